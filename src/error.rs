//! Failure taxonomy shared across the issuance pipeline.
//!
//! Every core operation is a pure computation over an already-validated
//! in-memory record set, so none of these conditions is retried internally.
//! Partial failure is policy only inside aggregated-journey generation,
//! where a term with no records is skipped rather than escalated.

use thiserror::Error;

/// Errors reported by the credential issuance pipeline.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// A caller passed malformed input (typically an empty identifier) into
    /// key derivation. This is a contract violation, not a runtime condition
    /// to recover from.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No records exist for the student in the queried scope (one tree, or
    /// every tree of a journey).
    #[error("no academic records found for student {student_id} in {scope}")]
    StudentNotFound {
        /// Student identifier that was queried.
        student_id: String,
        /// Scope that was searched (a term identifier, or `journey` when no
        /// term of an academic journey matched).
        scope: String,
    },

    /// A course filter was supplied and its intersection with the student's
    /// records is empty.
    #[error("none of the requested courses were found for student {student_id}")]
    NoMatchingCourses {
        /// Student identifier that was queried.
        student_id: String,
    },

    /// The external record set matches neither supported export shape.
    #[error("unknown academic data format: expected student_academic_journeys or student_records")]
    UnknownDataFormat,

    /// Filesystem failure in the persistence layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure at a document boundary.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
