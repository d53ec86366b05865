//! Input record model: course completions, academic terms, and student
//! journeys.
//!
//! The record set arrives from an external registrar export in one of two
//! supported JSON shapes: the multi-semester journey format
//! (`student_academic_journeys`) or the legacy flat format
//! (`student_records`). Anything else is rejected as
//! [`CredentialError::UnknownDataFormat`]. Records are immutable once
//! loaded.

use serde::{Deserialize, Serialize};

use crate::encode::grade_points;
use crate::error::CredentialError;

/// One completed course for one student. Immutable input data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseCompletion {
    /// Registrar course code, e.g. `CS101`.
    pub course_code: String,
    /// Human-readable course title.
    pub course_name: String,
    /// Letter grade awarded.
    pub grade: String,
    /// Completion date, `YYYY-MM-DD`.
    pub completion_date: String,
    /// Credit hours awarded.
    pub credits: u32,
    /// Instructor of record.
    #[serde(default)]
    pub instructor: String,
    /// Term the completion belongs to, e.g. `Fall_2022`.
    #[serde(alias = "semester")]
    pub term_id: String,
}

/// One academic term within a student journey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademicTerm {
    /// Term identifier, e.g. `Fall_2022`.
    pub term: String,
    /// Completions recorded for this term.
    pub courses: Vec<CourseCompletion>,
    /// GPA reported by the registrar for this term.
    #[serde(default)]
    pub term_gpa: f64,
    /// Credit hours reported for this term.
    #[serde(default)]
    pub total_credits: u32,
}

/// Aggregate figures over an entire academic journey.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JourneySummary {
    /// Number of academic terms.
    pub total_terms: usize,
    /// Number of course completions across all terms.
    pub total_courses: usize,
    /// Credit hours across all terms.
    pub total_credits: u32,
    /// Credit-weighted grade-point average, rounded to two decimals.
    pub cumulative_gpa: f64,
    /// Enrollment date carried from the student record.
    #[serde(default)]
    pub start_date: String,
    /// Chronologically latest term identifier.
    #[serde(default)]
    pub latest_term: String,
}

/// A student's complete multi-term academic history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentJourney {
    /// Registrar student identifier.
    pub student_id: String,
    /// Display name.
    #[serde(default)]
    pub student_name: String,
    /// Degree program.
    #[serde(default)]
    pub program: String,
    /// Enrollment date, `YYYY-MM-DD`.
    #[serde(default)]
    pub enrollment_date: String,
    /// Terms in registrar order.
    pub academic_terms: Vec<AcademicTerm>,
    /// Registrar-supplied summary. Proof generation never trusts this;
    /// see [`recompute_summary`].
    #[serde(default = "empty_summary")]
    pub journey_summary: JourneySummary,
}

fn empty_summary() -> JourneySummary {
    JourneySummary::default()
}

/// Legacy flat student record: completions without term grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Registrar student identifier.
    pub student_id: String,
    /// Display name.
    #[serde(default)]
    pub student_name: String,
    /// All completions for this student, each carrying its own term.
    pub course_completions: Vec<CourseCompletion>,
}

/// Export-level metadata shared by both input shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Issuing institution name.
    pub institution: String,
    /// Semester label, present only in legacy exports.
    #[serde(default)]
    pub semester: Option<String>,
}

/// The full input record set in either supported shape.
#[derive(Debug, Clone)]
pub enum RecordSet {
    /// Multi-semester journey export: one entry per student, terms grouped.
    MultiSemester {
        /// Export-level metadata.
        metadata: ExportMetadata,
        /// Per-student journeys.
        journeys: Vec<StudentJourney>,
    },
    /// Legacy flat export: completions listed per student without term
    /// grouping.
    Legacy {
        /// Export-level metadata.
        metadata: ExportMetadata,
        /// Per-student flat records.
        students: Vec<StudentRecord>,
    },
}

#[derive(Deserialize)]
struct MultiSemesterExport {
    export_metadata: ExportMetadata,
    student_academic_journeys: Vec<StudentJourney>,
}

#[derive(Deserialize)]
struct LegacyExport {
    export_metadata: ExportMetadata,
    student_records: Vec<StudentRecord>,
}

impl RecordSet {
    /// Detects the export shape of a parsed JSON document and loads it.
    pub fn from_value(value: serde_json::Value) -> Result<Self, CredentialError> {
        if value.get("student_academic_journeys").is_some() {
            let export: MultiSemesterExport = serde_json::from_value(value)?;
            Ok(Self::MultiSemester {
                metadata: export.export_metadata,
                journeys: export.student_academic_journeys,
            })
        } else if value.get("student_records").is_some() {
            let export: LegacyExport = serde_json::from_value(value)?;
            Ok(Self::Legacy {
                metadata: export.export_metadata,
                students: export.student_records,
            })
        } else {
            Err(CredentialError::UnknownDataFormat)
        }
    }

    /// Parses a record set from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, CredentialError> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Reads and parses a record set from a file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, CredentialError> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Issuing institution recorded in the export metadata.
    pub fn institution(&self) -> &str {
        match self {
            Self::MultiSemester { metadata, .. } | Self::Legacy { metadata, .. } => {
                &metadata.institution
            }
        }
    }

    /// Number of students in the export.
    pub fn student_count(&self) -> usize {
        match self {
            Self::MultiSemester { journeys, .. } => journeys.len(),
            Self::Legacy { students, .. } => students.len(),
        }
    }

    /// Journeys, when the export is in multi-semester form.
    pub fn journeys(&self) -> Option<&[StudentJourney]> {
        match self {
            Self::MultiSemester { journeys, .. } => Some(journeys),
            Self::Legacy { .. } => None,
        }
    }
}

/// Sort key placing term identifiers in chronological order.
///
/// `Season_Year` identifiers order by year, then Winter < Spring < Summer <
/// Fall. Identifiers that do not parse sort after all parseable ones, by
/// plain string comparison, so the order is still total and deterministic.
pub fn term_sort_key(term: &str) -> (i32, u8, String) {
    if let Some((season, year)) = term.split_once('_') {
        if let Ok(year) = year.parse::<i32>() {
            let rank = match season {
                "Winter" => 0,
                "Spring" => 1,
                "Summer" => 2,
                "Fall" => 3,
                _ => u8::MAX,
            };
            if rank != u8::MAX {
                return (year, rank, String::new());
            }
        }
    }
    (i32::MAX, u8::MAX, term.to_string())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Recomputes a journey summary from the journey's terms.
///
/// Externally supplied summaries are never trusted; every proof carries a
/// summary produced here. The GPA is credit-weighted over all courses and
/// rounded to two decimals.
pub fn recompute_summary(journey: &StudentJourney) -> JourneySummary {
    let total_terms = journey.academic_terms.len();
    let total_courses: usize = journey.academic_terms.iter().map(|t| t.courses.len()).sum();
    let total_credits: u32 = journey.academic_terms.iter().map(|t| t.total_credits).sum();
    let grade_point_sum: f64 = journey
        .academic_terms
        .iter()
        .flat_map(|t| t.courses.iter())
        .map(|c| grade_points(&c.grade) * f64::from(c.credits))
        .sum();
    let cumulative_gpa = if total_credits > 0 {
        round2(grade_point_sum / f64::from(total_credits))
    } else {
        0.0
    };
    let latest_term = journey
        .academic_terms
        .iter()
        .max_by_key(|t| term_sort_key(&t.term))
        .map(|t| t.term.clone())
        .unwrap_or_default();
    JourneySummary {
        total_terms,
        total_courses,
        total_credits,
        cumulative_gpa,
        start_date: journey.enrollment_date.clone(),
        latest_term,
    }
}
