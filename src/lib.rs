#![deny(missing_docs)]

//! # verkle_house
//!
//! `verkle_house` issues verifiable academic-credential proofs. It takes a
//! registrar export of per-student course-completion records, derives
//! deterministic verification keys, commits the encoded records into
//! Verkle-style trees (one per academic term, or one tree in legacy mode),
//! binds each tree to a symbolic ledger anchor, and emits self-contained
//! proof documents a third party can check without contacting the
//! institution again.
//!
//! The pipeline, leaves-first:
//!
//! 1. [`keys`] — stems and verification keys from
//!    `(student, course, term, schema version)`.
//! 2. [`encode`] — fixed-width binary encoding of completion records.
//! 3. [`tree`] — sort, group by stem, batch into internal nodes, root
//!    commitment; per-term and legacy build strategies.
//! 4. [`anchor`] — symbolic external-ledger anchoring with institutional
//!    HMAC attestation.
//! 5. [`proof`] / [`journey`] — individual-term proofs and aggregated
//!    journey proofs chaining terms across trees.
//! 6. [`document`] / [`store`] — self-describing JSON documents and their
//!    on-disk layout.
//!
//! Commitments are SHA-256 hash-chain surrogates behind the
//! [`tree::CommitmentScheme`] trait; the document shapes are designed so a
//! real polynomial-commitment backend can replace the surrogate without
//! breaking issued proofs.
//!
//! ## Example
//!
//! ```rust
//! use verkle_house::{
//!     build, generate_term_proof, BuildStrategy, InstitutionKey, LocalAnchorer, RecordSet,
//!     SystemConfig, TermProofTag,
//! };
//!
//! let set = RecordSet::from_json_str(r#"{
//!     "export_metadata": {"institution": "IU", "semester": "Fall_2022"},
//!     "student_records": [{
//!         "student_id": "STU001",
//!         "course_completions": [{
//!             "course_code": "CS101", "course_name": "Intro to CS",
//!             "grade": "A", "completion_date": "2022-12-15",
//!             "credits": 3, "semester": "Fall_2022"
//!         }]
//!     }]
//! }"#).unwrap();
//!
//! let anchorer = LocalAnchorer::new(InstitutionKey::generate(), "sepolia");
//! let system = build(&set, BuildStrategy::Legacy, &SystemConfig::default(), &anchorer).unwrap();
//! let proof = generate_term_proof(
//!     &system.trees[0], "STU001", None, TermProofTag::SingleTerm,
//! ).unwrap();
//! assert_eq!(proof.claim.claimed_courses, vec!["CS101"]);
//! ```

pub mod anchor;
pub mod config;
pub mod document;
pub mod encode;
pub mod error;
pub mod journey;
pub mod keys;
pub mod proof;
pub mod records;
pub mod store;
pub mod tree;

pub use anchor::{AnchorContext, AnchorRecord, AnchorTermMetadata, Anchorer, LocalAnchorer};
pub use config::{CryptoParams, InstitutionKey, SystemConfig};
pub use document::ProofDocument;
pub use encode::{encode_completion, grade_points, EncodedValue};
pub use error::CredentialError;
pub use journey::{generate_all, generate_journey_proof, AggregatedJourneyProof};
pub use keys::{derive_key, derive_stem, VerificationKey};
pub use proof::{generate_term_proof, IndividualTermProof, TermProofTag};
pub use records::{recompute_summary, CourseCompletion, RecordSet, StudentJourney};
pub use store::{save_proofs, StoreSummary};
pub use tree::{build, BuildStrategy, Tree, TreeSystem};
