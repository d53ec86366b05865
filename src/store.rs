//! Proof persistence.
//!
//! One JSON file per proof, named by student (and term for per-term
//! proofs), plus a `summary.json` describing aggregate counts. A thin I/O
//! wrapper over the document types; nothing here inspects proof contents
//! beyond what naming requires.

use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::document::ProofDocument;
use crate::error::CredentialError;
use crate::proof::TermProofTag;

/// Aggregate description of one persisted batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSummary {
    /// Total documents written, excluding the summary itself.
    pub total_proofs: usize,
    /// Per-term proofs written.
    pub individual_term_proofs: usize,
    /// Legacy whole-set proofs written.
    pub single_term_proofs: usize,
    /// Journey proofs written.
    pub journey_proofs: usize,
    /// RFC 3339 write timestamp.
    pub generated_at: String,
    /// File names written, in batch order.
    pub files: Vec<String>,
}

fn file_name(document: &ProofDocument) -> String {
    match document {
        ProofDocument::Term(proof) => match proof.tag {
            TermProofTag::IndividualTerm => {
                format!("term_{}_{}.json", proof.claim.student_id, proof.claim.term)
            }
            TermProofTag::SingleTerm => format!("single_term_{}.json", proof.claim.student_id),
        },
        ProofDocument::Journey(proof) => {
            format!("journey_{}.json", proof.student_info.student_id)
        }
    }
}

/// Writes every document into `dir` and a `summary.json` beside them.
///
/// The directory is created if missing; existing files with the same names
/// are overwritten.
pub fn save_proofs(
    documents: &[ProofDocument],
    dir: impl AsRef<Path>,
) -> Result<StoreSummary, CredentialError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut individual = 0;
    let mut single = 0;
    let mut journeys = 0;
    let mut files = Vec::with_capacity(documents.len());
    for document in documents {
        match document {
            ProofDocument::Term(proof) => match proof.tag {
                TermProofTag::IndividualTerm => individual += 1,
                TermProofTag::SingleTerm => single += 1,
            },
            ProofDocument::Journey(_) => journeys += 1,
        }
        let name = file_name(document);
        fs::write(dir.join(&name), document.to_json_string()?)?;
        files.push(name);
    }

    let summary = StoreSummary {
        total_proofs: documents.len(),
        individual_term_proofs: individual,
        single_term_proofs: single,
        journey_proofs: journeys,
        generated_at: Utc::now().to_rfc3339(),
        files,
    };
    fs::write(dir.join("summary.json"), serde_json::to_string_pretty(&summary)?)?;

    info!(
        directory = %dir.display(),
        proofs = summary.total_proofs,
        "saved proof batch"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::LocalAnchorer;
    use crate::config::{InstitutionKey, SystemConfig};
    use crate::journey::generate_all;
    use crate::records::RecordSet;
    use crate::tree::{build, BuildStrategy};

    fn sample_documents() -> Vec<ProofDocument> {
        let set = RecordSet::from_json_str(
            r#"{
                "export_metadata": {"institution": "IU"},
                "student_academic_journeys": [{
                    "student_id": "STU001",
                    "academic_terms": [{
                        "term": "Fall_2022",
                        "courses": [{
                            "course_code": "CS101", "course_name": "Intro",
                            "grade": "A", "completion_date": "2022-12-15",
                            "credits": 3, "term_id": "Fall_2022"
                        }],
                        "total_credits": 3
                    }]
                }]
            }"#,
        )
        .unwrap();
        let anchorer = LocalAnchorer::new(
            InstitutionKey::from_secret([4u8; 32], "store-test"),
            "sepolia",
        );
        let system =
            build(&set, BuildStrategy::PerTerm, &SystemConfig::default(), &anchorer).unwrap();
        generate_all(&set, &system)
    }

    #[test]
    fn batch_writes_named_files_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let documents = sample_documents();
        let summary = save_proofs(&documents, dir.path()).unwrap();

        assert_eq!(summary.total_proofs, 2);
        assert_eq!(summary.individual_term_proofs, 1);
        assert_eq!(summary.journey_proofs, 1);
        assert!(dir.path().join("term_STU001_Fall_2022.json").exists());
        assert!(dir.path().join("journey_STU001.json").exists());

        let text = fs::read_to_string(dir.path().join("summary.json")).unwrap();
        let parsed: StoreSummary = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.files.len(), 2);
    }

    #[test]
    fn saved_documents_parse_back() {
        let dir = tempfile::tempdir().unwrap();
        let documents = sample_documents();
        save_proofs(&documents, dir.path()).unwrap();
        let text = fs::read_to_string(dir.path().join("journey_STU001.json")).unwrap();
        let parsed = ProofDocument::from_json_str(&text).unwrap();
        assert!(matches!(parsed, ProofDocument::Journey(_)));
    }
}
