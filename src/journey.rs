//! Aggregated-journey proof generation.
//!
//! A journey proof chains individual-term proofs across independently
//! committed trees for one student. Terms where the student has no provable
//! records are logged and skipped, never escalated; a partial academic
//! history is still a useful credential. The proof fails only when no term
//! matched at all. Course detail in `academic_terms` comes from the source
//! journey record rather than the trees, preserving the display fidelity the
//! binary encoding drops.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::document::ProofDocument;
use crate::error::CredentialError;
use crate::proof::{
    generate_term_proof, AnchorReference, ClaimedValue, IndividualTermProof, TermProofTag,
};
use crate::records::{recompute_summary, term_sort_key, JourneySummary, RecordSet, StudentJourney};
use crate::tree::{TreeSystem, LEGACY_TERM_LABEL};

/// Identity block of the student the journey belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudentInfo {
    /// Registrar student identifier.
    pub student_id: String,
    /// Display name.
    pub student_name: String,
    /// Degree program.
    pub program: String,
    /// Enrollment date, `YYYY-MM-DD`.
    pub enrollment_date: String,
}

/// One term's course detail as carried by a journey proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyTerm {
    /// Term identifier.
    pub term: String,
    /// Full course detail, taken from the source journey record.
    pub courses: Vec<ClaimedValue>,
    /// Registrar-reported term GPA.
    pub term_gpa: f64,
    /// Credit hours for the term.
    pub total_credits: u32,
}

/// One entry of the multi-tree verification chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEntry {
    /// Term this entry proves.
    pub term: String,
    /// Anchor fields of the term's tree.
    pub blockchain_deployment: AnchorReference,
    /// Number of verification keys proved for this term.
    pub verification_keys_count: usize,
    /// Course codes proved for this term.
    pub courses_verified: Vec<String>,
}

/// Institutional attestation block for journey proofs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JourneyAttestation {
    /// Issuing institution.
    pub institution: String,
}

/// Generation metadata carried by every journey proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyMetadata {
    /// Terms that produced a chain entry.
    pub total_terms_verified: usize,
    /// Anchored trees the chain references (equal to the chain length).
    pub total_blockchain_deployments: usize,
    /// RFC 3339 generation timestamp.
    pub proof_generation_timestamp: String,
    /// Document-level type label.
    pub proof_type: String,
}

/// A proof chaining individual-term proofs across trees for one student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedJourneyProof {
    /// Shape discriminant, always `aggregated_journey`.
    #[serde(rename = "type")]
    pub tag: String,
    /// Student identity.
    pub student_info: StudentInfo,
    /// Per-term course detail in chronological order.
    pub academic_terms: Vec<JourneyTerm>,
    /// Aggregate figures recomputed from `academic_terms`; externally
    /// supplied summaries are never trusted.
    pub journey_summary: JourneySummary,
    /// One entry per proved term, in chronological order regardless of
    /// tree construction order.
    pub multi_tree_verification_chain: Vec<ChainEntry>,
    /// Institutional attestation.
    pub institutional_verification: JourneyAttestation,
    /// Generation metadata.
    pub metadata: JourneyMetadata,
}

/// Generates the aggregated journey proof for one student.
///
/// Fails with [`CredentialError::StudentNotFound`] only when no term in the
/// journey could be proved against any tree.
pub fn generate_journey_proof(
    system: &TreeSystem,
    journey: &StudentJourney,
    institution: &str,
) -> Result<AggregatedJourneyProof, CredentialError> {
    let mut terms: Vec<&crate::records::AcademicTerm> = journey.academic_terms.iter().collect();
    terms.sort_by_key(|t| term_sort_key(&t.term));

    let mut chain: Vec<ChainEntry> = Vec::new();
    for term in &terms {
        let Some(tree) = system.tree_for_term(&term.term) else {
            warn!(
                student = %journey.student_id,
                term = %term.term,
                "no committed tree for term, skipping"
            );
            continue;
        };
        match generate_term_proof(tree, &journey.student_id, None, TermProofTag::IndividualTerm) {
            Ok(proof) => chain.push(ChainEntry {
                term: term.term.clone(),
                verification_keys_count: proof.verkle_proof.verification_keys.len(),
                courses_verified: proof.claim.claimed_courses,
                blockchain_deployment: proof.blockchain_reference,
            }),
            Err(err) => warn!(
                student = %journey.student_id,
                term = %term.term,
                error = %err,
                "term proof failed, excluding from journey"
            ),
        }
    }

    if chain.is_empty() {
        return Err(CredentialError::StudentNotFound {
            student_id: journey.student_id.clone(),
            scope: "journey".to_string(),
        });
    }

    info!(
        student = %journey.student_id,
        terms_verified = chain.len(),
        terms_listed = terms.len(),
        "generated journey proof"
    );

    Ok(AggregatedJourneyProof {
        tag: "aggregated_journey".to_string(),
        student_info: StudentInfo {
            student_id: journey.student_id.clone(),
            student_name: journey.student_name.clone(),
            program: journey.program.clone(),
            enrollment_date: journey.enrollment_date.clone(),
        },
        academic_terms: terms
            .iter()
            .map(|term| JourneyTerm {
                term: term.term.clone(),
                courses: term.courses.iter().map(ClaimedValue::from).collect(),
                term_gpa: term.term_gpa,
                total_credits: term.total_credits,
            })
            .collect(),
        journey_summary: recompute_summary(journey),
        metadata: JourneyMetadata {
            total_terms_verified: chain.len(),
            total_blockchain_deployments: chain.len(),
            proof_generation_timestamp: Utc::now().to_rfc3339(),
            proof_type: "aggregated_journey_multi_tree".to_string(),
        },
        multi_tree_verification_chain: chain,
        institutional_verification: JourneyAttestation {
            institution: institution.to_string(),
        },
    })
}

/// Generates every proof the record set supports.
///
/// Multi-semester exports committed per term yield one individual-term
/// proof per student per term plus one journey proof per student. A
/// multi-semester export committed as a single undifferentiated tree
/// yields one whole-set proof per student instead; aggregated journeys
/// need per-term anchors, so none are produced in that combination.
/// Legacy exports yield one whole-set proof per student. Per-student
/// failures are logged and skipped so one bad record never blocks the
/// batch.
pub fn generate_all(records: &RecordSet, system: &TreeSystem) -> Vec<ProofDocument> {
    let mut documents = Vec::new();
    match records {
        RecordSet::MultiSemester { journeys, .. } => {
            let whole_set_tree = system
                .trees
                .iter()
                .find(|t| t.metadata.term_id == LEGACY_TERM_LABEL);
            if let Some(tree) = whole_set_tree {
                warn!(
                    "multi-semester export committed as one tree; emitting whole-set proofs, \
                     aggregated journeys unavailable"
                );
                for journey in journeys {
                    match generate_term_proof(
                        tree,
                        &journey.student_id,
                        None,
                        TermProofTag::SingleTerm,
                    ) {
                        Ok(proof) => documents.push(ProofDocument::Term(proof)),
                        Err(err) => warn!(
                            student = %journey.student_id,
                            error = %err,
                            "skipping whole-set proof"
                        ),
                    }
                }
                return documents;
            }
            for journey in journeys {
                for term in &journey.academic_terms {
                    let Some(tree) = system.tree_for_term(&term.term) else {
                        continue;
                    };
                    match generate_term_proof(
                        tree,
                        &journey.student_id,
                        None,
                        TermProofTag::IndividualTerm,
                    ) {
                        Ok(proof) => documents.push(ProofDocument::Term(proof)),
                        Err(err) => warn!(
                            student = %journey.student_id,
                            term = %term.term,
                            error = %err,
                            "skipping term proof"
                        ),
                    }
                }
                match generate_journey_proof(system, journey, records.institution()) {
                    Ok(proof) => documents.push(ProofDocument::Journey(proof)),
                    Err(err) => warn!(
                        student = %journey.student_id,
                        error = %err,
                        "skipping journey proof"
                    ),
                }
            }
        }
        RecordSet::Legacy { students, .. } => {
            for student in students {
                for tree in &system.trees {
                    match generate_term_proof(
                        tree,
                        &student.student_id,
                        None,
                        TermProofTag::SingleTerm,
                    ) {
                        Ok(proof) => documents.push(ProofDocument::Term(proof)),
                        Err(err) => warn!(
                            student = %student.student_id,
                            error = %err,
                            "skipping whole-set proof"
                        ),
                    }
                }
            }
        }
    }
    documents
}

/// Counts documents by kind: `(individual_term, single_term, journey)`.
pub fn count_by_tag(documents: &[ProofDocument]) -> (usize, usize, usize) {
    let mut individual = 0;
    let mut single = 0;
    let mut journeys = 0;
    for document in documents {
        match document {
            ProofDocument::Term(IndividualTermProof {
                tag: TermProofTag::IndividualTerm,
                ..
            }) => individual += 1,
            ProofDocument::Term(IndividualTermProof {
                tag: TermProofTag::SingleTerm,
                ..
            }) => single += 1,
            ProofDocument::Journey(_) => journeys += 1,
        }
    }
    (individual, single, journeys)
}
