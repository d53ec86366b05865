//! Individual-term proof generation.
//!
//! A term proof is scoped to one student's records within one tree. The
//! `claim` and `claimed_values` are deterministic given the same tree,
//! student and filter; the challenge and inner-product stub are fresh
//! randomness on every call (issuance nonces, not soundness parameters).
//! The commitment-path values stand in for real inclusion proofs and are
//! modeled as opaque payloads so a polynomial-commitment backend can
//! replace them without changing the document shape.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::anchor::random_hex;
use crate::encode::EncodedValue;
use crate::error::CredentialError;
use crate::keys::VerificationKey;
use crate::records::CourseCompletion;
use crate::tree::{KeyedRecord, Tree};

/// Historic discriminants for the term-proof shape.
///
/// Both tags denote the same document layout. `single_term` is emitted by
/// the legacy whole-set pipeline and `individual_term` by the per-term
/// pipeline; verifiers accept either, and the two are deliberately never
/// unified so older documents keep validating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermProofTag {
    /// Per-term-tree proof.
    #[serde(rename = "individual_term")]
    IndividualTerm,
    /// Legacy whole-set proof.
    #[serde(rename = "single_term")]
    SingleTerm,
}

/// The statement a term proof attests to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TermClaim {
    /// Student the claim is about.
    pub student_id: String,
    /// Term the claim is scoped to.
    pub term: String,
    /// Course codes claimed, in verification-data order.
    pub claimed_courses: Vec<String>,
}

/// Decoded course detail carried alongside the binary commitment data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimedValue {
    /// Registrar course code.
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
    pub instructor: String,
}

impl From<&CourseCompletion> for ClaimedValue {
    fn from(completion: &CourseCompletion) -> Self {
        Self {
            course_code: completion.course_code.clone(),
            course_name: completion.course_name.clone(),
            grade: completion.grade.clone(),
            completion_date: completion.completion_date.clone(),
            credits: completion.credits,
            instructor: completion.instructor.clone(),
        }
    }
}

/// Inner-product-argument-shaped stub: `proof_depth` paired commitments
/// plus a final evaluation, all freshly random.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnerProductArgument {
    /// Left-side commitments, hex.
    pub left_commitments: Vec<String>,
    /// Right-side commitments, hex.
    pub right_commitments: Vec<String>,
    /// Final evaluation value, hex.
    pub final_evaluation: String,
}

impl InnerProductArgument {
    fn fresh(depth: usize) -> Self {
        Self {
            left_commitments: (0..depth).map(|_| random_hex(32)).collect(),
            right_commitments: (0..depth).map(|_| random_hex(32)).collect(),
            final_evaluation: random_hex(32),
        }
    }
}

/// The cryptographic body of a term proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptographicProof {
    /// Stems proved absent. Always empty in the current pipeline; the
    /// field is part of the document shape.
    pub absence_stems: Vec<String>,
    /// One presence bit per claimed key, zero-filled, hex.
    pub extension_presence_flags: String,
    /// Per-record commitment-path values taken from the owning leaf.
    pub commitment_paths: Vec<String>,
    /// Fresh issuance nonce, hex.
    pub random_challenge: String,
    /// Randomised argument stub.
    pub inner_product_argument: InnerProductArgument,
}

/// Commitment data bundled with the claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerkleProofBundle {
    /// Decoded course details, one per claimed record.
    pub claimed_values: Vec<ClaimedValue>,
    /// The cryptographic body.
    pub cryptographic_proof: CryptographicProof,
    /// Verification keys of the claimed records, hex.
    pub verification_keys: Vec<VerificationKey>,
    /// Encoded values of the claimed records, hex.
    pub encoded_values: Vec<EncodedValue>,
    /// Serialized size of the cryptographic body, bytes.
    pub proof_size_bytes: usize,
}

/// The anchor fields a proof carries out of its tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnchorReference {
    /// Anchoring contract identifier.
    pub contract_address: String,
    /// Anchoring transaction identifier.
    pub transaction_hash: String,
    /// Block counter at anchoring time.
    pub block_number: u64,
    /// Root commitment of the referenced tree.
    pub tree_commitment: String,
    /// RFC 3339 anchoring timestamp.
    pub deployment_timestamp: String,
}

impl AnchorReference {
    /// Extracts the reference fields from a tree's anchor.
    pub fn from_tree(tree: &Tree) -> Self {
        Self {
            contract_address: tree.anchor.contract_address.clone(),
            transaction_hash: tree.anchor.transaction_hash.clone(),
            block_number: tree.anchor.block_number,
            tree_commitment: tree.root.commitment_hash.clone(),
            deployment_timestamp: tree.anchor.deployment_timestamp.clone(),
        }
    }
}

/// Institutional attestation block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstitutionalVerification {
    /// Issuing institution.
    pub institution: String,
    /// Term the attestation is scoped to.
    pub term: String,
}

/// Generation metadata carried by every term proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermProofMetadata {
    /// Students in the referenced tree.
    pub total_students_in_tree: usize,
    /// RFC 3339 generation timestamp.
    pub proof_generation_timestamp: String,
    /// Historic tag, repeated in metadata for document consumers.
    pub proof_type: TermProofTag,
}

/// A proof scoped to one student's records within one tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndividualTermProof {
    /// Historic shape discriminant.
    #[serde(rename = "type")]
    pub tag: TermProofTag,
    /// The attested statement.
    pub claim: TermClaim,
    /// Commitment data and decoded values.
    pub verkle_proof: VerkleProofBundle,
    /// Anchor fields of the referenced tree.
    pub blockchain_reference: AnchorReference,
    /// Institutional attestation.
    pub institutional_verification: InstitutionalVerification,
    /// Generation metadata.
    pub metadata: TermProofMetadata,
}

fn build_cryptographic_proof(targets: &[&KeyedRecord], tree: &Tree) -> CryptographicProof {
    let flag_bytes = targets.len().div_ceil(8);
    let commitment_paths = targets
        .iter()
        .map(|record| {
            match tree.leaf_for_stem(&record.verification_key.stem) {
                Some(leaf) => leaf.commitment.point_representation.clone(),
                // Unreachable for records taken from this tree's own
                // verification data; kept total rather than panicking.
                None => random_hex(32),
            }
        })
        .collect();
    CryptographicProof {
        absence_stems: Vec::new(),
        extension_presence_flags: hex::encode(vec![0u8; flag_bytes]),
        commitment_paths,
        random_challenge: random_hex(32),
        inner_product_argument: InnerProductArgument::fresh(tree.metadata.params.proof_depth),
    }
}

/// Generates a term proof for one student against one tree.
///
/// Fails with [`CredentialError::StudentNotFound`] when the student has no
/// records in the tree, and [`CredentialError::NoMatchingCourses`] when a
/// supplied course filter excludes everything.
pub fn generate_term_proof(
    tree: &Tree,
    student_id: &str,
    requested_courses: Option<&[String]>,
    tag: TermProofTag,
) -> Result<IndividualTermProof, CredentialError> {
    let student_records = tree.records_for(student_id);
    if student_records.is_empty() {
        return Err(CredentialError::StudentNotFound {
            student_id: student_id.to_string(),
            scope: tree.metadata.term_id.clone(),
        });
    }

    let targets: Vec<&KeyedRecord> = match requested_courses {
        Some(requested) if !requested.is_empty() => {
            let filtered: Vec<&KeyedRecord> = student_records
                .into_iter()
                .filter(|r| requested.iter().any(|c| *c == r.completion.course_code))
                .collect();
            if filtered.is_empty() {
                return Err(CredentialError::NoMatchingCourses {
                    student_id: student_id.to_string(),
                });
            }
            filtered
        }
        _ => student_records,
    };

    let cryptographic_proof = build_cryptographic_proof(&targets, tree);
    let proof_size_bytes = serde_json::to_string(&cryptographic_proof)?.len();

    info!(
        student = student_id,
        term = %tree.metadata.term_id,
        courses = targets.len(),
        "generated term proof"
    );

    Ok(IndividualTermProof {
        tag,
        claim: TermClaim {
            student_id: student_id.to_string(),
            term: tree.metadata.term_id.clone(),
            claimed_courses: targets
                .iter()
                .map(|r| r.completion.course_code.clone())
                .collect(),
        },
        verkle_proof: VerkleProofBundle {
            claimed_values: targets.iter().map(|r| ClaimedValue::from(&r.completion)).collect(),
            cryptographic_proof,
            verification_keys: targets.iter().map(|r| r.verification_key.clone()).collect(),
            encoded_values: targets.iter().map(|r| r.encoded_value).collect(),
            proof_size_bytes,
        },
        blockchain_reference: AnchorReference::from_tree(tree),
        institutional_verification: InstitutionalVerification {
            institution: tree.metadata.institution.clone(),
            term: tree.metadata.term_id.clone(),
        },
        metadata: TermProofMetadata {
            total_students_in_tree: tree.metadata.student_count,
            proof_generation_timestamp: Utc::now().to_rfc3339(),
            proof_type: tag,
        },
    })
}
