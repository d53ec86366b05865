//! Self-describing proof documents.
//!
//! Consumers distinguish the two proof kinds structurally: a term proof
//! carries `claim` and `verkle_proof`, a journey proof carries
//! `student_info` and `academic_terms`. The structural sniffing is
//! load-bearing for compatibility with documents issued before the `type`
//! field was reliable, so the enum is untagged rather than discriminated.

use serde::{Deserialize, Serialize};

use crate::error::CredentialError;
use crate::journey::AggregatedJourneyProof;
use crate::proof::IndividualTermProof;

/// Either proof kind, distinguished by document shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProofDocument {
    /// One student's records within one tree.
    Term(IndividualTermProof),
    /// A chain of term proofs across trees.
    Journey(AggregatedJourneyProof),
}

impl ProofDocument {
    /// Student the document is about.
    pub fn student_id(&self) -> &str {
        match self {
            Self::Term(proof) => &proof.claim.student_id,
            Self::Journey(proof) => &proof.student_info.student_id,
        }
    }

    /// Serializes the document as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, CredentialError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a document of either kind from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, CredentialError> {
        Ok(serde_json::from_str(text)?)
    }
}
