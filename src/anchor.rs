//! Symbolic anchoring of root commitments.
//!
//! An anchor record stands in for an external-ledger deployment: opaque
//! address/transaction/block identifiers bound 1:1 to a tree at
//! construction time and never mutated afterwards. Identifier uniqueness is
//! a process-wide allocation concern, not a cryptographic guarantee. The
//! attached signature is the institution's HMAC over the commitment hash —
//! attestation, not double-spend safety.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::InstitutionKey;

/// Returns `bytes` bytes of OS randomness as lowercase hex.
pub(crate) fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Term-level metadata embedded in the deployment record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnchorTermMetadata {
    /// Term the anchored tree covers.
    pub term_id: String,
    /// Issuing institution.
    pub institution: String,
    /// Students represented in the tree.
    pub student_count: usize,
    /// Completion records committed by the tree.
    pub course_count: usize,
}

/// Symbolic external-ledger reference bound to one tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnchorRecord {
    /// Address-like identifier of the anchoring contract.
    pub contract_address: String,
    /// Transaction-like identifier of the anchoring submission.
    pub transaction_hash: String,
    /// Block-like counter at which the anchor was recorded.
    pub block_number: u64,
    /// Hash-like identifier of the containing block.
    pub block_hash: String,
    /// Gas figure carried for parity with the ledger record shape.
    pub gas_used: u64,
    /// Network label the anchor nominally belongs to.
    pub network: String,
    /// RFC 3339 timestamp of anchor allocation.
    pub deployment_timestamp: String,
    /// Root commitment hash this anchor binds.
    pub commitment_hash: String,
    /// Institutional HMAC-SHA256 attestation over the commitment hash.
    pub institution_signature: String,
    /// Term metadata captured at anchoring time.
    pub term_metadata: AnchorTermMetadata,
}

/// Term-level context available when an anchor is allocated.
#[derive(Debug, Clone)]
pub struct AnchorContext<'a> {
    /// Term the tree covers.
    pub term_id: &'a str,
    /// Issuing institution.
    pub institution: &'a str,
    /// Students represented in the tree.
    pub student_count: usize,
    /// Completion records committed by the tree.
    pub course_count: usize,
}

/// Capability producing anchor records for root commitments.
///
/// The default implementation allocates local identifiers; a real
/// implementation would submit a ledger transaction. The tree and proof
/// data model stays decoupled from this choice.
pub trait Anchorer: Send + Sync {
    /// Allocates a fresh anchor binding `commitment_hash`. Cannot fail
    /// under normal operation and is never retried.
    fn anchor(&self, commitment_hash: &str, ctx: &AnchorContext<'_>) -> AnchorRecord;
}

/// Anchorer allocating process-local identifiers.
#[derive(Debug)]
pub struct LocalAnchorer {
    key: InstitutionKey,
    network: String,
    next_block: AtomicU64,
}

impl LocalAnchorer {
    /// Creates an anchorer signing with `key` on the named network.
    pub fn new(key: InstitutionKey, network: impl Into<String>) -> Self {
        let mut jitter = [0u8; 4];
        OsRng.fill_bytes(&mut jitter);
        let base = 19_000_000 + u64::from(u32::from_be_bytes(jitter)) % 100_000;
        Self {
            key,
            network: network.into(),
            next_block: AtomicU64::new(base),
        }
    }
}

impl Anchorer for LocalAnchorer {
    fn anchor(&self, commitment_hash: &str, ctx: &AnchorContext<'_>) -> AnchorRecord {
        let block_number = self.next_block.fetch_add(1, Ordering::Relaxed);
        let mut gas = [0u8; 4];
        OsRng.fill_bytes(&mut gas);
        AnchorRecord {
            contract_address: format!("0x{}", random_hex(20)),
            transaction_hash: format!("0x{}", random_hex(32)),
            block_number,
            block_hash: format!("0x{}", random_hex(32)),
            gas_used: 150_000 + u64::from(u32::from_be_bytes(gas)) % 200_000,
            network: self.network.clone(),
            deployment_timestamp: Utc::now().to_rfc3339(),
            commitment_hash: commitment_hash.to_string(),
            institution_signature: self.key.sign(commitment_hash.as_bytes()),
            term_metadata: AnchorTermMetadata {
                term_id: ctx.term_id.to_string(),
                institution: ctx.institution.to_string(),
                student_count: ctx.student_count,
                course_count: ctx.course_count,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchorer() -> LocalAnchorer {
        LocalAnchorer::new(InstitutionKey::from_secret([9u8; 32], "anchor-test"), "sepolia")
    }

    fn ctx<'a>() -> AnchorContext<'a> {
        AnchorContext {
            term_id: "Fall_2022",
            institution: "IU",
            student_count: 1,
            course_count: 3,
        }
    }

    #[test]
    fn anchors_get_distinct_identifiers() {
        let anchorer = anchorer();
        let a = anchorer.anchor("deadbeef", &ctx());
        let b = anchorer.anchor("deadbeef", &ctx());
        assert_ne!(a.contract_address, b.contract_address);
        assert_ne!(a.transaction_hash, b.transaction_hash);
        assert_eq!(b.block_number, a.block_number + 1);
    }

    #[test]
    fn anchor_signature_verifies() {
        let key = InstitutionKey::from_secret([9u8; 32], "anchor-test");
        let anchorer = LocalAnchorer::new(key.clone(), "sepolia");
        let record = anchorer.anchor("cafebabe", &ctx());
        assert!(key.verify(b"cafebabe", &record.institution_signature));
        assert_eq!(record.commitment_hash, "cafebabe");
        assert_eq!(record.network, "sepolia");
    }

    #[test]
    fn anchor_captures_term_metadata() {
        let record = anchorer().anchor("deadbeef", &ctx());
        assert_eq!(record.term_metadata.term_id, "Fall_2022");
        assert_eq!(record.term_metadata.institution, "IU");
        assert_eq!(record.term_metadata.student_count, 1);
        assert_eq!(record.term_metadata.course_count, 3);
    }
}
