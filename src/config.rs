//! System configuration and institution key material.
//!
//! Everything the pipeline needs to parameterise tree construction and
//! attestation is carried in explicit values passed down the call chain;
//! nothing here is ambient or global. The institution key is read-only
//! after construction and may be shared immutably across concurrent
//! operations.

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Trusted-setup label embedded in every root commitment. An opaque
/// provenance tag, not cryptographically enforced.
pub const DEFAULT_TRUSTED_SETUP: &str = "ethereum_verkle_ceremony_2024";

/// Schema version mixed into stem derivation. Bumping it re-keys every
/// record.
pub const SCHEMA_VERSION: &str = "2.0.0";

/// Network label recorded on anchor records.
pub const DEFAULT_NETWORK: &str = "sepolia";

/// Structural parameters of the commitment tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CryptoParams {
    /// Maximum number of leaf children batched under one internal node.
    pub node_width: usize,
    /// Byte length of the truncated stem hash.
    pub stem_length: usize,
    /// Byte length of an encoded leaf value (fixed at 32 in this
    /// implementation).
    pub leaf_value_length: usize,
    /// Number of paired commitments in the inner-product-argument stub.
    pub proof_depth: usize,
}

impl Default for CryptoParams {
    fn default() -> Self {
        Self {
            node_width: 256,
            stem_length: 31,
            leaf_value_length: 32,
            proof_depth: 8,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Tree and proof shape parameters.
    pub params: CryptoParams,
    /// Trusted-setup provenance tag referenced by root commitments.
    pub trusted_setup: String,
    /// Schema version mixed into every derived stem.
    pub schema_version: String,
    /// Network label stamped onto anchor records.
    pub network: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            params: CryptoParams::default(),
            trusted_setup: DEFAULT_TRUSTED_SETUP.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            network: DEFAULT_NETWORK.to_string(),
        }
    }
}

/// Institutional key material used to attest commitments.
///
/// The signature produced here is an HMAC-SHA256 over the committed hash: it
/// proves institutional attestation, not double-spend safety.
#[derive(Debug, Clone)]
pub struct InstitutionKey {
    secret: [u8; 32],
    /// Hex-encoded public half published alongside proofs.
    pub public_key: String,
    /// Short identifier naming this key in institutional records.
    pub key_id: String,
}

impl InstitutionKey {
    /// Generates fresh key material from OS randomness.
    pub fn generate() -> Self {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        let mut public = [0u8; 64];
        OsRng.fill_bytes(&mut public);
        let mut key_id = [0u8; 16];
        OsRng.fill_bytes(&mut key_id);
        Self {
            secret,
            public_key: hex::encode(public),
            key_id: hex::encode(key_id),
        }
    }

    /// Constructs key material from an existing 32-byte secret.
    pub fn from_secret(secret: [u8; 32], key_id: impl Into<String>) -> Self {
        let mut public = [0u8; 64];
        OsRng.fill_bytes(&mut public);
        Self {
            secret,
            public_key: hex::encode(public),
            key_id: key_id.into(),
        }
    }

    /// Signs arbitrary data with HMAC-SHA256 and returns the hex digest.
    pub fn sign(&self, data: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(data);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Checks a signature previously produced by [`InstitutionKey::sign`].
    pub fn verify(&self, data: &[u8], signature_hex: &str) -> bool {
        self.sign(data) == signature_hex
    }
}
