//! Deterministic verification-key derivation.
//!
//! A record's key is a fixed-length *stem* — a truncated SHA-256 digest of
//! `(student, course, term, schema version)` — followed by a one-byte
//! disambiguator taken from the record's position within its student+term
//! record list. Records sharing a stem land in the same leaf; the suffix
//! keeps the full keys locally distinguishable within that group.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::CredentialError;

/// Serde adapter encoding byte vectors as lowercase hex strings.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes the bytes as a hex string.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    /// Deserializes a hex string back into bytes.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(&text).map_err(serde::de::Error::custom)
    }
}

/// Derived identifier for one completion record: stem plus disambiguator.
///
/// Ordering is the total order over the concatenated byte sequence, which
/// fixes leaf grouping independent of input order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VerificationKey {
    /// Truncated stem hash shared by all records of one (student, course,
    /// term) tuple.
    pub stem: Vec<u8>,
    /// Position of the record within its student+term record list, mod 256.
    pub suffix: u8,
}

impl VerificationKey {
    /// Returns the full key as a contiguous byte sequence.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.stem.len() + 1);
        out.extend_from_slice(&self.stem);
        out.push(self.suffix);
        out
    }

    /// Hex encoding of the full key bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parses a key from its hex encoding. The final byte is the suffix.
    pub fn from_hex(text: &str) -> Result<Self, CredentialError> {
        let bytes = hex::decode(text)
            .map_err(|err| CredentialError::InvalidInput(format!("bad key hex: {err}")))?;
        match bytes.split_last() {
            Some((suffix, stem)) => Ok(Self {
                stem: stem.to_vec(),
                suffix: *suffix,
            }),
            None => Err(CredentialError::InvalidInput("empty key".to_string())),
        }
    }
}

impl Serialize for VerificationKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for VerificationKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// Derives the stem for a completion record.
///
/// Two records with identical `(student, course, term)` under the same
/// schema version always derive the same stem. Empty identifiers are a
/// caller contract violation and are rejected as [`CredentialError::InvalidInput`].
pub fn derive_stem(
    student_id: &str,
    course_code: &str,
    term_id: &str,
    schema_version: &str,
    stem_length: usize,
) -> Result<Vec<u8>, CredentialError> {
    for (name, value) in [
        ("student_id", student_id),
        ("course_code", course_code),
        ("term_id", term_id),
        ("schema_version", schema_version),
    ] {
        if value.is_empty() {
            return Err(CredentialError::InvalidInput(format!("empty {name}")));
        }
    }
    let input = format!("{student_id}_{course_code}_{term_id}_{schema_version}");
    let digest = Sha256::digest(input.as_bytes());
    Ok(digest[..stem_length.min(digest.len())].to_vec())
}

/// Derives the full verification key for the record at `position` within
/// its student+term record list.
pub fn derive_key(
    student_id: &str,
    course_code: &str,
    term_id: &str,
    schema_version: &str,
    stem_length: usize,
    position: usize,
) -> Result<VerificationKey, CredentialError> {
    let stem = derive_stem(student_id, course_code, term_id, schema_version, stem_length)?;
    Ok(VerificationKey {
        stem,
        suffix: (position % 256) as u8,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const V: &str = "2.0.0";

    #[test]
    fn stem_is_deterministic() {
        let a = derive_stem("STU001", "CS101", "Fall_2022", V, 31).unwrap();
        let b = derive_stem("STU001", "CS101", "Fall_2022", V, 31).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 31);
    }

    #[test]
    fn stem_separates_tuples() {
        let base = derive_stem("STU001", "CS101", "Fall_2022", V, 31).unwrap();
        assert_ne!(base, derive_stem("STU002", "CS101", "Fall_2022", V, 31).unwrap());
        assert_ne!(base, derive_stem("STU001", "CS102", "Fall_2022", V, 31).unwrap());
        assert_ne!(base, derive_stem("STU001", "CS101", "Spring_2023", V, 31).unwrap());
        assert_ne!(base, derive_stem("STU001", "CS101", "Fall_2022", "1.0.0", 31).unwrap());
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let err = derive_stem("", "CS101", "Fall_2022", V, 31).unwrap_err();
        assert!(matches!(err, CredentialError::InvalidInput(_)));
    }

    #[test]
    fn suffix_wraps_at_256() {
        let key = derive_key("STU001", "CS101", "Fall_2022", V, 31, 300).unwrap();
        assert_eq!(key.suffix, 44);
    }

    #[test]
    fn ordering_follows_byte_sequence() {
        let low = VerificationKey {
            stem: vec![0u8; 31],
            suffix: 9,
        };
        let high = VerificationKey {
            stem: vec![1u8; 31],
            suffix: 0,
        };
        assert!(low < high);
        let sibling = VerificationKey {
            stem: vec![0u8; 31],
            suffix: 10,
        };
        assert!(low < sibling);
    }

    #[test]
    fn hex_round_trip() {
        let key = derive_key("STU001", "CS101", "Fall_2022", V, 31, 3).unwrap();
        let parsed = VerificationKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(key, parsed);
    }
}
