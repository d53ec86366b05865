//! Fixed-width binary encoding of completion records.
//!
//! The encoded value is lossy for display fidelity but stable: identical
//! inputs always produce identical bytes, which is what leaf commitments
//! require. Layout (big-endian, fixed offsets):
//!
//! | offset | width | field                              |
//! |--------|-------|------------------------------------|
//! | 0      | 4     | grade points × 100                 |
//! | 4      | 4     | credits                            |
//! | 8      | 4     | completion date, epoch seconds     |
//! | 12     | 12    | course code, truncated, zero-padded|
//! | 24     | 8     | reserved (zero)                    |

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::records::CourseCompletion;

/// Byte width of every encoded leaf value.
pub const LEAF_VALUE_LENGTH: usize = 32;

/// Width of the truncated course-code field.
const COURSE_CODE_WIDTH: usize = 12;

/// Grade points on the 4.0 scale for a letter grade.
///
/// Grades outside the mapping degrade to 0.0 rather than failing; issuance
/// is never blocked by an unrecognised grade.
pub fn grade_points(letter: &str) -> f64 {
    match letter {
        "A+" | "A" => 4.0,
        "A-" => 3.7,
        "B+" => 3.3,
        "B" => 3.0,
        "B-" => 2.7,
        "C+" => 2.3,
        "C" => 2.0,
        "C-" => 1.7,
        "D+" => 1.3,
        "D" => 1.0,
        "D-" => 0.7,
        "F" => 0.0,
        _ => 0.0,
    }
}

/// Grade points scaled by 100 and rounded, as stored in encoded values.
pub fn grade_centipoints(letter: &str) -> u32 {
    (grade_points(letter) * 100.0).round() as u32
}

/// Parses a `YYYY-MM-DD` completion date into epoch seconds at midnight UTC.
///
/// Unparseable dates encode as 0 under the same never-block-issuance policy
/// as unknown grades.
fn completion_timestamp(date: &str) -> u32 {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(day) => {
            let seconds = day.and_time(NaiveTime::MIN).and_utc().timestamp();
            seconds.clamp(0, u32::MAX as i64) as u32
        }
        Err(_) => {
            warn!(date, "unparseable completion date, encoding as epoch 0");
            0
        }
    }
}

/// Fixed-width encoded form of one completion record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodedValue(pub [u8; LEAF_VALUE_LENGTH]);

impl EncodedValue {
    /// Returns the raw encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex encoding of the value.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Serialize for EncodedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EncodedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
        if bytes.len() != LEAF_VALUE_LENGTH {
            return Err(serde::de::Error::custom(format!(
                "encoded value must be {LEAF_VALUE_LENGTH} bytes, got {}",
                bytes.len()
            )));
        }
        let mut out = [0u8; LEAF_VALUE_LENGTH];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

/// Encodes a completion record into its fixed-width commitment form.
pub fn encode_completion(completion: &CourseCompletion) -> EncodedValue {
    let mut out = [0u8; LEAF_VALUE_LENGTH];
    out[0..4].copy_from_slice(&grade_centipoints(&completion.grade).to_be_bytes());
    out[4..8].copy_from_slice(&completion.credits.to_be_bytes());
    out[8..12].copy_from_slice(&completion_timestamp(&completion.completion_date).to_be_bytes());
    let code = completion.course_code.as_bytes();
    let width = code.len().min(COURSE_CODE_WIDTH);
    out[12..12 + width].copy_from_slice(&code[..width]);
    EncodedValue(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(grade: &str, credits: u32, date: &str, code: &str) -> CourseCompletion {
        CourseCompletion {
            course_code: code.to_string(),
            course_name: "Test Course".to_string(),
            grade: grade.to_string(),
            completion_date: date.to_string(),
            credits,
            instructor: "Prof. Test".to_string(),
            term_id: "Fall_2022".to_string(),
        }
    }

    #[test]
    fn layout_offsets() {
        let value = encode_completion(&completion("A", 3, "2022-12-15", "CS101"));
        let bytes = value.as_bytes();
        assert_eq!(u32::from_be_bytes(bytes[0..4].try_into().unwrap()), 400);
        assert_eq!(u32::from_be_bytes(bytes[4..8].try_into().unwrap()), 3);
        let ts = u32::from_be_bytes(bytes[8..12].try_into().unwrap());
        assert!(ts > 1_600_000_000);
        assert_eq!(&bytes[12..17], b"CS101");
        assert!(bytes[17..].iter().all(|b| *b == 0));
    }

    #[test]
    fn unknown_grade_defaults_to_zero() {
        let value = encode_completion(&completion("Z?", 3, "2022-12-15", "CS101"));
        assert_eq!(u32::from_be_bytes(value.as_bytes()[0..4].try_into().unwrap()), 0);
    }

    #[test]
    fn unparseable_date_defaults_to_zero() {
        let value = encode_completion(&completion("A", 3, "yesterday", "CS101"));
        assert_eq!(u32::from_be_bytes(value.as_bytes()[8..12].try_into().unwrap()), 0);
    }

    #[test]
    fn course_code_is_truncated() {
        let value = encode_completion(&completion("B+", 2, "2023-05-15", "VERYLONGCOURSECODE"));
        assert_eq!(&value.as_bytes()[12..24], b"VERYLONGCOUR");
    }

    #[test]
    fn encoding_is_stable() {
        let record = completion("B-", 4, "2023-05-15", "MATH102");
        assert_eq!(encode_completion(&record), encode_completion(&record));
    }

    #[test]
    fn hex_round_trip() {
        let value = encode_completion(&completion("A-", 3, "2024-12-15", "CS301"));
        let json = serde_json::to_string(&value).unwrap();
        let back: EncodedValue = serde_json::from_str(&json).unwrap();
        assert_eq!(value, back);
    }
}
