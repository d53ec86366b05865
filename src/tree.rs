//! Commitment-tree construction.
//!
//! A tree commits to one term's completion records (or, in legacy mode, to
//! an entire undifferentiated record set). Construction sorts the keyed
//! records, groups them by stem into leaf nodes, batches leaves into
//! internal nodes of `node_width`, and computes a root commitment over the
//! full node sequence. Sorting fixes grouping and ordering independent of
//! input order, which is what makes root commitments reproducible.
//!
//! Commitment computation sits behind [`CommitmentScheme`] so the hash-chain
//! surrogate used here can later be swapped for a real polynomial
//! commitment without touching the tree shape.

use std::collections::HashMap;

use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::anchor::{random_hex, AnchorContext, AnchorRecord, Anchorer};
use crate::config::SystemConfig;
use crate::encode::{encode_completion, EncodedValue};
use crate::error::CredentialError;
use crate::keys::{derive_key, hex_bytes, VerificationKey};
use crate::records::{term_sort_key, CourseCompletion, RecordSet};

/// Term label applied when a legacy tree spans the whole record set.
pub const LEGACY_TERM_LABEL: &str = "Multi_Semester_Journey";

/// One keyed, encoded completion record as stored in a tree's
/// verification data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyedRecord {
    /// Derived verification key (stem plus disambiguator).
    pub verification_key: VerificationKey,
    /// Fixed-width encoded completion value.
    pub encoded_value: EncodedValue,
    /// Owning student.
    pub student_id: String,
    /// Term the record belongs to.
    pub term_id: String,
    /// The original completion record, kept for display-fidelity claims.
    pub completion: CourseCompletion,
}

/// A node commitment: deterministic hash plus a point-shaped surrogate.
///
/// The point representation stands in for an elliptic-curve point and is
/// freshly random; only the hash is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Commitment {
    /// Deterministic commitment hash, hex.
    pub commitment_hash: String,
    /// Opaque point-shaped payload, hex.
    pub point_representation: String,
}

/// Root commitment summarising an entire tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RootCommitment {
    /// Deterministic hash over every leaf and internal commitment, in
    /// construction order.
    pub commitment_hash: String,
    /// Opaque point-shaped payload, hex.
    pub point_representation: String,
    /// Commitment algorithm label carried by proof documents.
    pub commitment_algorithm: String,
    /// Nominal trusted-setup provenance tag (not enforced).
    pub trusted_setup_reference: String,
}

/// Capability computing node and root commitments.
pub trait CommitmentScheme: Send + Sync {
    /// Commits to a leaf's encoded values in their grouped order.
    fn commit_leaf(&self, values: &[EncodedValue]) -> Commitment;
    /// Commits to a batch of child commitments in leaf order.
    fn commit_internal(&self, children: &[Commitment]) -> Commitment;
    /// Commits to the full ordered node sequence `[leaves..., internals...]`.
    fn commit_root(
        &self,
        leaves: &[Commitment],
        internals: &[Commitment],
        trusted_setup: &str,
    ) -> RootCommitment;
}

/// Production scheme: SHA-256 hash chains over hex commitment strings.
#[derive(Debug, Default)]
pub struct HashChainScheme;

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

impl CommitmentScheme for HashChainScheme {
    fn commit_leaf(&self, values: &[EncodedValue]) -> Commitment {
        let mut hasher = Sha256::new();
        for value in values {
            hasher.update(value.as_bytes());
        }
        Commitment {
            commitment_hash: hex::encode(hasher.finalize()),
            point_representation: random_hex(32),
        }
    }

    fn commit_internal(&self, children: &[Commitment]) -> Commitment {
        let joined: String = children.iter().map(|c| c.commitment_hash.as_str()).collect();
        Commitment {
            commitment_hash: sha256_hex(joined.as_bytes()),
            point_representation: random_hex(32),
        }
    }

    fn commit_root(
        &self,
        leaves: &[Commitment],
        internals: &[Commitment],
        trusted_setup: &str,
    ) -> RootCommitment {
        let joined: String = leaves
            .iter()
            .chain(internals.iter())
            .map(|c| c.commitment_hash.as_str())
            .collect();
        // The empty sequence is valid and hashes to the digest of zero bytes.
        RootCommitment {
            commitment_hash: sha256_hex(joined.as_bytes()),
            point_representation: random_hex(32),
            commitment_algorithm: "inner_product_argument".to_string(),
            trusted_setup_reference: trusted_setup.to_string(),
        }
    }
}

/// Leaf node: the records sharing one stem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafNode {
    /// Stem shared by every record in this leaf.
    #[serde(with = "hex_bytes")]
    pub stem: Vec<u8>,
    /// Encoded values in sorted-key order.
    pub encoded_values: Vec<EncodedValue>,
    /// Commitment over the encoded values.
    pub commitment: Commitment,
}

/// Internal node batching up to `node_width` leaf commitments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalNode {
    /// Child leaf commitment hashes, in leaf order.
    pub child_commitments: Vec<String>,
    /// Commitment over the children.
    pub commitment: Commitment,
}

/// Descriptive metadata carried by every tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeMetadata {
    /// Term this tree covers (or [`LEGACY_TERM_LABEL`]).
    pub term_id: String,
    /// Issuing institution.
    pub institution: String,
    /// Completion records committed.
    pub record_count: usize,
    /// Distinct students represented.
    pub student_count: usize,
    /// RFC 3339 construction timestamp.
    pub construction_timestamp: String,
    /// Structural parameters the tree was built with.
    pub params: crate::config::CryptoParams,
}

/// An immutable, anchored commitment tree over one record partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    /// Descriptive metadata.
    pub metadata: TreeMetadata,
    /// Root commitment over all nodes.
    pub root: RootCommitment,
    /// Anchor record bound at construction time.
    pub anchor: AnchorRecord,
    /// Leaf nodes in sorted-stem order.
    pub leaves: Vec<LeafNode>,
    /// Internal nodes in batch order.
    pub internals: Vec<InternalNode>,
    /// Every keyed record, in sorted-key order. Whoever holds the tree can
    /// reconstruct any proof from this list; there is no separate
    /// inclusion-proof retrieval path.
    pub verification_data: Vec<KeyedRecord>,
}

impl Tree {
    /// All of the student's records in this tree, in sorted-key order.
    pub fn records_for(&self, student_id: &str) -> Vec<&KeyedRecord> {
        self.verification_data
            .iter()
            .filter(|r| r.student_id == student_id)
            .collect()
    }

    /// The leaf owning the given stem, if present.
    pub fn leaf_for_stem(&self, stem: &[u8]) -> Option<&LeafNode> {
        self.leaves.iter().find(|leaf| leaf.stem == stem)
    }

    /// Serializes the tree as a self-describing JSON document.
    pub fn to_json_string(&self) -> Result<String, CredentialError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Named construction strategies behind the single [`build`] entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStrategy {
    /// One tree per distinct academic term.
    PerTerm,
    /// One tree over the entire record set, undifferentiated by term.
    Legacy,
}

/// The set of trees produced by one build run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSystem {
    /// Trees in chronological term order.
    pub trees: Vec<Tree>,
}

impl TreeSystem {
    /// Finds the tree committed for a term.
    pub fn tree_for_term(&self, term_id: &str) -> Option<&Tree> {
        self.trees.iter().find(|t| t.metadata.term_id == term_id)
    }
}

/// One record flattened out of the record set, with the position used for
/// key disambiguation.
struct FlatRecord {
    student_id: String,
    position: usize,
    completion: CourseCompletion,
}

/// Flattens the record set, assigning each record its position within its
/// student+term record list.
fn flatten(records: &RecordSet) -> Vec<FlatRecord> {
    let mut positions: HashMap<(String, String), usize> = HashMap::new();
    let mut out = Vec::new();
    let mut push = |student_id: &str, completion: CourseCompletion| {
        let slot = positions
            .entry((student_id.to_string(), completion.term_id.clone()))
            .or_insert(0);
        out.push(FlatRecord {
            student_id: student_id.to_string(),
            position: *slot,
            completion,
        });
        *slot += 1;
    };
    match records {
        RecordSet::MultiSemester { journeys, .. } => {
            for journey in journeys {
                for term in &journey.academic_terms {
                    for course in &term.courses {
                        let mut completion = course.clone();
                        completion.term_id = term.term.clone();
                        push(&journey.student_id, completion);
                    }
                }
            }
        }
        RecordSet::Legacy { students, .. } => {
            for student in students {
                for completion in &student.course_completions {
                    push(&student.student_id, completion.clone());
                }
            }
        }
    }
    out
}

fn build_one(
    term_label: &str,
    entries: &[FlatRecord],
    institution: &str,
    config: &SystemConfig,
    scheme: &dyn CommitmentScheme,
    anchorer: &dyn Anchorer,
) -> Result<Tree, CredentialError> {
    let mut keyed: Vec<KeyedRecord> = entries
        .iter()
        .map(|entry| {
            let key = derive_key(
                &entry.student_id,
                &entry.completion.course_code,
                &entry.completion.term_id,
                &config.schema_version,
                config.params.stem_length,
                entry.position,
            )?;
            Ok(KeyedRecord {
                verification_key: key,
                encoded_value: encode_completion(&entry.completion),
                student_id: entry.student_id.clone(),
                term_id: entry.completion.term_id.clone(),
                completion: entry.completion.clone(),
            })
        })
        .collect::<Result<_, CredentialError>>()?;
    keyed.sort_by(|a, b| a.verification_key.cmp(&b.verification_key));

    let mut leaves: Vec<LeafNode> = Vec::new();
    for record in &keyed {
        match leaves.last_mut() {
            Some(leaf) if leaf.stem == record.verification_key.stem => {
                leaf.encoded_values.push(record.encoded_value);
            }
            _ => leaves.push(LeafNode {
                stem: record.verification_key.stem.clone(),
                encoded_values: vec![record.encoded_value],
                commitment: Commitment {
                    commitment_hash: String::new(),
                    point_representation: String::new(),
                },
            }),
        }
    }
    for leaf in &mut leaves {
        leaf.commitment = scheme.commit_leaf(&leaf.encoded_values);
    }

    let internals: Vec<InternalNode> = leaves
        .chunks(config.params.node_width)
        .map(|chunk| {
            let children: Vec<Commitment> = chunk.iter().map(|l| l.commitment.clone()).collect();
            InternalNode {
                child_commitments: children.iter().map(|c| c.commitment_hash.clone()).collect(),
                commitment: scheme.commit_internal(&children),
            }
        })
        .collect();

    let leaf_commitments: Vec<Commitment> = leaves.iter().map(|l| l.commitment.clone()).collect();
    let internal_commitments: Vec<Commitment> =
        internals.iter().map(|n| n.commitment.clone()).collect();
    let root = scheme.commit_root(&leaf_commitments, &internal_commitments, &config.trusted_setup);

    let mut students: Vec<&str> = keyed.iter().map(|r| r.student_id.as_str()).collect();
    students.sort_unstable();
    students.dedup();
    let student_count = students.len();

    let anchor = anchorer.anchor(
        &root.commitment_hash,
        &AnchorContext {
            term_id: term_label,
            institution,
            student_count,
            course_count: keyed.len(),
        },
    );

    info!(
        term = term_label,
        records = keyed.len(),
        leaves = leaves.len(),
        root = %root.commitment_hash,
        "constructed commitment tree"
    );

    Ok(Tree {
        metadata: TreeMetadata {
            term_id: term_label.to_string(),
            institution: institution.to_string(),
            record_count: keyed.len(),
            student_count,
            construction_timestamp: Utc::now().to_rfc3339(),
            params: config.params.clone(),
        },
        root,
        anchor,
        leaves,
        internals,
        verification_data: keyed,
    })
}

/// Builds the tree system for a record set with the production hash-chain
/// commitment scheme.
pub fn build(
    records: &RecordSet,
    strategy: BuildStrategy,
    config: &SystemConfig,
    anchorer: &dyn Anchorer,
) -> Result<TreeSystem, CredentialError> {
    build_with_scheme(records, strategy, config, &HashChainScheme, anchorer)
}

/// Builds the tree system with an explicit commitment scheme.
///
/// Per-term partitions read only their own records and write only their own
/// tree, so construction across terms runs in parallel.
pub fn build_with_scheme(
    records: &RecordSet,
    strategy: BuildStrategy,
    config: &SystemConfig,
    scheme: &dyn CommitmentScheme,
    anchorer: &dyn Anchorer,
) -> Result<TreeSystem, CredentialError> {
    let institution = records.institution().to_string();
    let flat = flatten(records);

    let partitions: Vec<(String, Vec<FlatRecord>)> = match strategy {
        BuildStrategy::PerTerm => {
            let mut by_term: Vec<(String, Vec<FlatRecord>)> = Vec::new();
            for record in flat {
                let term = record.completion.term_id.clone();
                match by_term.iter_mut().find(|(label, _)| *label == term) {
                    Some((_, bucket)) => bucket.push(record),
                    None => by_term.push((term, vec![record])),
                }
            }
            by_term.sort_by_key(|(label, _)| term_sort_key(label));
            by_term
        }
        BuildStrategy::Legacy => {
            let label = match records {
                RecordSet::Legacy { metadata, .. } => metadata
                    .semester
                    .clone()
                    .unwrap_or_else(|| LEGACY_TERM_LABEL.to_string()),
                RecordSet::MultiSemester { .. } => LEGACY_TERM_LABEL.to_string(),
            };
            vec![(label, flat)]
        }
    };

    let trees = partitions
        .par_iter()
        .map(|(label, entries)| build_one(label, entries, &institution, config, scheme, anchorer))
        .collect::<Result<Vec<Tree>, CredentialError>>()?;

    Ok(TreeSystem { trees })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstitutionKey;
    use crate::records::{AcademicTerm, ExportMetadata, StudentJourney, StudentRecord};
    use proptest::prelude::*;

    fn completion(code: &str, grade: &str, credits: u32, term: &str) -> CourseCompletion {
        CourseCompletion {
            course_code: code.to_string(),
            course_name: format!("Course {code}"),
            grade: grade.to_string(),
            completion_date: "2022-12-15".to_string(),
            credits,
            instructor: "Prof. Smith".to_string(),
            term_id: term.to_string(),
        }
    }

    fn legacy_set(records: Vec<(&str, CourseCompletion)>) -> RecordSet {
        let mut students: Vec<StudentRecord> = Vec::new();
        for (student_id, record) in records {
            match students.iter_mut().find(|s| s.student_id == student_id) {
                Some(student) => student.course_completions.push(record),
                None => students.push(StudentRecord {
                    student_id: student_id.to_string(),
                    student_name: format!("Student {student_id}"),
                    course_completions: vec![record],
                }),
            }
        }
        RecordSet::Legacy {
            metadata: ExportMetadata {
                institution: "International University Vietnam".to_string(),
                semester: Some("Fall_2022".to_string()),
            },
            students,
        }
    }

    fn test_anchorer() -> crate::anchor::LocalAnchorer {
        crate::anchor::LocalAnchorer::new(
            InstitutionKey::from_secret([3u8; 32], "tree-test"),
            "sepolia",
        )
    }

    fn build_legacy(records: Vec<(&str, CourseCompletion)>) -> Tree {
        let system = build(
            &legacy_set(records),
            BuildStrategy::Legacy,
            &SystemConfig::default(),
            &test_anchorer(),
        )
        .unwrap();
        system.trees.into_iter().next().unwrap()
    }

    #[test]
    fn root_commitment_is_deterministic() {
        let records = || {
            vec![
                ("STU001", completion("CS101", "A", 3, "Fall_2022")),
                ("STU001", completion("MATH101", "B", 4, "Fall_2022")),
                ("STU002", completion("CS101", "A-", 3, "Fall_2022")),
            ]
        };
        let a = build_legacy(records());
        let b = build_legacy(records());
        assert_eq!(a.root.commitment_hash, b.root.commitment_hash);
    }

    #[test]
    fn root_commitment_is_order_invariant() {
        let forward = vec![
            ("STU001", completion("CS101", "A", 3, "Fall_2022")),
            ("STU001", completion("MATH101", "B", 4, "Fall_2022")),
            ("STU002", completion("CS101", "A-", 3, "Fall_2022")),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();
        let a = build_legacy(forward);
        let b = build_legacy(reversed);
        assert_eq!(a.root.commitment_hash, b.root.commitment_hash);
    }

    #[test]
    fn identical_tuples_share_a_leaf() {
        let tree = build_legacy(vec![
            ("STU001", completion("CS101", "A", 3, "Fall_2022")),
            ("STU001", completion("CS101", "A", 3, "Fall_2022")),
            ("STU001", completion("MATH101", "B", 4, "Fall_2022")),
        ]);
        assert_eq!(tree.leaves.len(), 2);
        let stem = &tree
            .verification_data
            .iter()
            .find(|r| r.completion.course_code == "CS101")
            .unwrap()
            .verification_key
            .stem;
        let leaf = tree.leaf_for_stem(stem).unwrap();
        assert_eq!(leaf.encoded_values.len(), 2);
    }

    #[test]
    fn empty_record_set_yields_a_defined_tree() {
        let tree = build_legacy(Vec::new());
        assert!(tree.leaves.is_empty());
        assert!(tree.internals.is_empty());
        // SHA-256 of the empty byte sequence.
        assert_eq!(
            tree.root.commitment_hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert!(!tree.anchor.contract_address.is_empty());
    }

    #[test]
    fn leaves_batch_into_internal_nodes_by_width() {
        let mut config = SystemConfig::default();
        config.params.node_width = 2;
        let system = build(
            &legacy_set(vec![
                ("STU001", completion("CS101", "A", 3, "Fall_2022")),
                ("STU001", completion("MATH101", "B", 4, "Fall_2022")),
                ("STU002", completion("CS101", "A-", 3, "Fall_2022")),
            ]),
            BuildStrategy::Legacy,
            &config,
            &test_anchorer(),
        )
        .unwrap();
        let tree = &system.trees[0];
        assert_eq!(tree.leaves.len(), 3);
        assert_eq!(tree.internals.len(), 2);
        assert_eq!(tree.internals[0].child_commitments.len(), 2);
        assert_eq!(tree.internals[1].child_commitments.len(), 1);
    }

    #[test]
    fn per_term_strategy_builds_one_tree_per_term_in_chronological_order() {
        let journeys = vec![StudentJourney {
            student_id: "STU001".to_string(),
            student_name: "Student STU001".to_string(),
            program: "Computer Science".to_string(),
            enrollment_date: "2022-09-01".to_string(),
            academic_terms: vec![
                AcademicTerm {
                    term: "Spring_2023".to_string(),
                    courses: vec![completion("CS102", "A", 4, "Spring_2023")],
                    term_gpa: 4.0,
                    total_credits: 4,
                },
                AcademicTerm {
                    term: "Fall_2022".to_string(),
                    courses: vec![completion("CS101", "A", 3, "Fall_2022")],
                    term_gpa: 4.0,
                    total_credits: 3,
                },
            ],
            journey_summary: crate::records::JourneySummary::default(),
        }];
        let set = RecordSet::MultiSemester {
            metadata: ExportMetadata {
                institution: "IU".to_string(),
                semester: None,
            },
            journeys,
        };
        let system = build(
            &set,
            BuildStrategy::PerTerm,
            &SystemConfig::default(),
            &test_anchorer(),
        )
        .unwrap();
        assert_eq!(system.trees.len(), 2);
        assert_eq!(system.trees[0].metadata.term_id, "Fall_2022");
        assert_eq!(system.trees[1].metadata.term_id, "Spring_2023");
        assert_ne!(
            system.trees[0].anchor.contract_address,
            system.trees[1].anchor.contract_address
        );
    }

    #[test]
    fn tree_document_round_trips() {
        let tree = build_legacy(vec![("STU001", completion("CS101", "A", 3, "Fall_2022"))]);
        let json = tree.to_json_string().unwrap();
        let back: Tree = serde_json::from_str(&json).unwrap();
        assert_eq!(back.root.commitment_hash, tree.root.commitment_hash);
        assert_eq!(back.verification_data.len(), 1);
    }

    fn as_refs(v: &[(String, CourseCompletion)]) -> Vec<(&str, CourseCompletion)> {
        v.iter().map(|(s, c)| (s.as_str(), c.clone())).collect()
    }

    proptest! {
        #[test]
        fn shuffled_inputs_commit_to_the_same_root(
            grades in proptest::collection::vec(0usize..5, 2..8),
            permutation in proptest::collection::vec(0usize..100, 2..8).prop_shuffle(),
        ) {
            let letters = ["A", "B+", "B", "C", "F"];
            let records: Vec<(String, CourseCompletion)> = grades
                .iter()
                .enumerate()
                .map(|(i, g)| {
                    (
                        format!("STU{:03}", i % 3),
                        completion(&format!("CS{:03}", 100 + i), letters[*g], 3, "Fall_2022"),
                    )
                })
                .collect();
            let order: Vec<usize> = {
                let mut idx: Vec<usize> = (0..records.len()).collect();
                idx.sort_by_key(|i| permutation.get(*i).copied().unwrap_or(0));
                idx
            };
            let shuffled: Vec<(String, CourseCompletion)> =
                order.iter().map(|i| records[*i].clone()).collect();

            let a = build_legacy(as_refs(&records));
            let b = build_legacy(as_refs(&shuffled));
            prop_assert_eq!(a.root.commitment_hash, b.root.commitment_hash);
        }
    }
}
