//! Property-based test generators using proptest.
//!
//! Strategies here keep the invariants the diff engine relies on: document
//! sets are sorted by `_id` with strictly increasing keys.

use colldiff_codec::{Document, Value};
use colldiff_core::KeyExtractor;
use proptest::prelude::*;

/// Strategy for generating scalar values of every type.
pub fn leaf_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::Int32),
        any::<i64>().prop_map(Value::Int64),
        (-1.0e6f64..1.0e6).prop_map(Value::Double),
        "[a-z]{0,8}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Binary),
        any::<i64>().prop_map(Value::DateTime),
    ]
}

/// Strategy for generating values, nesting documents and arrays up to three
/// levels deep.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    leaf_value_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,4}", inner), 0..4)
                .prop_map(|fields| Value::Document(Document::from_fields(fields))),
        ]
    })
}

/// Strategy for generating a document body without an `_id` field.
///
/// Field names are unique so that insertion never replaces a field.
pub fn body_strategy() -> impl Strategy<Value = Document> {
    prop::collection::btree_map("[a-z]{1,6}", value_strategy(), 0..4)
        .prop_map(|fields| fields.into_iter().collect::<Document>())
}

/// Strategy for generating a set of documents with distinct integer keys,
/// sorted by `_id`.
pub fn sorted_documents_strategy(max_len: usize) -> impl Strategy<Value = Vec<Document>> {
    prop::collection::btree_map(0i32..1000, body_strategy(), 0..max_len)
        .prop_map(|entries| entries.into_iter().map(|(id, body)| with_id(id, body)).collect())
}

/// Strategy for generating two diverging copies of a collection.
///
/// Both sides draw keys from a shared pool; each key is present on one side,
/// the other, or both, and shared keys carry either the same document or a
/// mutated one. Both sides come back sorted by `_id`.
pub fn divergent_pair_strategy(
    max_len: usize,
) -> impl Strategy<Value = (Vec<Document>, Vec<Document>)> {
    let entry = (placement_strategy(), body_strategy());
    prop::collection::btree_map(key_strategy(), entry, 0..max_len).prop_map(|entries| {
        let mut source = Vec::new();
        let mut syncing = Vec::new();
        for (key, (placement, body)) in entries {
            let doc = with_id(key.into_value(), body);
            match placement {
                Placement::SourceOnly => source.push(doc),
                Placement::SyncingOnly => syncing.push(doc),
                Placement::Both => {
                    source.push(doc.clone());
                    syncing.push(doc);
                }
                Placement::Mutated => {
                    syncing.push(doc.clone().with("__mutated", true));
                    source.push(doc);
                }
            }
        }
        let keys = KeyExtractor::default();
        keys.sort(&mut source);
        keys.sort(&mut syncing);
        (source, syncing)
    })
}

/// Where a generated key lands in a [`divergent_pair_strategy`] pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    SourceOnly,
    SyncingOnly,
    Both,
    Mutated,
}

fn placement_strategy() -> impl Strategy<Value = Placement> {
    prop_oneof![
        1 => Just(Placement::SourceOnly),
        1 => Just(Placement::SyncingOnly),
        3 => Just(Placement::Both),
        1 => Just(Placement::Mutated),
    ]
}

/// Key values of mixed type, deduplicated by canonical order.
///
/// `Int32(4)` and `Int64(4)` are the same key, so keys are generated as
/// `OrderedKey`s and duplicates collapse in the map.
fn key_strategy() -> impl Strategy<Value = OrderedKey> {
    prop_oneof![
        (0i32..500).prop_map(|n| OrderedKey(Value::Int32(n))),
        (500i64..1000).prop_map(|n| OrderedKey(Value::Int64(n))),
        (0u32..1000).prop_map(|n| OrderedKey(Value::Double(f64::from(n) + 0.5))),
        "[a-z]{1,4}".prop_map(|s| OrderedKey(Value::Text(s))),
    ]
}

/// A key value ordered canonically, for use as a map key.
#[derive(Debug, Clone)]
struct OrderedKey(Value);

impl OrderedKey {
    fn into_value(self) -> Value {
        self.0
    }
}

impl PartialEq for OrderedKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for OrderedKey {}

impl PartialOrd for OrderedKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp_canonical(&other.0)
    }
}

/// Prepends `_id` to `body`.
pub fn with_id(id: impl Into<Value>, body: Document) -> Document {
    let mut fields = Vec::with_capacity(body.len() + 1);
    fields.push(("_id".to_string(), id.into()));
    fields.extend(body.into_fields().into_iter().filter(|(name, _)| name != "_id"));
    Document::from_fields(fields)
}

/// Case counts for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
