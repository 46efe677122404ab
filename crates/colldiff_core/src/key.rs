//! Document identity keys.

use colldiff_codec::{Document, Value};
use std::cmp::Ordering;
use std::fmt;

/// Default identity field.
pub const DEFAULT_KEY_FIELD: &str = "_id";

/// The identity value of a document, ordered by the canonical type-aware
/// ordering.
///
/// Equality follows the ordering, so `DocumentKey(Int32(4))` and
/// `DocumentKey(Int64(4))` are the same key even though the values are not
/// structurally equal.
#[derive(Debug, Clone)]
pub struct DocumentKey(Value);

impl DocumentKey {
    /// Wraps a key value.
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// Borrow the key value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Unwrap the key value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl PartialEq for DocumentKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DocumentKey {}

impl PartialOrd for DocumentKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DocumentKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp_canonical(&other.0)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Extracts the identity key from documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyExtractor {
    field: String,
}

impl KeyExtractor {
    /// Creates an extractor for the given top-level field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// The field this extractor reads.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the document's key, or `None` if the field is absent.
    pub fn extract(&self, document: &Document) -> Option<DocumentKey> {
        document.get(&self.field).cloned().map(DocumentKey)
    }

    /// Sorts documents in place by key, as a sorted find would return them.
    ///
    /// Documents without the key field sort first.
    pub fn sort(&self, documents: &mut [Document]) {
        documents.sort_by(|a, b| self.extract(a).cmp(&self.extract(b)));
    }
}

impl Default for KeyExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_FIELD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_by_default() {
        let doc = Document::new().with("num", 1).with("_id", 7);
        let key = KeyExtractor::default().extract(&doc).unwrap();
        assert_eq!(key.value(), &Value::Int32(7));
    }

    #[test]
    fn missing_field_yields_none() {
        let doc = Document::new().with("num", 1);
        assert!(KeyExtractor::default().extract(&doc).is_none());
    }

    #[test]
    fn custom_field() {
        let doc = Document::new().with("_id", 1).with("sku", "A-1");
        let key = KeyExtractor::new("sku").extract(&doc).unwrap();
        assert_eq!(key.to_string(), "\"A-1\"");
    }

    #[test]
    fn keys_of_different_widths_are_equal() {
        assert_eq!(DocumentKey::new(4), DocumentKey::new(4i64));
        assert!(DocumentKey::new(30) < DocumentKey::new(30.2));
        assert!(DocumentKey::new(30.2) < DocumentKey::new(31i64));
    }

    #[test]
    fn keys_order_across_types() {
        assert!(DocumentKey::new(Value::Null) < DocumentKey::new(0));
        assert!(DocumentKey::new(1_000_000) < DocumentKey::new("a"));
    }

    #[test]
    fn sort_orders_by_key() {
        let mut docs = vec![
            Document::new().with("_id", 70.4),
            Document::new().with("_id", 3),
            Document::new().with("_id", "z"),
            Document::new().with("_id", 30.2),
        ];
        KeyExtractor::default().sort(&mut docs);

        let ids: Vec<String> = docs
            .iter()
            .map(|d| d.get("_id").unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["3", "30.2", "70.4", "\"z\""]);
    }
}
