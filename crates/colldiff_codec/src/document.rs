//! Ordered document type.

use crate::value::Value;
use std::cmp::Ordering;
use std::fmt;

/// An ordered collection of named fields.
///
/// Field order is preserved exactly as inserted (or as decoded) and is part
/// of a document's identity: `{a: 1, b: 2}` and `{b: 2, a: 1}` are not
/// structurally equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty document with room for `capacity` fields.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Build a document from raw fields, keeping duplicates and order as given.
    pub fn from_fields(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a field.
    ///
    /// An existing field with the same name is replaced in place and its
    /// previous value returned; otherwise the field is appended.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    /// Remove a field, preserving the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(index).1)
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Check whether a field is present.
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check whether the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(name, value)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Iterate over field names in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Borrow the raw field list.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Consume the document, returning its raw field list.
    pub fn into_fields(self) -> Vec<(String, Value)> {
        self.fields
    }

    /// Compare two documents using the canonical ordering.
    ///
    /// Fields are compared pairwise in document order: first the type class
    /// of the value, then the field name, then the value. A document that is
    /// a strict prefix of another sorts first.
    pub fn cmp_canonical(&self, other: &Self) -> Ordering {
        for ((an, av), (bn, bv)) in self.fields.iter().zip(other.fields.iter()) {
            let ord = av
                .type_rank()
                .cmp(&bv.type_rank())
                .then_with(|| an.as_bytes().cmp(bn.as_bytes()))
                .then_with(|| av.cmp_canonical(bv));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.fields.len().cmp(&other.fields.len())
    }

    /// Exact equality including field order and value widths.
    pub fn structurally_eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|((an, av), (bn, bv))| an == bn && av.structurally_eq(bv))
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return write!(f, "{{}}");
        }
        write!(f, "{{ ")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, " }}")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut document = Document::new();
        for (name, value) in iter {
            document.insert(name, value);
        }
        document
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_preserved() {
        let doc = Document::new().with("z", 1).with("a", 2).with("m", 3);
        let keys: Vec<_> = doc.keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut doc = Document::new().with("a", 1).with("b", 2);
        let previous = doc.insert("a", 10);

        assert_eq!(previous, Some(Value::Int32(1)));
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(doc.get("a"), Some(&Value::Int32(10)));
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let mut doc = Document::new().with("a", 1).with("b", 2).with("c", 3);
        assert_eq!(doc.remove("b"), Some(Value::Int32(2)));
        assert_eq!(doc.remove("missing"), None);
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn field_order_breaks_structural_equality() {
        let ab = Document::new().with("a", 1).with("b", 2);
        let ba = Document::new().with("b", 2).with("a", 1);
        assert!(!ab.structurally_eq(&ba));
        assert!(ab.structurally_eq(&ab.clone()));
    }

    #[test]
    fn extra_field_breaks_structural_equality() {
        let base = Document::new().with("_id", 40).with("num", 80);
        let extended = base.clone().with("extra", "yes");
        assert!(!base.structurally_eq(&extended));
    }

    #[test]
    fn canonical_ordering_prefix_sorts_first() {
        let short = Document::new().with("a", 1);
        let long = Document::new().with("a", 1).with("b", 1);
        assert_eq!(short.cmp_canonical(&long), Ordering::Less);
        assert_eq!(long.cmp_canonical(&short), Ordering::Greater);
    }

    #[test]
    fn canonical_ordering_checks_type_before_name() {
        // A text value outranks any number regardless of field name.
        let number = Document::new().with("z", 1);
        let text = Document::new().with("a", "x");
        assert_eq!(number.cmp_canonical(&text), Ordering::Less);
    }

    #[test]
    fn display_renders_shell_style() {
        let doc = Document::new()
            .with("_id", 2)
            .with("num", 4i64)
            .with("tags", Value::Array(vec!["a".into()]));
        assert_eq!(doc.to_string(), r#"{ _id: 2, num: NumberLong(4), tags: ["a"] }"#);
        assert_eq!(Document::new().to_string(), "{}");
    }

    #[test]
    fn collect_from_pairs() {
        let doc: Document = vec![("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get("b"), Some(&Value::Int32(2)));
    }
}
