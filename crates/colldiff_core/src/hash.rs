//! Collection content hashing.
//!
//! A cheap pre-check before a full diff: two collections read in the same
//! order hash equal exactly when every document is structurally equal, since
//! the encoding is injective and each encoded document carries its own
//! length prefix.
//!
//! [`hash_sorted_collection`] additionally enforces the sorted-by-key
//! precondition of the diff, so equal hashes never hide an unsorted or
//! keyless stream.

use crate::cursor::DocumentCursor;
use crate::diff::{OrderedStream, Side};
use crate::error::CheckResult;
use crate::key::KeyExtractor;
use colldiff_codec::{Document, DocumentEncoder};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest over the encoded documents of a collection.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionHash([u8; 32]);

impl CollectionHash {
    /// Wraps a raw digest.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for CollectionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CollectionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionHash({})", self.to_hex())
    }
}

/// Hash and document count of one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSummary {
    /// Digest over every document in cursor order.
    pub hash: CollectionHash,
    /// Number of documents hashed.
    pub count: u64,
}

/// Running digest over encoded documents.
struct Digester {
    hasher: Sha256,
    encoder: DocumentEncoder,
    count: u64,
}

impl Digester {
    fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            encoder: DocumentEncoder::new(),
            count: 0,
        }
    }

    fn update(&mut self, document: &Document) -> CheckResult<()> {
        self.encoder.clear();
        self.encoder.encode_document(document)?;
        self.hasher.update(self.encoder.as_bytes());
        self.count += 1;
        Ok(())
    }

    fn finish(self) -> CollectionSummary {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&self.hasher.finalize());
        CollectionSummary {
            hash: CollectionHash(digest),
            count: self.count,
        }
    }
}

/// Drain `cursor`, hashing every document in the order yielded.
///
/// No ordering is checked; see [`hash_sorted_collection`].
///
/// # Errors
///
/// Propagates cursor and encoding failures.
pub fn hash_collection<C: DocumentCursor>(mut cursor: C) -> CheckResult<CollectionSummary> {
    let mut digester = Digester::new();
    while cursor.has_next()? {
        digester.update(&cursor.next_document()?)?;
    }
    Ok(digester.finish())
}

/// Drain a cursor that must be sorted by `keys`, hashing every document.
///
/// # Errors
///
/// - [`CheckError::OutOfOrder`](crate::CheckError::OutOfOrder) or
///   [`CheckError::MissingKey`](crate::CheckError::MissingKey), tagged with
///   `side`, if the cursor is not strictly increasing by key
/// - cursor and encoding failures
pub fn hash_sorted_collection<C: DocumentCursor>(
    cursor: C,
    keys: &KeyExtractor,
    side: Side,
) -> CheckResult<CollectionSummary> {
    let mut stream = OrderedStream::new(cursor, side, keys);
    let mut digester = Digester::new();
    while let Some((_, document)) = stream.advance()? {
        digester.update(&document)?;
    }
    Ok(digester.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{CursorError, IterCursor, VecCursor};
    use crate::error::CheckError;
    use colldiff_codec::Document;

    fn docs() -> Vec<Document> {
        (0..5)
            .map(|i| Document::new().with("_id", i).with("num", i * 2))
            .collect()
    }

    #[test]
    fn empty_collection_hashes_to_sha256_of_nothing() {
        let summary = hash_collection(VecCursor::empty()).unwrap();
        assert_eq!(summary.count, 0);
        assert_eq!(
            summary.hash.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn equal_collections_hash_equal() {
        let a = hash_collection(VecCursor::new(docs())).unwrap();
        let b = hash_collection(VecCursor::new(docs())).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.count, 5);
    }

    #[test]
    fn widened_number_changes_hash() {
        let mut widened = docs();
        widened[2].insert("num", 4i64);

        let a = hash_collection(VecCursor::new(docs())).unwrap();
        let b = hash_collection(VecCursor::new(widened)).unwrap();
        assert_ne!(a.hash, b.hash);
        assert_eq!(a.count, b.count);
    }

    #[test]
    fn missing_document_changes_hash() {
        let mut fewer = docs();
        fewer.remove(1);

        let a = hash_collection(VecCursor::new(docs())).unwrap();
        let b = hash_collection(VecCursor::new(fewer)).unwrap();
        assert_ne!(a.hash, b.hash);
        assert_eq!(b.count, 4);
    }

    #[test]
    fn display_is_lowercase_hex() {
        let hash = CollectionHash::from_bytes([0xab; 32]);
        assert_eq!(hash.to_string(), "ab".repeat(32));
    }

    #[test]
    fn sorted_hash_matches_unchecked_hash() {
        let keys = KeyExtractor::default();
        let checked = hash_sorted_collection(VecCursor::new(docs()), &keys, Side::Source).unwrap();
        let unchecked = hash_collection(VecCursor::new(docs())).unwrap();
        assert_eq!(checked, unchecked);
    }

    #[test]
    fn sorted_hash_rejects_descending_keys() {
        let keys = KeyExtractor::default();
        let unsorted = vec![Document::new().with("_id", 3), Document::new().with("_id", 1)];

        let err = hash_sorted_collection(VecCursor::new(unsorted), &keys, Side::Syncing)
            .unwrap_err();
        assert!(err.is_precondition_violation());
        assert_eq!(err.side(), Some(Side::Syncing));
    }

    #[test]
    fn sorted_hash_rejects_missing_key() {
        let keys = KeyExtractor::default();
        let keyless = vec![Document::new().with("_id", 1), Document::new().with("num", 9)];

        assert!(matches!(
            hash_sorted_collection(VecCursor::new(keyless), &keys, Side::Source),
            Err(CheckError::MissingKey { side: Side::Source, .. })
        ));
    }

    #[test]
    fn cursor_errors_propagate() {
        let cursor = IterCursor::new(vec![Err(CursorError::Closed)].into_iter());
        assert!(matches!(
            hash_collection(cursor),
            Err(CheckError::Cursor(CursorError::Closed))
        ));
    }
}
