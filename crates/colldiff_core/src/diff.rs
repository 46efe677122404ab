//! Sorted-merge collection diff.
//!
//! Compares two cursors over logically corresponding collections (a source,
//! such as a primary, and a syncing copy, such as a secondary) in a single
//! linear pass. Both cursors must yield documents in strictly increasing key
//! order; nothing else is assumed about them. They may be read at different
//! instants and from different servers.
//!
//! ## Algorithm
//!
//! Classic two-pointer merge. At each step the pending document of each side
//! is compared by key:
//!
//! - equal keys: the documents are compared structurally, recorded as a
//!   content difference if they differ, and both sides advance
//! - source key smaller: the source document is missing on syncing
//! - syncing key smaller: the syncing document is missing on source
//!
//! Once one side is drained, every remaining document of the other side is
//! missing from the drained one. At most one pending document per side is
//! held at any time.

use crate::config::DiffOptions;
use crate::cursor::DocumentCursor;
use crate::error::{CheckError, CheckResult};
use crate::key::{DocumentKey, KeyExtractor};
use colldiff_codec::Document;
use std::cmp::Ordering;
use std::fmt;
use tracing::{debug, trace, warn};

/// Which of the two compared copies a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The reference copy.
    Source,
    /// The copy under scrutiny.
    Syncing,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Syncing => write!(f, "syncing"),
        }
    }
}

/// Two documents that share a key but differ in content.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPair {
    /// The document as read from the source.
    pub source_node: Document,
    /// The document as read from the syncing copy.
    pub syncing_node: Document,
}

impl DocumentPair {
    /// Exchange source and syncing.
    #[must_use]
    pub fn swapped(self) -> Self {
        Self {
            source_node: self.syncing_node,
            syncing_node: self.source_node,
        }
    }
}

/// The result of one diff run.
///
/// Documents that are identical on both sides appear in none of the lists.
/// Every list is in increasing key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionDiff {
    /// Pairs sharing a key but differing in content.
    pub docs_with_different_contents: Vec<DocumentPair>,
    /// Documents present on syncing with no matching key on source.
    pub docs_missing_on_source: Vec<Document>,
    /// Documents present on source with no matching key on syncing.
    pub docs_missing_on_syncing: Vec<Document>,
}

impl CollectionDiff {
    /// Returns true if no divergence was found.
    pub fn is_empty(&self) -> bool {
        self.docs_with_different_contents.is_empty()
            && self.docs_missing_on_source.is_empty()
            && self.docs_missing_on_syncing.is_empty()
    }

    /// Total number of entries across all three lists.
    pub fn total_differences(&self) -> usize {
        self.docs_with_different_contents.len()
            + self.docs_missing_on_source.len()
            + self.docs_missing_on_syncing.len()
    }

    /// The diff that relabelling source as syncing (and vice versa) would
    /// have produced.
    #[must_use]
    pub fn swapped(self) -> Self {
        Self {
            docs_with_different_contents: self
                .docs_with_different_contents
                .into_iter()
                .map(DocumentPair::swapped)
                .collect(),
            docs_missing_on_source: self.docs_missing_on_syncing,
            docs_missing_on_syncing: self.docs_missing_on_source,
        }
    }
}

/// A cursor wrapped with key extraction and the strictly-increasing check.
pub(crate) struct OrderedStream<'k, C> {
    cursor: C,
    side: Side,
    keys: &'k KeyExtractor,
    last_key: Option<DocumentKey>,
    pub(crate) taken: u64,
}

impl<'k, C: DocumentCursor> OrderedStream<'k, C> {
    pub(crate) fn new(cursor: C, side: Side, keys: &'k KeyExtractor) -> Self {
        Self {
            cursor,
            side,
            keys,
            last_key: None,
            taken: 0,
        }
    }

    /// Pull the next document, or `None` once the cursor is drained.
    pub(crate) fn advance(&mut self) -> CheckResult<Option<(DocumentKey, Document)>> {
        if !self.cursor.has_next()? {
            return Ok(None);
        }
        let document = self.cursor.next_document()?;
        self.taken += 1;

        let Some(key) = self.keys.extract(&document) else {
            warn!(side = %self.side, field = self.keys.field(), "document without key field");
            return Err(CheckError::MissingKey {
                side: self.side,
                field: self.keys.field().to_string(),
                document,
            });
        };

        if let Some(previous) = &self.last_key {
            if key <= *previous {
                warn!(
                    side = %self.side,
                    previous = %previous,
                    current = %key,
                    "cursor keys not strictly increasing"
                );
                return Err(CheckError::OutOfOrder {
                    side: self.side,
                    previous: previous.value().clone(),
                    current: key.into_value(),
                });
            }
        }

        self.last_key = Some(key.clone());
        Ok(Some((key, document)))
    }
}

/// Stateless engine computing a [`CollectionDiff`] from two sorted cursors.
///
/// # Example
///
/// ```
/// use colldiff_codec::Document;
/// use colldiff_core::{DiffEngine, VecCursor};
///
/// let source = VecCursor::new(vec![
///     Document::new().with("_id", 1).with("num", 2),
///     Document::new().with("_id", 2).with("num", 4i64),
/// ]);
/// let syncing = VecCursor::new(vec![Document::new().with("_id", 2).with("num", 4)]);
///
/// let diff = DiffEngine::default().diff(source, syncing).unwrap();
/// assert_eq!(diff.docs_missing_on_syncing.len(), 1);
/// assert_eq!(diff.docs_with_different_contents.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    keys: KeyExtractor,
}

impl DiffEngine {
    /// Creates an engine with the given options.
    pub fn new(options: DiffOptions) -> Self {
        Self {
            keys: KeyExtractor::new(options.key_field),
        }
    }

    /// The key extractor used to align documents.
    pub fn keys(&self) -> &KeyExtractor {
        &self.keys
    }

    /// Diff two cursors, consuming both to exhaustion.
    ///
    /// # Errors
    ///
    /// - [`CheckError::OutOfOrder`] or [`CheckError::MissingKey`] if either
    ///   cursor breaks the sorted-by-key precondition
    /// - [`CheckError::Cursor`] if either cursor fails; no retry is attempted
    ///
    /// No partial diff is returned on error.
    pub fn diff<S, T>(&self, source: S, syncing: T) -> CheckResult<CollectionDiff>
    where
        S: DocumentCursor,
        T: DocumentCursor,
    {
        let mut source = OrderedStream::new(source, Side::Source, &self.keys);
        let mut syncing = OrderedStream::new(syncing, Side::Syncing, &self.keys);

        let mut diff = CollectionDiff::default();
        let mut identical = 0u64;

        let mut source_next = source.advance()?;
        let mut syncing_next = syncing.advance()?;

        loop {
            match (source_next.take(), syncing_next.take()) {
                (None, None) => break,
                (None, Some((key, document))) => {
                    trace!(%key, "missing on source");
                    diff.docs_missing_on_source.push(document);
                    syncing_next = syncing.advance()?;
                }
                (Some((key, document)), None) => {
                    trace!(%key, "missing on syncing");
                    diff.docs_missing_on_syncing.push(document);
                    source_next = source.advance()?;
                }
                (Some((source_key, source_doc)), Some((syncing_key, syncing_doc))) => {
                    match source_key.cmp(&syncing_key) {
                        Ordering::Equal => {
                            if source_doc.structurally_eq(&syncing_doc) {
                                identical += 1;
                            } else {
                                trace!(key = %source_key, "different contents");
                                diff.docs_with_different_contents.push(DocumentPair {
                                    source_node: source_doc,
                                    syncing_node: syncing_doc,
                                });
                            }
                            source_next = source.advance()?;
                            syncing_next = syncing.advance()?;
                        }
                        Ordering::Less => {
                            trace!(key = %source_key, "missing on syncing");
                            diff.docs_missing_on_syncing.push(source_doc);
                            syncing_next = Some((syncing_key, syncing_doc));
                            source_next = source.advance()?;
                        }
                        Ordering::Greater => {
                            trace!(key = %syncing_key, "missing on source");
                            diff.docs_missing_on_source.push(syncing_doc);
                            source_next = Some((source_key, source_doc));
                            syncing_next = syncing.advance()?;
                        }
                    }
                }
            }
        }

        debug!(
            source_docs = source.taken,
            syncing_docs = syncing.taken,
            identical,
            different = diff.docs_with_different_contents.len(),
            missing_on_source = diff.docs_missing_on_source.len(),
            missing_on_syncing = diff.docs_missing_on_syncing.len(),
            "collection diff complete"
        );

        Ok(diff)
    }
}

/// Diff two sorted cursors keyed on `_id`.
///
/// Shorthand for `DiffEngine::default().diff(source, syncing)`.
pub fn diff_collections<S, T>(source: S, syncing: T) -> CheckResult<CollectionDiff>
where
    S: DocumentCursor,
    T: DocumentCursor,
{
    DiffEngine::default().diff(source, syncing)
}
