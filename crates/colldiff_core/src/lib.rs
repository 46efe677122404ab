//! # colldiff Core
//!
//! Consistency checking for replicated document collections.
//!
//! This crate provides:
//! - A single-pass sorted-merge diff between two key-ordered cursors
//!   ([`DiffEngine`], [`diff_collections`])
//! - A cross-replica index consistency checker with bounded retry of
//!   transient catalog errors ([`IndexConsistencyChecker`])
//! - Collection hashing and a replica-set wide check that only diffs
//!   collections whose hashes differ ([`ReplicaSetChecker`])
//!
//! Cursors, catalogs and replica nodes are traits; the driver or session
//! layer that actually talks to servers lives outside this crate.
//!
//! ## Example
//!
//! ```
//! use colldiff_codec::Document;
//! use colldiff_core::{diff_collections, VecCursor};
//!
//! let source = VecCursor::new(vec![
//!     Document::new().with("_id", 1),
//!     Document::new().with("_id", 2),
//! ]);
//! let syncing = VecCursor::new(vec![Document::new().with("_id", 2)]);
//!
//! let diff = diff_collections(source, syncing).unwrap();
//! assert_eq!(diff.docs_missing_on_syncing, vec![Document::new().with("_id", 1)]);
//! assert!(diff.docs_missing_on_source.is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod cursor;
mod diff;
mod error;
mod hash;
mod index;
mod key;
mod namespace;
mod replset;

pub use config::{CheckConfig, DiffOptions, RetryConfig};
pub use cursor::{CursorError, CursorResult, DocumentCursor, IterCursor, VecCursor};
pub use diff::{diff_collections, CollectionDiff, DiffEngine, DocumentPair, Side};
pub use error::{CheckError, CheckResult};
pub use hash::{hash_collection, hash_sorted_collection, CollectionHash, CollectionSummary};
pub use index::{
    CatalogError, CatalogResult, IndexCatalog, IndexConsistencyChecker, IndexDescriptor,
    NamespaceIndexReport, ReplicaId,
};
pub use key::{DocumentKey, KeyExtractor, DEFAULT_KEY_FIELD};
pub use namespace::Namespace;
pub use replset::{CollectionMismatch, ReplicaNode, ReplicaSetChecker, ReplicaSetReport};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
