//! Error types for colldiff core.

use crate::cursor::CursorError;
use crate::diff::Side;
use crate::index::CatalogError;
use colldiff_codec::{CodecError, Document, Value};
use thiserror::Error;

/// Result type for consistency checks.
pub type CheckResult<T> = Result<T, CheckError>;

/// Errors that abort a consistency check.
///
/// A check never returns a partial result: any of these errors means the
/// comparison did not complete.
#[derive(Debug, Error)]
pub enum CheckError {
    /// A cursor yielded a key that is not strictly greater than the one
    /// before it.
    #[error("{side} cursor yielded key {current} after {previous}; keys must be strictly increasing")]
    OutOfOrder {
        /// The cursor that broke ordering.
        side: Side,
        /// Key of the previous document from that cursor.
        previous: Value,
        /// Key of the offending document.
        current: Value,
    },

    /// A cursor yielded a document without the key field.
    #[error("{side} cursor yielded a document without key field {field:?}: {document}")]
    MissingKey {
        /// The cursor that yielded the document.
        side: Side,
        /// Name of the key field.
        field: String,
        /// The offending document.
        document: Document,
    },

    /// The underlying cursor failed; propagated unchanged.
    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// A non-transient catalog failure.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Transient catalog failures persisted through every retry.
    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Description of the operation that was retried.
        operation: String,
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        last: CatalogError,
    },

    /// Document encoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl CheckError {
    /// Returns true if a cursor broke the ordering or key precondition.
    ///
    /// These indicate a bug in the data source under test and must not be
    /// papered over.
    pub fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            CheckError::OutOfOrder { .. } | CheckError::MissingKey { .. }
        )
    }

    /// Returns the side that violated a precondition, if any.
    pub fn side(&self) -> Option<Side> {
        match self {
            CheckError::OutOfOrder { side, .. } | CheckError::MissingKey { side, .. } => {
                Some(*side)
            }
            _ => None,
        }
    }
}
