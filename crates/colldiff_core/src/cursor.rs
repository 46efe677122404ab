//! Sorted document cursor abstraction.

use colldiff_codec::Document;
use thiserror::Error;

/// Result type for cursor operations.
pub type CursorResult<T> = Result<T, CursorError>;

/// Errors raised by a cursor while fetching documents.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CursorError {
    /// Network failure while fetching a batch.
    #[error("network error: {message}")]
    Network {
        /// Error message.
        message: String,
    },

    /// The server rejected the request.
    #[error("server error {code}: {message}")]
    Server {
        /// Server error code.
        code: i32,
        /// Error message.
        message: String,
    },

    /// `next_document` was called on a drained cursor.
    #[error("cursor exhausted")]
    Exhausted,

    /// The cursor was closed (for example, cancelled by its owner).
    #[error("cursor closed")]
    Closed,
}

impl CursorError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a server error.
    pub fn server(code: i32, message: impl Into<String>) -> Self {
        Self::Server {
            code,
            message: message.into(),
        }
    }
}

/// A fallible, pull-based cursor over documents in key order.
///
/// Implementations are supplied by whatever driver or session layer owns the
/// data; they may block for as long as a batch fetch takes. Callers that need
/// cancellation close the cursor, which makes the next call fail.
pub trait DocumentCursor {
    /// Returns true if another document is available.
    fn has_next(&mut self) -> CursorResult<bool>;

    /// Takes the next document.
    ///
    /// Returns [`CursorError::Exhausted`] if no document remains.
    fn next_document(&mut self) -> CursorResult<Document>;
}

impl<C: DocumentCursor + ?Sized> DocumentCursor for &mut C {
    fn has_next(&mut self) -> CursorResult<bool> {
        (**self).has_next()
    }

    fn next_document(&mut self) -> CursorResult<Document> {
        (**self).next_document()
    }
}

impl<C: DocumentCursor + ?Sized> DocumentCursor for Box<C> {
    fn has_next(&mut self) -> CursorResult<bool> {
        (**self).has_next()
    }

    fn next_document(&mut self) -> CursorResult<Document> {
        (**self).next_document()
    }
}

/// An in-memory cursor over an owned list of documents.
#[derive(Debug, Clone)]
pub struct VecCursor {
    documents: std::vec::IntoIter<Document>,
}

impl VecCursor {
    /// Creates a cursor yielding `documents` in the given order.
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: documents.into_iter(),
        }
    }

    /// Creates a cursor with no documents.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of documents not yet taken.
    pub fn remaining(&self) -> usize {
        self.documents.len()
    }
}

impl From<Vec<Document>> for VecCursor {
    fn from(documents: Vec<Document>) -> Self {
        Self::new(documents)
    }
}

impl DocumentCursor for VecCursor {
    fn has_next(&mut self) -> CursorResult<bool> {
        Ok(!self.documents.as_slice().is_empty())
    }

    fn next_document(&mut self) -> CursorResult<Document> {
        self.documents.next().ok_or(CursorError::Exhausted)
    }
}

/// Adapts an iterator of fallible documents into a cursor.
///
/// One document is peeked to answer [`has_next`](DocumentCursor::has_next);
/// an error from the iterator is returned by whichever call reaches it.
pub struct IterCursor<I> {
    iter: I,
    peeked: Option<Document>,
}

impl<I> IterCursor<I>
where
    I: Iterator<Item = CursorResult<Document>>,
{
    /// Wraps an iterator.
    pub fn new(iter: I) -> Self {
        Self { iter, peeked: None }
    }
}

impl<I> DocumentCursor for IterCursor<I>
where
    I: Iterator<Item = CursorResult<Document>>,
{
    fn has_next(&mut self) -> CursorResult<bool> {
        if self.peeked.is_none() {
            match self.iter.next() {
                Some(Ok(document)) => self.peeked = Some(document),
                Some(Err(e)) => return Err(e),
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    fn next_document(&mut self) -> CursorResult<Document> {
        match self.peeked.take() {
            Some(document) => Ok(document),
            None => self.iter.next().unwrap_or(Err(CursorError::Exhausted)),
        }
    }
}
