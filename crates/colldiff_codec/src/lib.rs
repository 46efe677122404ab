//! # colldiff Codec
//!
//! Typed document model and binary encoding for colldiff.
//!
//! This crate provides:
//! - [`Value`], a closed sum type over the database's primitive types
//!   (integer widths, double, text, bool, null, date, binary, nested
//!   documents and arrays)
//! - [`Document`], an ordered field list whose order is significant
//! - The canonical type-aware ordering used to sort documents by key
//! - A lossless binary encoding whose bytes differ exactly when two
//!   documents are not structurally equal
//!
//! ## Usage
//!
//! ```
//! use colldiff_codec::{from_bytes, to_bytes, Document, Value};
//!
//! let doc = Document::new().with("_id", 2).with("num", 4i64);
//! let bytes = to_bytes(&doc).unwrap();
//!
//! let decoded = from_bytes(&bytes).unwrap();
//! assert!(decoded.structurally_eq(&doc));
//! assert_eq!(decoded.get("num"), Some(&Value::Int64(4)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod document;
mod encoder;
mod error;
mod tags;
mod value;

pub use decoder::{from_bytes, DocumentDecoder, MAX_NESTING_DEPTH};
pub use document::Document;
pub use encoder::{to_bytes, DocumentEncoder};
pub use error::{CodecError, CodecResult};
pub use value::Value;

/// Trait for types that can be encoded to document bytes.
pub trait Encode {
    /// Encode this value to bytes.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Trait for types that can be decoded from document bytes.
pub trait Decode: Sized {
    /// Decode this value from bytes.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl Encode for Document {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_bytes(self)
    }
}

impl Decode for Document {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_bytes(bytes)
    }
}
