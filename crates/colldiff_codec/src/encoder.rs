//! Binary document encoder.

use crate::decoder::MAX_NESTING_DEPTH;
use crate::document::Document;
use crate::error::{CodecError, CodecResult};
use crate::tags;
use crate::value::Value;

/// Encode a document to its binary form.
///
/// The output is deterministic and lossless with respect to structure:
/// field order, value widths and double bit patterns are all preserved, so
/// two documents encode to identical bytes exactly when they are
/// [structurally equal](Document::structurally_eq).
///
/// # Errors
///
/// Returns an error if a field name contains NUL, containers nest deeper
/// than [`MAX_NESTING_DEPTH`], or a container grows past the format's 2 GiB
/// length limit.
pub fn to_bytes(document: &Document) -> CodecResult<Vec<u8>> {
    let mut encoder = DocumentEncoder::new();
    encoder.encode_document(document)?;
    Ok(encoder.into_bytes())
}

/// A binary document encoder.
///
/// Layout: every document and array is a little-endian `i32` total length,
/// a sequence of elements (`tag`, NUL-terminated name, payload) and a
/// trailing `0x00`. Arrays are documents keyed `"0"`, `"1"`, ...
pub struct DocumentEncoder {
    buffer: Vec<u8>,
    depth: usize,
}

impl DocumentEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            depth: 0,
        }
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            depth: 0,
        }
    }

    /// Append one encoded document to the buffer.
    pub fn encode_document(&mut self, document: &Document) -> CodecResult<()> {
        let start = self.begin_container()?;
        let fields = document
            .iter()
            .try_for_each(|(name, value)| self.encode_element(name, value));
        self.end_container(start, fields)
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Reset the buffer, keeping its allocation.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.depth = 0;
    }

    fn encode_array(&mut self, items: &[Value]) -> CodecResult<()> {
        let start = self.begin_container()?;
        let elements = items
            .iter()
            .enumerate()
            .try_for_each(|(index, item)| self.encode_element(&index.to_string(), item));
        self.end_container(start, elements)
    }

    fn encode_element(&mut self, name: &str, value: &Value) -> CodecResult<()> {
        self.buffer.push(value.type_tag());
        self.encode_cstring(name)?;

        match value {
            Value::Null => {}
            Value::Bool(b) => self.buffer.push(u8::from(*b)),
            Value::Int32(n) => self.buffer.extend_from_slice(&n.to_le_bytes()),
            Value::Int64(n) | Value::DateTime(n) => {
                self.buffer.extend_from_slice(&n.to_le_bytes());
            }
            Value::Double(d) => self.buffer.extend_from_slice(&d.to_le_bytes()),
            Value::Text(s) => self.encode_string(s)?,
            Value::Binary(bytes) => self.encode_binary(bytes)?,
            Value::Document(d) => self.encode_document(d)?,
            Value::Array(items) => self.encode_array(items)?,
        }
        Ok(())
    }

    fn encode_cstring(&mut self, name: &str) -> CodecResult<()> {
        if name.as_bytes().contains(&0) {
            return Err(CodecError::invalid_field_name(name));
        }
        self.buffer.extend_from_slice(name.as_bytes());
        self.buffer.push(0);
        Ok(())
    }

    fn encode_string(&mut self, s: &str) -> CodecResult<()> {
        // Length includes the trailing NUL
        let len = Self::length_prefix(s.len() + 1)?;
        self.buffer.extend_from_slice(&len.to_le_bytes());
        self.buffer.extend_from_slice(s.as_bytes());
        self.buffer.push(0);
        Ok(())
    }

    fn encode_binary(&mut self, bytes: &[u8]) -> CodecResult<()> {
        let len = Self::length_prefix(bytes.len())?;
        self.buffer.extend_from_slice(&len.to_le_bytes());
        self.buffer.push(tags::BINARY_GENERIC);
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    fn begin_container(&mut self) -> CodecResult<usize> {
        // Same bound the decoder enforces
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CodecError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
            });
        }
        self.depth += 1;

        let start = self.buffer.len();
        // Placeholder, patched in end_container
        self.buffer.extend_from_slice(&[0; 4]);
        Ok(start)
    }

    fn end_container(&mut self, start: usize, contents: CodecResult<()>) -> CodecResult<()> {
        self.depth -= 1;
        contents?;

        self.buffer.push(tags::END_OF_DOCUMENT);
        let len = Self::length_prefix(self.buffer.len() - start)?;
        self.buffer[start..start + 4].copy_from_slice(&len.to_le_bytes());
        Ok(())
    }

    fn length_prefix(len: usize) -> CodecResult<i32> {
        i32::try_from(len)
            .map_err(|_| CodecError::encoding_failed(format!("length {len} exceeds i32::MAX")))
    }
}

impl Default for DocumentEncoder {
    fn default() -> Self {
        Self::new()
    }
}
