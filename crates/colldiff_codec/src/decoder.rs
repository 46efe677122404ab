//! Binary document decoder.

use crate::document::Document;
use crate::error::{CodecError, CodecResult};
use crate::tags;
use crate::value::Value;

/// Decode a single document from bytes.
///
/// # Errors
///
/// Returns an error if the bytes are truncated, malformed, contain unknown
/// element types, or are followed by trailing data.
pub fn from_bytes(bytes: &[u8]) -> CodecResult<Document> {
    let mut decoder = DocumentDecoder::new(bytes);
    let document = decoder.decode_document()?;
    if !decoder.is_at_end() {
        return Err(CodecError::invalid_structure(format!(
            "{} trailing bytes after document",
            decoder.remaining()
        )));
    }
    Ok(document)
}

/// Maximum nesting of documents and arrays.
/// Bounds recursion on untrusted input.
pub const MAX_NESTING_DEPTH: usize = 100;

/// Minimum encoded size of a container: length prefix plus terminator.
const MIN_CONTAINER_LEN: usize = 5;

/// A binary document decoder.
///
/// Decodes a stream of concatenated documents; call
/// [`decode_document`](Self::decode_document) until [`is_at_end`](Self::is_at_end).
pub struct DocumentDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> DocumentDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether all input has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Decode the next document.
    pub fn decode_document(&mut self) -> CodecResult<Document> {
        self.decode_container().map(Document::from_fields)
    }

    fn decode_container(&mut self) -> CodecResult<Vec<(String, Value)>> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CodecError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
            });
        }

        let start = self.pos;
        let declared = usize::try_from(self.read_i32()?)
            .map_err(|_| CodecError::invalid_structure("negative container length"))?;
        if declared < MIN_CONTAINER_LEN {
            return Err(CodecError::invalid_structure(format!(
                "container length {declared} below minimum of {MIN_CONTAINER_LEN}"
            )));
        }
        let end = start
            .checked_add(declared)
            .filter(|end| *end <= self.data.len())
            .ok_or(CodecError::UnexpectedEof)?;

        self.depth += 1;
        let mut fields = Vec::new();
        loop {
            let tag = self.read_byte()?;
            if tag == tags::END_OF_DOCUMENT {
                break;
            }
            let name = self.read_cstring()?;
            let value = self.decode_value(tag)?;
            fields.push((name, value));

            if self.pos >= end {
                return Err(CodecError::invalid_structure("container missing terminator"));
            }
        }
        self.depth -= 1;

        if self.pos != end {
            return Err(CodecError::invalid_structure(format!(
                "container length mismatch: declared {declared}, consumed {}",
                self.pos - start
            )));
        }
        Ok(fields)
    }

    fn decode_array(&mut self) -> CodecResult<Vec<Value>> {
        let fields = self.decode_container()?;
        let mut items = Vec::with_capacity(fields.len());
        for (index, (name, value)) in fields.into_iter().enumerate() {
            if name != index.to_string() {
                return Err(CodecError::invalid_structure(format!(
                    "array key {name:?} at position {index}"
                )));
            }
            items.push(value);
        }
        Ok(items)
    }

    fn decode_value(&mut self, tag: u8) -> CodecResult<Value> {
        match tag {
            tags::DOUBLE => Ok(Value::Double(f64::from_le_bytes(self.read_array()?))),
            tags::TEXT => self.read_string().map(Value::Text),
            tags::DOCUMENT => self.decode_document().map(Value::Document),
            tags::ARRAY => self.decode_array().map(Value::Array),
            tags::BINARY => self.read_binary().map(Value::Binary),
            tags::BOOL => match self.read_byte()? {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                other => Err(CodecError::invalid_structure(format!(
                    "invalid boolean byte 0x{other:02x}"
                ))),
            },
            tags::DATETIME => Ok(Value::DateTime(i64::from_le_bytes(self.read_array()?))),
            tags::NULL => Ok(Value::Null),
            tags::INT32 => Ok(Value::Int32(self.read_i32()?)),
            tags::INT64 => Ok(Value::Int64(i64::from_le_bytes(self.read_array()?))),
            other => Err(CodecError::UnsupportedType { tag: other }),
        }
    }

    fn read_byte(&mut self) -> CodecResult<u8> {
        let byte = *self.data.get(self.pos).ok_or(CodecError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_slice(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let data = self.data;
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= data.len())
            .ok_or(CodecError::UnexpectedEof)?;
        let slice = &data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let slice = self.read_slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn read_i32(&mut self) -> CodecResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    fn read_length(&mut self) -> CodecResult<usize> {
        usize::try_from(self.read_i32()?)
            .map_err(|_| CodecError::invalid_structure("negative length prefix"))
    }

    fn read_cstring(&mut self) -> CodecResult<String> {
        let data = self.data;
        let rest = &data[self.pos..];
        let nul = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(CodecError::UnexpectedEof)?;
        let name = std::str::from_utf8(&rest[..nul]).map_err(|_| CodecError::InvalidUtf8)?;
        self.pos += nul + 1;
        Ok(name.to_string())
    }

    fn read_string(&mut self) -> CodecResult<String> {
        let len = self.read_length()?;
        if len == 0 {
            return Err(CodecError::invalid_structure("string length must include NUL"));
        }
        let bytes = self.read_slice(len)?;
        let (text, terminator) = bytes.split_at(len - 1);
        if terminator != [0] {
            return Err(CodecError::invalid_structure("string not NUL-terminated"));
        }
        std::str::from_utf8(text)
            .map(str::to_string)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    fn read_binary(&mut self) -> CodecResult<Vec<u8>> {
        let len = self.read_length()?;
        let subtype = self.read_byte()?;
        if subtype != tags::BINARY_GENERIC {
            return Err(CodecError::decoding_failed(format!(
                "unsupported binary subtype 0x{subtype:02x}"
            )));
        }
        Ok(self.read_slice(len)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::to_bytes;

    fn sample() -> Document {
        Document::new()
            .with("_id", 7)
            .with("wide", 7i64)
            .with("ratio", 0.5)
            .with("name", "seven")
            .with("flag", false)
            .with("nothing", Value::Null)
            .with("at", Value::DateTime(1_700_000_000_000))
            .with("blob", vec![1u8, 2, 3])
            .with(
                "nested",
                Document::new().with("list", Value::Array(vec![1.into(), "two".into()])),
            )
    }

    #[test]
    fn decode_preserves_types_and_order() {
        let doc = sample();
        let decoded = from_bytes(&to_bytes(&doc).unwrap()).unwrap();
        assert!(decoded.structurally_eq(&doc));
        assert_eq!(decoded.get("wide"), Some(&Value::Int64(7)));
        assert_eq!(decoded.keys().next(), Some("_id"));
    }

    #[test]
    fn truncated_input_fails() {
        let bytes = to_bytes(&sample()).unwrap();
        for cut in [0, 3, 4, bytes.len() / 2, bytes.len() - 1] {
            assert!(from_bytes(&bytes[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn trailing_bytes_fail() {
        let mut bytes = to_bytes(&Document::new()).unwrap();
        bytes.push(0);
        assert!(matches!(
            from_bytes(&bytes),
            Err(CodecError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn unknown_tag_fails() {
        // { a: <tag 0x7f> }
        let bytes = vec![8, 0, 0, 0, 0x7f, b'a', 0, 0];
        assert_eq!(
            from_bytes(&bytes),
            Err(CodecError::UnsupportedType { tag: 0x7f })
        );
    }

    #[test]
    fn out_of_sequence_array_keys_fail() {
        // { a: { "1": true } } tagged as an array
        let bytes = vec![17, 0, 0, 0, 0x04, b'a', 0, 9, 0, 0, 0, 0x08, b'1', 0, 1, 0, 0];
        assert!(matches!(
            from_bytes(&bytes),
            Err(CodecError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn invalid_utf8_name_fails() {
        let bytes = vec![9, 0, 0, 0, 0x0a, 0xff, 0xfe, 0, 0];
        assert_eq!(from_bytes(&bytes), Err(CodecError::InvalidUtf8));
    }

    #[test]
    fn declared_length_mismatch_fails() {
        let mut bytes = to_bytes(&Document::new().with("a", 1)).unwrap();
        // Claim one byte less than actually used
        bytes[0] -= 1;
        assert!(from_bytes(&bytes).is_err());
    }

    #[test]
    fn nesting_limit_is_enforced() {
        let mut doc = Document::new().with("leaf", 1);
        for _ in 1..MAX_NESTING_DEPTH {
            doc = Document::new().with("child", doc);
        }
        let mut bytes = to_bytes(&doc).unwrap();

        // The encoder refuses to go deeper, so wrap by hand
        let mut wrapped = vec![tags::DOCUMENT, b'c', 0];
        wrapped.append(&mut bytes);
        wrapped.push(tags::END_OF_DOCUMENT);
        let len = i32::try_from(wrapped.len() + 4).unwrap();
        let mut bytes = len.to_le_bytes().to_vec();
        bytes.extend(wrapped);

        assert_eq!(
            from_bytes(&bytes),
            Err(CodecError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH
            })
        );
    }

    #[test]
    fn decoder_reads_concatenated_documents() {
        let mut bytes = to_bytes(&Document::new().with("n", 1)).unwrap();
        bytes.extend(to_bytes(&Document::new().with("n", 2)).unwrap());

        let mut decoder = DocumentDecoder::new(&bytes);
        let first = decoder.decode_document().unwrap();
        let second = decoder.decode_document().unwrap();

        assert_eq!(first.get("n"), Some(&Value::Int32(1)));
        assert_eq!(second.get("n"), Some(&Value::Int32(2)));
        assert!(decoder.is_at_end());
    }
}
