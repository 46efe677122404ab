//! Extended JSON mapping for document dumps.
//!
//! Plain JSON loses integer width, so typed values are wrapped:
//!
//! | Value      | JSON                              |
//! |------------|-----------------------------------|
//! | `Int32`    | bare integer                      |
//! | `Int64`    | `{"$numberLong": "4"}`            |
//! | `Double`   | `{"$numberDouble": "4"}`          |
//! | `DateTime` | `{"$date": 1700000000000}`        |
//! | `Binary`   | `{"$binary": [1, 2, 3]}`          |
//!
//! On input, `{"$numberInt": "4"}` is also accepted, bare integers become
//! `Int32` when they fit and `Int64` otherwise, and bare fractional numbers
//! become `Double`. Object field order is preserved.

use colldiff_codec::{Document, Value};
use serde_json::{Map, Number, Value as Json};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors converting JSON into documents.
#[derive(Debug, Error)]
pub enum JsonError {
    /// The input is not valid JSON.
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    /// A dump file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file path.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A top-level entry is not an object.
    #[error("expected a document, found {found}")]
    NotADocument {
        /// JSON type found instead.
        found: &'static str,
    },

    /// A typed wrapper such as `$numberLong` has an invalid payload.
    #[error("invalid {wrapper} value: {reason}")]
    InvalidWrapper {
        /// The wrapper key.
        wrapper: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// A number outside the representable range.
    #[error("number {0} does not fit any numeric type")]
    NumberOutOfRange(Number),
}

/// Reads a dump file.
///
/// A dump is either a JSON array of documents or one document per line.
pub fn read_documents(path: &Path) -> Result<Vec<Document>, JsonError> {
    let text = fs::read_to_string(path).map_err(|source| JsonError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_documents(&text)
}

/// Parses a dump from text. See [`read_documents`].
pub fn parse_documents(text: &str) -> Result<Vec<Document>, JsonError> {
    if text.trim_start().starts_with('[') {
        let parsed: Json = serde_json::from_str(text)?;
        return match parsed {
            Json::Array(items) => items.iter().map(document_from_json).collect(),
            other => Err(JsonError::NotADocument {
                found: json_type(&other),
            }),
        };
    }

    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| document_from_json(&serde_json::from_str(line)?))
        .collect()
}

/// Converts a JSON object into a document.
pub fn document_from_json(json: &Json) -> Result<Document, JsonError> {
    match json {
        Json::Object(map) => object_to_document(map),
        other => Err(JsonError::NotADocument {
            found: json_type(other),
        }),
    }
}

fn object_to_document(map: &Map<String, Json>) -> Result<Document, JsonError> {
    let mut fields = Vec::with_capacity(map.len());
    for (name, value) in map {
        fields.push((name.clone(), value_from_json(value)?));
    }
    Ok(Document::from_fields(fields))
}

/// Converts any JSON value.
pub fn value_from_json(json: &Json) -> Result<Value, JsonError> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => number_from_json(n),
        Json::String(s) => Ok(Value::Text(s.clone())),
        Json::Array(items) => items
            .iter()
            .map(value_from_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Json::Object(map) => match typed_wrapper(map)? {
            Some(value) => Ok(value),
            None => object_to_document(map).map(Value::Document),
        },
    }
}

fn number_from_json(n: &Number) -> Result<Value, JsonError> {
    if let Some(i) = n.as_i64() {
        return Ok(match i32::try_from(i) {
            Ok(small) => Value::Int32(small),
            Err(_) => Value::Int64(i),
        });
    }
    if n.is_u64() {
        return Err(JsonError::NumberOutOfRange(n.clone()));
    }
    n.as_f64()
        .map(Value::Double)
        .ok_or_else(|| JsonError::NumberOutOfRange(n.clone()))
}

fn typed_wrapper(map: &Map<String, Json>) -> Result<Option<Value>, JsonError> {
    if map.len() != 1 {
        return Ok(None);
    }
    let Some((key, payload)) = map.iter().next() else {
        return Ok(None);
    };

    let value = match key.as_str() {
        "$numberInt" => Value::Int32(parse_wrapped(payload, "$numberInt")?),
        "$numberLong" => Value::Int64(parse_wrapped(payload, "$numberLong")?),
        "$numberDouble" => Value::Double(parse_wrapped(payload, "$numberDouble")?),
        "$date" => Value::DateTime(date_millis(payload)?),
        "$binary" => Value::Binary(binary_bytes(payload)?),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn parse_wrapped<T>(payload: &Json, wrapper: &'static str) -> Result<T, JsonError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let text = payload.as_str().ok_or_else(|| JsonError::InvalidWrapper {
        wrapper,
        reason: format!("expected a string, found {}", json_type(payload)),
    })?;
    text.parse().map_err(|e: T::Err| JsonError::InvalidWrapper {
        wrapper,
        reason: format!("{text:?}: {e}"),
    })
}

fn date_millis(payload: &Json) -> Result<i64, JsonError> {
    match payload {
        Json::Number(n) => n.as_i64().ok_or_else(|| JsonError::InvalidWrapper {
            wrapper: "$date",
            reason: format!("{n} is not an integer millisecond count"),
        }),
        Json::Object(inner) => match inner.get("$numberLong") {
            Some(long) if inner.len() == 1 => parse_wrapped(long, "$date"),
            _ => Err(JsonError::InvalidWrapper {
                wrapper: "$date",
                reason: "expected milliseconds or {\"$numberLong\": ...}".to_string(),
            }),
        },
        other => Err(JsonError::InvalidWrapper {
            wrapper: "$date",
            reason: format!("unexpected {}", json_type(other)),
        }),
    }
}

fn binary_bytes(payload: &Json) -> Result<Vec<u8>, JsonError> {
    let invalid = || JsonError::InvalidWrapper {
        wrapper: "$binary",
        reason: "expected an array of bytes".to_string(),
    };
    payload
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()).ok_or_else(invalid))
        .collect()
}

/// Converts a document into JSON, wrapping typed values.
pub fn document_to_json(document: &Document) -> Json {
    Json::Object(
        document
            .iter()
            .map(|(name, value)| (name.to_string(), value_to_json(value)))
            .collect(),
    )
}

/// Converts a value into JSON, wrapping typed values.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int32(i) => Json::from(*i),
        Value::Int64(i) => wrapped("$numberLong", Json::String(i.to_string())),
        Value::Double(d) => wrapped("$numberDouble", Json::String(d.to_string())),
        Value::Text(s) => Json::String(s.clone()),
        Value::Binary(bytes) => wrapped("$binary", Json::from(bytes.clone())),
        Value::DateTime(ms) => wrapped("$date", Json::from(*ms)),
        Value::Document(doc) => document_to_json(doc),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
    }
}

fn wrapped(key: &str, payload: Json) -> Json {
    let mut map = Map::with_capacity(1);
    map.insert(key.to_string(), payload);
    Json::Object(map)
}

fn json_type(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_integers_pick_the_narrowest_width() {
        assert_eq!(value_from_json(&json!(4)).unwrap(), Value::Int32(4));
        assert_eq!(
            value_from_json(&json!(5_000_000_000i64)).unwrap(),
            Value::Int64(5_000_000_000)
        );
        assert_eq!(value_from_json(&json!(30.2)).unwrap(), Value::Double(30.2));
    }

    #[test]
    fn wrappers_keep_exact_types() {
        assert_eq!(
            value_from_json(&json!({"$numberLong": "4"})).unwrap(),
            Value::Int64(4)
        );
        assert_eq!(
            value_from_json(&json!({"$numberInt": "-7"})).unwrap(),
            Value::Int32(-7)
        );
        assert_eq!(
            value_from_json(&json!({"$numberDouble": "4"})).unwrap(),
            Value::Double(4.0)
        );
        assert_eq!(
            value_from_json(&json!({"$date": 1000})).unwrap(),
            Value::DateTime(1000)
        );
        assert_eq!(
            value_from_json(&json!({"$date": {"$numberLong": "1000"}})).unwrap(),
            Value::DateTime(1000)
        );
        assert_eq!(
            value_from_json(&json!({"$binary": [1, 2, 255]})).unwrap(),
            Value::Binary(vec![1, 2, 255])
        );
    }

    #[test]
    fn wrapper_lookalikes_are_documents() {
        let value = value_from_json(&json!({"$numberLong": "4", "other": 1})).unwrap();
        assert!(matches!(value, Value::Document(_)));
    }

    #[test]
    fn invalid_wrappers_are_rejected() {
        assert!(matches!(
            value_from_json(&json!({"$numberLong": 4})),
            Err(JsonError::InvalidWrapper { wrapper: "$numberLong", .. })
        ));
        assert!(matches!(
            value_from_json(&json!({"$numberInt": "5000000000"})),
            Err(JsonError::InvalidWrapper { .. })
        ));
        assert!(matches!(
            value_from_json(&json!({"$binary": [256]})),
            Err(JsonError::InvalidWrapper { wrapper: "$binary", .. })
        ));
    }

    #[test]
    fn field_order_is_preserved() {
        let doc = document_from_json(&json!({"b": 1, "a": 2, "_id": 3})).unwrap();
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["b", "a", "_id"]);
    }

    #[test]
    fn typed_values_survive_a_json_round_trip() {
        let doc = Document::new()
            .with("_id", 2)
            .with("num", 4i64)
            .with("ratio", 0.5)
            .with("whole", 4.0)
            .with("at", Value::DateTime(1_700_000_000_000))
            .with("raw", vec![0u8, 1, 2])
            .with("tags", vec![Value::from("a"), Value::Null]);

        let back = document_from_json(&document_to_json(&doc)).unwrap();
        assert!(back.structurally_eq(&doc));
    }

    #[test]
    fn dumps_parse_as_array_or_lines() {
        let array = parse_documents(r#"[{"_id": 1}, {"_id": 2}]"#).unwrap();
        let lines = parse_documents("{\"_id\": 1}\n\n{\"_id\": 2}\n").unwrap();
        assert_eq!(array, lines);
        assert_eq!(array.len(), 2);
    }

    #[test]
    fn non_document_entries_are_rejected() {
        assert!(matches!(
            parse_documents("[1, 2]"),
            Err(JsonError::NotADocument { found: "number" })
        ));
        assert!(matches!(
            parse_documents("{\"_id\": 1"),
            Err(JsonError::Syntax(_))
        ));
    }
}
