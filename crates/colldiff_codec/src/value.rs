//! Dynamic typed value.

use crate::document::Document;
use crate::tags;
use std::cmp::Ordering;
use std::fmt;

/// A dynamically typed document value.
///
/// Every variant keeps its exact storage type: `Int32(4)`, `Int64(4)` and
/// `Double(4.0)` are distinct values even though they order as equal under
/// [`Value::cmp_canonical`]. Derived `==` uses IEEE semantics for doubles;
/// fidelity checks should use [`Value::structurally_eq`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// IEEE 754 double.
    Double(f64),
    /// UTF-8 text.
    Text(String),
    /// Generic binary data.
    Binary(Vec<u8>),
    /// Milliseconds since the Unix epoch.
    DateTime(i64),
    /// Embedded document.
    Document(Document),
    /// Ordered list of values.
    Array(Vec<Value>),
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Double(f64),
}

/// 2^63 as an exact double.
const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

impl Value {
    /// Compare two values using the canonical type-aware ordering.
    ///
    /// Values are first ordered by type class
    /// (null < numbers < text < document < array < binary < bool < date),
    /// then by content. Numbers of different widths compare by numeric
    /// value, and NaN sorts below every other number.
    pub fn cmp_canonical(&self, other: &Self) -> Ordering {
        let by_rank = self.type_rank().cmp(&other.type_rank());
        if by_rank != Ordering::Equal {
            return by_rank;
        }

        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Value::Binary(a), Value::Binary(b)) => {
                // Length-first, then bytewise
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Document(a), Value::Document(b)) => a.cmp_canonical(b),
            (Value::Array(a), Value::Array(b)) => {
                for (av, bv) in a.iter().zip(b.iter()) {
                    let ord = av.cmp_canonical(bv);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => cmp_numbers(a, b),
                _ => Ordering::Equal, // Unreachable for equal type ranks
            },
        }
    }

    /// Exact equality: same variant, same width, same field order.
    ///
    /// Doubles are compared by bit pattern, so `0.0` and `-0.0` differ and
    /// NaN equals an identical NaN. Two values are structurally equal exactly
    /// when their encoded forms are byte-for-byte identical.
    pub fn structurally_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Document(a), Value::Document(b)) => a.structurally_eq(b),
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structurally_eq(y))
            }
            _ => false,
        }
    }

    /// Rank of this value's type class in the canonical ordering.
    pub(crate) fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 1,
            Value::Int32(_) | Value::Int64(_) | Value::Double(_) => 2,
            Value::Text(_) => 3,
            Value::Document(_) => 4,
            Value::Array(_) => 5,
            Value::Binary(_) => 6,
            Value::Bool(_) => 7,
            Value::DateTime(_) => 8,
        }
    }

    /// Element type tag used by the binary encoding.
    pub fn type_tag(&self) -> u8 {
        match self {
            Value::Null => tags::NULL,
            Value::Bool(_) => tags::BOOL,
            Value::Int32(_) => tags::INT32,
            Value::Int64(_) => tags::INT64,
            Value::Double(_) => tags::DOUBLE,
            Value::Text(_) => tags::TEXT,
            Value::Binary(_) => tags::BINARY,
            Value::DateTime(_) => tags::DATETIME,
            Value::Document(_) => tags::DOCUMENT,
            Value::Array(_) => tags::ARRAY,
        }
    }

    /// Short type alias, as used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int",
            Value::Int64(_) => "long",
            Value::Double(_) => "double",
            Value::Text(_) => "string",
            Value::Binary(_) => "binData",
            Value::DateTime(_) => "date",
            Value::Document(_) => "object",
            Value::Array(_) => "array",
        }
    }

    fn as_number(&self) -> Option<Number> {
        match self {
            Value::Int32(n) => Some(Number::Int(i64::from(*n))),
            Value::Int64(n) => Some(Number::Int(*n)),
            Value::Double(d) => Some(Number::Double(*d)),
            _ => None,
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is any numeric type.
    pub fn is_number(&self) -> bool {
        self.as_number().is_some()
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an `i64` if it is an integer of either width.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a double, if it is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Get this value as a string, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is binary.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Get this value as an embedded document, if it is one.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }
}

fn cmp_numbers(a: Number, b: Number) -> Ordering {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.cmp(&y),
        (Number::Double(x), Number::Double(y)) => cmp_doubles(x, y),
        (Number::Int(x), Number::Double(y)) => cmp_int_double(x, y),
        (Number::Double(x), Number::Int(y)) => cmp_int_double(y, x).reverse(),
    }
}

fn cmp_doubles(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        // -0.0 and 0.0 are numerically equal
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison of an integer against a double, without rounding the
/// integer through `f64`.
fn cmp_int_double(i: i64, d: f64) -> Ordering {
    if d.is_nan() {
        return Ordering::Greater;
    }
    if d >= TWO_POW_63 {
        return Ordering::Less;
    }
    if d < -TWO_POW_63 {
        return Ordering::Greater;
    }

    let truncated = d.trunc();
    // In range [-2^63, 2^63) after the checks above
    #[allow(clippy::cast_possible_truncation)]
    let whole = truncated as i64;

    match i.cmp(&whole) {
        Ordering::Equal => {
            let fraction = d - truncated;
            if fraction > 0.0 {
                Ordering::Less
            } else if fraction < 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }
        ord => ord,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int32(n) => write!(f, "{n}"),
            Value::Int64(n) => write!(f, "NumberLong({n})"),
            Value::Double(d) if d.is_finite() && d.fract() == 0.0 => write!(f, "{d:.1}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Binary(bytes) => {
                write!(f, "BinData(0, ")?;
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                write!(f, ")")
            }
            Value::DateTime(ms) => write!(f, "Date({ms})"),
            Value::Document(d) => write!(f, "{d}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Binary(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Binary(b.to_vec())
    }
}

impl From<Document> for Value {
    fn from(d: Document) -> Self {
        Value::Document(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}
