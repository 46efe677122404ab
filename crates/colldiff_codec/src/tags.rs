//! Element type tags of the binary document format.

pub(crate) const DOUBLE: u8 = 0x01;
pub(crate) const TEXT: u8 = 0x02;
pub(crate) const DOCUMENT: u8 = 0x03;
pub(crate) const ARRAY: u8 = 0x04;
pub(crate) const BINARY: u8 = 0x05;
pub(crate) const BOOL: u8 = 0x08;
pub(crate) const DATETIME: u8 = 0x09;
pub(crate) const NULL: u8 = 0x0a;
pub(crate) const INT32: u8 = 0x10;
pub(crate) const INT64: u8 = 0x12;

/// Binary subtype written for [`crate::Value::Binary`].
pub(crate) const BINARY_GENERIC: u8 = 0x00;

/// Terminates every document and array.
pub(crate) const END_OF_DOCUMENT: u8 = 0x00;
