//! Persisted record format (JSON)
//!
//! Layout of a collection file:
//! - UTF-8 JSON array of objects at the top level
//! - 4-space indentation, non-ASCII characters written as-is
//! - terminated by two newline characters
//!
//! Object key order survives a parse/serialize cycle, so a file loaded and
//! written back unchanged is byte-identical for datasets produced by this
//! layout.

use crate::{Error, Record, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

/// Indentation used for persisted collections
pub const INDENT: &[u8] = b"    ";

/// Bytes appended after the JSON document
pub const TRAILER: &[u8] = b"\n\n";

/// Decode a persisted collection.
///
/// # Errors
///
/// Returns [`Error::Format`] if the bytes are not valid JSON or the
/// document is not a non-empty array of objects.
pub fn parse(bytes: &[u8]) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::Format(format!("invalid JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(Error::Format(
            "provide a JSON file which is a list of dictionaries".to_string(),
        ));
    };

    if items.is_empty() {
        return Err(Error::Format("list contains no elements".to_string()));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(Error::Format(format!(
                "element {index} should be a dictionary but is {}",
                kind_of(&other)
            ))),
        })
        .collect()
}

/// Encode records in the persisted layout.
///
/// # Errors
///
/// Returns [`Error::Json`] if encoding fails.
pub fn serialize(records: &[Record]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(records.len() * 128);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(INDENT));
    records.serialize(&mut serializer)?;
    out.extend_from_slice(TRAILER);
    Ok(out)
}

/// Short JSON type name for diagnostics.
pub(crate) const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a dictionary",
    }
}
