//! JSON and newline-delimited JSON parsers.
//!
//! Both operate on already decoded text, see [`crate::charset`].

use crate::error::ParseError;
use crate::value::{FieldValue, ResultMap};
use serde_json::Value;
use tracing::trace;

/// Key under which the ndjson records and plain text bodies are stored.
pub const RAW_KEY: &str = "raw";

/// Parses a single JSON document whose top-level value must be an object.
///
/// The object's keys become the result keys. Arrays and scalars at the top level
/// are refused with [`ParseError::NotAnObject`].
pub fn parse_json(content_type: &str, text: &str) -> Result<ResultMap, ParseError> {
    let value = serde_json::from_str::<Value>(text).map_err(|e| ParseError::invalid_json(content_type, e))?;

    match value {
        Value::Object(entries) => Ok(entries.into_iter().map(|(key, value)| (key, FieldValue::from(value))).collect()),
        _ => Err(ParseError::not_an_object(content_type)),
    }
}

/// Parses newline-delimited JSON into `{raw: [value, ...]}`.
///
/// Blank lines are ignored. A single invalid line fails the whole body.
pub fn parse_ndjson(text: &str) -> Result<ResultMap, ParseError> {
    let mut records = Vec::new();

    for (index, line) in text.split('\n').enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let value = serde_json::from_str::<Value>(line).map_err(|e| ParseError::invalid_ndjson_line(index + 1, e))?;
        records.push(FieldValue::from(value));
    }

    trace!(records = records.len(), "parsed ndjson body");
    Ok(ResultMap::from([(RAW_KEY.to_string(), FieldValue::List(records))]))
}
