//! Decoded body values.

use crate::error::FileError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// The result of decoding a body: field name to value.
///
/// On failure this is simply empty, it is never absent.
pub type ResultMap = HashMap<String, FieldValue>;

/// A fully typed value stored in a [`ResultMap`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(DateTime<Utc>),
    Bytes(Bytes),
    File(FileObject),
    List(Vec<FieldValue>),
    Map(ResultMap),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            FieldValue::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileObject> {
        match self {
            FieldValue::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ResultMap> {
        match self {
            FieldValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                // u64 above i64::MAX or a real float
                None => n.as_f64().map_or(FieldValue::Null, FieldValue::Float),
            },
            Value::String(s) => FieldValue::Text(s),
            Value::Array(items) => FieldValue::List(items.into_iter().map(FieldValue::from).collect()),
            Value::Object(entries) => FieldValue::Map(entries.into_iter().map(|(k, v)| (k, FieldValue::from(v))).collect()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<FileObject> for FieldValue {
    fn from(value: FileObject) -> Self {
        FieldValue::File(value)
    }
}

/// An uploaded file taken from a multipart part that declared a filename.
///
/// `content` is a slice of the original request buffer, not a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileObject {
    filename: String,
    mime_type: String,
    content: Bytes,
}

impl FileObject {
    /// Builds a file, refusing names that cannot be stored and contents over `max_size`.
    pub fn try_new(filename: String, mime_type: String, content: Bytes, max_size: usize) -> Result<Self, FileError> {
        if filename.contains('\0') {
            return Err(FileError::invalid_filename("contains a nul byte"));
        }

        if content.len() > max_size {
            return Err(FileError::too_large(content.len(), max_size));
        }

        Ok(Self { filename, mime_type, content })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
