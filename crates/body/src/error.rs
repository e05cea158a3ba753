use thiserror::Error;

/// Failure to turn bytes into text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unsupported charset: {charset}")]
    UnsupportedCharset { charset: String },

    #[error("invalid {charset} byte sequence: {reason}")]
    InvalidSequence { charset: &'static str, reason: String },
}

impl DecodeError {
    pub fn unsupported_charset<S: ToString>(charset: S) -> Self {
        Self::UnsupportedCharset { charset: charset.to_string() }
    }

    pub fn invalid_sequence<S: ToString>(charset: &'static str, reason: S) -> Self {
        Self::InvalidSequence { charset, reason: reason.to_string() }
    }
}

/// Structural failure of a whole body, terminal for the call.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{content_type}: {source}")]
    Decode {
        content_type: String,
        #[source]
        source: DecodeError,
    },

    #[error("{content_type}: invalid json: {reason}")]
    InvalidJson { content_type: String, reason: String },

    #[error("{content_type}: top-level json value is not an object")]
    NotAnObject { content_type: String },

    #[error("application/x-ndjson: invalid json on line {line}: {reason}")]
    InvalidNdjsonLine { line: usize, reason: String },

    #[error("multipart: Missing boundary")]
    MissingBoundary,

    #[error("body size {size} exceed the limit {max}")]
    TooLarge { size: usize, max: usize },

    #[error("multipart: part number exceed the limit {max}")]
    TooManyParts { max: usize },
}

impl ParseError {
    pub fn decode<S: ToString>(content_type: S, source: DecodeError) -> Self {
        Self::Decode { content_type: content_type.to_string(), source }
    }

    pub fn invalid_json<S: ToString, R: ToString>(content_type: S, reason: R) -> Self {
        Self::InvalidJson { content_type: content_type.to_string(), reason: reason.to_string() }
    }

    pub fn not_an_object<S: ToString>(content_type: S) -> Self {
        Self::NotAnObject { content_type: content_type.to_string() }
    }

    pub fn invalid_ndjson_line<R: ToString>(line: usize, reason: R) -> Self {
        Self::InvalidNdjsonLine { line, reason: reason.to_string() }
    }

    pub fn too_large(size: usize, max: usize) -> Self {
        Self::TooLarge { size, max }
    }

    pub fn too_many_parts(max: usize) -> Self {
        Self::TooManyParts { max }
    }
}

/// A single `key=value` pair whose percent-encoding could not be decoded.
///
/// Scoped to that one pair: the form parser reports it and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot percent-decode form pair {key}={value}")]
pub struct FormDecodeError {
    pub key: String,
    pub value: String,
}

impl FormDecodeError {
    pub fn new<K: ToString, V: ToString>(key: K, value: V) -> Self {
        Self { key: key.to_string(), value: value.to_string() }
    }
}

/// Failure to build a [`FileObject`](crate::FileObject) out of a multipart part.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileError {
    #[error("file size {size} exceed the limit {max}")]
    TooLarge { size: usize, max: usize },

    #[error("invalid filename: {reason}")]
    InvalidFilename { reason: String },
}

impl FileError {
    pub fn too_large(size: usize, max: usize) -> Self {
        Self::TooLarge { size, max }
    }

    pub fn invalid_filename<S: ToString>(reason: S) -> Self {
        Self::InvalidFilename { reason: reason.to_string() }
    }
}
