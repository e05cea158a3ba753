//! A request body decoding engine
//!
//! This crate turns a fully buffered request body plus its `Content-Type` header into a
//! [`ResultMap`]: a mapping of field names to typed [`FieldValue`]s. It is the body side of
//! `micro-http`: the codecs hand over bytes, this crate makes sense of them.
//!
//! # Features
//!
//! - JSON (`application/json`, `text/json`, `application/ld+json`)
//! - Newline-delimited JSON (`application/x-ndjson`), all or nothing
//! - Plain text family, including any unknown media type
//! - `application/x-www-form-urlencoded` with type coercion and bracket notation
//! - Binary-safe `multipart/form-data` with zero-copy file contents
//! - Strict `utf-8`, `utf-16le` and `utf-16be` decoding with byte-order-mark sniffing
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use micro_body::{parse_body, FieldValue, ParseContext};
//!
//! let ctx = ParseContext::default();
//! let body = Bytes::from_static(b"id=42&tags[]=a&tags[]=b");
//!
//! let fields = parse_body(&ctx, Some("application/x-www-form-urlencoded"), &body);
//! assert_eq!(fields["id"], FieldValue::Integer(42));
//! assert_eq!(fields["tags"].as_list().map(<[_]>::len), Some(2));
//! ```
//!
//! # Error Handling
//!
//! [`parse_body`] never returns an error and never panics on its input. A body that cannot
//! be decoded yields an empty [`ResultMap`], the cause goes to the [`DiagnosticSink`] of the
//! [`ParseContext`]:
//!
//! - [`DecodeError`]: unsupported charset or invalid bytes for it
//! - [`ParseError`]: malformed JSON or NDJSON, missing multipart boundary, limits exceeded
//! - [`FormDecodeError`]: one form pair was undecodable, only that pair is dropped
//! - [`FileError`]: one multipart file could not be built, only that part is dropped
//!
//! The default context reports through `tracing` at debug level.
//!
//! # Architecture
//!
//! - [`media_type`]: content-type resolution
//! - [`charset`]: strict charset decoding
//! - [`json`], [`form`], [`multipart`]: the parsers
//! - [`dispatch`]: routing and the failure boundary
//! - [`request`]: adapter for `http::Request` bodies

pub mod charset;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod form;
pub mod json;
pub mod media_type;
pub mod multipart;
pub mod request;
pub mod value;

mod utils;

pub use charset::Charset;
pub use config::BodyConfig;
pub use diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
pub use dispatch::{ParseContext, parse_body};
pub use error::{DecodeError, FileError, FormDecodeError, ParseError};
pub use media_type::MediaType;
pub use request::{parse_parts, parse_request};
pub use value::{FieldValue, FileObject, ResultMap};
