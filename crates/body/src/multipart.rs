//! Binary-safe `multipart/form-data` parser.
//!
//! The body is scanned as bytes: delimiters are located with `memchr::memmem`,
//! every part is a `Bytes` slice of the original buffer, and only parts without a
//! filename are ever decoded as text.
//!
//! # Layout
//!
//! ```text
//! preamble
//! --boundary\r\n
//! Content-Disposition: form-data; name="field"\r\n
//! \r\n
//! value\r\n
//! --boundary\r\n
//! Content-Disposition: form-data; name="file"; filename="a.bin"\r\n
//! Content-Type: application/octet-stream\r\n
//! \r\n
//! <bytes>\r\n
//! --boundary--\r\n
//! epilogue
//! ```
//!
//! The CRLF in front of a delimiter belongs to the delimiter, not to the content.
//!
//! # Recovery
//!
//! A part without a header/content separator, without a `name`, with an empty file
//! or whose file cannot be built is skipped with a diagnostic. A text part whose
//! charset is unsupported or whose bytes are invalid fails the whole body.

use crate::charset::{self, Charset};
use crate::diagnostics::Diagnostic;
use crate::dispatch::ParseContext;
use crate::error::{FileError, ParseError};
use crate::media_type::{MediaType, split_params, unquote};
use crate::utils::ensure;
use crate::value::{FieldValue, FileObject, ResultMap};
use bytes::Bytes;
use memchr::memmem;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use tracing::trace;

const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";
const DASHES: &[u8] = b"--";

const CONTENT_TYPE: &str = "content-type";
const CONTENT_DISPOSITION: &str = "content-disposition";
const DEFAULT_FILE_TYPE: &str = "application/octet-stream";
const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// One boundary delimited segment, alive only until it becomes a field or is dropped.
#[derive(Debug)]
struct Part {
    headers: HashMap<String, String>,
    name: Option<String>,
    filename: Option<Filename>,
    content_type: Option<MediaType>,
    body: Bytes,
}

/// A filename as sent by the client, either `filename="..."` or the RFC 5987
/// `filename*=charset'lang'percent-encoded` form.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Filename {
    Plain(String),
    Extended(String),
}

impl Filename {
    fn resolve(self) -> Result<String, FileError> {
        match self {
            Filename::Plain(name) => Ok(name),
            Filename::Extended(raw) => decode_extended_value(&raw),
        }
    }
}

/// Parses a multipart body delimited by `boundary` into a mapping of field name
/// to text or [`FileObject`].
///
/// A body that contains no delimiter at all yields an empty mapping.
pub fn parse_multipart(ctx: &ParseContext<'_>, boundary: &str, body: &Bytes) -> Result<ResultMap, ParseError> {
    let mut delimiter = Vec::with_capacity(boundary.len() + DASHES.len());
    delimiter.extend_from_slice(DASHES);
    delimiter.extend_from_slice(boundary.as_bytes());

    let positions = find_delimiters(body, &delimiter);
    let mut map = ResultMap::new();
    let mut part_count = 0usize;

    for window in positions.windows(2) {
        let (start, next) = (window[0], window[1]);
        let after = skip_padding(body, start + delimiter.len());
        if body[after..].starts_with(DASHES) {
            break;
        }

        part_count += 1;
        ensure!(part_count <= ctx.config().get_max_parts(), ParseError::too_many_parts(ctx.config().get_max_parts()));

        // the delimiter line ends with CRLF, the content ends before the CRLF of the next delimiter
        let segment_start = after + CRLF.len();
        let segment_end = next - CRLF.len();
        if segment_start > segment_end {
            ctx.report(Diagnostic::part_skipped(None, "empty part"));
            continue;
        }

        let Some(part) = read_part(body, segment_start, segment_end) else {
            ctx.report(Diagnostic::part_skipped(None, "missing header separator"));
            continue;
        };

        if let Some((name, value)) = part_value(ctx, part)? {
            map.insert(name, value);
        }
    }

    trace!(parts = part_count, fields = map.len(), "parsed multipart body");
    Ok(map)
}

/// Positions of every delimiter that starts a line and is followed by CRLF or `--`.
fn find_delimiters(body: &[u8], delimiter: &[u8]) -> Vec<usize> {
    memmem::find_iter(body, delimiter)
        .filter(|&at| at == 0 || body[..at].ends_with(CRLF))
        .filter(|&at| {
            let rest = &body[skip_padding(body, at + delimiter.len())..];
            rest.starts_with(CRLF) || rest.starts_with(DASHES)
        })
        .collect()
}

/// Skips linear whitespace allowed between a delimiter and its line end.
fn skip_padding(body: &[u8], mut index: usize) -> usize {
    while matches!(body.get(index), Some(b' ' | b'\t')) {
        index += 1;
    }
    index
}

/// Splits `body[start..end]` into headers and content, `None` when no separator exists.
fn read_part(body: &Bytes, start: usize, end: usize) -> Option<Part> {
    let segment = &body[start..end];

    let (header_block, content_offset) = if segment.starts_with(CRLF) {
        (&segment[..0], CRLF.len())
    } else {
        let separator = memmem::find(segment, HEADER_END)?;
        (&segment[..separator], separator + HEADER_END.len())
    };

    let headers = parse_headers(header_block);
    let (name, filename) = headers.get(CONTENT_DISPOSITION).map(|value| parse_disposition(value)).unwrap_or_default();
    let content_type = headers.get(CONTENT_TYPE).and_then(|value| MediaType::parse(value));

    Some(Part { headers, name, filename, content_type, body: body.slice(start + content_offset..end) })
}

/// Parses CRLF separated header lines, names lower-cased, folded lines joined.
fn parse_headers(block: &[u8]) -> HashMap<String, String> {
    let text = String::from_utf8_lossy(block);
    let mut headers: HashMap<String, String> = HashMap::new();
    let mut last: Option<String> = None;

    for line in text.split("\r\n") {
        if line.starts_with([' ', '\t'])
            && let Some(name) = &last
            && let Some(value) = headers.get_mut(name)
        {
            value.push(' ');
            value.push_str(line.trim());
            continue;
        }

        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            headers.insert(name.clone(), value.trim().to_string());
            last = Some(name);
        }
    }

    headers
}

/// Extracts `name` and the filename from a `Content-Disposition` value.
fn parse_disposition(value: &str) -> (Option<String>, Option<Filename>) {
    let mut name = None;
    let mut plain = None;
    let mut extended = None;

    for param in split_params(value) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };

        match key.trim().to_ascii_lowercase().as_str() {
            "name" => name = Some(unquote(raw.trim())),
            "filename" => plain = Some(unquote(raw.trim())),
            "filename*" => extended = Some(raw.trim().to_string()),
            _ => {}
        }
    }

    let filename = extended.map(Filename::Extended).or(plain.map(Filename::Plain));
    (name.filter(|name| !name.is_empty()), filename)
}

/// Decodes an RFC 5987 extended value, only utf-8 is accepted.
fn decode_extended_value(raw: &str) -> Result<String, FileError> {
    let mut pieces = raw.splitn(3, '\'');
    let (Some(charset), Some(_language), Some(encoded)) = (pieces.next(), pieces.next(), pieces.next()) else {
        return Err(FileError::invalid_filename(format!("malformed extended value {raw}")));
    };

    if !charset.eq_ignore_ascii_case("utf-8") {
        return Err(FileError::invalid_filename(format!("unsupported filename charset {charset}")));
    }

    percent_decode_str(encoded)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| FileError::invalid_filename(e.to_string()))
}

/// Turns a part into its named value, `None` when the part is dropped.
fn part_value(ctx: &ParseContext<'_>, part: Part) -> Result<Option<(String, FieldValue)>, ParseError> {
    let Some(name) = part.name else {
        ctx.report(Diagnostic::part_skipped(None, "missing name"));
        return Ok(None);
    };

    let Some(filename) = part.filename else {
        let declared = part
            .content_type
            .as_ref()
            .and_then(MediaType::charset)
            .map(Charset::from_label)
            .transpose()
            .map_err(|e| ParseError::decode(MULTIPART_FORM_DATA, e))?;
        let text = charset::decode(&part.body, declared).map_err(|e| ParseError::decode(MULTIPART_FORM_DATA, e))?;
        return Ok(Some((name, FieldValue::Text(text))));
    };

    if part.body.is_empty() {
        ctx.report(Diagnostic::part_skipped(Some(name.as_str()), "empty file"));
        return Ok(None);
    }

    let mime_type = part.content_type.as_ref().map_or(DEFAULT_FILE_TYPE, MediaType::essence).to_string();
    let file = filename
        .resolve()
        .and_then(|filename| FileObject::try_new(filename, mime_type, part.body, ctx.config().get_max_file_size()));

    match file {
        Ok(file) => {
            trace!(name = %name, filename = file.filename(), size = file.len(), headers = part.headers.len(), "parsed multipart file");
            Ok(Some((name, FieldValue::File(file))))
        }
        Err(e) => {
            ctx.report(Diagnostic::part_skipped(Some(name.as_str()), e));
            Ok(None)
        }
    }
}
