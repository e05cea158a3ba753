//! Content-type resolution.
//!
//! Turns a raw `Content-Type` header value into a [`MediaType`]: the lower-cased
//! `type/subtype` pair plus the two parameters the parsers care about, `charset`
//! and `boundary`. Unknown types are not an error, the dispatcher routes them to
//! the plain text parser.

use mime::Mime;
use std::fmt;

const CHARSET: &str = "charset";
const BOUNDARY: &str = "boundary";

/// A parsed content-type header.
///
/// The charset is lower-cased since its value is case-insensitive, the boundary keeps
/// its original case since it must match the body byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaType {
    mime: Mime,
    charset: Option<String>,
    boundary: Option<String>,
}

impl MediaType {
    /// Parses a content-type header value.
    ///
    /// The header is split on `;` outside of quotes. The first segment is the
    /// essence, the rest are `key=value` parameters; segments without `=` or with
    /// an empty value are ignored.
    ///
    /// Returns `None` when the header is empty or its essence is not a media type,
    /// which tells the dispatcher to hand the body back undecoded.
    pub fn parse(header: &str) -> Option<Self> {
        let mut segments = split_params(header).into_iter();
        let essence = segments.next()?.to_ascii_lowercase();
        if essence.is_empty() {
            return None;
        }

        let mime = essence.parse::<Mime>().ok()?;

        let mut charset = None;
        let mut boundary = None;
        for segment in segments {
            let Some((name, value)) = segment.split_once('=') else {
                continue;
            };
            let value = unquote(value.trim());
            if value.is_empty() {
                continue;
            }

            let name = name.trim();
            if name.eq_ignore_ascii_case(CHARSET) {
                charset = Some(value.to_ascii_lowercase());
            } else if name.eq_ignore_ascii_case(BOUNDARY) {
                boundary = Some(value);
            }
        }

        Some(Self { mime, charset, boundary })
    }

    /// The top level type, e.g. `text` in `text/plain`
    pub fn type_(&self) -> &str {
        self.mime.type_().as_str()
    }

    /// The subtype, e.g. `ld+json` in `application/ld+json`
    pub fn subtype(&self) -> &str {
        self.essence().split_once('/').map_or("", |(_, subtype)| subtype)
    }

    /// The `type/subtype` pair without parameters
    pub fn essence(&self) -> &str {
        self.mime.essence_str()
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.essence())
    }
}

/// Splits on `;` outside of double quotes, trimming each segment.
pub(crate) fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(value[start..].trim());
    params
}

/// Removes surrounding quotes, turning `\"` back into `"`.
///
/// Other backslashes are kept: browsers send Windows paths unescaped.
pub(crate) fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return value.to_string();
    };
    inner.replace("\\\"", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_type() {
        let media_type = MediaType::parse("application/json").unwrap();
        assert_eq!(media_type.type_(), "application");
        assert_eq!(media_type.subtype(), "json");
        assert_eq!(media_type.essence(), "application/json");
        assert_eq!(media_type.charset(), None);
        assert_eq!(media_type.boundary(), None);
    }

    #[test]
    fn type_is_lower_cased_and_charset_too() {
        let media_type = MediaType::parse("Application/JSON; Charset=UTF-16LE").unwrap();
        assert_eq!(media_type.essence(), "application/json");
        assert_eq!(media_type.charset(), Some("utf-16le"));
    }

    #[test]
    fn boundary_keeps_case() {
        let media_type = MediaType::parse("multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW").unwrap();
        assert_eq!(media_type.essence(), "multipart/form-data");
        assert_eq!(media_type.boundary(), Some("----WebKitFormBoundary7MA4YWxkTrZu0gW"));
    }

    #[test]
    fn quoted_parameters() {
        let media_type = MediaType::parse(r#"multipart/form-data; charset="utf-8"; boundary="AaB03x""#).unwrap();
        assert_eq!(media_type.charset(), Some("utf-8"));
        assert_eq!(media_type.boundary(), Some("AaB03x"));
    }

    #[test]
    fn suffix_subtype() {
        let media_type = MediaType::parse("application/ld+json").unwrap();
        assert_eq!(media_type.subtype(), "ld+json");
    }

    #[test]
    fn boundary_with_non_token_characters() {
        let media_type = MediaType::parse("multipart/form-data; boundary=----=_Part_0_1").unwrap();
        assert_eq!(media_type.boundary(), Some("----=_Part_0_1"));

        let media_type = MediaType::parse("multipart/form-data; boundary=a/b:c").unwrap();
        assert_eq!(media_type.boundary(), Some("a/b:c"));
    }

    #[test]
    fn quoted_value_may_contain_separator() {
        let media_type = MediaType::parse(r#"multipart/form-data; boundary="a;b"; charset=utf-8"#).unwrap();
        assert_eq!(media_type.boundary(), Some("a;b"));
        assert_eq!(media_type.charset(), Some("utf-8"));
    }

    #[test]
    fn malformed_parameters_are_ignored() {
        let media_type = MediaType::parse("application/json; charset").unwrap();
        assert_eq!(media_type.essence(), "application/json");
        assert_eq!(media_type.charset(), None);

        let media_type = MediaType::parse("text/plain;; charset= ; foo=bar baz").unwrap();
        assert_eq!(media_type.essence(), "text/plain");
        assert_eq!(media_type.charset(), None);

        let media_type = MediaType::parse("text/plain; charset=latin1 ; foo=bar baz").unwrap();
        assert_eq!(media_type.charset(), Some("latin1"));
    }

    #[test]
    fn split_respects_quotes_and_escapes() {
        assert_eq!(split_params(r#"form-data; name="a;b"; filename="x\"; y""#), vec![
            "form-data",
            r#"name="a;b""#,
            r#"filename="x\"; y""#
        ]);
        assert_eq!(unquote(r#""x\"; y""#), r#"x"; y"#);
        assert_eq!(unquote(r#""C:\dir\f.txt""#), r"C:\dir\f.txt");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn absent_or_unparseable() {
        assert!(MediaType::parse("").is_none());
        assert!(MediaType::parse("   ").is_none());
        assert!(MediaType::parse("definitely not a media type").is_none());
        assert!(MediaType::parse("; charset=utf-8").is_none());
    }
}
