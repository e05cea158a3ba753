//! `application/x-www-form-urlencoded` parser.
//!
//! Values are coerced to the narrowest matching type, in this order:
//! empty string, integer, float, boolean, ISO-8601 date-time, string.
//!
//! Keys understand one level of bracket notation:
//! - `tags[]=a&tags[]=b` appends to a list under `tags`
//! - `user[name]=x` inserts `name` into a map under `user`
//! - `name=x` sets or overwrites a scalar

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::FormDecodeError;
use crate::value::{FieldValue, ResultMap};
use chrono::{DateTime, NaiveDateTime, Utc};
use percent_encoding::percent_decode_str;
use std::collections::hash_map::Entry;
use tracing::trace;

/// Parses decoded form text into a typed mapping.
///
/// Pairs that fail to percent-decode are reported to `sink` and skipped.
pub fn parse_form(text: &str, sink: &dyn DiagnosticSink) -> ResultMap {
    let mut map = ResultMap::new();
    let mut skipped = 0usize;

    for pair in text.split('&').filter(|pair| !pair.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));

        match decode_pair(raw_key, raw_value) {
            Ok((key, value)) => insert(&mut map, &key, coerce(&value)),
            Err(e) => {
                skipped += 1;
                sink.debug(&Diagnostic::FormPairSkipped { key: e.key, value: e.value });
            }
        }
    }

    trace!(fields = map.len(), skipped, "parsed form body");
    map
}

fn decode_pair(raw_key: &str, raw_value: &str) -> Result<(String, String), FormDecodeError> {
    match (decode_component(raw_key), decode_component(raw_value)) {
        (Some(key), Some(value)) => Ok((key, value)),
        _ => Err(FormDecodeError::new(raw_key, raw_value)),
    }
}

/// Percent-decodes one form component, `+` standing for a space.
///
/// Unlike a lossy decode this refuses a `%` not followed by two hex digits and
/// escapes that do not form valid utf-8.
fn decode_component(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let well_formed = bytes.iter().enumerate().filter(|(_, b)| **b == b'%').all(|(i, _)| {
        matches!(bytes.get(i + 1..i + 3), Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit())
    });
    if !well_formed {
        return None;
    }

    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8().ok().map(|decoded| decoded.into_owned())
}

enum Target<'a> {
    Scalar(&'a str),
    Append(&'a str),
    Nested(&'a str, &'a str),
}

fn target(key: &str) -> Target<'_> {
    if let Some(inner_start) = key.find('[')
        && inner_start > 0
        && let Some(inner) = key[inner_start + 1..].strip_suffix(']')
    {
        let name = &key[..inner_start];
        return if inner.is_empty() { Target::Append(name) } else { Target::Nested(name, inner) };
    }
    Target::Scalar(key)
}

fn insert(map: &mut ResultMap, key: &str, value: FieldValue) {
    match target(key) {
        Target::Scalar(name) => {
            map.insert(name.to_string(), value);
        }
        Target::Append(name) => match map.entry(name.to_string()) {
            Entry::Occupied(mut entry) => match entry.get_mut() {
                FieldValue::List(items) => items.push(value),
                other => *other = FieldValue::List(vec![value]),
            },
            Entry::Vacant(entry) => {
                entry.insert(FieldValue::List(vec![value]));
            }
        },
        Target::Nested(name, sub) => match map.entry(name.to_string()) {
            Entry::Occupied(mut entry) => match entry.get_mut() {
                FieldValue::Map(nested) => {
                    nested.insert(sub.to_string(), value);
                }
                other => *other = FieldValue::Map(ResultMap::from([(sub.to_string(), value)])),
            },
            Entry::Vacant(entry) => {
                entry.insert(FieldValue::Map(ResultMap::from([(sub.to_string(), value)])));
            }
        },
    }
}

/// Converts a decoded value string into its typed form.
pub fn coerce(value: &str) -> FieldValue {
    if value.is_empty() {
        return FieldValue::Text(String::new());
    }

    if is_integer(value) {
        // integers too large for i64 keep their magnitude as a float
        return match value.parse::<i64>() {
            Ok(i) => FieldValue::Integer(i),
            Err(_) => value.parse::<f64>().map_or_else(|_| FieldValue::from(value), FieldValue::Float),
        };
    }

    if is_decimal(value)
        && let Ok(f) = value.parse::<f64>()
    {
        return FieldValue::Float(f);
    }

    match value {
        "true" => return FieldValue::Bool(true),
        "false" => return FieldValue::Bool(false),
        _ => {}
    }

    if let Some(date) = parse_date_time(value) {
        return FieldValue::Date(date);
    }

    FieldValue::from(value)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `-?\d+`
fn is_integer(value: &str) -> bool {
    is_digits(value.strip_prefix('-').unwrap_or(value))
}

/// `-?\d+\.\d+`
fn is_decimal(value: &str) -> bool {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    matches!(unsigned.split_once('.'), Some((int, frac)) if is_digits(int) && is_digits(frac))
}

/// `YYYY-MM-DDTHH:MM:SS[.fff][Z|±HH:MM]`, a missing offset meaning UTC.
fn parse_date_time(value: &str) -> Option<DateTime<Utc>> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() >= 19
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes[10] == b'T'
        && bytes[13] == b':'
        && bytes[16] == b':';
    if !shaped {
        return None;
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MockDiagnosticSink;
    use chrono::TimeZone;

    fn silent() -> MockDiagnosticSink {
        let mut sink = MockDiagnosticSink::new();
        sink.expect_debug().never();
        sink
    }

    #[test]
    fn typed_values() {
        let text = "int=42&float=2.75&boolTrue=true&boolFalse=false&date=2024-05-01T12:00:00.000Z&array[]=a&array[]=b&nested[key]=value&empty=&name=john";
        let map = parse_form(text, &silent());

        assert_eq!(map["int"], FieldValue::Integer(42));
        assert_eq!(map["float"], FieldValue::Float(2.75));
        assert_eq!(map["boolTrue"], FieldValue::Bool(true));
        assert_eq!(map["boolFalse"], FieldValue::Bool(false));
        assert_eq!(map["date"], FieldValue::Date(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()));
        assert_eq!(map["array"], FieldValue::List(vec![FieldValue::from("a"), FieldValue::from("b")]));
        assert_eq!(map["nested"], FieldValue::Map(ResultMap::from([("key".to_string(), FieldValue::from("value"))])));
        assert_eq!(map["empty"], FieldValue::from(""));
        assert_eq!(map["name"], FieldValue::from("john"));
    }

    #[test]
    fn percent_and_plus_decoding() {
        let map = parse_form("greeting=hello+world%21&tags%5B%5D=x&caf%C3%A9=%E2%9C%93", &silent());
        assert_eq!(map["greeting"], FieldValue::from("hello world!"));
        assert_eq!(map["tags"], FieldValue::List(vec![FieldValue::from("x")]));
        assert_eq!(map["café"], FieldValue::from("✓"));
    }

    #[test]
    fn malformed_pair_is_skipped_alone() {
        let mut sink = MockDiagnosticSink::new();
        sink.expect_debug()
            .withf(|d| *d == Diagnostic::FormPairSkipped { key: "bad".into(), value: "%E0%A4%A".into() })
            .times(1)
            .return_const(());
        sink.expect_debug()
            .withf(|d| *d == Diagnostic::FormPairSkipped { key: "worse".into(), value: "%zz".into() })
            .times(1)
            .return_const(());

        let map = parse_form("a=1&bad=%E0%A4%A&worse=%zz&b=2", &sink);
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], FieldValue::Integer(1));
        assert_eq!(map["b"], FieldValue::Integer(2));
    }

    #[test]
    fn invalid_utf8_escape_is_skipped() {
        let mut sink = MockDiagnosticSink::new();
        sink.expect_debug().times(1).return_const(());

        let map = parse_form("x=%FF&y=ok", &sink);
        assert_eq!(map.len(), 1);
        assert_eq!(map["y"], FieldValue::from("ok"));
    }

    #[test]
    fn last_scalar_wins() {
        let map = parse_form("a=1&a=2", &silent());
        assert_eq!(map["a"], FieldValue::Integer(2));
    }

    #[test]
    fn bracket_notation_replaces_a_conflicting_scalar() {
        let map = parse_form("a=1&a[]=2&b=x&b[k]=y", &silent());
        assert_eq!(map["a"], FieldValue::List(vec![FieldValue::Integer(2)]));
        assert_eq!(map["b"], FieldValue::Map(ResultMap::from([("k".to_string(), FieldValue::from("y"))])));
    }

    #[test]
    fn nested_keys_accumulate() {
        let map = parse_form("user[name]=ann&user[age]=30&user[name]=bob", &silent());
        let user = map["user"].as_map().unwrap();
        assert_eq!(user.len(), 2);
        assert_eq!(user["name"], FieldValue::from("bob"));
        assert_eq!(user["age"], FieldValue::Integer(30));
    }

    #[test]
    fn odd_keys_stay_scalar() {
        let map = parse_form("[x]=1&a[b=2&flag&=v&&", &silent());
        assert_eq!(map["[x]"], FieldValue::Integer(1));
        assert_eq!(map["a[b"], FieldValue::Integer(2));
        assert_eq!(map["flag"], FieldValue::from(""));
        assert_eq!(map[""], FieldValue::from("v"));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn coercion_order() {
        assert_eq!(coerce("-7"), FieldValue::Integer(-7));
        assert_eq!(coerce("007"), FieldValue::Integer(7));
        assert_eq!(coerce("-0.5"), FieldValue::Float(-0.5));
        assert_eq!(coerce("99999999999999999999"), FieldValue::Float(1e20));
        assert_eq!(coerce("1e5"), FieldValue::from("1e5"));
        assert_eq!(coerce(".5"), FieldValue::from(".5"));
        assert_eq!(coerce("1."), FieldValue::from("1."));
        assert_eq!(coerce("-"), FieldValue::from("-"));
        assert_eq!(coerce("True"), FieldValue::from("True"));
        assert_eq!(coerce("2024-05-01"), FieldValue::from("2024-05-01"));
    }

    #[test]
    fn date_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(coerce("2024-05-01T12:00:00Z"), FieldValue::Date(expected));
        assert_eq!(coerce("2024-05-01T12:00:00"), FieldValue::Date(expected));
        assert_eq!(coerce("2024-05-01T14:00:00+02:00"), FieldValue::Date(expected));
        assert_eq!(coerce("2024-13-01T12:00:00Z"), FieldValue::from("2024-13-01T12:00:00Z"));
        assert_eq!(coerce("2024-05-01 12:00:00Z"), FieldValue::from("2024-05-01 12:00:00Z"));
    }
}
