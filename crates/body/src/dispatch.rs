//! Routing of a body to its parser, and the single failure boundary.
//!
//! [`parse_body`] never fails: anything that goes wrong below it is reported to the
//! [`DiagnosticSink`] once and turned into an empty [`ResultMap`].

use crate::charset::{self, Charset};
use crate::config::BodyConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::ParseError;
use crate::json::{self, RAW_KEY};
use crate::media_type::MediaType;
use crate::utils::ensure;
use crate::value::{FieldValue, ResultMap};
use crate::{form, multipart};
use bytes::Bytes;
use std::fmt;

static TRACING_SINK: TracingSink = TracingSink;

/// Everything a parse needs besides the body: where diagnostics go and which limits apply.
#[derive(Clone, Copy)]
pub struct ParseContext<'a> {
    sink: &'a dyn DiagnosticSink,
    config: BodyConfig,
}

impl<'a> ParseContext<'a> {
    pub fn new(sink: &'a dyn DiagnosticSink) -> Self {
        Self { sink, config: BodyConfig::default() }
    }

    #[must_use]
    pub fn with_config(mut self, config: BodyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &BodyConfig {
        &self.config
    }

    pub fn sink(&self) -> &'a dyn DiagnosticSink {
        self.sink
    }

    pub(crate) fn report(&self, diagnostic: Diagnostic) {
        self.sink.debug(&diagnostic);
    }
}

impl Default for ParseContext<'static> {
    /// Reports diagnostics through `tracing`, with default limits.
    fn default() -> Self {
        Self::new(&TRACING_SINK)
    }
}

impl fmt::Debug for ParseContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseContext").field("config", &self.config).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Json,
    Ndjson,
    Form,
    Multipart,
    Text,
}

/// Media types with a dedicated parser, everything else is decoded as text.
const ROUTES: &[(&str, Route)] = &[
    ("application/json", Route::Json),
    ("text/json", Route::Json),
    ("application/ld+json", Route::Json),
    ("application/x-ndjson", Route::Ndjson),
    ("application/x-www-form-urlencoded", Route::Form),
    ("multipart/form-data", Route::Multipart),
    ("text/plain", Route::Text),
    ("text/html", Route::Text),
    ("text/csv", Route::Text),
    ("application/xml", Route::Text),
    ("text/xml", Route::Text),
];

fn route(media_type: &MediaType) -> Route {
    ROUTES.iter().find(|(essence, _)| *essence == media_type.essence()).map_or(Route::Text, |(_, route)| *route)
}

/// Decodes `body` according to `content_type`.
///
/// | content-type | result |
/// |---|---|
/// | `application/json`, `text/json`, `application/ld+json` | the top-level object's keys |
/// | `application/x-ndjson` | `{raw: [value, ...]}` |
/// | `application/x-www-form-urlencoded` | typed, bracket-notation aware fields |
/// | `multipart/form-data; boundary=...` | text fields and [`FileObject`](crate::FileObject)s |
/// | any other type | `{raw: text}` |
/// | absent or unparseable | `{raw: bytes}`, undecoded |
///
/// On failure the result is empty and one [`Diagnostic::BodyRejected`] is reported.
pub fn parse_body(ctx: &ParseContext<'_>, content_type: Option<&str>, body: &Bytes) -> ResultMap {
    let Some(media_type) = content_type.and_then(MediaType::parse) else {
        return ResultMap::from([(RAW_KEY.to_string(), FieldValue::Bytes(body.clone()))]);
    };

    match dispatch(ctx, &media_type, body) {
        Ok(map) => map,
        Err(e) => {
            ctx.report(Diagnostic::body_rejected(&media_type, e));
            ResultMap::new()
        }
    }
}

fn dispatch(ctx: &ParseContext<'_>, media_type: &MediaType, body: &Bytes) -> Result<ResultMap, ParseError> {
    let essence = media_type.essence();
    let max = ctx.config().get_max_body_size();
    ensure!(body.len() <= max, ParseError::too_large(body.len(), max));

    // validated for every route, multipart included, even though parts carry their own charset
    let declared = media_type.charset().map(Charset::from_label).transpose().map_err(|e| ParseError::decode(essence, e))?;
    let decode_text = || charset::decode(body, declared).map_err(|e| ParseError::decode(essence, e));

    match route(media_type) {
        Route::Json => json::parse_json(essence, &decode_text()?),
        Route::Ndjson => json::parse_ndjson(&decode_text()?),
        Route::Form => Ok(form::parse_form(&decode_text()?, ctx.sink())),
        Route::Multipart => {
            let boundary = media_type.boundary().ok_or(ParseError::MissingBoundary)?;
            multipart::parse_multipart(ctx, boundary, body)
        }
        Route::Text => Ok(ResultMap::from([(RAW_KEY.to_string(), FieldValue::Text(decode_text()?))])),
    }
}
