//! Adapter for bodies that still live inside an [`http::Request`].
//!
//! The body is collected with [`BodyExt::collect`] and handed to
//! [`parse_body`] together with the request's `Content-Type`, so the result has
//! exactly the shape `parse_body` gives for the same bytes.

use crate::diagnostics::Diagnostic;
use crate::dispatch::{ParseContext, parse_body};
use crate::value::ResultMap;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Request};
use http_body::Body;
use http_body_util::BodyExt;
use std::fmt::Display;

/// Reads the whole request body and decodes it.
///
/// A body that fails while being read is reported as
/// [`Diagnostic::RequestBodyUnreadable`] and yields an empty mapping.
pub async fn parse_request<B>(ctx: &ParseContext<'_>, request: Request<B>) -> ResultMap
where
    B: Body,
    B::Error: Display,
{
    let (parts, body) = request.into_parts();

    match body.collect().await {
        Ok(collected) => parse_parts(ctx, &parts.headers, &collected.to_bytes()),
        Err(e) => {
            ctx.report(Diagnostic::RequestBodyUnreadable { msg: e.to_string() });
            ResultMap::new()
        }
    }
}

/// Decodes an already buffered body using the `Content-Type` found in `headers`.
///
/// A header value that is not visible ASCII counts as absent.
pub fn parse_parts(ctx: &ParseContext<'_>, headers: &HeaderMap, body: &Bytes) -> ResultMap {
    let content_type = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok());
    parse_body(ctx, content_type, body)
}
