//! Diagnostics reported while decoding a body.
//!
//! Decoding never fails towards its caller: every anomaly, recovered or not, is
//! handed to a [`DiagnosticSink`] instead. The default sink, [`TracingSink`],
//! forwards them to `tracing` at debug level.

use std::fmt;
use tracing::debug;

/// One non-fatal event observed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The whole body was rejected, the caller receives an empty result.
    BodyRejected { media_type: String, msg: String },

    /// A form pair could not be percent-decoded and was dropped.
    FormPairSkipped { key: String, value: String },

    /// A multipart part was malformed or unusable and was dropped.
    PartSkipped { name: Option<String>, reason: String },

    /// The request adapter could not read the body at all.
    RequestBodyUnreadable { msg: String },
}

impl Diagnostic {
    pub fn body_rejected<T: ToString, M: ToString>(media_type: T, msg: M) -> Self {
        Self::BodyRejected { media_type: media_type.to_string(), msg: msg.to_string() }
    }

    pub fn part_skipped<R: ToString>(name: Option<&str>, reason: R) -> Self {
        Self::PartSkipped { name: name.map(str::to_string), reason: reason.to_string() }
    }

    /// Short human readable summary, without the structured context.
    pub fn message(&self) -> &'static str {
        match self {
            Diagnostic::BodyRejected { .. } => "failed to parse request body",
            Diagnostic::FormPairSkipped { .. } => "skipped undecodable form pair",
            Diagnostic::PartSkipped { .. } => "skipped multipart part",
            Diagnostic::RequestBodyUnreadable { .. } => "failed to read request body",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::BodyRejected { media_type, msg } => write!(f, "{}: type={media_type} msg={msg}", self.message()),
            Diagnostic::FormPairSkipped { key, value } => write!(f, "{}: key={key} value={value}", self.message()),
            Diagnostic::PartSkipped { name: Some(name), reason } => write!(f, "{}: name={name} reason={reason}", self.message()),
            Diagnostic::PartSkipped { name: None, reason } => write!(f, "{}: reason={reason}", self.message()),
            Diagnostic::RequestBodyUnreadable { msg } => write!(f, "{}: msg={msg}", self.message()),
        }
    }
}

/// Receiver of [`Diagnostic`]s, the `logger.debug(message, context)` of the engine.
#[cfg_attr(test, mockall::automock)]
pub trait DiagnosticSink {
    fn debug(&self, diagnostic: &Diagnostic);
}

/// Sink that emits every diagnostic as a `tracing` debug event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn debug(&self, diagnostic: &Diagnostic) {
        let message = diagnostic.message();
        match diagnostic {
            Diagnostic::BodyRejected { media_type, msg } => debug!(media_type = %media_type, msg = %msg, "{message}"),
            Diagnostic::FormPairSkipped { key, value } => debug!(key = %key, value = %value, "{message}"),
            Diagnostic::PartSkipped { name, reason } => debug!(name = ?name, reason = %reason, "{message}"),
            Diagnostic::RequestBodyUnreadable { msg } => debug!(msg = %msg, "{message}"),
        }
    }
}
