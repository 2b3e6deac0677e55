//! Error types for the doc2txt library.
//!
//! Every failure a request can hit is one variant of [`Doc2TxtError`], and each
//! variant belongs to exactly one side of the client/server split:
//!
//! * **Client input** — [`Doc2TxtError::Decode`] and
//!   [`Doc2TxtError::InvalidRequest`]. The request never reaches an extractor
//!   and the HTTP layer answers `400`.
//! * **Server side** — [`Doc2TxtError::Extraction`] and
//!   [`Doc2TxtError::Internal`]. The HTTP layer answers `500` carrying the
//!   error's `Display` text.
//!
//! [`Doc2TxtError::RequestFailed`], [`Doc2TxtError::Remote`] and
//! [`Doc2TxtError::ReadFailed`] only come out of the HTTP client.
//!
//! [`Doc2TxtError::is_client_error`] is the single place that split is decided.

use crate::extractor::ExtractorKind;
use thiserror::Error;

/// All errors returned by the doc2txt library.
#[derive(Debug, Error)]
pub enum Doc2TxtError {
    // ── Client input errors ───────────────────────────────────────────────
    /// The `file` field is not valid base64.
    #[error("Failed to decode base64 string: {reason}")]
    Decode { reason: String },

    /// The request body is structurally wrong (bad JSON, empty filename, …).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ── Extractor errors ──────────────────────────────────────────────────
    /// The selected extractor failed: unreachable server, parse failure,
    /// corrupt or unsupported document.
    #[error("{message}")]
    Extraction {
        extractor: ExtractorKind,
        message: String,
    },

    // ── Client-side errors ────────────────────────────────────────────────
    /// [`crate::client::Doc2TxtClient`] could not reach the backend.
    #[error("Request to '{url}' failed: {reason}\nIs the doc2txt backend running?")]
    RequestFailed { url: String, reason: String },

    /// The backend answered with a non-success status.
    #[error("Backend returned HTTP {status}: {detail}")]
    Remote { status: u16, detail: String },

    /// A local file could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or environment validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task panic, temp-file I/O, …).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Doc2TxtError {
    /// Shorthand for an [`Doc2TxtError::Extraction`] failure.
    pub fn extraction(extractor: ExtractorKind, message: impl Into<String>) -> Self {
        Self::Extraction {
            extractor,
            message: message.into(),
        }
    }

    /// `true` when the caller sent something malformed and retrying the same
    /// request cannot succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::InvalidRequest(_))
    }
}
