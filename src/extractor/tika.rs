//! Tika server adapter.
//!
//! Uses the recursive-metadata endpoint (`PUT /rmeta/text`) rather than
//! `/tika` because it returns text *and* metadata in one round trip, and
//! also covers embedded documents (mail attachments, files inside archives).
//!
//! The response is a JSON array: the container document first, then each
//! embedded document. Text lives in the `X-TIKA:content` key of every entry.
//! We concatenate all of it and keep only the container's metadata.

use super::{Document, Extraction, Extractor, ExtractorKind, Metadata};
use crate::config::ServiceConfig;
use crate::error::Doc2TxtError;
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_DISPOSITION};
use std::time::Duration;
use tracing::{debug, warn};

/// Key under which Tika's rmeta endpoint reports extracted text.
pub const TIKA_CONTENT_KEY: &str = "X-TIKA:content";

/// Longest slice of an error body echoed back in messages.
const MAX_ERROR_BODY: usize = 200;

/// Extractor backed by a running Tika server.
#[derive(Debug, Clone)]
pub struct TikaExtractor {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
    probe_timeout: Duration,
}

impl TikaExtractor {
    /// `endpoint` is the server base URL, e.g. `http://localhost:9998`.
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        probe_timeout: Duration,
    ) -> Result<Self, Doc2TxtError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Doc2TxtError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
            timeout,
            probe_timeout,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, Doc2TxtError> {
        Self::new(
            config.tika_endpoint.clone(),
            Duration::from_secs(config.tika_timeout_secs),
            Duration::from_secs(config.health_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn failure(message: impl Into<String>) -> Doc2TxtError {
        Doc2TxtError::extraction(ExtractorKind::Tika, message)
    }
}

#[async_trait]
impl Extractor for TikaExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Tika
    }

    async fn extract(&self, document: &Document) -> Result<Extraction, Doc2TxtError> {
        let url = format!("{}/rmeta/text", self.endpoint);
        debug!("PUT {} ({} bytes)", url, document.bytes.len());

        let mut request = self
            .client
            .put(&url)
            .header(ACCEPT, "application/json")
            .timeout(self.timeout)
            .body(document.bytes.clone());
        if let Some(disposition) = content_disposition(&document.filename) {
            request = request.header(CONTENT_DISPOSITION, disposition);
        }

        let response = request.send().await.map_err(|e| {
            warn!("Tika server connection error: {}", error_chain(&e));
            if e.is_timeout() {
                Self::failure(format!(
                    "Error connecting to Tika server: timed out after {}s",
                    self.timeout.as_secs()
                ))
            } else {
                Self::failure(format!("Error connecting to Tika server: {}", error_chain(&e)))
            }
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            Self::failure(format!("Error connecting to Tika server: {}", error_chain(&e)))
        })?;

        if !status.is_success() {
            let snippet = String::from_utf8_lossy(&body);
            let snippet = snippet.trim();
            let snippet: String = snippet.chars().take(MAX_ERROR_BODY).collect();
            warn!("Tika returned {} for '{}'", status, document.filename);
            return Err(Self::failure(if snippet.is_empty() {
                format!("Error during Tika parsing: HTTP {status}")
            } else {
                format!("Error during Tika parsing: HTTP {status}: {snippet}")
            }));
        }

        parse_rmeta(&body).map_err(|reason| Self::failure(format!("Error during Tika parsing: {reason}")))
    }

    async fn probe(&self) -> Result<(), String> {
        let url = format!("{}/tika", self.endpoint);
        match self.client.get(&url).timeout(self.probe_timeout).send().await {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(resp.status().as_u16().to_string()),
            Err(e) => Err(format!("connection error: {}", error_chain(&e))),
        }
    }
}

/// Parse an `/rmeta/text` response body.
///
/// An empty body or array, and entries without `X-TIKA:content`, are not
/// errors: they mean Tika found no text. Only a body that is not a JSON array
/// of objects is rejected.
pub fn parse_rmeta(body: &[u8]) -> Result<Extraction, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Extraction::default());
    }

    let entries: Vec<Metadata> =
        serde_json::from_slice(body).map_err(|e| format!("unexpected response body: {e}"))?;

    let mut text: Option<String> = None;
    for entry in &entries {
        if let Some(content) = entry.get(TIKA_CONTENT_KEY).and_then(|v| v.as_str()) {
            text.get_or_insert_with(String::new).push_str(content);
        }
    }

    let metadata = entries.into_iter().next().map(|mut container| {
        container.remove(TIKA_CONTENT_KEY);
        container
    });

    Ok(Extraction { text, metadata })
}

/// Build a `Content-Disposition` hint so Tika can use the filename for type
/// detection. Characters that cannot appear in a quoted header value are
/// replaced with `_`.
fn content_disposition(filename: &str) -> Option<HeaderValue> {
    let safe: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.trim().is_empty() {
        return None;
    }
    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\"")).ok()
}

/// Render an error together with its `source()` chain, which is where
/// reqwest keeps the useful part ("Connection refused").
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !msg.contains(&cause_msg) {
            msg.push_str(": ");
            msg.push_str(&cause_msg);
        }
        source = cause.source();
    }
    msg
}
