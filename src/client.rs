//! HTTP client for a running doc2txt backend.
//!
//! Does what the upload form does: read a file, base64 it, post it to
//! `/process`, hand back the extracted text. Also used by the CLI's `submit`
//! and `health` subcommands.

use crate::error::Doc2TxtError;
use crate::health::HealthStatus;
use crate::pipeline::{ProcessRequest, ProcessResponse};
use crate::server::ErrorBody;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Default backend address.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8005";

/// Thin wrapper over `reqwest` speaking the doc2txt JSON API.
#[derive(Debug, Clone)]
pub struct Doc2TxtClient {
    base_url: String,
    http: reqwest::Client,
}

impl Doc2TxtClient {
    /// `timeout` bounds a whole request, including extraction time.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, Doc2TxtError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Doc2TxtError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read `path` and submit it for extraction.
    pub async fn process_file(
        &self,
        path: impl AsRef<Path>,
        use_markitdown: bool,
    ) -> Result<ProcessResponse, Doc2TxtError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| Doc2TxtError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        info!("Submitting '{}' ({} bytes)", filename, bytes.len());
        self.process(&ProcessRequest::from_bytes(filename, &bytes, use_markitdown))
            .await
    }

    /// `POST /process`.
    pub async fn process(&self, request: &ProcessRequest) -> Result<ProcessResponse, Doc2TxtError> {
        let url = format!("{}/process", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| request_failed(&url, e))?;
        read_json(&url, response).await
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<HealthStatus, Doc2TxtError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| request_failed(&url, e))?;
        read_json(&url, response).await
    }
}

fn request_failed(url: &str, e: reqwest::Error) -> Doc2TxtError {
    Doc2TxtError::RequestFailed {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

/// Decode a success body as `T`, or turn an error body into
/// [`Doc2TxtError::Remote`].
async fn read_json<T: DeserializeOwned>(
    url: &str,
    response: reqwest::Response,
) -> Result<T, Doc2TxtError> {
    let status = response.status();
    let body = response.bytes().await.map_err(|e| request_failed(url, e))?;
    debug!("{} → {} ({} bytes)", url, status, body.len());

    if !status.is_success() {
        let detail = serde_json::from_slice::<ErrorBody>(&body)
            .map(|b| b.detail)
            .unwrap_or_else(|_| String::from_utf8_lossy(&body).trim().to_string());
        return Err(Doc2TxtError::Remote {
            status: status.as_u16(),
            detail,
        });
    }

    serde_json::from_slice(&body).map_err(|e| Doc2TxtError::RequestFailed {
        url: url.to_string(),
        reason: format!("unexpected response body: {e}"),
    })
}
