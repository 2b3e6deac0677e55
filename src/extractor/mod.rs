//! Extraction engines.
//!
//! Both engines sit behind the [`Extractor`] trait so the pipeline only ever
//! sees `Arc<dyn Extractor>`. Tests swap in stubs through the same seam.
//!
//! ```text
//!                 ┌──────────────────┐
//!   Document ───▶ │ TikaExtractor    │ ── PUT /rmeta/text ──▶ Tika server
//!                 ├──────────────────┤
//!                 │ LocalExtractor   │ ── temp file ──▶ pdfium / html / text
//!                 └──────────────────┘
//! ```
//!
//! 1. [`tika`]  — network-backed; bytes go straight from memory to the server
//! 2. [`local`] — filesystem-backed; bytes are written to a scoped temp file
//!    that is removed on every exit path

pub mod local;
pub mod tika;

pub use local::LocalExtractor;
pub use tika::TikaExtractor;

use crate::error::Doc2TxtError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Free-form metadata returned by an engine.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Which engine produced a result.
///
/// Serialises to the names existing clients already send and expect:
/// `"tika"` and `"markitdown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractorKind {
    /// The Tika server.
    #[serde(rename = "tika")]
    Tika,
    /// The in-process converter.
    #[serde(rename = "markitdown")]
    Local,
}

impl ExtractorKind {
    /// Wire name used in `parser_used`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractorKind::Tika => "tika",
            ExtractorKind::Local => "markitdown",
        }
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded upload.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// The filename's extension with a leading dot (`".pdf"`), or `""` when
    /// the name has none.
    pub fn extension(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default()
    }
}

/// Raw engine output before normalisation.
///
/// Engines report what they actually got back; the pipeline decides what an
/// absent field means.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub text: Option<String>,
    pub metadata: Option<Metadata>,
}

/// A document-to-text engine.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Which engine this is.
    fn kind(&self) -> ExtractorKind;

    /// Extract text and metadata from `document`.
    ///
    /// Every engine-level failure is returned as
    /// [`Doc2TxtError::Extraction`].
    async fn extract(&self, document: &Document) -> Result<Extraction, Doc2TxtError>;

    /// Cheap availability check that does not convert anything.
    ///
    /// `Err` carries the detail shown in the health report, e.g. `"503"` or
    /// `"connection error: …"`.
    async fn probe(&self) -> Result<(), String>;
}
