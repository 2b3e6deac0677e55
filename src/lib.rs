//! # doc2txt
//!
//! A small HTTP proxy that turns uploaded documents into plain text.
//!
//! Clients post a JSON body carrying the file as base64. The backend decodes
//! it and hands the bytes to one of two extraction engines:
//!
//! * **Tika** — a long-running Apache Tika server reached over HTTP. The bytes
//!   are streamed from memory, nothing touches the disk.
//! * **Local** — an in-process converter (pdfium text layer, HTML stripping,
//!   plain-text decoding) that works on a temporary file named after the
//!   original extension.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST /process {filename, file, use_markitdown}
//!  │
//!  ├─ 1. Decode   base64 → bytes            (400 on failure)
//!  ├─ 2. Route    use_markitdown ? local : tika
//!  ├─ 3. Extract  adapter call              (500 on failure)
//!  └─ 4. Respond  {status, text, metadata, filename, parser_used}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2txt::{Pipeline, ProcessRequest, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::from_env()?;
//!     let pipeline = Pipeline::from_config(&config)?;
//!     let request = ProcessRequest::from_bytes("notes.txt", b"hello", false);
//!     let response = pipeline.process(request).await?;
//!     println!("{}", response.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2txt` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod extractor;
pub mod health;
pub mod pipeline;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::Doc2TxtClient;
pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use error::Doc2TxtError;
pub use extractor::{Document, Extraction, Extractor, ExtractorKind, LocalExtractor, TikaExtractor};
pub use health::{HealthReporter, HealthStatus};
pub use pipeline::{Pipeline, ProcessRequest, ProcessResponse};

/// Service identifier reported by `/health` and `/test`.
pub const SERVICE_NAME: &str = "doc2txt-backend";
