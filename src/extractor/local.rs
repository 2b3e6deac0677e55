//! In-process conversion on a temporary file.
//!
//! ## Why a temp file?
//!
//! pdfium opens documents by path. The upload is therefore written to a
//! [`NamedTempFile`] whose suffix is the original extension, converted, and
//! removed when the handle drops. Drop runs on success, on conversion failure
//! and on panic unwinding inside the blocking task, so no path leaks a file.
//!
//! ## Format resolution
//!
//! The extension decides first. Files without one are sniffed: `%PDF` magic,
//! an HTML prologue, or valid UTF-8. Anything else is unsupported.

use super::{Document, Extraction, Extractor, ExtractorKind, Metadata};
use crate::config::ServiceConfig;
use crate::error::Doc2TxtError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Prefix of every temp file this extractor creates.
pub const TEMP_PREFIX: &str = "doc2txt-";

/// Reported as `converter_version` in metadata.
const CONVERTER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Input formats the local converter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalFormat {
    Pdf,
    Html,
    Text,
}

impl LocalFormat {
    /// Resolve a format from an extension such as `".pdf"`. Case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "html" | "htm" | "xhtml" => Some(Self::Html),
            "txt" | "text" | "md" | "markdown" | "csv" | "tsv" | "json" | "xml" | "yaml"
            | "yml" | "log" | "rst" => Some(Self::Text),
            _ => None,
        }
    }

    /// Guess a format from content alone.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            return Some(Self::Pdf);
        }
        let text = std::str::from_utf8(bytes).ok()?;
        let head: String = text
            .trim_start_matches('\u{feff}')
            .trim_start()
            .chars()
            .take(15)
            .collect::<String>()
            .to_ascii_lowercase();
        if head.starts_with("<!doctype html") || head.starts_with("<html") {
            Some(Self::Html)
        } else {
            Some(Self::Text)
        }
    }

    fn converter_name(&self) -> &'static str {
        match self {
            Self::Pdf => "pdfium",
            Self::Html => "html",
            Self::Text => "text",
        }
    }
}

/// Extractor that converts uploads in-process.
#[derive(Debug, Clone, Default)]
pub struct LocalExtractor {
    temp_dir: Option<PathBuf>,
    pdfium_library_path: Option<PathBuf>,
}

impl LocalExtractor {
    pub fn new(temp_dir: Option<PathBuf>, pdfium_library_path: Option<PathBuf>) -> Self {
        Self {
            temp_dir,
            pdfium_library_path,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.temp_dir.clone(), config.pdfium_library_path.clone())
    }

    fn failure(message: impl Into<String>) -> Doc2TxtError {
        Doc2TxtError::extraction(ExtractorKind::Local, message)
    }
}

#[async_trait]
impl Extractor for LocalExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Local
    }

    async fn extract(&self, document: &Document) -> Result<Extraction, Doc2TxtError> {
        let bytes = document.bytes.clone();
        let ext = document.extension();
        let temp_dir = self.temp_dir.clone();
        let library = self.pdfium_library_path.clone();

        tokio::task::spawn_blocking(move || {
            let staged = stage(&bytes, &ext, temp_dir.as_deref())?;
            debug!("Staged {} bytes at {}", bytes.len(), staged.path().display());
            let result = convert_path(staged.path(), &ext, library.as_deref());
            drop(staged);
            result
        })
        .await
        .map_err(|e| Doc2TxtError::Internal(format!("Conversion task panicked: {e}")))?
    }

    async fn probe(&self) -> Result<(), String> {
        if let Some(dir) = &self.temp_dir {
            if !dir.is_dir() {
                return Err(format!("temp dir '{}' does not exist", dir.display()));
            }
        }
        let library = self.pdfium_library_path.clone();
        tokio::task::spawn_blocking(move || bind_pdfium(library.as_deref()).map(|_| ()))
            .await
            .map_err(|e| format!("probe task panicked: {e}"))?
    }
}

/// Write `bytes` to a fresh, uniquely named temp file ending in `ext`.
fn stage(bytes: &[u8], ext: &str, dir: Option<&Path>) -> Result<NamedTempFile, Doc2TxtError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(TEMP_PREFIX).suffix(ext);
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| Doc2TxtError::Internal(format!("Failed to create temp file: {e}")))?;

    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|e| Doc2TxtError::Internal(format!("Failed to write temp file: {e}")))?;
    Ok(file)
}

/// Convert the file at `path`. `ext` is the original extension (may be `""`).
pub fn convert_path(
    path: &Path,
    ext: &str,
    pdfium_library: Option<&Path>,
) -> Result<Extraction, Doc2TxtError> {
    let bytes = std::fs::read(path)
        .map_err(|e| LocalExtractor::failure(format!("Failed to read '{}': {e}", path.display())))?;

    let format = if ext.is_empty() {
        LocalFormat::sniff(&bytes)
    } else {
        LocalFormat::from_extension(ext)
    }
    .ok_or_else(|| {
        LocalExtractor::failure(if ext.is_empty() {
            "Unsupported file type: content is not PDF, HTML or UTF-8 text".to_string()
        } else {
            format!("Unsupported file type '{ext}'")
        })
    })?;

    let mut metadata = Metadata::new();
    metadata.insert("file_type".into(), Value::from(ext));
    metadata.insert("converter".into(), Value::from(format.converter_name()));
    metadata.insert("converter_version".into(), Value::from(CONVERTER_VERSION));

    let text = match format {
        LocalFormat::Pdf => {
            let (text, pdf_meta) = pdf_to_text(path, pdfium_library).map_err(LocalExtractor::failure)?;
            metadata.extend(pdf_meta);
            text
        }
        LocalFormat::Html => html_to_text(&decode_text(&bytes)),
        LocalFormat::Text => decode_text(&bytes),
    };

    Ok(Extraction {
        text: Some(text),
        metadata: Some(metadata),
    })
}

fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, String> {
    match library {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map(Pdfium::new)
    .map_err(|e| format!("failed to load pdfium: {e}"))
}

/// Read the text layer of every page. Pages are separated by a blank line.
fn pdf_to_text(path: &Path, library: Option<&Path>) -> Result<(String, Metadata), String> {
    let pdfium = bind_pdfium(library)?;
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| format!("Failed to open PDF: {e:?}"))?;

    let pages = document.pages();
    let mut page_texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| format!("Failed to read text of page {}: {e:?}", idx + 1))?
            .all();
        page_texts.push(text.trim_end().to_string());
    }

    let mut metadata = Metadata::new();
    metadata.insert("page_count".into(), Value::from(page_texts.len()));
    let doc_meta = document.metadata();
    for (key, tag) in [
        ("title", PdfDocumentMetadataTagType::Title),
        ("author", PdfDocumentMetadataTagType::Author),
    ] {
        if let Some(value) = doc_meta.get(tag).map(|t| t.value().to_string()) {
            if !value.is_empty() {
                metadata.insert(key.into(), Value::from(value));
            }
        }
    }

    Ok((page_texts.join("\n\n"), metadata))
}

/// Lossy UTF-8 decode with any byte-order mark removed.
fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}

/// Subtrees that never contribute visible text.
const SKIPPED: &[&str] = &["head", "script", "style", "noscript", "template", "svg"];

/// Elements that start and end a paragraph.
const PARAGRAPH: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "table", "ul", "ol", "dl",
    "section", "article", "header", "footer", "figure", "hr",
];

/// Elements that sit on their own line.
const LINE: &[&str] = &["div", "li", "tr", "dt", "dd", "figcaption", "caption", "main", "nav"];

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Reduce an HTML document to readable text.
///
/// Source whitespace is collapsed everywhere except inside `<pre>`; line
/// structure comes from the element tree.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    collect_text(document.root_element(), false, &mut out);

    let lines: Vec<&str> = out.lines().map(str::trim).collect();
    RE_BLANK_RUN
        .replace_all(lines.join("\n").trim(), "\n\n")
        .into_owned()
}

fn collect_text(element: ElementRef<'_>, preformatted: bool, out: &mut String) {
    let name = element.value().name();
    if SKIPPED.contains(&name) {
        return;
    }
    if name == "br" {
        out.push('\n');
        return;
    }

    let breaks = if PARAGRAPH.contains(&name) {
        2
    } else if LINE.contains(&name) {
        1
    } else {
        0
    };
    let preformatted = preformatted || name == "pre";

    end_with_newlines(out, breaks);
    for child in element.children() {
        match child.value() {
            Node::Text(text) if preformatted => out.push_str(text),
            Node::Text(text) => out.push_str(&RE_WS.replace_all(text, " ")),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, preformatted, out);
                }
            }
            _ => {}
        }
    }
    end_with_newlines(out, breaks);
    if matches!(name, "td" | "th") {
        out.push(' ');
    }
}

/// Make `out` end with at least `n` newlines, ignoring trailing blanks.
fn end_with_newlines(out: &mut String, n: usize) {
    if n == 0 {
        return;
    }
    let kept = out.trim_end_matches([' ', '\t']).len();
    out.truncate(kept);
    let have = out.len() - out.trim_end_matches('\n').len();
    for _ in have..n {
        out.push('\n');
    }
}
