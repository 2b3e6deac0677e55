//! PDF conversion through the local extractor.
//!
//! Needs a pdfium shared library. The tests skip themselves when none can be
//! bound; point `PDFIUM_LIB_PATH` at one to run them:
//!
//!   PDFIUM_LIB_PATH=/opt/pdfium/lib/libpdfium.so cargo test --test pdf -- --nocapture

use doc2txt::{Document, Extractor, LocalExtractor};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn extractor_in(dir: &Path) -> LocalExtractor {
    let library = std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from);
    LocalExtractor::new(Some(dir.to_path_buf()), library)
}

/// Skip this test when pdfium cannot be loaded.
macro_rules! pdf_skip_unless_pdfium {
    ($extractor:expr) => {{
        if let Err(reason) = $extractor.probe().await {
            println!("SKIP — {reason}");
            println!("       Set PDFIUM_LIB_PATH to a pdfium shared library");
            return;
        }
    }};
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pdf_pages_are_joined_by_blank_lines() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = extractor_in(tmp.path());
    pdf_skip_unless_pdfium!(extractor);

    let bytes = std::fs::read(fixture("two-pages.pdf")).unwrap();
    let ex = extractor
        .extract(&Document::new("two-pages.pdf", bytes))
        .await
        .unwrap();

    let text = ex.text.unwrap();
    let pages: Vec<&str> = text.split("\n\n").collect();
    assert_eq!(pages.len(), 2, "got: {text:?}");
    assert!(pages[0].contains("Hello page one"), "got: {text:?}");
    assert!(pages[1].contains("Hello page two"), "got: {text:?}");

    let meta = ex.metadata.unwrap();
    assert_eq!(meta["converter"], "pdfium");
    assert_eq!(meta["file_type"], ".pdf");
    assert_eq!(meta["page_count"], 2);
    assert_eq!(meta["title"], "Fixture");
    assert_eq!(meta["author"], "doc2txt tests");

    let leftovers: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}

#[tokio::test]
async fn extensionless_pdf_is_sniffed() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = extractor_in(tmp.path());
    pdf_skip_unless_pdfium!(extractor);

    let bytes = std::fs::read(fixture("two-pages.pdf")).unwrap();
    let ex = extractor
        .extract(&Document::new("scan", bytes))
        .await
        .unwrap();

    assert!(ex.text.unwrap().contains("Hello page two"));
    let meta = ex.metadata.unwrap();
    assert_eq!(meta["converter"], "pdfium");
    assert_eq!(meta["file_type"], "");
}

#[tokio::test]
async fn corrupt_pdf_is_an_extraction_error_without_leftovers() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = extractor_in(tmp.path());
    pdf_skip_unless_pdfium!(extractor);

    let err = extractor
        .extract(&Document::new("broken.pdf", b"%PDF-1.4\nnot really".to_vec()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to open PDF"), "got: {err}");

    let leftovers: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}
