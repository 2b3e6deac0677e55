//! The request pipeline: decode → route → extract → normalise.
//!
//! ```text
//! ProcessRequest ──▶ decode ──▶ route ──▶ extractor ──▶ normalise ──▶ ProcessResponse
//!   (base64)        (bytes)   (flag)    (tika|local)   (defaults)
//! ```
//!
//! 1. [`decode`] — base64 text to bytes; failures are client errors
//! 2. routing — `use_markitdown` picks the local extractor, otherwise Tika
//! 3. extraction — delegated to an [`Extractor`]; failures are server errors
//! 4. normalisation — absent text becomes `""`, absent metadata `{}`
//!
//! The pipeline holds no per-request state, so one instance is shared by
//! every HTTP worker.

pub mod decode;

use crate::config::ServiceConfig;
use crate::error::Doc2TxtError;
use crate::extractor::{Document, Extractor, ExtractorKind, LocalExtractor, Metadata, TikaExtractor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Body of `POST /process`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    /// Original filename; its extension is a format hint.
    pub filename: String,
    /// File content, base64-encoded.
    pub file: String,
    /// Route to the local extractor instead of Tika.
    #[serde(default)]
    pub use_markitdown: bool,
}

impl ProcessRequest {
    /// Build a request from raw bytes, encoding them the way the HTTP API
    /// expects.
    pub fn from_bytes(filename: impl Into<String>, bytes: &[u8], use_markitdown: bool) -> Self {
        Self {
            filename: filename.into(),
            file: decode::encode_payload(bytes),
            use_markitdown,
        }
    }
}

/// Successful `POST /process` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponse {
    /// Always `true`; failures never produce this type.
    pub status: bool,
    pub text: String,
    pub metadata: Metadata,
    pub filename: String,
    pub parser_used: ExtractorKind,
}

/// Routes decoded documents to one of two extractors.
#[derive(Clone)]
pub struct Pipeline {
    tika: Arc<dyn Extractor>,
    local: Arc<dyn Extractor>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("tika", &"<dyn Extractor>")
            .field("local", &"<dyn Extractor>")
            .finish()
    }
}

impl Pipeline {
    /// Build a pipeline from explicit extractors. Tests use this to plug in
    /// stubs.
    pub fn new(tika: Arc<dyn Extractor>, local: Arc<dyn Extractor>) -> Self {
        Self { tika, local }
    }

    /// Build the production pipeline: a [`TikaExtractor`] and a
    /// [`LocalExtractor`] configured from `config`.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, Doc2TxtError> {
        Ok(Self::new(
            Arc::new(TikaExtractor::from_config(config)?),
            Arc::new(LocalExtractor::from_config(config)),
        ))
    }

    /// The extractor that serves `kind`.
    pub fn extractor(&self, kind: ExtractorKind) -> &Arc<dyn Extractor> {
        match kind {
            ExtractorKind::Tika => &self.tika,
            ExtractorKind::Local => &self.local,
        }
    }

    /// Run one request through the pipeline.
    pub async fn process(&self, request: ProcessRequest) -> Result<ProcessResponse, Doc2TxtError> {
        let start = Instant::now();
        let ProcessRequest {
            filename,
            file,
            use_markitdown,
        } = request;

        if filename.trim().is_empty() {
            return Err(Doc2TxtError::InvalidRequest("filename must not be empty".into()));
        }

        // ── Step 1: Decode ───────────────────────────────────────────────
        let bytes = decode::decode_payload(&file)?;
        drop(file);

        // ── Step 2: Route ────────────────────────────────────────────────
        let kind = if use_markitdown {
            ExtractorKind::Local
        } else {
            ExtractorKind::Tika
        };
        let extractor = self.extractor(kind);
        info!(
            "Processing '{}' ({} bytes) with {}",
            filename,
            bytes.len(),
            extractor.kind()
        );

        // ── Step 3: Extract ──────────────────────────────────────────────
        let document = Document::new(filename, bytes);
        let extraction = extractor.extract(&document).await?;

        // ── Step 4: Normalise ────────────────────────────────────────────
        let text = extraction.text.unwrap_or_default();
        let metadata = extraction.metadata.unwrap_or_default();

        info!(
            "Extracted {} chars from '{}' with {} in {}ms",
            text.chars().count(),
            document.filename,
            kind,
            start.elapsed().as_millis()
        );

        Ok(ProcessResponse {
            status: true,
            text,
            metadata,
            filename: document.filename,
            parser_used: kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Extraction;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Records every document it sees and replies with a canned result.
    struct Recording {
        kind: ExtractorKind,
        reply: Result<Extraction, String>,
        seen: Mutex<Vec<Document>>,
    }

    impl Recording {
        fn new(kind: ExtractorKind, reply: Result<Extraction, String>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Extractor for Recording {
        fn kind(&self) -> ExtractorKind {
            self.kind
        }

        async fn extract(&self, document: &Document) -> Result<Extraction, Doc2TxtError> {
            self.seen.lock().unwrap().push(document.clone());
            self.reply
                .clone()
                .map_err(|m| Doc2TxtError::extraction(self.kind, m))
        }

        async fn probe(&self) -> Result<(), String> {
            Ok(())
        }
    }

    fn echo() -> Result<Extraction, String> {
        Ok(Extraction {
            text: Some("hello".into()),
            metadata: None,
        })
    }

    #[tokio::test]
    async fn routes_on_flag() {
        let tika = Recording::new(ExtractorKind::Tika, echo());
        let local = Recording::new(ExtractorKind::Local, echo());
        let pipeline = Pipeline::new(tika.clone(), local.clone());

        let r = pipeline
            .process(ProcessRequest::from_bytes("a.txt", b"hello", false))
            .await
            .unwrap();
        assert_eq!(r.parser_used, ExtractorKind::Tika);
        assert_eq!((tika.calls(), local.calls()), (1, 0));

        let r = pipeline
            .process(ProcessRequest::from_bytes("a.txt", b"hello", true))
            .await
            .unwrap();
        assert_eq!(r.parser_used, ExtractorKind::Local);
        assert_eq!((tika.calls(), local.calls()), (1, 1));
    }

    #[tokio::test]
    async fn extractor_receives_decoded_bytes_and_filename() {
        let tika = Recording::new(ExtractorKind::Tika, echo());
        let pipeline = Pipeline::new(tika.clone(), Recording::new(ExtractorKind::Local, echo()));

        pipeline
            .process(ProcessRequest::from_bytes("report.pdf", b"%PDF-1.7", false))
            .await
            .unwrap();

        let seen = tika.seen.lock().unwrap();
        assert_eq!(seen[0].filename, "report.pdf");
        assert_eq!(seen[0].bytes, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn absent_fields_are_normalised() {
        let tika = Recording::new(ExtractorKind::Tika, Ok(Extraction::default()));
        let pipeline = Pipeline::new(tika, Recording::new(ExtractorKind::Local, echo()));

        let r = pipeline
            .process(ProcessRequest::from_bytes("empty.txt", b"", false))
            .await
            .unwrap();
        assert!(r.status);
        assert_eq!(r.text, "");
        assert!(r.metadata.is_empty());
        assert_eq!(r.filename, "empty.txt");
    }

    #[tokio::test]
    async fn bad_base64_never_reaches_an_extractor() {
        let tika = Recording::new(ExtractorKind::Tika, echo());
        let local = Recording::new(ExtractorKind::Local, echo());
        let pipeline = Pipeline::new(tika.clone(), local.clone());

        let err = pipeline
            .process(ProcessRequest {
                filename: "a.txt".into(),
                file: "not-base64!!".into(),
                use_markitdown: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Doc2TxtError::Decode { .. }));
        assert_eq!((tika.calls(), local.calls()), (0, 0));
    }

    /// Counts WARN events seen by the thread-local subscriber.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn rejected_payload_is_left_to_the_caller_to_log() {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let pipeline = Pipeline::new(
            Recording::new(ExtractorKind::Tika, echo()),
            Recording::new(ExtractorKind::Local, echo()),
        );
        let err = pipeline
            .process(ProcessRequest {
                filename: "a.txt".into(),
                file: "%%%".into(),
                use_markitdown: false,
            })
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(warnings.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn extractor_slots_report_their_kind() {
        let pipeline = Pipeline::new(
            Recording::new(ExtractorKind::Tika, echo()),
            Recording::new(ExtractorKind::Local, echo()),
        );
        for kind in [ExtractorKind::Tika, ExtractorKind::Local] {
            assert_eq!(pipeline.extractor(kind).kind(), kind);
        }
    }

    #[tokio::test]
    async fn empty_filename_is_rejected() {
        let pipeline = Pipeline::new(
            Recording::new(ExtractorKind::Tika, echo()),
            Recording::new(ExtractorKind::Local, echo()),
        );
        let err = pipeline
            .process(ProcessRequest::from_bytes("  ", b"x", false))
            .await
            .unwrap_err();
        assert!(matches!(err, Doc2TxtError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn extractor_failure_is_propagated() {
        let tika = Recording::new(ExtractorKind::Tika, Err("Error during Tika parsing: HTTP 422".into()));
        let pipeline = Pipeline::new(tika, Recording::new(ExtractorKind::Local, echo()));

        let err = pipeline
            .process(ProcessRequest::from_bytes("a.doc", b"junk", false))
            .await
            .unwrap_err();
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "Error during Tika parsing: HTTP 422");
    }

    #[test]
    fn request_flag_defaults_to_false() {
        let req: ProcessRequest = serde_json::from_str(r#"{"filename":"a","file":""}"#).unwrap();
        assert!(!req.use_markitdown);
    }
}
