//! Combined availability report for both extractors.
//!
//! Both probes run concurrently and each is reduced to a status string, so a
//! hung Tika server can delay the report by at most its probe timeout and
//! never hides the local extractor's state.

use crate::extractor::{Extractor, ExtractorKind};
use crate::pipeline::Pipeline;
use crate::SERVICE_NAME;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Status string for a healthy extractor.
pub const AVAILABLE: &str = "available";

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `"healthy"`: the backend itself answered.
    pub status: String,
    pub service: String,
    /// `"available"` or `"error (…)"`.
    pub tika_server: String,
    /// `"available"` or `"error (…)"`.
    pub markitdown: String,
}

/// Probes the extractors of a [`Pipeline`].
#[derive(Clone)]
pub struct HealthReporter {
    tika: Arc<dyn Extractor>,
    local: Arc<dyn Extractor>,
}

impl HealthReporter {
    pub fn new(pipeline: &Pipeline) -> Self {
        Self {
            tika: pipeline.extractor(ExtractorKind::Tika).clone(),
            local: pipeline.extractor(ExtractorKind::Local).clone(),
        }
    }

    /// Probe both extractors. Never fails.
    pub async fn check(&self) -> HealthStatus {
        let (tika, local) = tokio::join!(probe_status(&*self.tika), probe_status(&*self.local));
        debug!("Health: tika={}, local={}", tika, local);

        HealthStatus {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
            tika_server: tika,
            markitdown: local,
        }
    }
}

async fn probe_status(extractor: &dyn Extractor) -> String {
    match extractor.probe().await {
        Ok(()) => AVAILABLE.to_string(),
        Err(detail) => {
            warn!("{} probe failed: {}", extractor.kind(), detail);
            format!("error ({detail})")
        }
    }
}
