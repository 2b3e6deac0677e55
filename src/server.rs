//! HTTP surface (actix-web).
//!
//! | Route | Handler |
//! |-------|---------|
//! | `POST /process` | [`Pipeline::process`] |
//! | `GET /health`   | [`HealthReporter::check`] |
//! | `GET /test`     | static liveness answer |
//!
//! Every failure leaves as `{"detail": "<message>"}`: `400` for client input
//! (bad base64, malformed JSON, empty filename), `413` for oversized bodies
//! and `500` for extractor failures.

use crate::config::ServiceConfig;
use crate::error::Doc2TxtError;
use crate::health::{HealthReporter, HealthStatus};
use crate::pipeline::{Pipeline, ProcessRequest, ProcessResponse};
use crate::SERVICE_NAME;
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::StatusCode;
use actix_web::{get, middleware, post, web, App, HttpResponse, HttpServer, ResponseError};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Error body shared by every failing route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Body of `GET /test`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResponse {
    pub status: String,
    pub message: String,
    pub service: String,
    pub tika_server: String,
}

/// Shared, read-only state handed to every worker.
pub struct AppState {
    pipeline: Pipeline,
    health: HealthReporter,
    tika_endpoint: String,
}

impl AppState {
    pub fn new(pipeline: Pipeline, tika_endpoint: impl Into<String>) -> Self {
        let reporter = HealthReporter::new(&pipeline);
        Self {
            pipeline,
            health: reporter,
            tika_endpoint: tika_endpoint.into(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, Doc2TxtError> {
        Ok(Self::new(Pipeline::from_config(config)?, config.tika_endpoint.clone()))
    }
}

impl ResponseError for Doc2TxtError {
    fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            detail: self.to_string(),
        })
    }
}

#[post("/process")]
async fn process(
    state: web::Data<AppState>,
    body: web::Json<ProcessRequest>,
) -> Result<web::Json<ProcessResponse>, Doc2TxtError> {
    let request = body.into_inner();
    let filename = request.filename.clone();

    match state.pipeline.process(request).await {
        Ok(response) => Ok(web::Json(response)),
        Err(e) if e.is_client_error() => {
            warn!("Rejected request for '{}': {}", filename, e);
            Err(e)
        }
        Err(e) => {
            error!("Error processing document '{}': {:?}", filename, e);
            Err(e)
        }
    }
}

#[get("/health")]
async fn health_check(state: web::Data<AppState>) -> web::Json<HealthStatus> {
    web::Json(state.health.check().await)
}

#[get("/test")]
async fn test_endpoint(state: web::Data<AppState>) -> web::Json<TestResponse> {
    web::Json(TestResponse {
        status: "ok".to_string(),
        message: "Test endpoint is working!".to_string(),
        service: SERVICE_NAME.to_string(),
        tika_server: state.tika_endpoint.clone(),
    })
}

/// Register every route on an actix app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(process)
        .service(health_check)
        .service(test_endpoint);
}

/// JSON extractor settings: body limit and `{detail}` error bodies.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            let status = match &err {
                JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
                    StatusCode::PAYLOAD_TOO_LARGE
                }
                _ => StatusCode::BAD_REQUEST,
            };
            let detail = format!("Invalid request body: {err}");
            warn!("{}", detail);
            InternalError::from_response(err, HttpResponse::build(status).json(ErrorBody { detail }))
                .into()
        })
}

/// Bind and run the HTTP server until it is shut down.
pub async fn run(config: ServiceConfig) -> Result<(), Doc2TxtError> {
    let state = web::Data::new(AppState::from_config(&config)?);
    let addr = config.bind_addr();
    let limit = config.max_body_bytes;

    info!("Using Tika server at: {}", config.tika_endpoint);
    info!("Listening on {}", addr);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(json_config(limit))
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(&addr)
    .map_err(|e| Doc2TxtError::Internal(format!("Failed to bind {addr}: {e}")))?;

    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }

    server
        .run()
        .await
        .map_err(|e| Doc2TxtError::Internal(format!("Server error: {e}")))
}
