// HTTP route handlers for the runcell API

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use runcell_common::types::{ApiResponse, ExecutionData};
use runcell_common::{ExecutionRequest, Language};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::metrics;
use crate::AppState;

/// POST /execute - Run a submission and report its output
///
/// Program failures (compile, runtime, timeout) are 200 responses with
/// `data.error = true`; malformed requests and unknown languages are 400s.
pub async fn execute_code(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExecutionRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ExecutionData>>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        metrics::record_rejected("malformed_body");
        ApiError::bad_request(rejection.body_text())
    })?;

    // Unknown names share one label to keep metric cardinality bounded
    let language = Language::parse(&request.language)
        .map(|lang| lang.as_str())
        .unwrap_or("unknown");

    let _in_flight = metrics::InFlight::start();
    match state.executor.execute(&request).await {
        Ok(outcome) => {
            let label = if outcome.succeeded {
                "success"
            } else {
                outcome.failure_stage.as_str()
            };
            metrics::record_execution(language, label, outcome.elapsed_ms as f64);
            info!(
                language = language,
                outcome = label,
                elapsed_ms = outcome.elapsed_ms,
                "✓ Execution complete"
            );
            Ok(Json(ApiResponse::from(&outcome)))
        }
        Err(e) if e.is_client_error() => {
            metrics::record_rejected(e.reason());
            info!(reason = e.reason(), "Request rejected: {}", e);
            Err(e.into())
        }
        Err(e) => {
            metrics::record_execution(language, e.failure_stage().as_str(), 0.0);
            warn!(language = language, "✗ {}", e);
            Err(e.into())
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LanguageInfo {
    pub language: Language,
    pub compiled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,
    pub runner: String,
}

/// GET /languages - Toolchains this instance can run
pub async fn list_languages(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let languages: Vec<LanguageInfo> = state
        .executor
        .registry()
        .iter()
        .map(|spec| LanguageInfo {
            language: spec.language,
            compiled: spec.is_compiled(),
            compiler: spec
                .compile
                .as_ref()
                .and_then(|stage| stage.program())
                .map(str::to_string),
            runner: spec
                .run
                .program()
                .map(str::to_string)
                .or_else(|| spec.binary_file.clone())
                .unwrap_or_default(),
        })
        .collect();

    Json(ApiResponse::new(200, languages, "Supported languages"))
}

/// GET /metrics - Prometheus scrape endpoint
pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}

/// GET /health - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
