// Route definitions for the runcell API

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/execute", post(handlers::execute_code))
        .route("/languages", get(handlers::list_languages))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/health", get(handlers::health_check))
}
