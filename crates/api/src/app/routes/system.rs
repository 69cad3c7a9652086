use axum::{routing::get, Router};
use serde_json::json;

use crate::app::dto;

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// GET /health - liveness probe, public.
pub async fn health() -> axum::response::Response {
    dto::ok("ok", json!({ "status": "ok" }))
}
