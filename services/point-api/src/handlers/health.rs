//! Liveness endpoint with cache counters.

use axum::{extract::Extension, http::StatusCode, response::Response};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

use super::json_response;

#[derive(Serialize)]
struct CacheStats {
    hits: u64,
    misses: u64,
    refreshes: u64,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    live_grid_cache: CacheStats,
}

/// GET /health
pub async fn health_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let (hits, misses, refreshes) = state.live_grid.stats().snapshot();
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "ok",
            live_grid_cache: CacheStats {
                hits,
                misses,
                refreshes,
            },
        },
    )
}
