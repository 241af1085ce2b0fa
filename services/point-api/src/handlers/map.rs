//! Full-grid export and raw snapshot passthrough.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
};
use std::sync::Arc;

use aq_common::time;

use crate::state::AppState;

use super::{aq_error_response, error_response, json_response};

/// GET /map — the entire cached live grid, unmodified, for map renderers.
pub async fn map_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    match state.live_grid.get().await {
        Ok(Some(grid)) => json_response(StatusCode::OK, grid.as_ref()),
        Ok(None) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Live grid has not been ingested yet",
        ),
        Err(e) => aq_error_response(&e),
    }
}

/// GET /forecast/:timestamp — raw forecast snapshot by its hour stamp.
pub async fn forecast_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(timestamp): Path<String>,
) -> Response {
    if let Err(e) = time::parse_stamp(&timestamp) {
        return aq_error_response(&e);
    }

    match state.snapshots.read_forecast_hour(&timestamp).await {
        Ok(Some(records)) => json_response(StatusCode::OK, &records),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Forecast snapshot not found"),
        Err(e) => aq_error_response(&e),
    }
}

/// GET /history/:timestamp — realized history grid by its ingestion stamp.
pub async fn history_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(timestamp): Path<String>,
) -> Response {
    if let Err(e) = time::parse_stamp(&timestamp) {
        return aq_error_response(&e);
    }

    match state.snapshots.read_history(&timestamp).await {
        Ok(Some(records)) => json_response(StatusCode::OK, &records),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "History grid not found"),
        Err(e) => aq_error_response(&e),
    }
}
