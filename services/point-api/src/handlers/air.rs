//! Nearest-point air quality queries.

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::Response,
};
use chrono::{Duration, Timelike};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use aq_common::{time, RiskCategory};
use forecast_engine::{LookupStatus, PointLookup};

use crate::response::{upcoming, v1_response, v2_response, OutOfBoundsResponse, SchemaVersion};
use crate::state::AppState;

use super::{aq_error_response, error_response, json_response};

/// Query parameters for the point endpoint.
#[derive(Debug, Deserialize)]
pub struct AirQueryParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Response schema version, `v1` or `v2` (default).
    pub schema: Option<String>,
}

/// GET /air?lat=..&lon=..[&schema=v1|v2]
pub async fn air_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<AirQueryParams>,
) -> Response {
    let (Some(lat), Some(lon)) = (params.lat, params.lon) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing required parameters: lat, lon",
        );
    };

    let version = match SchemaVersion::parse(params.schema.as_deref()) {
        Ok(v) => v,
        Err(e) => return aq_error_response(&e),
    };

    let grid = match state.live_grid.get().await {
        Ok(Some(grid)) => grid,
        Ok(None) => {
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Live grid has not been ingested yet",
            );
        }
        Err(e) => return aq_error_response(&e),
    };

    let lookup = match state.lookup.query(&grid, lat, lon) {
        Ok(lookup) => lookup,
        Err(e) => return aq_error_response(&e),
    };

    let PointLookup {
        status,
        record: Some(record),
        distance_km: Some(distance_km),
    } = lookup
    else {
        return json_response(StatusCode::OK, &OutOfBoundsResponse::new());
    };

    match version {
        SchemaVersion::V1 => json_response(
            StatusCode::OK,
            &v1_response(&record, distance_km, status, state.config.max_distance_km),
        ),
        SchemaVersion::V2 => {
            // The timeline block is best-effort: a missing or unreadable
            // summary degrades to an empty timeline, not a failed query.
            let timeline = match state.snapshots.read_timeline().await {
                Ok(Some(entries)) => upcoming(
                    &entries,
                    &record.timestamp,
                    state.config.default_timeline_hours,
                ),
                Ok(None) => Vec::new(),
                Err(e) => {
                    warn!(error = %e, "Timeline summary unavailable");
                    Vec::new()
                }
            };
            json_response(
                StatusCode::OK,
                &v2_response(&record, distance_km, status, timeline),
            )
        }
    }
}

/// Query parameters for the multi-hour timeline endpoint.
#[derive(Debug, Deserialize)]
pub struct TimelineQueryParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Number of forecast hours to fetch (clamped to the horizon).
    pub hours: Option<usize>,
}

#[derive(Debug, Serialize)]
struct TimelinePointHour {
    time: String,
    ias: i64,
    risk: RiskCategory,
    dominant: String,
    distance_km: f64,
}

#[derive(Debug, Serialize)]
struct TimelineResponse {
    status: LookupStatus,
    hours: Vec<TimelinePointHour>,
}

/// GET /air/timeline?lat=..&lon=..&hours=N
///
/// Fetches the next N forecast-hour snapshots concurrently through a
/// bounded pool sized to the horizon, re-sorts by hour (completion order is
/// not guaranteed), and resolves the nearest cell per hour. Missing hours
/// are skipped.
pub async fn timeline_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<TimelineQueryParams>,
) -> Response {
    let (Some(lat), Some(lon)) = (params.lat, params.lon) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing required parameters: lat, lon",
        );
    };

    if !state.lookup.bounds().contains(lat, lon) {
        return json_response(StatusCode::OK, &OutOfBoundsResponse::new());
    }

    let horizon = state.config.horizon_hours.max(1);
    let hours = params
        .hours
        .unwrap_or(state.config.default_timeline_hours)
        .clamp(1, horizon);

    // Upcoming whole hours in local time.
    let now = time::local_now();
    let base = match now.with_minute(0).and_then(|t| t.with_second(0)) {
        Some(base) => base,
        None => now,
    };
    let stamps: Vec<String> = (1..=hours as i64)
        .map(|i| time::snapshot_stamp(&(base + Duration::hours(i))))
        .collect();

    // Independent blocking reads fan out to a pool sized to the horizon.
    let fetched: Vec<(String, Option<Vec<aq_common::CellRecord>>)> = stream::iter(
        stamps.into_iter().map(|stamp| {
            let snapshots = state.snapshots.clone();
            async move {
                let result = snapshots.read_forecast_hour(&stamp).await;
                (stamp, result)
            }
        }),
    )
    .buffer_unordered(horizon)
    .map(|(stamp, result)| match result {
        Ok(records) => (stamp, records),
        Err(e) => {
            warn!(stamp = %stamp, error = %e, "Forecast hour unreadable, skipping");
            (stamp, None)
        }
    })
    .collect()
    .await;

    // Completion order is arbitrary; restore hour order before shaping.
    let mut fetched = fetched;
    fetched.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = Vec::with_capacity(fetched.len());
    let mut worst = LookupStatus::Success;
    for (stamp, records) in fetched {
        let Some(records) = records else { continue };
        match state.lookup.query(&records, lat, lon) {
            Ok(PointLookup {
                status,
                record: Some(record),
                distance_km: Some(distance_km),
            }) => {
                if status == LookupStatus::Warning {
                    worst = LookupStatus::Warning;
                }
                out.push(TimelinePointHour {
                    time: record.timestamp.clone(),
                    ias: record.ias,
                    risk: record.risk,
                    dominant: record.dominant.clone(),
                    distance_km: (distance_km * 100.0).round() / 100.0,
                });
            }
            Ok(_) => {}
            Err(e) => {
                warn!(stamp = %stamp, error = %e, "Lookup failed for hour, skipping");
            }
        }
    }

    json_response(
        StatusCode::OK,
        &TimelineResponse {
            status: worst,
            hours: out,
        },
    )
}
