//! Versioned response shaping for point queries.
//!
//! One nearest-point lookup feeds every consumer; the schema version picks
//! the wire shape. V1 is the compact bot payload, V2 the full payload with
//! air context, trend, and the upcoming timeline.

use serde::Serialize;

use aq_common::{AqError, AqResult, CellRecord, RiskCategory, TimelineEntry};
use forecast_engine::LookupStatus;

/// Wire-schema version selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    V1,
    V2,
}

impl SchemaVersion {
    /// Parse the `schema` query parameter; absent means the full schema.
    pub fn parse(raw: Option<&str>) -> AqResult<Self> {
        match raw {
            None => Ok(SchemaVersion::V2),
            Some("v1") => Ok(SchemaVersion::V1),
            Some("v2") => Ok(SchemaVersion::V2),
            Some(other) => Err(AqError::InvalidParameter {
                param: "schema".to_string(),
                message: format!("unknown schema version '{}'", other),
            }),
        }
    }
}

/// Quality label, map color, and short advisory for an IAS band.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AirContext {
    pub quality: &'static str,
    pub color: &'static str,
    pub advisory: &'static str,
}

/// IAS band → public-facing context.
pub fn air_context(ias: i64) -> AirContext {
    if ias <= 50 {
        AirContext {
            quality: "Good",
            color: "Green",
            advisory: "Enjoy the outdoors, conditions are ideal.",
        }
    } else if ias <= 100 {
        AirContext {
            quality: "Fair",
            color: "Yellow",
            advisory: "Acceptable, but sensitive groups should limit heavy exertion.",
        }
    } else if ias <= 150 {
        AirContext {
            quality: "Poor",
            color: "Orange",
            advisory: "Avoid outdoor activity; wear a mask if you go out.",
        }
    } else if ias <= 200 {
        AirContext {
            quality: "Very Poor",
            color: "Red",
            advisory: "Danger: stay indoors and keep windows closed.",
        }
    } else {
        AirContext {
            quality: "Hazardous",
            color: "Purple",
            advisory: "Health alert: avoid all outdoor exposure.",
        }
    }
}

/// Short-term IAS tendency against the next forecast hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Steady,
}

/// ±5 index points of deadband around "steady".
pub fn trend(current_ias: i64, next_ias: Option<f64>) -> Trend {
    match next_ias {
        Some(next) if next > current_ias as f64 + 5.0 => Trend::Rising,
        Some(next) if next < current_ias as f64 - 5.0 => Trend::Falling,
        _ => Trend::Steady,
    }
}

/// One upcoming hour in the response timeline.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineHour {
    /// Local clock time, `HH:MM`.
    pub time: String,
    pub ias: i64,
    pub risk: RiskCategory,
    pub dominant: String,
}

/// Timeline entries strictly after the record's own timestamp, capped at
/// `n`. The display-timestamp format sorts lexicographically, so a plain
/// string comparison picks the future.
pub fn upcoming(timeline: &[TimelineEntry], current_ts: &str, n: usize) -> Vec<TimelineHour> {
    timeline
        .iter()
        .filter(|e| e.timestamp.as_str() > current_ts)
        .take(n)
        .map(|e| TimelineHour {
            time: clock_time(&e.timestamp),
            ias: e.ias_mean.round() as i64,
            risk: e.risk,
            dominant: e.dominant.clone(),
        })
        .collect()
}

/// `YYYY-MM-DD HH:MM` → `HH:MM`.
fn clock_time(display_ts: &str) -> String {
    display_ts
        .get(11..16)
        .map(|s| s.to_string())
        .unwrap_or_else(|| display_ts.to_string())
}

/// Out-of-coverage result: a normal structured response, not an error.
#[derive(Debug, Serialize)]
pub struct OutOfBoundsResponse {
    pub status: LookupStatus,
    pub message: &'static str,
}

impl OutOfBoundsResponse {
    pub fn new() -> Self {
        Self {
            status: LookupStatus::OutOfBounds,
            message: "Outside the coverage area",
        }
    }
}

impl Default for OutOfBoundsResponse {
    fn default() -> Self {
        Self::new()
    }
}

// ---- V1: compact bot schema ----

#[derive(Debug, Serialize)]
pub struct V1Location {
    pub distance_km: f64,
    pub zone: String,
}

#[derive(Debug, Serialize)]
pub struct V1Air {
    pub ias: i64,
    pub risk: RiskCategory,
    pub dominant: String,
    pub o3: f64,
    pub pm10: f64,
    pub pm25: f64,
}

#[derive(Debug, Serialize)]
pub struct V1Weather {
    pub tmp: f64,
    pub rh: i64,
    pub wsp: f64,
    pub altitude: i64,
}

#[derive(Debug, Serialize)]
pub struct PointResponseV1 {
    pub status: LookupStatus,
    pub system_note: String,
    pub location: V1Location,
    pub air: V1Air,
    pub weather: V1Weather,
    pub timestamp: String,
}

/// Shape the compact V1 payload from one lookup hit.
pub fn v1_response(
    record: &CellRecord,
    distance_km: f64,
    status: LookupStatus,
    max_distance_km: f64,
) -> PointResponseV1 {
    let system_note = match status {
        LookupStatus::Warning => format!(
            "Beyond official coverage (>{:.0} km)",
            max_distance_km
        ),
        _ => "Coverage OK".to_string(),
    };

    PointResponseV1 {
        status,
        system_note,
        location: V1Location {
            distance_km: round2(distance_km),
            zone: zone_name(record),
        },
        air: V1Air {
            ias: record.ias,
            risk: record.risk,
            dominant: record.dominant.clone(),
            o3: round1(record.o3.unwrap_or(0.0)),
            pm10: round1(record.pm10.unwrap_or(0.0)),
            pm25: round1(record.pm25.unwrap_or(0.0)),
        },
        weather: V1Weather {
            tmp: round1(record.tmp),
            rh: record.rh.round() as i64,
            wsp: round1(record.wsp),
            altitude: record.altitude.round() as i64,
        },
        timestamp: record.timestamp.clone(),
    }
}

// ---- V2: full schema with context, trend, and timeline ----

#[derive(Debug, Serialize)]
pub struct V2Location {
    pub distance_km: f64,
    pub zone: String,
    pub mun: String,
    pub edo: String,
}

#[derive(Debug, Serialize)]
pub struct Concentrations {
    pub o3: f64,
    pub pm10: f64,
    pub pm25: f64,
    pub so2: f64,
    pub co: f64,
}

#[derive(Debug, Serialize)]
pub struct V2Air {
    pub ias: i64,
    pub quality: &'static str,
    pub color: &'static str,
    pub trend: Trend,
    pub advisory: &'static str,
    pub dominant: String,
    pub concentrations: Concentrations,
}

#[derive(Debug, Serialize)]
pub struct V2Weather {
    pub tmp: f64,
    pub rh: f64,
    pub wsp: f64,
}

#[derive(Debug, Serialize)]
pub struct PointResponseV2 {
    pub status: LookupStatus,
    pub origin: &'static str,
    pub ts: String,
    pub location: V2Location,
    pub air: V2Air,
    pub weather: V2Weather,
    pub timeline: Vec<TimelineHour>,
}

/// Shape the full V2 payload from one lookup hit plus the city timeline.
pub fn v2_response(
    record: &CellRecord,
    distance_km: f64,
    status: LookupStatus,
    timeline: Vec<TimelineHour>,
) -> PointResponseV2 {
    let context = air_context(record.ias);
    let next_ias = timeline.first().map(|h| h.ias as f64);

    PointResponseV2 {
        status,
        origin: "live",
        ts: record.timestamp.clone(),
        location: V2Location {
            distance_km: round2(distance_km),
            zone: zone_name(record),
            mun: record.mun.clone(),
            edo: record.edo.clone(),
        },
        air: V2Air {
            ias: record.ias,
            quality: context.quality,
            color: context.color,
            trend: trend(record.ias, next_ias),
            advisory: context.advisory,
            dominant: record.dominant.clone(),
            concentrations: Concentrations {
                o3: round1(record.o3.unwrap_or(0.0)),
                pm10: round1(record.pm10.unwrap_or(0.0)),
                pm25: round1(record.pm25.unwrap_or(0.0)),
                so2: round1(record.so2.unwrap_or(0.0)),
                co: round2(record.co.unwrap_or(0.0)),
            },
        },
        weather: V2Weather {
            tmp: round1(record.tmp),
            rh: round1(record.rh),
            wsp: round1(record.wsp),
        },
        timeline,
    }
}

fn zone_name(record: &CellRecord) -> String {
    record
        .station
        .clone()
        .unwrap_or_else(|| "Model interpolation".to_string())
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::record_at;

    #[test]
    fn test_air_context_bands() {
        assert_eq!(air_context(50).quality, "Good");
        assert_eq!(air_context(51).quality, "Fair");
        assert_eq!(air_context(150).color, "Orange");
        assert_eq!(air_context(300).quality, "Hazardous");
    }

    #[test]
    fn test_trend_deadband() {
        assert_eq!(trend(100, Some(103.0)), Trend::Steady);
        assert_eq!(trend(100, Some(106.0)), Trend::Rising);
        assert_eq!(trend(100, Some(94.0)), Trend::Falling);
        assert_eq!(trend(100, None), Trend::Steady);
    }

    #[test]
    fn test_schema_version_parse() {
        assert_eq!(SchemaVersion::parse(None).unwrap(), SchemaVersion::V2);
        assert_eq!(SchemaVersion::parse(Some("v1")).unwrap(), SchemaVersion::V1);
        assert!(SchemaVersion::parse(Some("v3")).is_err());
    }

    #[test]
    fn test_upcoming_filters_past_hours() {
        let timeline = vec![
            entry("2025-03-14 09:00", 40.0),
            entry("2025-03-14 10:00", 55.0),
            entry("2025-03-14 11:00", 60.0),
            entry("2025-03-14 12:00", 65.0),
        ];
        let hours = upcoming(&timeline, "2025-03-14 10:00", 2);
        assert_eq!(hours.len(), 2);
        assert_eq!(hours[0].time, "11:00");
        assert_eq!(hours[0].ias, 60);
        assert_eq!(hours[1].time, "12:00");
    }

    #[test]
    fn test_v1_shape() {
        let record = record_at(19.4, -99.1);
        let resp = v1_response(&record, 0.234, LookupStatus::Success, 10.0);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["location"]["distance_km"], 0.23);
        assert_eq!(json["location"]["zone"], "Model interpolation");
        assert_eq!(json["air"]["o3"], 40.0);
    }

    #[test]
    fn test_v1_warning_note_mentions_radius() {
        let record = record_at(19.4, -99.1);
        let resp = v1_response(&record, 52.0, LookupStatus::Warning, 10.0);
        assert!(resp.system_note.contains("10 km"));
    }

    #[test]
    fn test_v2_shape_with_trend() {
        let mut record = record_at(19.4, -99.1);
        record.ias = 48;
        let timeline = vec![TimelineHour {
            time: "11:00".to_string(),
            ias: 80,
            risk: aq_common::RiskCategory::Moderate,
            dominant: "O3".to_string(),
        }];
        let resp = v2_response(&record, 1.2, LookupStatus::Success, timeline);
        assert_eq!(resp.air.trend, Trend::Rising);
        assert_eq!(resp.air.quality, "Good");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["air"]["trend"], "rising");
        assert_eq!(json["timeline"][0]["ias"], 80);
    }

    fn entry(ts: &str, ias: f64) -> TimelineEntry {
        TimelineEntry {
            timestamp: ts.to_string(),
            ias_mean: ias,
            risk: aq_common::index::risk_category(ias),
            dominant: "O3".to_string(),
        }
    }
}
