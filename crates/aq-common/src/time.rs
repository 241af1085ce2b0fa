//! Local-time handling for snapshot keys.
//!
//! All persisted snapshots are keyed by Valle de México local time (fixed
//! UTC−6; the zone abolished DST in 2022), formatted `%Y-%m-%d_%H-%M`.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{AqError, AqResult};

/// Fixed UTC−6 offset for the metropolitan domain.
pub fn local_offset() -> FixedOffset {
    FixedOffset::west_opt(6 * 3600).expect("static offset is valid")
}

/// Convert a UTC instant into domain-local time.
pub fn to_local(utc: DateTime<Utc>) -> DateTime<FixedOffset> {
    utc.with_timezone(&local_offset())
}

/// Format a local instant as a snapshot key stamp: `2025-03-14_16-00`.
pub fn snapshot_stamp(local: &NaiveDateTime) -> String {
    local.format("%Y-%m-%d_%H-%M").to_string()
}

/// Build a stamp for a local date at a given hour and minute.
pub fn stamp_for(date: NaiveDate, hour: u32, minute: u32) -> AqResult<String> {
    let dt = date
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| AqError::InvalidParameter {
            param: "hour/minute".to_string(),
            message: format!("{}:{} is not a valid time of day", hour, minute),
        })?;
    Ok(snapshot_stamp(&dt))
}

/// Parse a snapshot stamp back to a naive local datetime.
pub fn parse_stamp(stamp: &str) -> AqResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d_%H-%M").map_err(|_| AqError::InvalidParameter {
        param: "timestamp".to_string(),
        message: format!("'{}' does not match %Y-%m-%d_%H-%M", stamp),
    })
}

/// Human-readable record timestamp: `2025-03-14 16:00`.
pub fn display_timestamp(local: &NaiveDateTime) -> String {
    local.format("%Y-%m-%d %H:%M").to_string()
}

/// Parse an ISO hourly instant as emitted by the weather feed
/// (`2025-03-14T16:00`, already in local time).
pub fn parse_feed_time(s: &str) -> AqResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").map_err(|_| {
        AqError::WeatherFeed(format!("unparseable hourly time '{}' in feed response", s))
    })
}

/// Current local wall-clock time, derived from UTC.
pub fn local_now() -> NaiveDateTime {
    to_local(Utc::now()).naive_local()
}

/// Interpret a naive local datetime as a UTC instant (for metadata fields).
pub fn local_to_utc(local: &NaiveDateTime) -> DateTime<Utc> {
    match local_offset().from_local_datetime(local) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        // Fixed offsets never produce ambiguous or missing local times.
        _ => Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_stamp_round_trip() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let stamp = stamp_for(date, 16, 0).unwrap();
        assert_eq!(stamp, "2025-03-14_16-00");

        let parsed = parse_stamp(&stamp).unwrap();
        assert_eq!(parsed.format("%H").to_string(), "16");
    }

    #[test]
    fn test_display_timestamp() {
        let dt = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(display_timestamp(&dt), "2025-03-14 09:00");
    }

    #[test]
    fn test_parse_feed_time() {
        let dt = parse_feed_time("2025-03-14T07:00").unwrap();
        assert_eq!(display_timestamp(&dt), "2025-03-14 07:00");
        assert!(parse_feed_time("not-a-time").is_err());
    }

    #[test]
    fn test_local_offset_is_utc_minus_6() {
        let utc = Utc.with_ymd_and_hms(2025, 3, 14, 18, 0, 0).unwrap();
        let local = to_local(utc);
        assert_eq!(local.naive_local().format("%H").to_string(), "12");
    }

    #[test]
    fn test_invalid_stamp_rejected() {
        assert!(parse_stamp("2025-03-14 16:00").is_err());
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert!(stamp_for(date, 25, 0).is_err());
    }
}
