//! Tests for the visit merge engine.

mod engine_tests;

use chrono::{DateTime, TimeZone, Utc};

use crate::app::models::LocationInfo;

/// Timestamp on 2024-03-01 at the given hour and minute
pub fn on_march_first(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
}

/// Timestamp on the given March 2024 day
pub fn on_march(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

pub fn test_location(identifier: &str) -> LocationInfo {
    LocationInfo {
        identifier: identifier.to_string(),
        unique_id: format!("uid-{identifier}"),
        name: format!("Gauge {identifier}"),
        utc_offset_hours: 0.0,
    }
}
