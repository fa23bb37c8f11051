//! GPS point domain model.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;
use validator::Validate;

/// A single position report of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GpsPoint {
    pub device_id: String,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[serde(deserialize_with = "flexible_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Envelope returned by `GET /api/gpspoints`. Records that do not decode
/// are dropped instead of failing the whole response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GpsPointsResponse {
    #[serde(default, deserialize_with = "lenient_points")]
    pub data: Vec<GpsPoint>,
}

/// Query parameters for `GET /api/gpspoints`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct GpsPointsQuery {
    #[validate(custom(function = "shared::validation::validate_gps_date"))]
    pub date: String,

    #[validate(range(min = 1, max = 10000, message = "Limit must be between 1 and 10000"))]
    pub limit: u32,
}

/// Accepts RFC 3339 timestamps as well as naive `YYYY-MM-DD[T ]HH:MM:SS[.f]`
/// values, which are taken as UTC.
fn flexible_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("unrecognized timestamp: {}", raw))
    })
}

fn lenient_points<'de, D>(deserializer: D) -> Result<Vec<GpsPoint>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    let total = raw.len();

    let points: Vec<GpsPoint> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<GpsPoint>(value) {
            Ok(point) => Some(point),
            Err(e) => {
                debug!(index, error = %e, "Skipping undecodable GPS point");
                None
            }
        })
        .collect();

    if points.len() < total {
        debug!(kept = points.len(), total, "Dropped GPS points from response");
    }
    Ok(points)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
