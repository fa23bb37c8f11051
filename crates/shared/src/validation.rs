//! Common validation utilities.

use chrono::NaiveDate;
use validator::ValidationError;

/// Format accepted by the GPS points endpoint for its `date` parameter.
pub const GPS_DATE_FORMAT: &str = "%Y-%m-%d";

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates that a display name or identifier is not just whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates GeoJSON polygon rings stored as `[longitude, latitude]` pairs.
///
/// Only the first ring is used by the console, so it must contain at least
/// one point. Vertex values are left to the backend.
pub fn validate_rings(rings: &[Vec<[f64; 2]>]) -> Result<(), ValidationError> {
    match rings.first() {
        Some(ring) if !ring.is_empty() => Ok(()),
        _ => {
            let mut err = ValidationError::new("empty_ring");
            err.message = Some("Polygon must contain at least one point".into());
            Err(err)
        }
    }
}

/// Validates a `YYYY-MM-DD` date used to query GPS points.
pub fn validate_gps_date(date: &str) -> Result<(), ValidationError> {
    match NaiveDate::parse_from_str(date, GPS_DATE_FORMAT) {
        Ok(_) => Ok(()),
        Err(_) => {
            let mut err = ValidationError::new("date_format");
            err.message = Some("Date must use the YYYY-MM-DD format".into());
            Err(err)
        }
    }
}
