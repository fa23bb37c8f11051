//! Polygon-to-device assignment domain model.
//!
//! An assignment binds one node to one geofence. It carries an active flag
//! and the half-hour slot at which an activation change should be applied.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use validator::Validate;

/// Errors raised when decoding activation hours and action codes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Activation hour must be between 0 and 48, got {0}")]
    HourOutOfRange(i64),

    #[error("Invalid activation hour: {0}")]
    InvalidHour(String),

    #[error("Unknown assignment action code: {0}")]
    UnknownAction(u8),

    #[error("Invalid assignment action: {0}")]
    InvalidAction(String),
}

/// Scheduled activation time encoded as a half-hour slot.
///
/// Values `0..48` are slots of the day (`hour = i / 2`, `minute = (i % 2) * 30`).
/// The value `48` means the change is applied immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ActivationHour(u8);

impl ActivationHour {
    /// Number of half-hour slots in a day.
    pub const SLOTS: u8 = 48;

    /// First slot of the day, also sent when the hour is irrelevant.
    pub const MIDNIGHT: Self = Self(0);

    /// Sentinel meaning "apply now".
    pub const IMMEDIATE: Self = Self(Self::SLOTS);

    pub fn new(value: u8) -> Result<Self, EncodingError> {
        if value <= Self::SLOTS {
            Ok(Self(value))
        } else {
            Err(EncodingError::HourOutOfRange(i64::from(value)))
        }
    }

    /// Every encodable value, in selector order (49 values).
    pub fn all() -> impl Iterator<Item = Self> {
        (0..=Self::SLOTS).map(Self)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_immediate(self) -> bool {
        self.0 == Self::SLOTS
    }

    /// `(hour, minute)` of the slot, or `None` for the immediate sentinel.
    pub fn time_of_day(self) -> Option<(u8, u8)> {
        if self.is_immediate() {
            None
        } else {
            Some((self.0 / 2, (self.0 % 2) * 30))
        }
    }

    /// Human readable label: `HH:MM` or `Immediate`.
    pub fn label(self) -> String {
        match self.time_of_day() {
            Some((hour, minute)) => format!("{:02}:{:02}", hour, minute),
            None => "Immediate".to_string(),
        }
    }
}

impl fmt::Display for ActivationHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl TryFrom<u8> for ActivationHour {
    type Error = EncodingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ActivationHour> for u8 {
    fn from(hour: ActivationHour) -> Self {
        hour.0
    }
}

impl FromStr for ActivationHour {
    type Err = EncodingError;

    /// Accepts a raw slot code (`0`..`48`), a `HH:MM` time on a half hour,
    /// or `immediate`/`now`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("immediate") || s.eq_ignore_ascii_case("now") {
            return Ok(Self::IMMEDIATE);
        }

        if let Some((hour, minute)) = s.split_once(':') {
            let hour: u8 = hour
                .parse()
                .map_err(|_| EncodingError::InvalidHour(s.to_string()))?;
            let half = match minute {
                "00" | "0" => 0,
                "30" => 1,
                _ => return Err(EncodingError::InvalidHour(s.to_string())),
            };
            if hour >= 24 {
                return Err(EncodingError::InvalidHour(s.to_string()));
            }
            return Ok(Self(hour * 2 + half));
        }

        let value: i64 = s
            .parse()
            .map_err(|_| EncodingError::InvalidHour(s.to_string()))?;
        u8::try_from(value)
            .ok()
            .and_then(|v| Self::new(v).ok())
            .ok_or(EncodingError::HourOutOfRange(value))
    }
}

/// Action codes accepted by `POST /API/update-assignment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AssignmentAction {
    Activate,
    Deactivate,
    Delete,
}

impl AssignmentAction {
    /// Wire code of the action.
    pub fn code(self) -> u8 {
        match self {
            AssignmentAction::Activate => 1,
            AssignmentAction::Deactivate => 2,
            AssignmentAction::Delete => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AssignmentAction::Activate => "Activate",
            AssignmentAction::Deactivate => "Deactivate",
            AssignmentAction::Delete => "Delete",
        }
    }

    /// Whether the action uses the scheduled activation hour.
    pub fn uses_hour(self) -> bool {
        !matches!(self, AssignmentAction::Delete)
    }

    /// The toggle offered for an assignment in the given state.
    pub fn toggle_for(active: bool) -> Self {
        if active {
            AssignmentAction::Deactivate
        } else {
            AssignmentAction::Activate
        }
    }
}

impl TryFrom<u8> for AssignmentAction {
    type Error = EncodingError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(AssignmentAction::Activate),
            2 => Ok(AssignmentAction::Deactivate),
            3 => Ok(AssignmentAction::Delete),
            other => Err(EncodingError::UnknownAction(other)),
        }
    }
}

impl From<AssignmentAction> for u8 {
    fn from(action: AssignmentAction) -> Self {
        action.code()
    }
}

impl FromStr for AssignmentAction {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "activate" | "1" => Ok(AssignmentAction::Activate),
            "deactivate" | "2" => Ok(AssignmentAction::Deactivate),
            "delete" | "3" => Ok(AssignmentAction::Delete),
            _ => Err(EncodingError::InvalidAction(s.to_string())),
        }
    }
}

impl fmt::Display for AssignmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An assignment as returned by `GET /API/get-polygon-assignments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Filled from the queried geofence when the backend omits it.
    #[serde(default)]
    pub polygon_id: i64,
    pub device_id: String,
    #[serde(default)]
    pub active: bool,
    #[serde(
        default,
        deserialize_with = "lenient_hour",
        skip_serializing_if = "Option::is_none"
    )]
    pub hour: Option<ActivationHour>,
}

impl Assignment {
    /// A freshly created, inactive assignment.
    pub fn pending(polygon_id: i64, device_id: impl Into<String>) -> Self {
        Self {
            polygon_id,
            device_id: device_id.into(),
            active: false,
            hour: None,
        }
    }
}

/// Drops hours the backend stores outside the encodable range instead of
/// failing the whole assignment list.
fn lenient_hour<'de, D>(deserializer: D) -> Result<Option<ActivationHour>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<i64> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(|value| u8::try_from(value).ok())
        .and_then(|value| ActivationHour::new(value).ok()))
}

/// Request payload for `POST /API/assign-geofence`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct AssignGeofenceRequest {
    pub polygon_id: i64,

    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub device_id: String,
}

/// Request payload for `POST /API/update-assignment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct UpdateAssignmentRequest {
    pub action: AssignmentAction,
    pub polygon_id: i64,
    pub hour: ActivationHour,
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub device_id: String,
}

impl UpdateAssignmentRequest {
    /// Builds the payload; the hour is sent as `0` for deletions.
    pub fn new(
        device_id: impl Into<String>,
        polygon_id: i64,
        action: AssignmentAction,
        hour: ActivationHour,
    ) -> Self {
        let hour = if action.uses_hour() {
            hour
        } else {
            ActivationHour::MIDNIGHT
        };
        Self {
            action,
            polygon_id,
            hour,
            device_id: device_id.into(),
        }
    }

    /// Confirmation shown once the backend accepted the update.
    pub fn confirmation(&self) -> String {
        if self.action.uses_hour() {
            format!(
                "Action sent successfully: {}, hour: {}",
                self.action, self.hour
            )
        } else {
            format!("Action sent successfully: {}", self.action)
        }
    }
}
