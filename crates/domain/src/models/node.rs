//! Node (tracked device) domain model.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A tracked device registered with the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub device_id: String,
    #[serde(default, alias = "nom", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Node {
    /// Name to show to the user, falling back to the device identifier.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.device_id,
        }
    }

    /// `name (device_id)` label used in device pickers.
    pub fn label(&self) -> String {
        format!("{} ({})", self.display_name(), self.device_id)
    }
}

/// Request payload for `POST /API/add-device`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct AddDeviceRequest {
    #[validate(length(min = 1, max = 64, message = "Device ID must be 1-64 characters"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub device_id: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

impl From<AddDeviceRequest> for Node {
    fn from(request: AddDeviceRequest) -> Self {
        Self {
            device_id: request.device_id,
            name: Some(request.name),
        }
    }
}
