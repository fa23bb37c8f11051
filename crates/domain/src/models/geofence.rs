//! Geofence domain model.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// GeoJSON geometry type used for every geofence.
pub const POLYGON_TYPE: &str = "Polygon";

/// GeoJSON polygon geometry as stored by the backend.
///
/// Coordinates are in storage order (`[longitude, latitude]`). Only the first
/// ring is used; holes are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PolygonGeometry {
    #[serde(rename = "type", default = "default_geometry_type")]
    pub kind: String,

    #[validate(custom(function = "shared::validation::validate_rings"))]
    #[serde(default)]
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl PolygonGeometry {
    /// Builds a polygon from a single ring of `[longitude, latitude]` pairs.
    pub fn from_ring(ring: Vec<[f64; 2]>) -> Self {
        Self {
            kind: default_geometry_type(),
            coordinates: vec![ring],
        }
    }

    /// The exterior ring, or an empty slice when the geometry has none.
    pub fn exterior(&self) -> &[[f64; 2]] {
        self.coordinates
            .first()
            .map(|ring| ring.as_slice())
            .unwrap_or(&[])
    }
}

fn default_geometry_type() -> String {
    POLYGON_TYPE.to_string()
}

/// Represents a geofence known to the backend.
///
/// Whether a geofence is assigned is not part of the wire format; it is
/// derived from the assignment index held by the console state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub polygon_id: i64,
    #[serde(default)]
    pub name: String,
    pub geometry: PolygonGeometry,
    #[serde(default)]
    pub active: bool,
}

impl Geofence {
    /// Name to show to the user, falling back to the identifier.
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("#{}", self.polygon_id)
        } else {
            self.name.clone()
        }
    }
}

/// Request payload for `POST /API/create-geofence`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct CreateGeofenceRequest {
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub name: String,

    #[validate(nested)]
    pub geometry: PolygonGeometry,
}

/// Body of a successful `POST /API/create-geofence`.
///
/// The backend answers either with the created geofence or with a bare
/// `{message}` acknowledgement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CreateGeofenceResponse {
    Created(Geofence),
    Message(crate::models::MessageResponse),
}

impl CreateGeofenceResponse {
    /// Confirmation shown to the user.
    pub fn confirmation(&self) -> String {
        match self {
            CreateGeofenceResponse::Created(g) => {
                format!("Geofence {} created (ID: {})", g.display_name(), g.polygon_id)
            }
            CreateGeofenceResponse::Message(m) => m.text_or("Geofence created"),
        }
    }
}

/// Request payload for `POST /API/save-geofencing`.
///
/// Submitting an existing polygon with a node list starts the segmented
/// downlink workflow for those nodes on the server side.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct SaveGeofencingRequest {
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub name: String,

    #[validate(nested)]
    pub geometry: PolygonGeometry,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[validate(length(min = 1, message = "At least one node must be selected"))]
    pub nodes: Vec<String>,
}

/// Request payload for `DELETE /API/delete-unused-polygon`.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteGeofenceRequest {
    pub polygon_id: i64,
}
