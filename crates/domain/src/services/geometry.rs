//! Coordinate order conversions between storage and display.
//!
//! The backend stores GeoJSON rings as `[longitude, latitude]`; the map and
//! the text views use `[latitude, longitude]`. Both directions live here so
//! rendering and submission cannot drift apart.

use geo::{Centroid, Contains, Coord, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::models::PolygonGeometry;

/// A vertex in display order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Storage order pair `[longitude, latitude]`.
    pub fn to_storage(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    /// Builds a display vertex from a storage order pair.
    pub fn from_storage([lng, lat]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

/// Converts the exterior ring of a stored geometry to display order.
pub fn to_display_ring(geometry: &PolygonGeometry) -> Vec<LatLng> {
    geometry
        .exterior()
        .iter()
        .copied()
        .map(LatLng::from_storage)
        .collect()
}

/// Converts a ring drawn in display order to a stored geometry.
///
/// The ring is closed when its last vertex differs from the first, as GeoJSON
/// requires; vertex order is otherwise preserved.
pub fn from_display_ring(ring: &[LatLng]) -> PolygonGeometry {
    let mut storage: Vec<[f64; 2]> = ring.iter().map(|p| p.to_storage()).collect();
    if let (Some(first), Some(last)) = (storage.first().copied(), storage.last().copied()) {
        if storage.len() > 1 && first != last {
            storage.push(first);
        }
    }
    PolygonGeometry::from_ring(storage)
}

/// The exterior ring as a `geo` polygon (x = longitude, y = latitude).
pub fn to_polygon(geometry: &PolygonGeometry) -> Polygon<f64> {
    let exterior: LineString<f64> = geometry
        .exterior()
        .iter()
        .map(|[lng, lat]| Coord { x: *lng, y: *lat })
        .collect();
    Polygon::new(exterior, vec![])
}

/// Centroid of the exterior ring in display order.
pub fn centroid(geometry: &PolygonGeometry) -> Option<LatLng> {
    to_polygon(geometry)
        .centroid()
        .map(|p| LatLng::new(p.y(), p.x()))
}

/// Whether the position lies strictly inside the exterior ring.
pub fn contains(geometry: &PolygonGeometry, position: LatLng) -> bool {
    if geometry.exterior().len() < 3 {
        return false;
    }
    to_polygon(geometry).contains(&Point::new(position.lng, position.lat))
}
