//! Domain models for the geofence console.

pub mod assignment;
pub mod geofence;
pub mod gps_point;
pub mod message;
pub mod node;

pub use assignment::{ActivationHour, Assignment, AssignmentAction};
pub use geofence::{Geofence, PolygonGeometry};
pub use gps_point::GpsPoint;
pub use message::MessageResponse;
pub use node::Node;
