//! Domain services: console state, geometry conversions and view models.

pub mod geometry;
pub mod state;
pub mod view;

pub use geometry::LatLng;
pub use state::{AssignmentIndex, ConsoleState, StateChange};
pub use view::{GeofenceView, PolygonColor, SelectionView};
