//! View models and their text markup.
//!
//! Builders turn the console state into plain view models keyed by entity
//! id; the `render_*` functions turn those into terminal text. Neither side
//! performs I/O.

use std::fmt::Write as _;

use serde::Serialize;

use super::geometry::{self, LatLng};
use super::state::ConsoleState;
use crate::models::{ActivationHour, AssignmentAction, Geofence};

/// Color of a polygon on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolygonColor {
    /// The geofence currently selected by the user.
    Selected,
    /// At least one device is assigned.
    Assigned,
    Unassigned,
}

impl PolygonColor {
    pub fn for_geofence(selected: bool, assigned: bool) -> Self {
        match (selected, assigned) {
            (true, _) => PolygonColor::Selected,
            (false, true) => PolygonColor::Assigned,
            (false, false) => PolygonColor::Unassigned,
        }
    }

    /// CSS color name used by the map layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolygonColor::Selected => "blue",
            PolygonColor::Assigned => "red",
            PolygonColor::Unassigned => "green",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeofenceView {
    pub polygon_id: i64,
    pub name: String,
    pub active: bool,
    pub assigned: bool,
    pub color: PolygonColor,
    pub ring: Vec<LatLng>,
    pub centroid: Option<LatLng>,
}

/// One entry of the activation hour selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourOption {
    pub value: u8,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignedDeviceRow {
    /// Selector key, unique per (device, geofence) pair.
    pub key: String,
    pub device_id: String,
    pub display_name: String,
    pub active: bool,
    pub hour: Option<ActivationHour>,
    pub hour_options: Vec<HourOption>,
    pub toggle: AssignmentAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableDeviceRow {
    /// Checkbox key, unique per (geofence, device) pair.
    pub key: String,
    pub device_id: String,
    pub label: String,
}

/// Everything shown after the user picked a geofence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionView {
    pub polygons: Vec<GeofenceView>,
    pub selected: GeofenceView,
    pub assigned: Vec<AssignedDeviceRow>,
    pub available: Vec<AvailableDeviceRow>,
}

/// The 49 selector options; the assignment's hour is preselected, or
/// `Immediate` when none is scheduled.
pub fn hour_options(current: Option<ActivationHour>) -> Vec<HourOption> {
    let current = current.unwrap_or(ActivationHour::IMMEDIATE);
    ActivationHour::all()
        .map(|hour| HourOption {
            value: hour.value(),
            label: hour.label(),
            selected: hour == current,
        })
        .collect()
}

pub fn geofence_view(state: &ConsoleState, geofence: &Geofence) -> GeofenceView {
    let assigned = state.is_assigned(geofence.polygon_id);
    let selected = state.selected == Some(geofence.polygon_id);
    GeofenceView {
        polygon_id: geofence.polygon_id,
        name: geofence.display_name(),
        active: geofence.active,
        assigned,
        color: PolygonColor::for_geofence(selected, assigned),
        ring: geometry::to_display_ring(&geofence.geometry),
        centroid: geometry::centroid(&geofence.geometry),
    }
}

/// Views of every known geofence, colored against the current selection.
pub fn polygon_views(state: &ConsoleState) -> Vec<GeofenceView> {
    state
        .geofences
        .iter()
        .map(|g| geofence_view(state, g))
        .collect()
}

/// Builds the selection view for the currently selected geofence.
pub fn selection_view(state: &ConsoleState) -> Option<SelectionView> {
    let geofence_id = state.selected?;
    let geofence = state.geofence(geofence_id)?;

    let assigned = state
        .assignments
        .for_geofence(geofence_id)
        .iter()
        .map(|a| AssignedDeviceRow {
            key: format!("activation-hour-{}-{}", a.device_id, geofence_id),
            device_id: a.device_id.clone(),
            display_name: state
                .node(&a.device_id)
                .map(|n| n.display_name().to_string())
                .unwrap_or_else(|| a.device_id.clone()),
            active: a.active,
            hour: a.hour,
            hour_options: hour_options(a.hour),
            toggle: AssignmentAction::toggle_for(a.active),
        })
        .collect();

    let available = state
        .available_nodes(geofence_id)
        .into_iter()
        .map(|n| AvailableDeviceRow {
            key: format!("assign-{}-{}", geofence_id, n.device_id),
            device_id: n.device_id.clone(),
            label: n.label(),
        })
        .collect();

    Some(SelectionView {
        polygons: polygon_views(state),
        selected: geofence_view(state, geofence),
        assigned,
        available,
    })
}

/// One line per polygon: id, name, color and flags.
pub fn render_polygon_list(polygons: &[GeofenceView]) -> String {
    let mut out = String::new();
    if polygons.is_empty() {
        out.push_str("No geofences.\n");
        return out;
    }
    for p in polygons {
        let _ = writeln!(
            out,
            "[{:>4}] {:<24} {:<5}  assigned: {:<3}  active: {:<3}  vertices: {}",
            p.polygon_id,
            p.name,
            p.color.as_str(),
            yes_no(p.assigned),
            yes_no(p.active),
            p.ring.len()
        );
    }
    out
}

pub fn render_hour_options(options: &[HourOption]) -> String {
    options
        .iter()
        .map(|o| {
            if o.selected {
                format!("[{}={}]", o.value, o.label)
            } else {
                format!("{}={}", o.value, o.label)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Detail view of the selected geofence with its two device lists.
pub fn render_selection(view: &SelectionView) -> String {
    let mut out = String::new();
    let s = &view.selected;
    let _ = writeln!(out, "Polygon: {} (ID: {})", s.name, s.polygon_id);
    let _ = writeln!(out, "Color: {}", s.color.as_str());
    if let Some(c) = s.centroid {
        let _ = writeln!(out, "Center: {:.6}, {:.6}", c.lat, c.lng);
    }

    out.push_str("\nAssigned devices:\n");
    if view.assigned.is_empty() {
        out.push_str("  (none)\n");
    }
    for row in &view.assigned {
        let hour = row
            .hour
            .map(|h| h.label())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  {} ({}) active: {}  hour: {}  actions: {}, {}",
            row.display_name,
            row.device_id,
            yes_no(row.active),
            hour,
            row.toggle,
            AssignmentAction::Delete
        );
    }

    out.push_str("\nAvailable devices:\n");
    if view.available.is_empty() {
        out.push_str("  (none)\n");
    }
    for row in &view.available {
        let _ = writeln!(out, "  [ ] {}", row.label);
    }
    out
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
