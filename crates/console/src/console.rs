//! The geofence console component.
//!
//! [`GeofenceConsole`] owns the session state and a backend handle. Every
//! mutating operation talks to the backend first and only touches the local
//! state once the backend accepted the request.

use futures::future::join_all;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use client::{ClientError, GeofenceBackend};
use domain::models::assignment::{AssignGeofenceRequest, UpdateAssignmentRequest};
use domain::models::geofence::{
    CreateGeofenceRequest, DeleteGeofenceRequest, SaveGeofencingRequest,
};
use domain::models::node::AddDeviceRequest;
use domain::models::{ActivationHour, Assignment, AssignmentAction, PolygonGeometry};
use domain::services::geometry::{self, LatLng};
use domain::services::view::{self, GeofenceView, SelectionView};
use domain::services::{ConsoleState, StateChange};

use crate::error::ConsoleError;

// ============================================================================
// Operation results
// ============================================================================

/// A fetch that failed during [`GeofenceConsole::load_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    /// What was being fetched, e.g. `geofences` or `assignments of 7`.
    pub resource: String,
    pub message: String,
}

/// Outcome of a full reload. Counts reflect the state after the reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub geofences: usize,
    pub nodes: usize,
    pub assignments: usize,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of an accepted assignment update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentUpdate {
    /// Confirmation naming the action and, when relevant, the hour.
    pub confirmation: String,
    /// Message returned by the backend, if any.
    pub server_message: Option<String>,
    pub change: StateChange,
}

/// Per-device result of a bulk assignment.
#[derive(Debug)]
pub struct DeviceAssignment {
    pub device_id: String,
    pub outcome: Result<String, ConsoleError>,
}

#[derive(Debug, Default)]
pub struct BulkAssignReport {
    pub results: Vec<DeviceAssignment>,
}

impl BulkAssignReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &DeviceAssignment> {
        self.results.iter().filter(|r| r.outcome.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &DeviceAssignment> {
        self.results.iter().filter(|r| r.outcome.is_err())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }
}

// ============================================================================
// Console
// ============================================================================

/// Geofence console bound to one backend.
pub struct GeofenceConsole<B> {
    backend: B,
    state: ConsoleState,
}

impl<B: GeofenceBackend> GeofenceConsole<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: ConsoleState::new(),
        }
    }

    pub fn state(&self) -> &ConsoleState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Refreshes geofences, nodes and every geofence's assignments.
    ///
    /// Best effort: a failed fetch is logged and reported while the data it
    /// would have replaced stays as it was.
    #[instrument(skip(self))]
    pub async fn load_all(&mut self) -> LoadReport {
        let mut failures = Vec::new();

        match self.backend.get_geofences().await {
            Ok(geofences) => self.state.set_geofences(geofences),
            Err(e) => {
                error!(error = %e, "Failed to fetch geofences");
                failures.push(load_failure("geofences", &e));
            }
        }

        match self.backend.get_nodes().await {
            Ok(nodes) => self.state.nodes = nodes,
            Err(e) => {
                error!(error = %e, "Failed to fetch nodes");
                failures.push(load_failure("nodes", &e));
            }
        }

        let ids: Vec<i64> = self.state.geofences.iter().map(|g| g.polygon_id).collect();
        let backend = &self.backend;
        let results = join_all(ids.iter().map(|id| backend.get_polygon_assignments(*id))).await;

        for (geofence_id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(assignments) => self.state.assignments.replace(geofence_id, assignments),
                Err(e) => {
                    error!(geofence_id, error = %e, "Failed to fetch assignments");
                    failures.push(load_failure(&format!("assignments of {}", geofence_id), &e));
                }
            }
        }

        let report = LoadReport {
            geofences: self.state.geofences.len(),
            nodes: self.state.nodes.len(),
            assignments: self.state.assignments.len(),
            failures,
        };
        info!(
            geofences = report.geofences,
            nodes = report.nodes,
            assignments = report.assignments,
            failures = report.failures.len(),
            "State loaded"
        );
        report
    }

    /// Marks a geofence as selected and returns its detail view.
    pub fn select_geofence(&mut self, geofence_id: i64) -> Result<SelectionView, ConsoleError> {
        if self.state.geofence(geofence_id).is_none() {
            warn!(geofence_id, "Selected geofence is not loaded");
            return Err(ConsoleError::NotFound(format!("Geofence {}", geofence_id)));
        }
        self.state.selected = Some(geofence_id);

        view::selection_view(&self.state)
            .ok_or_else(|| ConsoleError::NotFound(format!("Geofence {}", geofence_id)))
    }

    /// Views of every known geofence with their current colors.
    pub fn polygons(&self) -> Vec<GeofenceView> {
        view::polygon_views(&self.state)
    }

    /// Converts a ring drawn in `[lat, lng]` order to a storable geometry.
    pub fn drawn_geometry(ring: &[LatLng]) -> PolygonGeometry {
        geometry::from_display_ring(ring)
    }

    /// Creates a geofence, then reloads the state.
    #[instrument(skip(self, geometry))]
    pub async fn create_geofence(
        &mut self,
        name: &str,
        geometry: PolygonGeometry,
    ) -> Result<String, ConsoleError> {
        let request = CreateGeofenceRequest {
            name: name.to_string(),
            geometry,
        };
        request.validate().map_err(|e| invalid("create_geofence", e))?;

        let response = self
            .backend
            .create_geofence(&request)
            .await
            .map_err(|e| backend_failure("create_geofence", e))?;
        let confirmation = response
            .map(|r| r.confirmation())
            .unwrap_or_else(|| "Geofence created".to_string());
        info!(name, "Geofence created");

        self.load_all().await;
        Ok(confirmation)
    }

    /// Saves a drawn polygon together with the nodes it is meant for.
    #[instrument(skip(self, geometry, nodes), fields(nodes = nodes.len()))]
    pub async fn save_geofencing(
        &mut self,
        name: &str,
        geometry: PolygonGeometry,
        nodes: Vec<String>,
        active: bool,
    ) -> Result<String, ConsoleError> {
        let request = SaveGeofencingRequest {
            name: name.to_string(),
            geometry,
            active: Some(active),
            nodes,
        };
        request.validate().map_err(|e| invalid("save_geofencing", e))?;

        let response = self
            .backend
            .save_geofencing(&request)
            .await
            .map_err(|e| backend_failure("save_geofencing", e))?;
        info!(name, "Geofencing saved");

        self.load_all().await;
        Ok(response.text_or("Geofence saved"))
    }

    /// Assigns a device to a geofence. The new assignment starts inactive.
    ///
    /// Nothing stops another session from assigning the same pair at the
    /// same time; the backend decides.
    #[instrument(skip(self))]
    pub async fn assign_device(
        &mut self,
        geofence_id: i64,
        device_id: &str,
    ) -> Result<String, ConsoleError> {
        let request = AssignGeofenceRequest {
            polygon_id: geofence_id,
            device_id: device_id.to_string(),
        };
        request.validate().map_err(|e| invalid("assign_device", e))?;

        let response = self
            .backend
            .assign_geofence(&request)
            .await
            .map_err(|e| backend_failure("assign_device", e))?;

        let change = self
            .state
            .assignments
            .insert(Assignment::pending(geofence_id, device_id));
        info!(geofence_id, device_id, ?change, "Device assigned");

        Ok(response.text_or(&format!(
            "Device {} assigned to geofence {}",
            device_id, geofence_id
        )))
    }

    /// Assigns each device in turn, reporting the outcome per device.
    pub async fn assign_devices(
        &mut self,
        geofence_id: i64,
        device_ids: &[String],
    ) -> Result<BulkAssignReport, ConsoleError> {
        if device_ids.is_empty() {
            return Err(ConsoleError::Validation(
                "Select at least one device".to_string(),
            ));
        }

        let mut report = BulkAssignReport::default();
        for device_id in device_ids {
            let outcome = self.assign_device(geofence_id, device_id).await;
            report.results.push(DeviceAssignment {
                device_id: device_id.clone(),
                outcome,
            });
        }
        Ok(report)
    }

    /// Re-submits a known geofence for one device, which starts the
    /// segmented downlink on the backend.
    #[instrument(skip(self))]
    pub async fn assign_via_segmentation(
        &mut self,
        geofence_id: i64,
        device_id: &str,
    ) -> Result<String, ConsoleError> {
        let geofence = self.state.geofence(geofence_id).cloned().ok_or_else(|| {
            error!(geofence_id, "Geofence not found in the loaded list");
            ConsoleError::NotFound(format!("Geofence {}", geofence_id))
        })?;

        if device_id.trim().is_empty() {
            warn!(geofence_id, "Rejected blank device id");
            return Err(ConsoleError::Validation(
                "device_id: Value must not be blank".to_string(),
            ));
        }

        // The stored name and geometry go back exactly as the backend sent them
        let request = SaveGeofencingRequest {
            name: geofence.name,
            geometry: geofence.geometry,
            active: None,
            nodes: vec![device_id.to_string()],
        };

        let response = self
            .backend
            .save_geofencing(&request)
            .await
            .map_err(|e| backend_failure("assign_via_segmentation", e))?;
        info!(geofence_id, device_id, "Segmented assignment submitted");

        self.load_all().await;
        Ok(response.text_or(&format!(
            "Segmented assignment of geofence {} started for {}",
            geofence_id, device_id
        )))
    }

    /// Activates, deactivates or deletes an assignment.
    ///
    /// The hour is sent as midnight for deletions. An accepted activate or
    /// deactivate for a pair the index does not know yet records it.
    #[instrument(skip(self, action, hour), fields(action = %action, hour = %hour))]
    pub async fn update_assignment(
        &mut self,
        device_id: &str,
        geofence_id: i64,
        action: AssignmentAction,
        hour: ActivationHour,
    ) -> Result<AssignmentUpdate, ConsoleError> {
        let request = UpdateAssignmentRequest::new(device_id, geofence_id, action, hour);
        request
            .validate()
            .map_err(|e| invalid("update_assignment", e))?;

        let response = self
            .backend
            .update_assignment(&request)
            .await
            .map_err(|e| backend_failure("update_assignment", e))?;

        let mut change = self
            .state
            .assignments
            .apply(geofence_id, device_id, action, request.hour);
        if change == StateChange::Missing && action.uses_hour() {
            let mut assignment = Assignment::pending(geofence_id, device_id);
            assignment.active = action == AssignmentAction::Activate;
            assignment.hour = Some(request.hour);
            change = self.state.assignments.insert(assignment);
        }
        info!(geofence_id, device_id, ?change, "Assignment updated");

        Ok(AssignmentUpdate {
            confirmation: request.confirmation(),
            server_message: response.message,
            change,
        })
    }

    /// Deletes a geofence the backend considers unused.
    ///
    /// A refusal (for instance because devices are still assigned) comes
    /// back as [`ConsoleError::Rejected`] with the backend's own wording.
    #[instrument(skip(self))]
    pub async fn delete_geofence(&mut self, geofence_id: i64) -> Result<String, ConsoleError> {
        let request = DeleteGeofenceRequest {
            polygon_id: geofence_id,
        };
        let response = self
            .backend
            .delete_unused_polygon(&request)
            .await
            .map_err(|e| backend_failure("delete_geofence", e))?;

        let change = self.state.remove_geofence(geofence_id);
        info!(geofence_id, ?change, "Geofence deleted");

        Ok(response.text_or(&format!("Geofence {} deleted", geofence_id)))
    }

    /// Registers a device with the backend and adds it to the node list.
    #[instrument(skip(self))]
    pub async fn add_device(&mut self, device_id: &str, name: &str) -> Result<String, ConsoleError> {
        let request = AddDeviceRequest {
            device_id: device_id.to_string(),
            name: name.to_string(),
        };
        request.validate().map_err(|e| invalid("add_device", e))?;

        let response = self
            .backend
            .add_device(&request)
            .await
            .map_err(|e| backend_failure("add_device", e))?;

        let change = self.state.upsert_node(request.into());
        info!(device_id, ?change, "Device added");

        Ok(response.text_or(&format!("Device {} added", device_id)))
    }
}

fn load_failure(resource: &str, err: &ClientError) -> LoadFailure {
    LoadFailure {
        resource: resource.to_string(),
        message: err.to_string(),
    }
}

fn backend_failure(operation: &'static str, err: ClientError) -> ConsoleError {
    error!(operation, error = %err, status = ?err.status(), "Backend request failed");
    ConsoleError::from_backend(err)
}

fn invalid(operation: &'static str, errors: validator::ValidationErrors) -> ConsoleError {
    let err = ConsoleError::from(errors);
    error!(operation, error = %err, "Request rejected before sending");
    err
}
