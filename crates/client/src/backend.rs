//! Backend abstraction used by the console.

use async_trait::async_trait;

use domain::models::assignment::{AssignGeofenceRequest, UpdateAssignmentRequest};
use domain::models::geofence::{
    CreateGeofenceRequest, CreateGeofenceResponse, DeleteGeofenceRequest, SaveGeofencingRequest,
};
use domain::models::gps_point::GpsPointsQuery;
use domain::models::node::AddDeviceRequest;
use domain::models::{Assignment, Geofence, GpsPoint, MessageResponse, Node};

use crate::error::ClientError;

/// Every endpoint the console talks to.
///
/// Mutating calls return the `{message}` acknowledgement; a body without a
/// message (or a non-JSON body) yields an empty `MessageResponse`.
#[async_trait]
pub trait GeofenceBackend: Send + Sync {
    async fn get_geofences(&self) -> Result<Vec<Geofence>, ClientError>;

    async fn get_polygon_assignments(&self, polygon_id: i64)
        -> Result<Vec<Assignment>, ClientError>;

    async fn get_nodes(&self) -> Result<Vec<Node>, ClientError>;

    /// `None` when the backend answered without a JSON body.
    async fn create_geofence(
        &self,
        request: &CreateGeofenceRequest,
    ) -> Result<Option<CreateGeofenceResponse>, ClientError>;

    async fn save_geofencing(
        &self,
        request: &SaveGeofencingRequest,
    ) -> Result<MessageResponse, ClientError>;

    async fn assign_geofence(
        &self,
        request: &AssignGeofenceRequest,
    ) -> Result<MessageResponse, ClientError>;

    async fn update_assignment(
        &self,
        request: &UpdateAssignmentRequest,
    ) -> Result<MessageResponse, ClientError>;

    async fn delete_unused_polygon(
        &self,
        request: &DeleteGeofenceRequest,
    ) -> Result<MessageResponse, ClientError>;

    async fn add_device(&self, request: &AddDeviceRequest) -> Result<MessageResponse, ClientError>;

    async fn get_gps_points(&self, query: &GpsPointsQuery) -> Result<Vec<GpsPoint>, ClientError>;
}
