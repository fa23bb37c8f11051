//! Backend endpoint paths, relative to the configured base URL.

pub const GET_GEOFENCES: &str = "/API/get-geofences";
pub const GET_POLYGON_ASSIGNMENTS: &str = "/API/get-polygon-assignments";
pub const GET_NODES: &str = "/API/get-nodes";
pub const CREATE_GEOFENCE: &str = "/API/create-geofence";
pub const SAVE_GEOFENCING: &str = "/API/save-geofencing";
pub const ASSIGN_GEOFENCE: &str = "/API/assign-geofence";
pub const UPDATE_ASSIGNMENT: &str = "/API/update-assignment";
pub const DELETE_UNUSED_POLYGON: &str = "/API/delete-unused-polygon";
pub const ADD_DEVICE: &str = "/API/add-device";
pub const GPS_POINTS: &str = "/api/gpspoints";
