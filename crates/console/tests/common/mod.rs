//! Common test utilities for integration tests.
//!
//! Provides an in-process axum server that mimics the geofencing backend,
//! so the real `ApiClient` can be exercised end to end.

// Not every helper is used by every integration test binary.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use client::{ApiClient, ApiClientConfig};
use geofence_console::console::GeofenceConsole;

/// Backend data and switches shared with the handlers.
#[derive(Debug, Default)]
pub struct MockState {
    pub geofences: Vec<Value>,
    pub nodes: Vec<Value>,
    /// polygon id → assignment records as the backend stores them
    pub assignments: BTreeMap<i64, Vec<Value>>,
    pub gps_points: Vec<Value>,
    /// Geofences whose assignment fetch answers 500.
    pub failing_assignments: HashSet<i64>,
    /// Answer `add-device` with a plain-text body.
    pub plain_text_acks: bool,
    pub next_id: i64,
    /// `METHOD path` of every request received.
    pub requests: Vec<String>,
    /// JSON bodies received, in order.
    pub bodies: Vec<Value>,
}

pub type SharedState = Arc<Mutex<MockState>>;

pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: SharedState,
}

impl MockBackend {
    /// Starts the mock server on an ephemeral local port.
    pub async fn start() -> Self {
        let state: SharedState = Arc::new(Mutex::new(MockState {
            next_id: 100,
            ..Default::default()
        }));

        let app = Router::new()
            .route("/API/get-geofences", get(get_geofences))
            .route("/API/get-polygon-assignments", get(get_polygon_assignments))
            .route("/API/get-nodes", get(get_nodes))
            .route("/API/create-geofence", post(create_geofence))
            .route("/API/save-geofencing", post(save_geofencing))
            .route("/API/assign-geofence", post(assign_geofence))
            .route("/API/update-assignment", post(update_assignment))
            .route("/API/delete-unused-polygon", delete(delete_unused_polygon))
            .route("/API/add-device", post(add_device))
            .route("/api/gpspoints", get(gps_points))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Mock backend has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(ApiClientConfig {
            base_url: self.base_url(),
            timeout: Some(std::time::Duration::from_secs(10)),
        })
        .expect("Failed to create API client")
    }

    pub fn console(&self) -> GeofenceConsole<ApiClient> {
        GeofenceConsole::new(self.client())
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().expect("Mock state poisoned");
        f(&mut state)
    }

    pub fn add_node(&self, device_id: &str, name: &str) {
        self.with_state(|s| s.nodes.push(json!({"device_id": device_id, "name": name})));
    }

    /// Inserts a geofence directly and returns its id.
    pub fn add_geofence(&self, name: &str, ring: Vec<[f64; 2]>) -> i64 {
        self.with_state(|s| {
            s.next_id += 1;
            let id = s.next_id;
            s.geofences.push(geofence_json(id, name, &json!(ring), false));
            id
        })
    }

    pub fn assign(&self, polygon_id: i64, device_id: &str, active: bool, hour: Option<u8>) {
        self.with_state(|s| {
            s.assignments
                .entry(polygon_id)
                .or_default()
                .push(json!({"device_id": device_id, "active": active, "hour": hour}));
        });
    }

    pub fn requests(&self) -> Vec<String> {
        self.with_state(|s| s.requests.clone())
    }

    pub fn last_body(&self) -> Option<Value> {
        self.with_state(|s| s.bodies.last().cloned())
    }
}

/// A closed square ring in storage order around (lat, lng).
pub fn square(lat: f64, lng: f64) -> Vec<[f64; 2]> {
    let d = 0.01;
    vec![
        [lng, lat],
        [lng + d, lat],
        [lng + d, lat + d],
        [lng, lat + d],
        [lng, lat],
    ]
}

fn geofence_json(id: i64, name: &str, ring: &Value, active: bool) -> Value {
    json!({
        "polygon_id": id,
        "name": name,
        "geometry": {"type": "Polygon", "coordinates": [ring]},
        "active": active,
    })
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn record<'a>(
    state: &'a SharedState,
    request: &str,
    body: Option<&Value>,
) -> std::sync::MutexGuard<'a, MockState> {
    let mut s = state.lock().expect("Mock state poisoned");
    s.requests.push(request.to_string());
    if let Some(body) = body {
        s.bodies.push(body.clone());
    }
    s
}

async fn get_geofences(State(state): State<SharedState>) -> Response {
    let s = record(&state, "GET /API/get-geofences", None);
    Json(s.geofences.clone()).into_response()
}

#[derive(Deserialize)]
struct PolygonQuery {
    polygon_id: i64,
}

async fn get_polygon_assignments(
    State(state): State<SharedState>,
    Query(query): Query<PolygonQuery>,
) -> Response {
    let s = record(&state, "GET /API/get-polygon-assignments", None);
    if s.failing_assignments.contains(&query.polygon_id) {
        return message(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable");
    }
    let list = s
        .assignments
        .get(&query.polygon_id)
        .cloned()
        .unwrap_or_default();
    Json(list).into_response()
}

async fn get_nodes(State(state): State<SharedState>) -> Response {
    let s = record(&state, "GET /API/get-nodes", None);
    Json(s.nodes.clone()).into_response()
}

async fn create_geofence(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut s = record(&state, "POST /API/create-geofence", Some(&body));
    let Some(name) = body["name"].as_str().map(str::to_string) else {
        return message(StatusCode::BAD_REQUEST, "Missing name");
    };
    s.next_id += 1;
    let id = s.next_id;
    let geofence = json!({
        "polygon_id": id,
        "name": name,
        "geometry": body["geometry"].clone(),
        "active": false,
    });
    s.geofences.push(geofence.clone());
    (StatusCode::CREATED, Json(geofence)).into_response()
}

async fn save_geofencing(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut s = record(&state, "POST /API/save-geofencing", Some(&body));
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let nodes: Vec<String> = body["nodes"]
        .as_array()
        .map(|a| a.iter().filter_map(|n| n.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    if nodes.is_empty() {
        return message(StatusCode::BAD_REQUEST, "At least one node is required");
    }

    let existing = s
        .geofences
        .iter()
        .find(|g| g["name"] == name.as_str())
        .and_then(|g| g["polygon_id"].as_i64());
    let id = match existing {
        Some(id) => id,
        None => {
            s.next_id += 1;
            let id = s.next_id;
            let active = body["active"].as_bool().unwrap_or(false);
            let mut geofence = json!({"polygon_id": id, "name": name, "active": active});
            geofence["geometry"] = body["geometry"].clone();
            s.geofences.push(geofence);
            id
        }
    };
    for node in nodes {
        s.assignments
            .entry(id)
            .or_default()
            .push(json!({"device_id": node, "active": false}));
    }
    message(StatusCode::OK, "Segmentation process started")
}

async fn assign_geofence(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut s = record(&state, "POST /API/assign-geofence", Some(&body));
    let (Some(polygon_id), Some(device_id)) = (body["polygon_id"].as_i64(), body["device_id"].as_str())
    else {
        return message(StatusCode::BAD_REQUEST, "polygon_id and device_id are required");
    };
    s.assignments
        .entry(polygon_id)
        .or_default()
        .push(json!({"polygon_id": polygon_id, "device_id": device_id, "active": false}));
    message(StatusCode::OK, "Geofence assigned successfully")
}

async fn update_assignment(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut s = record(&state, "POST /API/update-assignment", Some(&body));
    let action = body["action"].as_u64().unwrap_or(0);
    let hour = body["hour"].as_u64().unwrap_or(99);
    if !(1..=3).contains(&action) || hour > 48 {
        return message(StatusCode::BAD_REQUEST, "Invalid action or hour");
    }
    let polygon_id = body["polygon_id"].as_i64().unwrap_or_default();
    let device_id = body["device_id"].as_str().unwrap_or_default().to_string();

    let list = s.assignments.entry(polygon_id).or_default();
    if action == 3 {
        list.retain(|a| a["device_id"] != device_id.as_str());
    } else if let Some(a) = list.iter_mut().find(|a| a["device_id"] == device_id.as_str()) {
        a["active"] = json!(action == 1);
        a["hour"] = json!(hour);
    } else {
        return message(StatusCode::NOT_FOUND, "Assignment not found");
    }
    message(StatusCode::OK, "Assignment updated")
}

async fn delete_unused_polygon(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = record(&state, "DELETE /API/delete-unused-polygon", Some(&body));
    let polygon_id = body["polygon_id"].as_i64().unwrap_or_default();
    let assigned = s
        .assignments
        .get(&polygon_id)
        .map(|l| !l.is_empty())
        .unwrap_or(false);
    if assigned {
        return message(
            StatusCode::BAD_REQUEST,
            "Ce polygone est encore assigné à des nodes et ne peut pas être supprimé.",
        );
    }
    s.geofences.retain(|g| g["polygon_id"].as_i64() != Some(polygon_id));
    message(StatusCode::OK, "Polygon deleted successfully")
}

async fn add_device(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut s = record(&state, "POST /API/add-device", Some(&body));
    s.nodes.push(body.clone());
    if s.plain_text_acks {
        return (StatusCode::OK, "OK").into_response();
    }
    message(StatusCode::OK, "Device added")
}

#[derive(Deserialize)]
struct GpsQuery {
    date: String,
    limit: usize,
}

async fn gps_points(State(state): State<SharedState>, Query(query): Query<GpsQuery>) -> Response {
    let s = record(&state, "GET /api/gpspoints", None);
    let data: Vec<Value> = s
        .gps_points
        .iter()
        .filter(|p| {
            p["timestamp"]
                .as_str()
                .map(|t| t.starts_with(&query.date))
                .unwrap_or(false)
        })
        .take(query.limit)
        .cloned()
        .collect();
    Json(json!({ "data": data })).into_response()
}
