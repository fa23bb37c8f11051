//! reqwest implementation of the backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use domain::models::assignment::{AssignGeofenceRequest, UpdateAssignmentRequest};
use domain::models::geofence::{
    CreateGeofenceRequest, CreateGeofenceResponse, DeleteGeofenceRequest, SaveGeofencingRequest,
};
use domain::models::gps_point::{GpsPointsQuery, GpsPointsResponse};
use domain::models::node::AddDeviceRequest;
use domain::models::{Assignment, Geofence, GpsPoint, MessageResponse, Node};

use crate::backend::GeofenceBackend;
use crate::endpoints;
use crate::error::ClientError;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Backend origin, e.g. `https://geofencing.example.com`.
    pub base_url: String,
    /// Per-request timeout. `None` waits for the backend indefinitely.
    pub timeout: Option<Duration>,
}

/// Client for the geofencing backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client.
    pub fn new(config: ApiClientConfig) -> Result<Self, ClientError> {
        let parsed = Url::parse(&config.base_url)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("{}: {}", config.base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl(format!(
                "{}: scheme must be http or https",
                config.base_url
            )));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of an endpoint path.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.endpoint_url(path))
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
    }

    fn request_with_body<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> RequestBuilder {
        self.request(method, path).json(body)
    }

    /// Sends a request and decodes its body.
    ///
    /// Any non-2xx status is an error. A 2xx response with a JSON content
    /// type is parsed; anything else yields `None`.
    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<Option<T>, ClientError> {
        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains(JSON_CONTENT_TYPE))
            .unwrap_or(false);
        let body = response.bytes().await?;

        debug!(
            endpoint,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Backend responded"
        );

        if !status.is_success() {
            let message = serde_json::from_slice::<MessageResponse>(&body)
                .ok()
                .and_then(|m| m.message);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        if !is_json {
            return Ok(None);
        }

        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| ClientError::Decode {
                endpoint,
                reason: e.to_string(),
            })
    }

    async fn fetch_list<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<Vec<T>, ClientError> {
        let list = self.execute::<Vec<T>>(endpoint, request).await?;
        if list.is_none() {
            warn!(endpoint, "Backend returned a non-JSON body for a list");
        }
        Ok(list.unwrap_or_default())
    }

    async fn send_message<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &'static str,
        body: &B,
    ) -> Result<MessageResponse, ClientError> {
        let request = self.request_with_body(method, endpoint, body);
        Ok(self
            .execute::<MessageResponse>(endpoint, request)
            .await?
            .unwrap_or_default())
    }
}

#[async_trait]
impl GeofenceBackend for ApiClient {
    async fn get_geofences(&self) -> Result<Vec<Geofence>, ClientError> {
        let request = self.request(Method::GET, endpoints::GET_GEOFENCES);
        self.fetch_list(endpoints::GET_GEOFENCES, request).await
    }

    async fn get_polygon_assignments(
        &self,
        polygon_id: i64,
    ) -> Result<Vec<Assignment>, ClientError> {
        let request = self
            .request(Method::GET, endpoints::GET_POLYGON_ASSIGNMENTS)
            .query(&[("polygon_id", polygon_id)]);
        self.fetch_list(endpoints::GET_POLYGON_ASSIGNMENTS, request)
            .await
    }

    async fn get_nodes(&self) -> Result<Vec<Node>, ClientError> {
        let request = self.request(Method::GET, endpoints::GET_NODES);
        self.fetch_list(endpoints::GET_NODES, request).await
    }

    async fn create_geofence(
        &self,
        request: &CreateGeofenceRequest,
    ) -> Result<Option<CreateGeofenceResponse>, ClientError> {
        let http = self.request_with_body(Method::POST, endpoints::CREATE_GEOFENCE, request);
        self.execute(endpoints::CREATE_GEOFENCE, http).await
    }

    async fn save_geofencing(
        &self,
        request: &SaveGeofencingRequest,
    ) -> Result<MessageResponse, ClientError> {
        self.send_message(Method::POST, endpoints::SAVE_GEOFENCING, request)
            .await
    }

    async fn assign_geofence(
        &self,
        request: &AssignGeofenceRequest,
    ) -> Result<MessageResponse, ClientError> {
        self.send_message(Method::POST, endpoints::ASSIGN_GEOFENCE, request)
            .await
    }

    async fn update_assignment(
        &self,
        request: &UpdateAssignmentRequest,
    ) -> Result<MessageResponse, ClientError> {
        self.send_message(Method::POST, endpoints::UPDATE_ASSIGNMENT, request)
            .await
    }

    async fn delete_unused_polygon(
        &self,
        request: &DeleteGeofenceRequest,
    ) -> Result<MessageResponse, ClientError> {
        self.send_message(Method::DELETE, endpoints::DELETE_UNUSED_POLYGON, request)
            .await
    }

    async fn add_device(&self, request: &AddDeviceRequest) -> Result<MessageResponse, ClientError> {
        self.send_message(Method::POST, endpoints::ADD_DEVICE, request)
            .await
    }

    async fn get_gps_points(&self, query: &GpsPointsQuery) -> Result<Vec<GpsPoint>, ClientError> {
        let request = self
            .request(Method::GET, endpoints::GPS_POINTS)
            .query(query);
        let response = self
            .execute::<GpsPointsResponse>(endpoints::GPS_POINTS, request)
            .await?;
        Ok(response.map(|r| r.data).unwrap_or_default())
    }
}
