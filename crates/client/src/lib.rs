//! HTTP client layer for the geofence console.
//!
//! This crate contains:
//! - The `GeofenceBackend` trait describing every backend endpoint
//! - `ApiClient`, its reqwest implementation
//! - Client error types

pub mod backend;
pub mod endpoints;
pub mod error;
pub mod http;

pub use backend::GeofenceBackend;
pub use error::ClientError;
pub use http::{ApiClient, ApiClientConfig};
