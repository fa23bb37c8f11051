//! Domain layer for the geofence console.
//!
//! This crate contains:
//! - Wire models (Geofence, Node, Assignment, GpsPoint) and request payloads
//! - Activation hour and assignment action encodings
//! - The console state with its normalized assignment index
//! - Geometry conversions and view models

pub mod models;
pub mod services;
