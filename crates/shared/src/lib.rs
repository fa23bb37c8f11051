//! Shared utilities for the geofence console.
//!
//! This crate provides common functionality used across all other crates:
//! - Coordinate range checks
//! - Polygon ring presence checks
//! - Name and query parameter validation

pub mod validation;
