//! GPS track replay.
//!
//! Points fetched for a day are grouped per device, ordered by time and
//! annotated with the geofences containing them. [`Playback`] then steps
//! through one track the way the map marker replays it.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument};
use validator::Validate;

use client::GeofenceBackend;
use domain::models::gps_point::GpsPointsQuery;
use domain::models::{Geofence, GpsPoint};
use domain::services::geometry::{self, LatLng};

use crate::console::GeofenceConsole;
use crate::error::ConsoleError;

/// A position of a track with the geofences it falls in.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub position: LatLng,
    pub timestamp: DateTime<Utc>,
    /// Display names of the containing geofences, in geofence list order.
    pub inside: Vec<String>,
}

/// Entering or leaving a geofence between two consecutive points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Enter { geofence: String, at: DateTime<Utc> },
    Exit { geofence: String, at: DateTime<Utc> },
}

/// Every point of one device, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub device_id: String,
    pub points: Vec<TrackPoint>,
}

impl Track {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|p| p.timestamp)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|p| p.timestamp)
    }

    /// Geofence entries and exits along the track.
    ///
    /// The first point only produces entries; a geofence still occupied at
    /// the last point has no exit.
    pub fn transitions(&self) -> Vec<Transition> {
        let mut transitions = Vec::new();
        let mut previous: &[String] = &[];

        for point in &self.points {
            for name in previous.iter().filter(|n| !point.inside.contains(n)) {
                transitions.push(Transition::Exit {
                    geofence: name.clone(),
                    at: point.timestamp,
                });
            }
            for name in point.inside.iter().filter(|n| !previous.contains(n)) {
                transitions.push(Transition::Enter {
                    geofence: name.clone(),
                    at: point.timestamp,
                });
            }
            previous = &point.inside;
        }
        transitions
    }

    pub fn playback(&self) -> Playback<'_> {
        Playback::new(self)
    }
}

/// Steps through a track one point at a time.
#[derive(Debug, Clone)]
pub struct Playback<'a> {
    track: &'a Track,
    cursor: usize,
}

impl<'a> Playback<'a> {
    pub fn new(track: &'a Track) -> Self {
        Self { track, cursor: 0 }
    }

    /// Rewinds to the first point.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Fraction of the track already played, from 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        if self.track.is_empty() {
            return 1.0;
        }
        self.cursor as f64 / self.track.len() as f64
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.track.len()
    }
}

impl<'a> Iterator for Playback<'a> {
    type Item = &'a TrackPoint;

    fn next(&mut self) -> Option<Self::Item> {
        let point = self.track.points.get(self.cursor)?;
        self.cursor += 1;
        Some(point)
    }
}

/// Groups points by device, sorts them by time and tags each with the
/// geofences that contain it. Tracks come out ordered by device id.
pub fn build_tracks(points: Vec<GpsPoint>, geofences: &[Geofence]) -> Vec<Track> {
    let mut by_device: BTreeMap<String, Vec<GpsPoint>> = BTreeMap::new();
    for point in points {
        by_device.entry(point.device_id.clone()).or_default().push(point);
    }

    by_device
        .into_iter()
        .map(|(device_id, mut points)| {
            points.sort_by_key(|p| p.timestamp);
            let points = points
                .into_iter()
                .map(|p| {
                    let position = LatLng::new(p.latitude, p.longitude);
                    let inside = geofences
                        .iter()
                        .filter(|g| geometry::contains(&g.geometry, position))
                        .map(|g| g.display_name())
                        .collect();
                    TrackPoint {
                        position,
                        timestamp: p.timestamp,
                        inside,
                    }
                })
                .collect();
            Track { device_id, points }
        })
        .collect()
}

impl<B: GeofenceBackend> GeofenceConsole<B> {
    /// Fetches the points of one day and builds a track per device.
    ///
    /// Points with coordinates outside the valid ranges are skipped.
    #[instrument(skip(self))]
    pub async fn fetch_tracks(&self, date: &str, limit: u32) -> Result<Vec<Track>, ConsoleError> {
        let query = GpsPointsQuery {
            date: date.to_string(),
            limit,
        };
        query.validate()?;

        let points = self.backend().get_gps_points(&query).await.map_err(|e| {
            error!(error = %e, "Failed to fetch GPS points");
            ConsoleError::from_backend(e)
        })?;

        let total = points.len();
        let points: Vec<GpsPoint> = points
            .into_iter()
            .filter(|p| {
                let valid = p.validate().is_ok();
                if !valid {
                    debug!(device_id = %p.device_id, "Skipping GPS point with invalid coordinates");
                }
                valid
            })
            .collect();

        let tracks = build_tracks(points, &self.state().geofences);
        info!(points = total, tracks = tracks.len(), "GPS tracks built");
        Ok(tracks)
    }
}

/// Text rendering of a track: one line per point, then the transitions.
pub fn render_track(track: &Track) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Device {} ({} points)", track.device_id, track.len());

    let total = track.len() as f64;
    for (index, point) in track.playback().enumerate() {
        let zones = if point.inside.is_empty() {
            "-".to_string()
        } else {
            point.inside.join(", ")
        };
        let _ = writeln!(
            out,
            "  {:>3.0}%  {}  {:.6}, {:.6}  in: {}",
            (index + 1) as f64 / total * 100.0,
            point.timestamp.format("%H:%M:%S"),
            point.position.lat,
            point.position.lng,
            zones
        );
    }

    for transition in track.transitions() {
        match transition {
            Transition::Enter { geofence, at } => {
                let _ = writeln!(out, "  {} entered {}", at.format("%H:%M:%S"), geofence);
            }
            Transition::Exit { geofence, at } => {
                let _ = writeln!(out, "  {} left {}", at.format("%H:%M:%S"), geofence);
            }
        }
    }
    out
}
