//! Command line interface.
//!
//! Each subcommand loads whatever state it needs, runs one console operation
//! and turns the result into text for the terminal.

use std::fmt::Write;

use clap::{Parser, Subcommand};
use tracing::warn;

use client::GeofenceBackend;
use domain::models::{ActivationHour, AssignmentAction};
use domain::services::geometry::LatLng;
use domain::services::view;

use crate::config::GpsConfig;
use crate::console::{GeofenceConsole, LoadReport};
use crate::error::ConsoleError;
use crate::playback;

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage geofences, devices and their assignments", long_about = None)]
pub struct Cli {
    /// Path to an additional configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Backend origin, overrides `api.base_url`
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List every geofence with its color and flags
    List,

    /// Select a geofence and show its assigned and available devices
    Show { geofence_id: i64 },

    /// Create a geofence from vertices given as `lat,lng`
    Create {
        #[arg(long)]
        name: String,
        #[arg(long = "point", value_parser = parse_lat_lng, required = true)]
        points: Vec<LatLng>,
    },

    /// Save a drawn geofence for one or more nodes
    Save {
        #[arg(long)]
        name: String,
        #[arg(long = "point", value_parser = parse_lat_lng, required = true)]
        points: Vec<LatLng>,
        #[arg(long = "node", required = true)]
        nodes: Vec<String>,
        #[arg(long)]
        active: bool,
    },

    /// Assign one or more devices to a geofence
    Assign {
        geofence_id: i64,
        #[arg(required = true)]
        device_ids: Vec<String>,
    },

    /// Assign a geofence to a device through the segmented downlink
    AssignSegmented { geofence_id: i64, device_id: String },

    /// Activate, deactivate or delete an assignment
    Update {
        device_id: String,
        geofence_id: i64,
        /// `activate`, `deactivate`, `delete` or the code 1, 2, 3
        action: AssignmentAction,
        /// `immediate`, `HH:MM` on a half hour, or a slot 0-48
        #[arg(long, default_value = "immediate")]
        hour: ActivationHour,
    },

    /// Delete a geofence that has no assignments
    Delete { geofence_id: i64 },

    /// Register a new device
    AddDevice { device_id: String, name: String },

    /// Replay the GPS tracks of a day
    Tracks {
        /// Day to replay, `YYYY-MM-DD`
        #[arg(long)]
        date: String,
        #[arg(long)]
        limit: Option<u32>,
        /// Only show this device
        #[arg(long)]
        device: Option<String>,
    },

    /// Print the activation hour choices
    Hours,
}

/// Text produced by a command and whether it fully succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub success: bool,
}

impl CommandOutput {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
        }
    }
}

/// Parses a `lat,lng` pair.
pub fn parse_lat_lng(raw: &str) -> Result<LatLng, String> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected `lat,lng`, got `{}`", raw))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude `{}`", lat.trim()))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude `{}`", lng.trim()))?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {} out of range", lat));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(format!("longitude {} out of range", lng));
    }
    Ok(LatLng::new(lat, lng))
}

/// Every activation hour with its label, one per line.
pub fn render_hours() -> String {
    ActivationHour::all()
        .map(|h| format!("{:>2}  {}\n", h.value(), h.label()))
        .collect()
}

/// Runs one command against the console.
pub async fn run<B: GeofenceBackend>(
    console: &mut GeofenceConsole<B>,
    command: Command,
    gps: &GpsConfig,
) -> Result<CommandOutput, ConsoleError> {
    match command {
        Command::List => {
            let report = console.load_all().await;
            let mut text = view::render_polygon_list(&console.polygons());
            append_load_warnings(&mut text, &report);
            Ok(CommandOutput {
                text,
                success: report.is_complete(),
            })
        }
        Command::Show { geofence_id } => {
            let report = console.load_all().await;
            let selection = console.select_geofence(geofence_id)?;
            let mut text = view::render_selection(&selection);
            append_load_warnings(&mut text, &report);
            Ok(CommandOutput {
                text,
                success: report.is_complete(),
            })
        }
        Command::Create { name, points } => {
            let geometry = GeofenceConsole::<B>::drawn_geometry(&points);
            let message = console.create_geofence(&name, geometry).await?;
            Ok(CommandOutput::ok(message))
        }
        Command::Save {
            name,
            points,
            nodes,
            active,
        } => {
            let geometry = GeofenceConsole::<B>::drawn_geometry(&points);
            let message = console
                .save_geofencing(&name, geometry, nodes, active)
                .await?;
            Ok(CommandOutput::ok(message))
        }
        Command::Assign {
            geofence_id,
            device_ids,
        } => {
            let report = console.assign_devices(geofence_id, &device_ids).await?;
            let mut text = String::new();
            for result in &report.results {
                match &result.outcome {
                    Ok(message) => {
                        let _ = writeln!(text, "{}: {}", result.device_id, message);
                    }
                    Err(e) => {
                        let _ = writeln!(text, "{}: failed: {}", result.device_id, e);
                    }
                }
            }
            Ok(CommandOutput {
                text,
                success: report.all_succeeded(),
            })
        }
        Command::AssignSegmented {
            geofence_id,
            device_id,
        } => {
            console.load_all().await;
            let message = console
                .assign_via_segmentation(geofence_id, &device_id)
                .await?;
            Ok(CommandOutput::ok(message))
        }
        Command::Update {
            device_id,
            geofence_id,
            action,
            hour,
        } => {
            console.load_all().await;
            let update = console
                .update_assignment(&device_id, geofence_id, action, hour)
                .await?;
            let mut text = update.confirmation;
            if let Some(message) = update.server_message {
                let _ = write!(text, "\n{}", message);
            }
            Ok(CommandOutput::ok(text))
        }
        Command::Delete { geofence_id } => {
            let message = console.delete_geofence(geofence_id).await?;
            Ok(CommandOutput::ok(message))
        }
        Command::AddDevice { device_id, name } => {
            let message = console.add_device(&device_id, &name).await?;
            Ok(CommandOutput::ok(message))
        }
        Command::Tracks {
            date,
            limit,
            device,
        } => {
            console.load_all().await;
            let limit = limit.unwrap_or(gps.default_limit);
            let tracks = console.fetch_tracks(&date, limit).await?;

            let text: String = tracks
                .iter()
                .filter(|t| device.as_deref().map_or(true, |d| t.device_id == d))
                .map(playback::render_track)
                .collect();
            if text.is_empty() {
                return Ok(CommandOutput::ok(format!("No GPS points for {}\n", date)));
            }
            Ok(CommandOutput::ok(text))
        }
        Command::Hours => Ok(CommandOutput::ok(render_hours())),
    }
}

fn append_load_warnings(text: &mut String, report: &LoadReport) {
    for failure in &report.failures {
        warn!(resource = %failure.resource, "Showing stale data");
        let _ = writeln!(
            text,
            "warning: could not load {}: {}",
            failure.resource, failure.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lat_lng() {
        assert_eq!(parse_lat_lng("48.85, 2.35"), Ok(LatLng::new(48.85, 2.35)));
        assert!(parse_lat_lng("48.85").is_err());
        assert!(parse_lat_lng("abc,2.0").is_err());
        assert!(parse_lat_lng("91.0,2.0").is_err());
        assert!(parse_lat_lng("48.0,181.0").is_err());
    }

    #[test]
    fn test_parse_update_command() {
        let cli = Cli::try_parse_from([
            "geofence-console",
            "update",
            "dev1",
            "7",
            "activate",
            "--hour",
            "08:30",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Command::Update {
                device_id: "dev1".to_string(),
                geofence_id: 7,
                action: AssignmentAction::Activate,
                hour: ActivationHour::new(17).unwrap(),
            }
        );
    }

    #[test]
    fn test_update_hour_defaults_to_immediate() {
        let cli =
            Cli::try_parse_from(["geofence-console", "update", "dev1", "7", "2"]).unwrap();
        match cli.command {
            Command::Update { action, hour, .. } => {
                assert_eq!(action, AssignmentAction::Deactivate);
                assert!(hour.is_immediate());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(Cli::try_parse_from(["geofence-console", "update", "dev1", "7", "4"]).is_err());
        assert!(Cli::try_parse_from([
            "geofence-console",
            "update",
            "dev1",
            "7",
            "activate",
            "--hour",
            "49"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["geofence-console", "create", "--name", "A"]).is_err());
    }

    #[test]
    fn test_parse_create_with_global_flags() {
        let cli = Cli::try_parse_from([
            "geofence-console",
            "create",
            "--name",
            "Zone A",
            "--point",
            "48.85,2.35",
            "--point",
            "48.86,2.36",
            "--point",
            "48.85,2.36",
            "--base-url",
            "http://localhost:3000",
        ])
        .unwrap();

        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(cli.verbose, 0);
        match cli.command {
            Command::Create { name, points } => {
                assert_eq!(name, "Zone A");
                assert_eq!(points.len(), 3);
                assert_eq!(points[0], LatLng::new(48.85, 2.35));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_verbose_flag_counts() {
        let cli = Cli::try_parse_from(["geofence-console", "-vv", "hours"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.command, Command::Hours);
    }

    #[test]
    fn test_render_hours() {
        let text = render_hours();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 49);
        assert_eq!(lines[0], " 0  00:00");
        assert_eq!(lines[47], "47  23:30");
        assert_eq!(lines[48], "48  Immediate");
    }
}
