//! Message types exchanged over the mount bus
//!
//! These types describe the boundary to the publish/subscribe transport:
//! inbound ROI updates, position setpoints and direct vehicle commands,
//! and outbound command acknowledgments. Direct commands reuse the
//! MAVLink COMMAND_LONG wire layout together with the sender's header.

use mavlink::ardupilotmega::{MavCmd, MavResult, COMMAND_LONG_DATA};
use mavlink::MavHeader;
use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current timestamp in microseconds since the Unix epoch
pub fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

/// Region-of-interest tracking mode selected by the ROI subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoiMode {
    /// No region of interest; return the mount to neutral
    #[default]
    None,
    /// Track the next mission waypoint
    NextWaypoint,
    /// Track a waypoint by index
    WaypointIndex,
    /// Track a fixed geographic location
    Location,
    /// Track a moving target
    Target,
}

/// ROI-mode update published by the tracking subsystem
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoiUpdate {
    pub mode: RoiMode,
    /// Target point, meaningful for `RoiMode::Location`
    pub longitude: f64,
    pub latitude: f64,
    pub altitude_m: f32,
}

impl RoiUpdate {
    /// Create a mode-only update (no target point)
    pub fn mode_only(mode: RoiMode) -> Self {
        Self {
            mode,
            longitude: 0.0,
            latitude: 0.0,
            altitude_m: 0.0,
        }
    }

    /// Create a fixed-location ROI update
    pub fn location(longitude: f64, latitude: f64, altitude_m: f32) -> Self {
        Self {
            mode: RoiMode::Location,
            longitude,
            latitude,
            altitude_m,
        }
    }
}

/// One leg of the navigator's position setpoint triplet
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionSetpoint {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude_m: f32,
}

/// Position setpoint triplet; only the next leg is consumed here
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SetpointTriplet {
    pub next: PositionSetpoint,
}

impl SetpointTriplet {
    /// Create a triplet from the next leg's coordinates
    pub fn next_leg(longitude: f64, latitude: f64, altitude_m: f32) -> Self {
        Self {
            next: PositionSetpoint {
                longitude,
                latitude,
                altitude_m,
            },
        }
    }
}

/// Direct vehicle command received from the operator/ground-station channel
///
/// The command id, parameters and target address travel in `data`; the
/// sender's system/component ids travel in `header`.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub header: MavHeader,
    pub data: COMMAND_LONG_DATA,
}

/// Acknowledgment published for an accepted command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandAck {
    pub timestamp_us: u64,
    /// Echo of the acknowledged command id
    pub command: MavCmd,
    pub result: MavResult,
    pub result_param1: i32,
    pub result_param2: i32,
    /// Addressed back to the original sender
    pub target_system: u8,
    pub target_component: u8,
    /// This ack originates from the mount node itself
    pub from_external: bool,
}

impl CommandAck {
    /// Create an accepted-ack for a received command
    pub fn accepted(request: &CommandRequest) -> Self {
        Self {
            timestamp_us: now_us(),
            command: request.data.command,
            result: MavResult::MAV_RESULT_ACCEPTED,
            result_param1: 0,
            result_param2: 0,
            target_system: request.header.system_id,
            target_component: request.header.component_id,
            from_external: false,
        }
    }
}
