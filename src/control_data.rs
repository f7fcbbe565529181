//! Unified control-data snapshot produced by the mount inputs
//!
//! Each input owns a single long-lived `ControlData` record and overwrites
//! it in place; `update()` hands out a copy whenever the record changed.
//! The payload fields mirror the downstream actuator stage's expectations:
//! only the fields selected by `kind` are meaningful, the rest are stale
//! and must not be read.

/// Which interpretation of the snapshot is currently active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlKind {
    /// Park the mount in its neutral pose
    #[default]
    Neutral,
    /// Drive the axes from explicit angle (or rate) setpoints
    Angle,
    /// Point at an absolute geographic target
    LonLat,
}

/// Axis angle setpoints, meaningful when `kind == ControlKind::Angle`
///
/// Axis order is roll, pitch, yaw; angles are in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngleSetpoint {
    /// Per-axis angle in radians
    pub angles: [f32; 3],
    /// Per-axis flag: the angle is a rate command rather than an absolute angle
    pub is_rate: [bool; 3],
}

/// Geographic look-at target, meaningful when `kind == ControlKind::LonLat`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetPoint {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude_m: f32,
    /// Roll to hold while pointing at the target, radians
    pub roll_angle: f32,
    /// Fixed look-down pitch for the look-at geometry, radians
    pub pitch_fixed_angle: f32,
}

/// The unified output snapshot both inputs populate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlData {
    /// Active interpretation; payload fields of the other variants are stale
    pub kind: ControlKind,
    pub angle: AngleSetpoint,
    pub lonlat: TargetPoint,
    /// Stow/retract the gimbal; overrides the payload downstream
    pub gimbal_shutter_retract: bool,
    /// Camera zoom level, independent of mount geometry
    pub zoom: f32,
    /// Per-axis flag: apply downstream stabilization to roll/pitch/yaw
    pub stabilize_axis: [bool; 3],
}

impl Default for ControlData {
    fn default() -> Self {
        Self {
            kind: ControlKind::Neutral,
            angle: AngleSetpoint::default(),
            lonlat: TargetPoint::default(),
            gimbal_shutter_retract: false,
            zoom: 1.0,
            stabilize_axis: [false; 3],
        }
    }
}

impl ControlData {
    /// Select the LonLat interpretation and set the target point
    pub fn set_lon_lat(&mut self, longitude: f64, latitude: f64, altitude_m: f32) {
        self.kind = ControlKind::LonLat;
        self.lonlat.longitude = longitude;
        self.lonlat.latitude = latitude;
        self.lonlat.altitude_m = altitude_m;
    }
}
