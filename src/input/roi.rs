//! Region-of-interest input
//!
//! Consumes ROI-mode updates from the tracking subsystem together with the
//! navigator's position setpoints and reduces them to Neutral or LonLat
//! control data. The last observed ROI mode is persisted so that a
//! setpoint arriving on its own is reinterpreted under the mode selected
//! earlier.

use crate::bus::{MountBus, Subscription};
use crate::control_data::{ControlData, ControlKind};
use crate::error::{SubscriptionError, TransportError};
use crate::input::ControlInput;
use crate::messages::{RoiMode, RoiUpdate, SetpointTriplet};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Fixed look-down pitch applied while tracking the next waypoint, degrees
const WPNEXT_PITCH_DOWN_DEG: f32 = -10.0;

/// What woke the single per-cycle wait
enum Wake {
    Roi(RoiUpdate),
    Setpoint(SetpointTriplet),
    Timeout,
}

/// Input fed by the ROI tracking subsystem
pub struct RoiInput {
    bus: Arc<MountBus>,
    roi_sub: Option<Subscription<RoiUpdate>>,
    setpoint_sub: Option<Subscription<SetpointTriplet>>,
    control_data: ControlData,
    /// Last observed ROI mode, persisted across update calls
    current_roi_mode: RoiMode,
    /// Latest consumed setpoint; read back when tracking the next waypoint
    last_setpoint: Option<SetpointTriplet>,
}

impl RoiInput {
    const NAME: &'static str = "Mavlink (ROI)";

    pub fn new(bus: Arc<MountBus>) -> Self {
        Self {
            bus,
            roi_sub: None,
            setpoint_sub: None,
            control_data: ControlData::default(),
            current_roi_mode: RoiMode::None,
            last_setpoint: None,
        }
    }

    /// Last produced snapshot; stale until the next `update()` reports a change
    pub fn control_data(&self) -> &ControlData {
        &self.control_data
    }

    /// Drain any queued setpoints so the freshest one is on record
    fn refresh_setpoint(&mut self) {
        while let Some(triplet) = self.setpoint_sub.as_mut().and_then(|s| s.try_recv()) {
            self.last_setpoint = Some(triplet);
        }
    }

    /// Copy the next leg of the recorded setpoint into the LonLat payload
    fn apply_next_setpoint(&mut self) {
        match self.last_setpoint {
            Some(triplet) => {
                let next = triplet.next;
                self.control_data
                    .set_lon_lat(next.longitude, next.latitude, next.altitude_m);
            }
            // no setpoint published yet; the target point keeps its defaults
            None => self.control_data.kind = ControlKind::LonLat,
        }
    }

    fn handle_roi(&mut self, roi: RoiUpdate) -> bool {
        // every ROI message resets the retract and stabilization defaults
        self.control_data.gimbal_shutter_retract = false;
        self.control_data.stabilize_axis = [false; 3];

        let changed = match roi.mode {
            RoiMode::None => {
                self.control_data.kind = ControlKind::Neutral;
                true
            }
            RoiMode::NextWaypoint => {
                self.refresh_setpoint();
                self.apply_next_setpoint();
                self.control_data.lonlat.roll_angle = 0.0;
                self.control_data.lonlat.pitch_fixed_angle = WPNEXT_PITCH_DOWN_DEG.to_radians();
                true
            }
            RoiMode::Location => {
                self.control_data
                    .set_lon_lat(roi.longitude, roi.latitude, roi.altitude_m);
                true
            }
            RoiMode::WaypointIndex | RoiMode::Target => {
                // not supported by this input
                debug!("Ignoring unsupported ROI mode {:?}", roi.mode);
                false
            }
        };

        self.current_roi_mode = roi.mode;
        changed
    }

    fn handle_setpoint(&mut self, triplet: SetpointTriplet) -> bool {
        // record the setpoint in every case, even when it is not surfaced
        self.last_setpoint = Some(triplet);

        if self.current_roi_mode == RoiMode::NextWaypoint {
            self.apply_next_setpoint();
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl ControlInput for RoiInput {
    async fn initialize(&mut self) -> Result<(), SubscriptionError> {
        self.roi_sub = Some(self.bus.subscribe_roi().await?);
        self.setpoint_sub = Some(self.bus.subscribe_setpoints().await?);
        Ok(())
    }

    async fn update(
        &mut self,
        timeout: Duration,
        _already_active: bool,
    ) -> Result<Option<ControlData>, TransportError> {
        let wake = {
            let roi_sub = self
                .roi_sub
                .as_mut()
                .ok_or(TransportError::NotInitialized(Self::NAME))?;
            let setpoint_sub = self
                .setpoint_sub
                .as_mut()
                .ok_or(TransportError::NotInitialized(Self::NAME))?;

            tokio::select! {
                biased;
                msg = roi_sub.recv() => Wake::Roi(msg?),
                msg = setpoint_sub.recv() => Wake::Setpoint(msg?),
                _ = tokio::time::sleep(timeout) => Wake::Timeout,
            }
        };

        let changed = match wake {
            Wake::Timeout => return Ok(None),
            Wake::Roi(roi) => {
                let mut changed = self.handle_roi(roi);
                // a setpoint may have arrived in the same cycle
                if let Some(triplet) = self.setpoint_sub.as_mut().and_then(|s| s.try_recv()) {
                    changed |= self.handle_setpoint(triplet);
                }
                changed
            }
            Wake::Setpoint(triplet) => self.handle_setpoint(triplet),
        };

        Ok(changed.then_some(self.control_data))
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}
