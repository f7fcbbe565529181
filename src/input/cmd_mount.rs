//! Direct mount-command input
//!
//! Consumes MOUNT_CONTROL / MOUNT_CONFIGURE / DIGICAM_CONTROL commands from
//! the operator channel and reduces them to Neutral or Angle control data,
//! zoom and stabilization flags. Irrelevant or mis-addressed commands must
//! not silently consume the caller's timeout allowance, so the wait runs in
//! a budgeted retry loop: every premature wake-up subtracts the elapsed
//! time and the next wait only gets what is left.

use crate::bus::{MountBus, Publisher, Subscription};
use crate::config::NodeAddress;
use crate::control_data::{ControlData, ControlKind};
use crate::error::{SubscriptionError, TransportError};
use crate::input::ControlInput;
use crate::messages::{CommandAck, CommandRequest};
use async_trait::async_trait;
use mavlink::ardupilotmega::{MavCmd, MavMountMode};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

/// Input fed by direct vehicle commands
pub struct CmdMountInput {
    bus: Arc<MountBus>,
    address: NodeAddress,
    command_sub: Option<Subscription<CommandRequest>>,
    /// Ack publication handle, created on first use and then reused
    ack_pub: Option<Publisher<CommandAck>>,
    control_data: ControlData,
    /// Persisted per-axis stabilization flags; default set at construction
    stabilize: [bool; 3],
}

impl CmdMountInput {
    const NAME: &'static str = "Mavlink (CMD_MOUNT)";

    pub fn new(bus: Arc<MountBus>, address: NodeAddress, stabilize: bool) -> Self {
        Self {
            bus,
            address,
            command_sub: None,
            ack_pub: None,
            control_data: ControlData::default(),
            stabilize: [stabilize; 3],
        }
    }

    /// Last produced snapshot; stale until the next `update()` reports a change
    pub fn control_data(&self) -> &ControlData {
        &self.control_data
    }

    fn handle_mount_control(&mut self, request: &CommandRequest) -> Option<ControlData> {
        // MAV_CMD_DO_MOUNT_CONTROL carries the mount mode in param7
        let mode = request.data.param7 as i32;

        if mode == MavMountMode::MAV_MOUNT_MODE_RETRACT as i32 {
            debug!("MOUNT_CONTROL: retract");
            self.control_data.gimbal_shutter_retract = true;
        } else if mode == MavMountMode::MAV_MOUNT_MODE_NEUTRAL as i32 {
            debug!("MOUNT_CONTROL: neutral");
            self.control_data.kind = ControlKind::Neutral;
            self.control_data.gimbal_shutter_retract = false;
        } else if mode == MavMountMode::MAV_MOUNT_MODE_MAVLINK_TARGETING as i32 {
            self.control_data.kind = ControlKind::Angle;
            self.control_data.gimbal_shutter_retract = false;

            // param1: pitch (tilt), param2: roll, param3: yaw (pan), degrees
            let pitch = request.data.param1.to_radians();
            let roll = request.data.param2.to_radians();
            let yaw = request.data.param3.to_radians();

            if pitch.is_finite() && yaw.is_finite() {
                self.control_data.angle.angles[1] = pitch;
                self.control_data.angle.angles[2] = yaw;
                if roll.is_finite() {
                    self.control_data.angle.angles[0] = roll;
                }
            }
        } else {
            debug!("MOUNT_CONTROL: unsupported mode {}", mode);
            return None;
        }

        self.control_data.stabilize_axis = self.stabilize;
        Some(self.control_data)
    }

    fn handle_mount_configure(&mut self, request: &CommandRequest) -> ControlData {
        let data = &request.data;
        // MAV_CMD_DO_MOUNT_CONFIGURE carries the mount mode in param1
        let mode = data.param1 as i32;

        if mode == MavMountMode::MAV_MOUNT_MODE_RETRACT as i32 {
            debug!("MOUNT_CONFIGURE: retract");
            self.control_data.gimbal_shutter_retract = true;
        } else if mode == MavMountMode::MAV_MOUNT_MODE_NEUTRAL as i32 {
            debug!("MOUNT_CONFIGURE: neutral");
            self.control_data.kind = ControlKind::Neutral;
            self.control_data.gimbal_shutter_retract = false;
        }

        // the stabilization and rate flags apply independently of the mode
        self.stabilize = [
            data.param2 as u8 == 1,
            data.param3 as u8 == 1,
            data.param4 as u8 == 1,
        ];
        self.control_data.stabilize_axis = self.stabilize;
        self.control_data.angle.is_rate = [
            data.param5 as u8 == 1,
            data.param6 as u8 == 1,
            data.param7 as u8 == 1,
        ];

        self.ack(request);
        self.control_data
    }

    fn handle_digicam_control(&mut self, request: &CommandRequest) {
        // DIGICAM_CONTROL carries the zoom step in param2
        let zoom = request.data.param2 as i32;
        debug!("DIGICAM_CONTROL: zoom {}", zoom);
        self.control_data.zoom = zoom as f32;

        self.ack(request);
    }

    /// Publish exactly one accepted-ack for the given command
    fn ack(&mut self, request: &CommandRequest) {
        let ack = CommandAck::accepted(request);
        let bus = &self.bus;
        let publisher = self.ack_pub.get_or_insert_with(|| bus.ack_publisher());

        if let Err(e) = publisher.try_publish(ack) {
            warn!("Dropping command ack: {}", e);
        }
    }
}

#[async_trait]
impl ControlInput for CmdMountInput {
    async fn initialize(&mut self) -> Result<(), SubscriptionError> {
        self.command_sub = Some(self.bus.subscribe_commands().await?);
        Ok(())
    }

    async fn update(
        &mut self,
        budget: Duration,
        _already_active: bool,
    ) -> Result<Option<ControlData>, TransportError> {
        let deadline = Instant::now() + budget;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let sub = self
                .command_sub
                .as_mut()
                .ok_or(TransportError::NotInitialized(Self::NAME))?;

            // the first wait always runs; a zero budget still performs one
            // non-blocking check for an already queued command
            let request = match timeout(remaining, sub.recv()).await {
                Err(_) => return Ok(None),
                Ok(Err(e)) => return Err(e),
                Ok(Ok(request)) => request,
            };

            if !self
                .address
                .accepts(request.data.target_system, request.data.target_component)
            {
                debug!(
                    "Ignoring command {:?} for {}/{}",
                    request.data.command, request.data.target_system, request.data.target_component
                );
                if Instant::now() >= deadline {
                    return Ok(None);
                }
                continue;
            }

            match request.data.command {
                MavCmd::MAV_CMD_DO_MOUNT_CONTROL => {
                    return Ok(self.handle_mount_control(&request));
                }
                MavCmd::MAV_CMD_DO_MOUNT_CONFIGURE => {
                    return Ok(Some(self.handle_mount_configure(&request)));
                }
                MavCmd::MAV_CMD_DO_DIGICAM_CONTROL => {
                    // zoom-only update: acknowledged, but no new snapshot
                    self.handle_digicam_control(&request);
                    return Ok(None);
                }
                other => {
                    debug!("Ignoring unrelated command {:?}", other);
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::ardupilotmega::COMMAND_LONG_DATA;
    use mavlink::MavHeader;
    use std::f32::consts::{FRAC_PI_2, PI};

    const CYCLE: Duration = Duration::from_millis(100);

    fn command(cmd: MavCmd, params: [f32; 7], target: (u8, u8)) -> CommandRequest {
        CommandRequest {
            header: MavHeader {
                system_id: 255,
                component_id: 190,
                sequence: 0,
            },
            data: COMMAND_LONG_DATA {
                param1: params[0],
                param2: params[1],
                param3: params[2],
                param4: params[3],
                param5: params[4],
                param6: params[5],
                param7: params[6],
                command: cmd,
                target_system: target.0,
                target_component: target.1,
                confirmation: 0,
            },
        }
    }

    fn mount_control(mode: MavMountMode, angles: [f32; 3], target: (u8, u8)) -> CommandRequest {
        command(
            MavCmd::MAV_CMD_DO_MOUNT_CONTROL,
            // param1 pitch, param2 roll, param3 yaw, param7 mode
            [
                angles[1],
                angles[0],
                angles[2],
                0.0,
                0.0,
                0.0,
                mode as i32 as f32,
            ],
            target,
        )
    }

    async fn ready_input(stabilize: bool) -> (Arc<MountBus>, CmdMountInput) {
        let bus = Arc::new(MountBus::new());
        let mut input = CmdMountInput::new(bus.clone(), NodeAddress::new(1, 154), stabilize);
        input.initialize().await.expect("initialize failed");
        (bus, input)
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_command_leaves_snapshot_unchanged() {
        let (bus, mut input) = ready_input(false).await;
        let before = *input.control_data();

        bus.command_publisher()
            .publish(command(MavCmd::MAV_CMD_NAV_TAKEOFF, [0.0; 7], (1, 154)))
            .await
            .unwrap();

        assert!(input.update(CYCLE, false).await.unwrap().is_none());
        assert_eq!(*input.control_data(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatched_address_is_ignored() {
        let (bus, mut input) = ready_input(false).await;
        let before = *input.control_data();

        let publisher = bus.command_publisher();
        publisher
            .publish(mount_control(
                MavMountMode::MAV_MOUNT_MODE_RETRACT,
                [0.0; 3],
                (2, 154),
            ))
            .await
            .unwrap();
        publisher
            .publish(mount_control(
                MavMountMode::MAV_MOUNT_MODE_RETRACT,
                [0.0; 3],
                (1, 99),
            ))
            .await
            .unwrap();

        assert!(input.update(CYCLE, false).await.unwrap().is_none());
        assert_eq!(*input.control_data(), before);
    }

    #[tokio::test]
    async fn test_broadcast_component_is_accepted() {
        let (bus, mut input) = ready_input(false).await;

        bus.command_publisher()
            .publish(mount_control(
                MavMountMode::MAV_MOUNT_MODE_RETRACT,
                [0.0; 3],
                (1, 0),
            ))
            .await
            .unwrap();

        let snapshot = input.update(CYCLE, false).await.unwrap().expect("changed");
        assert!(snapshot.gimbal_shutter_retract);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_survives_irrelevant_traffic() {
        let (bus, mut input) = ready_input(false).await;

        let publisher = bus.command_publisher();
        tokio::spawn(async move {
            // three irrelevant commands, then a relevant one at 40ms
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
                publisher
                    .publish(command(MavCmd::MAV_CMD_NAV_TAKEOFF, [0.0; 7], (1, 154)))
                    .await
                    .unwrap();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            publisher
                .publish(mount_control(
                    MavMountMode::MAV_MOUNT_MODE_RETRACT,
                    [0.0; 3],
                    (1, 154),
                ))
                .await
                .unwrap();
        });

        let start = Instant::now();
        let snapshot = input.update(CYCLE, false).await.unwrap().expect("changed");
        assert!(snapshot.gimbal_shutter_retract);
        assert!(start.elapsed() < CYCLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_returns_no_change() {
        let (bus, mut input) = ready_input(false).await;

        let publisher = bus.command_publisher();
        tokio::spawn(async move {
            // nothing but irrelevant traffic, spaced inside the budget
            for _ in 0..6 {
                tokio::time::sleep(Duration::from_millis(30)).await;
                if publisher
                    .publish(command(MavCmd::MAV_CMD_NAV_TAKEOFF, [0.0; 7], (1, 154)))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        let start = Instant::now();
        assert!(input.update(CYCLE, false).await.unwrap().is_none());

        let elapsed = start.elapsed();
        assert!(elapsed >= CYCLE);
        assert!(elapsed < CYCLE + Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_targeting_converts_degrees_to_radians() {
        let (bus, mut input) = ready_input(false).await;

        // roll 0, pitch 90, yaw 180 degrees
        bus.command_publisher()
            .publish(mount_control(
                MavMountMode::MAV_MOUNT_MODE_MAVLINK_TARGETING,
                [0.0, 90.0, 180.0],
                (1, 154),
            ))
            .await
            .unwrap();

        let snapshot = input.update(CYCLE, false).await.unwrap().expect("changed");
        assert_eq!(snapshot.kind, ControlKind::Angle);
        assert!((snapshot.angle.angles[0]).abs() < 1e-6);
        assert!((snapshot.angle.angles[1] - FRAC_PI_2).abs() < 1e-6);
        assert!((snapshot.angle.angles[2] - PI).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_non_finite_pitch_keeps_previous_angles() {
        let (bus, mut input) = ready_input(false).await;
        let publisher = bus.command_publisher();

        publisher
            .publish(mount_control(
                MavMountMode::MAV_MOUNT_MODE_MAVLINK_TARGETING,
                [10.0, 45.0, 90.0],
                (1, 154),
            ))
            .await
            .unwrap();
        let first = input.update(CYCLE, false).await.unwrap().expect("changed");

        publisher
            .publish(mount_control(
                MavMountMode::MAV_MOUNT_MODE_MAVLINK_TARGETING,
                [20.0, f32::NAN, 120.0],
                (1, 154),
            ))
            .await
            .unwrap();
        let second = input.update(CYCLE, false).await.unwrap().expect("changed");

        // still reported as a change with the Angle interpretation active,
        // but the angle values are gated on finite pitch and yaw
        assert_eq!(second.kind, ControlKind::Angle);
        assert_eq!(second.angle.angles, first.angle.angles);
    }

    #[tokio::test]
    async fn test_retract_is_not_sticky_across_targeting() {
        let (bus, mut input) = ready_input(false).await;
        let publisher = bus.command_publisher();

        publisher
            .publish(mount_control(
                MavMountMode::MAV_MOUNT_MODE_RETRACT,
                [0.0; 3],
                (1, 154),
            ))
            .await
            .unwrap();
        let snapshot = input.update(CYCLE, false).await.unwrap().expect("changed");
        assert!(snapshot.gimbal_shutter_retract);

        publisher
            .publish(mount_control(
                MavMountMode::MAV_MOUNT_MODE_MAVLINK_TARGETING,
                [0.0, 30.0, 60.0],
                (1, 154),
            ))
            .await
            .unwrap();
        let snapshot = input.update(CYCLE, false).await.unwrap().expect("changed");
        assert!(!snapshot.gimbal_shutter_retract);
        assert_eq!(snapshot.kind, ControlKind::Angle);
    }

    #[tokio::test]
    async fn test_configure_captures_flags_and_acks_once() {
        let (bus, mut input) = ready_input(false).await;
        let mut acks = bus.subscribe_acks().await.unwrap();

        // neutral mode, stabilize roll+pitch, yaw as rate
        bus.command_publisher()
            .publish(command(
                MavCmd::MAV_CMD_DO_MOUNT_CONFIGURE,
                [
                    MavMountMode::MAV_MOUNT_MODE_NEUTRAL as i32 as f32,
                    1.0,
                    1.0,
                    0.0,
                    0.0,
                    0.0,
                    1.0,
                ],
                (1, 154),
            ))
            .await
            .unwrap();

        let snapshot = input.update(CYCLE, false).await.unwrap().expect("changed");
        assert_eq!(snapshot.kind, ControlKind::Neutral);
        assert!(!snapshot.gimbal_shutter_retract);
        assert_eq!(snapshot.stabilize_axis, [true, true, false]);
        assert_eq!(snapshot.angle.is_rate, [false, false, true]);

        let ack = acks.recv().await.unwrap();
        assert_eq!(ack.command, MavCmd::MAV_CMD_DO_MOUNT_CONFIGURE);
        assert_eq!(ack.target_system, 255);
        assert_eq!(ack.target_component, 190);
        assert!(acks.try_recv().is_none(), "exactly one ack expected");
    }

    #[tokio::test]
    async fn test_digicam_sets_zoom_without_snapshot() {
        let (bus, mut input) = ready_input(false).await;
        let mut acks = bus.subscribe_acks().await.unwrap();

        bus.command_publisher()
            .publish(command(
                MavCmd::MAV_CMD_DO_DIGICAM_CONTROL,
                [0.0, 4.7, 0.0, 0.0, 0.0, 0.0, 0.0],
                (1, 154),
            ))
            .await
            .unwrap();

        assert!(input.update(CYCLE, false).await.unwrap().is_none());
        assert_eq!(input.control_data().zoom, 4.0);

        let ack = acks.recv().await.unwrap();
        assert_eq!(ack.command, MavCmd::MAV_CMD_DO_DIGICAM_CONTROL);
        assert!(acks.try_recv().is_none(), "exactly one ack expected");
    }

    #[tokio::test]
    async fn test_constructor_stabilize_default_applies() {
        let (bus, mut input) = ready_input(true).await;

        bus.command_publisher()
            .publish(mount_control(
                MavMountMode::MAV_MOUNT_MODE_NEUTRAL,
                [0.0; 3],
                (1, 154),
            ))
            .await
            .unwrap();

        let snapshot = input.update(CYCLE, false).await.unwrap().expect("changed");
        assert_eq!(snapshot.stabilize_axis, [true; 3]);
    }

    #[tokio::test]
    async fn test_zero_budget_still_consumes_queued_command() {
        let (bus, mut input) = ready_input(false).await;

        bus.command_publisher()
            .publish(mount_control(
                MavMountMode::MAV_MOUNT_MODE_RETRACT,
                [0.0; 3],
                (1, 154),
            ))
            .await
            .unwrap();

        let snapshot = input
            .update(Duration::ZERO, false)
            .await
            .unwrap()
            .expect("changed");
        assert!(snapshot.gimbal_shutter_retract);
    }
}
