//! Demo driver for the mount input layer
//!
//! Wires both inputs to an in-process bus, feeds them a short simulated
//! traffic scenario and runs a minimal stand-in for the owning scheduler:
//! poll each input by priority and log the merged control data.

use anyhow::Result;
use gimbal_input::messages::{CommandRequest, RoiMode, RoiUpdate, SetpointTriplet};
use gimbal_input::{CmdMountInput, ControlInput, MountBus, NodeAddress, RoiInput};
use mavlink::ardupilotmega::{MavCmd, MavMountMode, COMMAND_LONG_DATA};
use mavlink::MavHeader;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Per-cycle budget handed to each input
const CYCLE_TIMEOUT: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let bus = Arc::new(MountBus::new());
    let address = NodeAddress::new(1, 154); // MAV_COMP_ID_GIMBAL

    // direct commands take priority over ROI tracking
    let mut inputs: Vec<Box<dyn ControlInput>> = vec![
        Box::new(CmdMountInput::new(bus.clone(), address, false)),
        Box::new(RoiInput::new(bus.clone())),
    ];

    for input in &mut inputs {
        input.initialize().await?;
        info!("Input ready: {}", input.name());
    }

    let mut acks = bus.subscribe_acks().await?;
    tokio::spawn(async move {
        while let Ok(ack) = acks.recv().await {
            info!(
                "Ack sent: {:?} -> {}/{}",
                ack.command, ack.target_system, ack.target_component
            );
        }
    });

    spawn_demo_traffic(&bus);

    loop {
        let mut active = false;
        for input in &mut inputs {
            match input.update(CYCLE_TIMEOUT, active).await {
                Ok(Some(snapshot)) => {
                    active = true;
                    info!("{}: {:?}", input.name(), snapshot);
                }
                Ok(None) => {}
                Err(e) => warn!("{}: {}", input.name(), e),
            }
        }
    }
}

/// Publish a short scripted scenario exercising both inputs
fn spawn_demo_traffic(bus: &Arc<MountBus>) {
    let commands = bus.command_publisher();
    let roi = bus.roi_publisher();
    let setpoints = bus.setpoint_publisher();

    tokio::spawn(async move {
        let step = Duration::from_millis(200);

        sleep(step).await;
        let _ = commands
            .publish(command_long(
                MavCmd::MAV_CMD_DO_MOUNT_CONTROL,
                // pitch -30, yaw 45 degrees, MAVLINK_TARGETING mode
                [
                    -30.0,
                    0.0,
                    45.0,
                    0.0,
                    0.0,
                    0.0,
                    MavMountMode::MAV_MOUNT_MODE_MAVLINK_TARGETING as i32 as f32,
                ],
            ))
            .await;

        sleep(step).await;
        let _ = commands
            .publish(command_long(
                MavCmd::MAV_CMD_DO_DIGICAM_CONTROL,
                [0.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            ))
            .await;

        sleep(step).await;
        let _ = roi.publish(RoiUpdate::location(8.55, 47.37, 500.0)).await;

        sleep(step).await;
        let _ = setpoints
            .publish(SetpointTriplet::next_leg(8.6, 47.4, 520.0))
            .await;
        let _ = roi.publish(RoiUpdate::mode_only(RoiMode::NextWaypoint)).await;

        sleep(step).await;
        let _ = commands
            .publish(command_long(
                MavCmd::MAV_CMD_DO_MOUNT_CONTROL,
                [
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    MavMountMode::MAV_MOUNT_MODE_RETRACT as i32 as f32,
                ],
            ))
            .await;
    });
}

/// Build a command addressed to this node from the demo ground station
fn command_long(cmd: MavCmd, params: [f32; 7]) -> CommandRequest {
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
            target_system: 1,
            target_component: 154,
            confirmation: 0,
        },
    }
}
