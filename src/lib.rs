//! Command-ingestion and translation layer for a camera/gimbal mount
//!
//! Two independent inputs receive asynchronous, possibly conflicting
//! directives (ROI tracking updates and direct operator commands) and
//! reduce them to a single internally consistent [`ControlData`] snapshot
//! for the downstream actuator stage. The inputs share the
//! [`ControlInput`] contract and are driven once per control cycle by an
//! external scheduler, which merges their outputs by priority.

pub mod bus;
pub mod config;
pub mod control_data;
pub mod error;
pub mod input;
pub mod messages;

pub use bus::MountBus;
pub use config::NodeAddress;
pub use control_data::{ControlData, ControlKind};
pub use error::{SubscriptionError, TransportError};
pub use input::{CmdMountInput, ControlInput, RoiInput};
