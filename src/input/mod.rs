//! Control input components
//!
//! Each input consumes one or more message sources and reduces them to the
//! unified [`ControlData`] snapshot. Inputs are driven by an external
//! scheduler that calls [`ControlInput::update`] once per control cycle and
//! merges the outputs by priority.

mod cmd_mount;
mod roi;

pub use cmd_mount::CmdMountInput;
pub use roi::RoiInput;

use crate::control_data::ControlData;
use crate::error::{SubscriptionError, TransportError};
use async_trait::async_trait;
use std::time::Duration;

/// Common contract for the mount control inputs
#[async_trait]
pub trait ControlInput: Send {
    /// Establish the input's message-source subscriptions
    ///
    /// A failure is fatal to this instance; `update()` must not be called
    /// afterwards.
    async fn initialize(&mut self) -> Result<(), SubscriptionError>;

    /// Advance the input, waiting up to `timeout` for relevant messages
    ///
    /// Returns `Ok(Some(snapshot))` when the control data changed this
    /// cycle and `Ok(None)` when it did not (timeout, or only irrelevant
    /// traffic). The returned snapshot is a copy; it stays valid after the
    /// next call. `already_active` tells the input whether a higher-priority
    /// input already produced output this cycle.
    async fn update(
        &mut self,
        timeout: Duration,
        already_active: bool,
    ) -> Result<Option<ControlData>, TransportError>;

    /// Human-readable identity for status output
    fn name(&self) -> &'static str;
}
