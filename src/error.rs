//! Error types for the input layer
//!
//! Only genuine transport and subscription failures cross the component
//! boundary. Timeouts, irrelevant commands and unsupported modes are
//! resolved inside `update()` and surfaced as "no change".

use thiserror::Error;

/// Errors raised while establishing message-source subscriptions
///
/// A failed `initialize()` is fatal to that input instance; callers must
/// not go on to call `update()`.
#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("Topic `{0}` already has a subscriber")]
    AlreadySubscribed(&'static str),
}

/// Errors raised when the wait primitive itself fails (not a timeout)
///
/// The input's internal state is left unchanged; the caller may retry on
/// the next cycle.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Topic `{0}` closed while waiting for input")]
    SourceClosed(&'static str),

    #[error("Input `{0}` used before a successful initialize()")]
    NotInitialized(&'static str),
}
