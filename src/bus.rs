//! In-process message bus for the mount node
//!
//! Bounded publish/subscribe channels standing in for the external
//! transport at its interface boundary. Each topic accepts any number of
//! publishers and exactly one subscriber (the input that owns it).

use crate::error::{SubscriptionError, TransportError};
use crate::messages::{CommandAck, CommandRequest, RoiUpdate, SetpointTriplet};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;

/// Queue depth for the inbound topics
pub const TOPIC_DEPTH: usize = 16;

/// Queue depth for outbound command acks; kept small, but deep enough that
/// several outstanding acks never block the producer
pub const ACK_QUEUE_DEPTH: usize = 4;

/// Publishing half of a topic
pub struct Publisher<T> {
    topic: &'static str,
    tx: mpsc::Sender<T>,
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic,
            tx: self.tx.clone(),
        }
    }
}

impl<T> Publisher<T> {
    /// Publish a message, waiting for queue space if necessary
    pub async fn publish(&self, msg: T) -> Result<(), TransportError> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| TransportError::SourceClosed(self.topic))
    }

    /// Publish without blocking; fails when the queue is full or closed
    pub fn try_publish(&self, msg: T) -> Result<(), TrySendError<T>> {
        self.tx.try_send(msg)
    }
}

/// Subscribing half of a topic
pub struct Subscription<T> {
    topic: &'static str,
    rx: mpsc::Receiver<T>,
}

impl<T> Subscription<T> {
    /// Wait for the next message
    ///
    /// Returns an error only when the topic itself is gone; an empty queue
    /// simply waits.
    pub async fn recv(&mut self) -> Result<T, TransportError> {
        self.rx
            .recv()
            .await
            .ok_or(TransportError::SourceClosed(self.topic))
    }

    /// Take a queued message without waiting
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Topic name, for diagnostics
    pub fn topic(&self) -> &'static str {
        self.topic
    }
}

/// One named topic: a bounded channel plus its unclaimed receiver
struct Topic<T> {
    name: &'static str,
    tx: mpsc::Sender<T>,
    rx: Mutex<Option<mpsc::Receiver<T>>>,
}

impl<T> Topic<T> {
    fn new(name: &'static str, depth: usize) -> Self {
        let (tx, rx) = mpsc::channel(depth);
        Self {
            name,
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    fn publisher(&self) -> Publisher<T> {
        Publisher {
            topic: self.name,
            tx: self.tx.clone(),
        }
    }

    async fn subscribe(&self) -> Result<Subscription<T>, SubscriptionError> {
        let rx = self
            .rx
            .lock()
            .await
            .take()
            .ok_or(SubscriptionError::AlreadySubscribed(self.name))?;

        Ok(Subscription {
            topic: self.name,
            rx,
        })
    }
}

/// The mount node's message bus
pub struct MountBus {
    roi: Topic<RoiUpdate>,
    setpoints: Topic<SetpointTriplet>,
    commands: Topic<CommandRequest>,
    acks: Topic<CommandAck>,
}

impl MountBus {
    /// Create a bus with all four topics
    pub fn new() -> Self {
        Self {
            roi: Topic::new("vehicle_roi", TOPIC_DEPTH),
            setpoints: Topic::new("position_setpoint_triplet", TOPIC_DEPTH),
            commands: Topic::new("vehicle_command", TOPIC_DEPTH),
            acks: Topic::new("vehicle_command_ack", ACK_QUEUE_DEPTH),
        }
    }

    pub fn roi_publisher(&self) -> Publisher<RoiUpdate> {
        self.roi.publisher()
    }

    pub fn setpoint_publisher(&self) -> Publisher<SetpointTriplet> {
        self.setpoints.publisher()
    }

    pub fn command_publisher(&self) -> Publisher<CommandRequest> {
        self.commands.publisher()
    }

    pub fn ack_publisher(&self) -> Publisher<CommandAck> {
        self.acks.publisher()
    }

    pub async fn subscribe_roi(&self) -> Result<Subscription<RoiUpdate>, SubscriptionError> {
        self.roi.subscribe().await
    }

    pub async fn subscribe_setpoints(
        &self,
    ) -> Result<Subscription<SetpointTriplet>, SubscriptionError> {
        self.setpoints.subscribe().await
    }

    pub async fn subscribe_commands(
        &self,
    ) -> Result<Subscription<CommandRequest>, SubscriptionError> {
        self.commands.subscribe().await
    }

    pub async fn subscribe_acks(&self) -> Result<Subscription<CommandAck>, SubscriptionError> {
        self.acks.subscribe().await
    }
}

impl Default for MountBus {
    fn default() -> Self {
        Self::new()
    }
}
