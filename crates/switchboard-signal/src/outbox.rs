//! Server-to-client half of a peer's channel

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::OutboxError;
use crate::messages::ServerEvent;

/// Bounded, non-blocking sender of events to one peer
///
/// The connection's writer task owns the matching receiver.
#[derive(Clone, Debug)]
pub struct Outbox {
    tx: mpsc::Sender<ServerEvent>,
}

impl Outbox {
    /// Create an outbox and the receiver its writer drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue an event without waiting
    pub fn emit(&self, event: ServerEvent) -> Result<(), OutboxError> {
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => OutboxError::Full,
            TrySendError::Closed(_) => OutboxError::Closed,
        })
    }
}
