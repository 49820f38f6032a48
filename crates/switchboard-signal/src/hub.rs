//! Hub task owning the registry
//!
//! Connection tasks never touch the registry directly. They send
//! [`HubCommand`]s through a [`HubHandle`]; the hub applies them one at a
//! time, so admissions, removals and routing are serialized without locks.
//! Each connection sends its commands in arrival order, which keeps
//! per-peer ordering intact.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use switchboard_core::PeerId;

use crate::error::SignalError;
use crate::messages::{ClientEvent, ServerEvent};
use crate::outbox::Outbox;
use crate::registry::{Admission, Registry};
use crate::router;

/// Commands consumed by the hub
#[derive(Debug)]
pub enum HubCommand {
    /// A channel opened
    Open {
        peer_id: PeerId,
        outbox: Outbox,
        ack: oneshot::Sender<Admission>,
    },
    /// An admitted channel closed
    Close { peer_id: PeerId },
    /// An admitted channel sent a signaling event
    Message { peer_id: PeerId, event: ClientEvent },
    /// Snapshot for monitoring
    Stats { reply: oneshot::Sender<HubStats> },
}

/// Monitoring snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    pub peers: usize,
}

/// The registry's owning task
pub struct Hub {
    registry: Registry,
    rx: mpsc::Receiver<HubCommand>,
}

impl Hub {
    /// Spawn a hub on the current runtime
    pub fn spawn(queue_capacity: usize) -> (HubHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let hub = Hub {
            registry: Registry::new(),
            rx,
        };
        let task = tokio::spawn(hub.run());
        (HubHandle { tx }, task)
    }

    /// Process commands until every handle is dropped
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            self.handle(command);
        }
        debug!("Hub stopped with {} peers registered", self.registry.len());
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Open {
                peer_id,
                outbox,
                ack,
            } => {
                let admission = self.registry.admit(peer_id.clone(), outbox);
                if admission == Admission::Admitted {
                    info!(
                        "Peer {} joined ({} connected)",
                        peer_id,
                        self.registry.len()
                    );
                }
                // The connection may already be gone; its close is never sent then
                let _ = ack.send(admission);
            }

            HubCommand::Close { peer_id } => {
                if self.registry.remove(&peer_id) {
                    self.registry.broadcast_except(
                        &peer_id,
                        ServerEvent::RemoveUser {
                            socket_id: peer_id.clone(),
                        },
                    );
                    info!("Peer {} left ({} connected)", peer_id, self.registry.len());
                }
            }

            HubCommand::Message { peer_id, event } => {
                router::route(&self.registry, &peer_id, event);
            }

            HubCommand::Stats { reply } => {
                let _ = reply.send(HubStats {
                    peers: self.registry.len(),
                });
            }
        }
    }
}

/// Cloneable sender side of the hub
#[derive(Clone, Debug)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Register a channel and wait for the admission outcome
    pub async fn open(&self, peer_id: PeerId, outbox: Outbox) -> Result<Admission, SignalError> {
        let (ack, rx) = oneshot::channel();
        self.send(HubCommand::Open {
            peer_id,
            outbox,
            ack,
        })
        .await?;
        rx.await.map_err(|_| SignalError::HubClosed)
    }

    /// Report that an admitted channel closed
    pub async fn close(&self, peer_id: PeerId) -> Result<(), SignalError> {
        self.send(HubCommand::Close { peer_id }).await
    }

    /// Hand an inbound event to the router
    pub async fn message(&self, peer_id: PeerId, event: ClientEvent) -> Result<(), SignalError> {
        self.send(HubCommand::Message { peer_id, event }).await
    }

    pub async fn stats(&self) -> Result<HubStats, SignalError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Stats { reply }).await?;
        rx.await.map_err(|_| SignalError::HubClosed)
    }

    async fn send(&self, command: HubCommand) -> Result<(), SignalError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| SignalError::HubClosed)
    }
}
