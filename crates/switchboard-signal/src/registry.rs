//! Registry of connected peers

use tracing::{debug, warn};

use switchboard_core::PeerId;

use crate::error::OutboxError;
use crate::messages::ServerEvent;
use crate::outbox::Outbox;

/// The set of currently connected peers, in connection order
///
/// Owned by the hub task; nothing else reads or writes it.
#[derive(Default)]
pub struct Registry {
    peers: Vec<Peer>,
}

/// A connected peer
struct Peer {
    id: PeerId,
    outbox: Outbox,
}

/// Result of an admission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The peer was added and presence was broadcast
    Admitted,
    /// The id was already registered; nothing changed
    Duplicate,
}

/// Outcome of handing one event to one peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Target is not registered; the event was dropped
    TargetNotFound,
    /// Target is the sender itself; the event was dropped
    SelfAddressed,
    /// Target's outbox is full; the event was dropped
    Backpressured,
    /// Target's writer has gone away; the event was dropped
    Closed,
}

impl From<Result<(), OutboxError>> for Delivery {
    fn from(result: Result<(), OutboxError>) -> Self {
        match result {
            Ok(()) => Delivery::Delivered,
            Err(OutboxError::Full) => Delivery::Backpressured,
            Err(OutboxError::Closed) => Delivery::Closed,
        }
    }
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a newly opened channel under `id`
    ///
    /// On success the new peer receives the roster of everyone else, then
    /// everyone else learns about the new peer. A duplicate id changes
    /// nothing and sends nothing.
    pub fn admit(&mut self, id: PeerId, outbox: Outbox) -> Admission {
        if self.contains(&id) {
            warn!("Ignoring duplicate admission of peer {}", id);
            return Admission::Duplicate;
        }

        self.peers.push(Peer {
            id: id.clone(),
            outbox,
        });

        let roster = ServerEvent::UpdateUserList {
            users: self.list_others(&id),
        };
        let delivery = self.send_to(&id, roster);
        if delivery != Delivery::Delivered {
            debug!("Roster for {} not delivered: {:?}", id, delivery);
        }

        self.broadcast_except(
            &id,
            ServerEvent::UpdateUserList {
                users: vec![id.clone()],
            },
        );

        Admission::Admitted
    }

    /// Remove a peer; returns whether it was present
    pub fn remove(&mut self, id: &PeerId) -> bool {
        let before = self.peers.len();
        self.peers.retain(|p| &p.id != id);
        self.peers.len() != before
    }

    /// Every registered id except `excluding`, in connection order
    pub fn list_others(&self, excluding: &PeerId) -> Vec<PeerId> {
        self.peers
            .iter()
            .filter(|p| &p.id != excluding)
            .map(|p| p.id.clone())
            .collect()
    }

    /// Send `event` to every registered peer except `id`
    ///
    /// Returns the number of peers the event was queued for.
    pub fn broadcast_except(&self, id: &PeerId, event: ServerEvent) -> usize {
        let mut delivered = 0;
        for peer in self.peers.iter().filter(|p| &p.id != id) {
            match Delivery::from(peer.outbox.emit(event.clone())) {
                Delivery::Delivered => delivered += 1,
                failure => warn!(
                    "Dropped {} for {}: {:?}",
                    event.name(),
                    peer.id,
                    failure
                ),
            }
        }
        delivered
    }

    /// Send `event` to one peer
    pub fn send_to(&self, id: &PeerId, event: ServerEvent) -> Delivery {
        match self.peers.iter().find(|p| &p.id == id) {
            Some(peer) => peer.outbox.emit(event).into(),
            None => Delivery::TargetNotFound,
        }
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.iter().any(|p| &p.id == id)
    }

    /// All registered ids, in connection order
    #[cfg(test)]
    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.iter().map(|p| p.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
