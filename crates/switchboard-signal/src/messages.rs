//! Signal protocol messages
//!
//! Every WebSocket text frame carries one named event:
//! `{"event": "<name>", "data": { ... }}`. Offer and answer blobs are opaque
//! JSON values and pass through untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use switchboard_core::PeerId;

/// Events a client sends to the relay
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Offer a call to `to`
    CallUser {
        to: PeerId,
        #[serde(default)]
        offer: Value,
    },

    /// Answer a call from `to`
    MakeAnswer {
        to: PeerId,
        #[serde(default)]
        answer: Value,
    },

    /// Reject a call placed by `from`
    RejectCall { from: PeerId },
}

/// Events the relay sends to a client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Peers the receiver can call
    UpdateUserList { users: Vec<PeerId> },

    /// A peer disconnected
    RemoveUser {
        #[serde(rename = "socketId")]
        socket_id: PeerId,
    },

    /// Incoming call offer from `socket`
    CallMade { offer: Value, socket: PeerId },

    /// Answer from `socket` to a call the receiver placed
    AnswerMade { socket: PeerId, answer: Value },

    /// `socket` rejected a call the receiver placed
    CallRejected { socket: PeerId },
}

impl ClientEvent {
    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::CallUser { .. } => "call-user",
            ClientEvent::MakeAnswer { .. } => "make-answer",
            ClientEvent::RejectCall { .. } => "reject-call",
        }
    }
}

impl ServerEvent {
    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::UpdateUserList { .. } => "update-user-list",
            ServerEvent::RemoveUser { .. } => "remove-user",
            ServerEvent::CallMade { .. } => "call-made",
            ServerEvent::AnswerMade { .. } => "answer-made",
            ServerEvent::CallRejected { .. } => "call-rejected",
        }
    }
}
