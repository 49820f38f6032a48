//! Signaling message routing
//!
//! Stateless dispatch: each inbound event is reshaped with the sender's id
//! and handed to the target's outbox. Payloads are never inspected. A
//! missing target drops the event without telling the sender, and so does
//! an event addressed to the sender itself.

use serde_json::Value;
use tracing::debug;

use switchboard_core::PeerId;

use crate::messages::{ClientEvent, ServerEvent};
use crate::registry::{Delivery, Registry};

/// Route one client event from `origin`
pub fn route(registry: &Registry, origin: &PeerId, event: ClientEvent) -> Delivery {
    match event {
        ClientEvent::CallUser { to, offer } => route_call_request(registry, origin, &to, offer),
        ClientEvent::MakeAnswer { to, answer } => route_answer(registry, origin, &to, answer),
        ClientEvent::RejectCall { from } => route_rejection(registry, origin, &from),
    }
}

/// Forward a call offer to `target` as `call-made`
pub fn route_call_request(
    registry: &Registry,
    origin: &PeerId,
    target: &PeerId,
    offer: Value,
) -> Delivery {
    forward(
        registry,
        origin,
        target,
        ServerEvent::CallMade {
            offer,
            socket: origin.clone(),
        },
    )
}

/// Forward an answer to `target` as `answer-made`
pub fn route_answer(
    registry: &Registry,
    origin: &PeerId,
    target: &PeerId,
    answer: Value,
) -> Delivery {
    forward(
        registry,
        origin,
        target,
        ServerEvent::AnswerMade {
            socket: origin.clone(),
            answer,
        },
    )
}

/// Tell the caller `target` that `origin` rejected its call
pub fn route_rejection(registry: &Registry, origin: &PeerId, target: &PeerId) -> Delivery {
    forward(
        registry,
        origin,
        target,
        ServerEvent::CallRejected {
            socket: origin.clone(),
        },
    )
}

fn forward(
    registry: &Registry,
    origin: &PeerId,
    target: &PeerId,
    event: ServerEvent,
) -> Delivery {
    let name = event.name();
    let delivery = if target == origin {
        Delivery::SelfAddressed
    } else {
        registry.send_to(target, event)
    };
    debug!("{} -> {}: {:?}", name, target, delivery);
    delivery
}
