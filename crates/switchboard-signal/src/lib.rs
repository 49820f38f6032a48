//! Switchboard Signal Server
//!
//! WebRTC signaling relay. Browsers connect over WebSocket, learn who else
//! is online, and exchange call offers, answers and rejections through the
//! relay. Media never passes through it.
//!
//! # Protocol
//!
//! 1. Client connects and receives `update-user-list` with every other peer
//! 2. Everyone else receives `update-user-list` with the new peer's id
//! 3. `call-user`, `make-answer` and `reject-call` are forwarded to the
//!    named peer as `call-made`, `answer-made` and `call-rejected`
//! 4. On disconnect every remaining peer receives `remove-user`
//!
//! Plain HTTP GET requests on the same port get the landing page, static
//! assets, or `/health`.

pub mod error;
pub mod http;
pub mod hub;
pub mod messages;
pub mod outbox;
pub mod registry;
pub mod router;
pub mod server;

pub use error::{OutboxError, SignalError};
pub use hub::{Hub, HubHandle, HubStats};
pub use messages::{ClientEvent, ServerEvent};
pub use outbox::Outbox;
pub use registry::{Admission, Delivery, Registry};
pub use server::SignalServer;
