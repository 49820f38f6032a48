//! Core type definitions for Switchboard
//!
//! These types are shared between the relay and anything that speaks its
//! wire protocol.

use serde::{Deserialize, Serialize};

/// Number of random bytes in a generated peer id
pub const PEER_ID_BYTES: usize = 8;

/// Identifier of one connected peer's signaling channel
///
/// Opaque to clients. Unique for the lifetime of the connection that owns it.
#[derive(Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Try to generate a random peer id, returning an error if RNG fails
    pub fn try_generate() -> Result<Self, getrandom::Error> {
        let mut bytes = [0u8; PEER_ID_BYTES];
        getrandom::fill(&mut bytes)?;
        Ok(Self(hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
