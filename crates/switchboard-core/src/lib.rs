//! Switchboard Core - Shared types, configuration, and path utilities
//!
//! This crate contains the foundational types used by the Switchboard relay.
//! It has no dependencies on networking code.

pub mod config;
pub mod error;
pub mod path;
pub mod types;

pub use config::{Config, HttpConfig, RelayConfig, ServerConfig};
pub use error::*;
pub use types::*;

/// Default listening port
pub const DEFAULT_PORT: u16 = 5000;

/// Maximum request path length in bytes
pub const MAX_PATH_LEN: usize = 4096;

/// Maximum filename length in bytes
pub const MAX_FILENAME_LEN: usize = 255;
