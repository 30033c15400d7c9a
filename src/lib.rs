//! fsocks Library
//!
//! SOCKS4/SOCKS5 handshake and relay message codec.
//!
//! The [`protocol`] module turns an async byte stream into validated
//! messages and back. The [`fuzz`] module holds optional obfuscation
//! transforms applied around the encoded bytes by the caller.

pub mod config;
pub mod fuzz;
pub mod protocol;

pub use config::Config;
pub use fuzz::{Fuzz, FuzzKind};
pub use protocol::{
    ClientGreeting, Packet, ProtocolError, Relay, RelayMessage, Reply, Request, ServerGreeting,
};

/// Common error type for configuration and tooling
pub type Result<T> = anyhow::Result<T>;
