//! SOCKS Protocol Codec
//!
//! Wire-format encoding and decoding of the SOCKS4/SOCKS5 handshake and
//! relay messages. The codec never opens sockets: it reads from any
//! `AsyncRead` and writes to any `AsyncWrite` handed to it.

pub mod constants;
pub mod error;
pub mod greeting;
pub mod packet;
pub mod relay;
pub mod types;

pub use error::{ProtocolError, Result};
pub use greeting::{ClientGreeting, ServerGreeting};
pub use packet::Packet;
pub use relay::{read_relay, Relay, RelayCode, RelayMessage, Reply, Request};
pub use types::*;
