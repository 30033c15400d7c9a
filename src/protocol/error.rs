//! Protocol Error
//!
//! A single error kind for every codec failure. It carries the SOCKS reply
//! code that a server should send back to the peer, so a decode failure can
//! be turned straight into a wire-level reply.

use std::borrow::Cow;
use std::io;
use thiserror::Error;

use super::relay::Reply;
use super::types::{Address, ProtocolVersion, ReplyCode};

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Malformed or semantically invalid SOCKS input
#[derive(Debug, Clone, Error)]
#[error("{reason} ({code})")]
pub struct ProtocolError {
    code: ReplyCode,
    reason: Cow<'static, str>,
}

impl ProtocolError {
    /// Create an error with an explicit reply code
    pub fn new(code: ReplyCode, reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Create an error carrying `GENERAL_SOCKS_SERVER_FAILURE`
    pub fn general(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ReplyCode::GeneralFailure, reason)
    }

    /// Reply code to report to the peer
    pub fn code(&self) -> ReplyCode {
        self.code
    }

    /// Human-readable reason
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// SOCKS5 reply a server sends back for this error
    pub fn reply(&self, bind: Address) -> Reply {
        Reply::new(ProtocolVersion::Socks5, self.code, bind)
    }
}

impl From<io::Error> for ProtocolError {
    fn from(err: io::Error) -> Self {
        let reason = match err.kind() {
            io::ErrorKind::UnexpectedEof => {
                format!("stream closed before message was complete: {}", err)
            }
            _ => format!("I/O error: {}", err),
        };
        Self::new(ReplyCode::from(err.kind()), reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_reply_name() {
        let err = ProtocolError::general("invalid reserved byte 0x01");
        assert_eq!(
            err.to_string(),
            "invalid reserved byte 0x01 (GENERAL_SOCKS_SERVER_FAILURE)"
        );
    }

    #[test]
    fn test_short_read_maps_to_general_failure() {
        let err: ProtocolError = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert_eq!(err.code(), ReplyCode::GeneralFailure);
        assert!(err.reason().starts_with("stream closed"));
    }

    #[test]
    fn test_reply_carries_code_and_bind_address() {
        use crate::protocol::Packet;

        let err = ProtocolError::new(ReplyCode::CommandNotSupported, "unknown command 0x09");
        let reply = err.reply("10.0.0.1:1080".parse().unwrap());
        assert_eq!(reply.reply_code(), ReplyCode::CommandNotSupported);
        assert_eq!(
            &reply.to_bytes()[..],
            &[0x05, 0x07, 0x00, 0x01, 10, 0, 0, 1, 0x04, 0x38]
        );
    }

    #[test]
    fn test_refused_maps_to_connection_refused() {
        let err: ProtocolError = io::Error::from(io::ErrorKind::ConnectionRefused).into();
        assert_eq!(err.code(), ReplyCode::ConnectionRefused);
    }
}
