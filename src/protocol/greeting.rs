//! Method negotiation messages
//!
//! ```text
//! Client greeting:            Server greeting:
//! +----+----------+----------+   +----+--------+
//! |VER | NMETHODS | METHODS  |   |VER | METHOD |
//! +----+----------+----------+   +----+--------+
//! | 1  |    1     | 1 to 255 |   | 1  |   1    |
//! +----+----------+----------+   +----+--------+
//! ```

use bytes::{BufMut, BytesMut};
use serde::Serialize;
use std::fmt;
use tokio::io::AsyncRead;
use tracing::debug;

use super::constants::MAX_METHODS;
use super::error::{ProtocolError, Result};
use super::packet::{read_array, read_vec, Packet};
use super::types::{AuthMethod, ProtocolVersion};

/// Authentication methods offered by a client at connection start
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientGreeting {
    version: ProtocolVersion,
    methods: Vec<AuthMethod>,
}

impl ClientGreeting {
    /// Create a greeting offering 1 to 255 methods
    pub fn new(version: ProtocolVersion, methods: Vec<AuthMethod>) -> Result<Self> {
        if methods.is_empty() {
            return Err(ProtocolError::general("no authentication methods offered"));
        }
        if methods.len() > MAX_METHODS {
            return Err(ProtocolError::general(format!(
                "{} authentication methods offered, limit is {}",
                methods.len(),
                MAX_METHODS
            )));
        }
        Ok(Self { version, methods })
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn methods(&self) -> &[AuthMethod] {
        &self.methods
    }

    /// NMETHODS as sent on the wire
    pub fn method_count(&self) -> u8 {
        self.methods.len() as u8
    }

    pub fn offers(&self, method: AuthMethod) -> bool {
        self.methods.contains(&method)
    }

    /// Pick the first of `preferred` that the client offered
    pub fn select(&self, preferred: &[AuthMethod]) -> ServerGreeting {
        let method = preferred
            .iter()
            .copied()
            .find(|m| *m != AuthMethod::NoAcceptableMethods && self.offers(*m))
            .unwrap_or(AuthMethod::NoAcceptableMethods);
        ServerGreeting::new(self.version, method)
    }
}

impl Packet for ClientGreeting {
    async fn read_from<R>(stream: &mut R) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let [version, count] = read_array::<2, _>(stream).await?;
        let raw_methods = read_vec(stream, count as usize).await?;

        let version = ProtocolVersion::try_from(version)?;
        let methods = raw_methods
            .into_iter()
            .map(AuthMethod::try_from)
            .collect::<Result<Vec<_>>>()?;

        let greeting = Self::new(version, methods)?;
        debug!("Decoded client greeting {}", greeting);
        Ok(greeting)
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());
        buf.put_u8(self.version.into());
        buf.put_u8(self.method_count());
        for method in &self.methods {
            buf.put_u8((*method).into());
        }
    }

    fn encoded_len(&self) -> usize {
        2 + self.methods.len()
    }
}

impl fmt::Display for ClientGreeting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.methods.iter().map(|m| m.name()).collect();
        write!(
            f,
            "<{} {}:[{}]>",
            self.version,
            self.method_count(),
            names.join(", ")
        )
    }
}

/// Method chosen by the server, or `NO_ACCEPTABLE_METHODS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerGreeting {
    pub version: ProtocolVersion,
    pub method: AuthMethod,
}

impl ServerGreeting {
    pub fn new(version: ProtocolVersion, method: AuthMethod) -> Self {
        Self { version, method }
    }

    /// Whether negotiation produced a usable method
    pub fn is_acceptable(&self) -> bool {
        self.method != AuthMethod::NoAcceptableMethods
    }
}

impl Default for ServerGreeting {
    fn default() -> Self {
        Self::new(ProtocolVersion::Socks5, AuthMethod::NoAuth)
    }
}

impl Packet for ServerGreeting {
    async fn read_from<R>(stream: &mut R) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let [version, method] = read_array::<2, _>(stream).await?;
        let greeting = Self::new(
            ProtocolVersion::try_from(version)?,
            AuthMethod::try_from(method)?,
        );
        debug!("Decoded server greeting {}", greeting);
        Ok(greeting)
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.version.into());
        buf.put_u8(self.method.into());
    }

    fn encoded_len(&self) -> usize {
        2
    }
}

impl fmt::Display for ServerGreeting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {}>", self.version, self.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ReplyCode;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_decode_client_greeting() {
        let mut stream = Builder::new().read(&[0x05, 0x02, 0x00, 0x02]).build();
        let greeting = ClientGreeting::read_from(&mut stream).await.unwrap();
        assert_eq!(greeting.version(), ProtocolVersion::Socks5);
        assert_eq!(
            greeting.methods(),
            &[AuthMethod::NoAuth, AuthMethod::UsernamePassword]
        );
        assert_eq!(greeting.to_string(), "<SOCKS5 2:[NO_AUTH, USERNAME_PASSWORD]>");
    }

    #[tokio::test]
    async fn test_unknown_method_rejected() {
        let data = [0x05u8, 0x02, 0x00, 0x80];
        let err = ClientGreeting::read_from(&mut &data[..]).await.unwrap_err();
        assert_eq!(err.code(), ReplyCode::GeneralFailure);
    }

    #[tokio::test]
    async fn test_zero_methods_rejected() {
        let data = [0x05u8, 0x00];
        assert!(ClientGreeting::read_from(&mut &data[..]).await.is_err());
    }

    #[tokio::test]
    async fn test_truncated_method_list_fails() {
        let data = [0x05u8, 0x03, 0x00];
        assert!(ClientGreeting::read_from(&mut &data[..]).await.is_err());
    }

    #[test]
    fn test_count_is_derived_from_methods() {
        let greeting = ClientGreeting::new(
            ProtocolVersion::Socks5,
            vec![AuthMethod::NoAuth, AuthMethod::Gssapi, AuthMethod::UsernamePassword],
        )
        .unwrap();
        assert_eq!(&greeting.to_bytes()[..], &[0x05, 0x03, 0x00, 0x01, 0x02]);
    }

    #[test]
    fn test_method_list_bounds() {
        assert!(ClientGreeting::new(ProtocolVersion::Socks5, vec![]).is_err());
        assert!(ClientGreeting::new(ProtocolVersion::Socks5, vec![AuthMethod::NoAuth; 255]).is_ok());
        assert!(ClientGreeting::new(ProtocolVersion::Socks5, vec![AuthMethod::NoAuth; 256]).is_err());
    }

    #[test]
    fn test_select_prefers_server_order() {
        let greeting = ClientGreeting::new(
            ProtocolVersion::Socks5,
            vec![AuthMethod::NoAuth, AuthMethod::UsernamePassword],
        )
        .unwrap();

        let chosen = greeting.select(&[AuthMethod::UsernamePassword, AuthMethod::NoAuth]);
        assert_eq!(chosen.method, AuthMethod::UsernamePassword);

        let chosen = greeting.select(&[AuthMethod::Gssapi]);
        assert_eq!(chosen.method, AuthMethod::NoAcceptableMethods);
        assert!(!chosen.is_acceptable());
    }

    #[tokio::test]
    async fn test_server_greeting_default_and_write() {
        let greeting = ServerGreeting::default();
        assert_eq!(greeting.to_string(), "<SOCKS5 NO_AUTH>");

        let mut stream = Builder::new().write(&[0x05, 0x00]).build();
        greeting.write_to(&mut stream).await.unwrap();
    }

    #[tokio::test]
    async fn test_server_greeting_no_acceptable() {
        let data = [0x05u8, 0xFF];
        let greeting = ServerGreeting::read_from(&mut &data[..]).await.unwrap();
        assert_eq!(greeting.method, AuthMethod::NoAcceptableMethods);
    }
}
