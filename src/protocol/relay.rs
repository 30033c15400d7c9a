//! Relay request and reply messages
//!
//! Requests and replies share one layout; byte 1 is a command in a request
//! and a reply code in a reply.
//!
//! ```text
//! +----+---------+-------+------+----------+----------+
//! |VER | CMD/REP |  RSV  | ATYP |   ADDR   |   PORT   |
//! +----+---------+-------+------+----------+----------+
//! | 1  |    1    | X'00' |  1   | Variable |    2     |
//! +----+---------+-------+------+----------+----------+
//! ```
//!
//! ADDR is 4 bytes for IPv4, 16 bytes for IPv6, and a length byte followed
//! by that many bytes of UTF-8 for a domain name. PORT is big-endian.

use bytes::{BufMut, BytesMut};
use serde::Serialize;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use tokio::io::AsyncRead;
use tracing::{debug, warn};

use super::constants::*;
use super::error::{ProtocolError, Result};
use super::packet::{read_array, read_vec, Packet};
use super::types::{Address, AddressType, Command, DomainName, Host, ProtocolVersion, ReplyCode};

/// Value carried in byte 1 of a relay message
pub trait RelayCode:
    Copy + Into<u8> + TryFrom<u8, Error = ProtocolError> + fmt::Display + Serialize
{
    /// Which side of the exchange uses this code
    const KIND: &'static str;
}

impl RelayCode for Command {
    const KIND: &'static str = "request";
}

impl RelayCode for ReplyCode {
    const KIND: &'static str = "reply";
}

/// Relay message with `C` at the command/reply position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayMessage<C> {
    pub version: ProtocolVersion,
    pub code: C,
    pub address: Address,
}

/// Client to server: what to relay and where
pub type Request = RelayMessage<Command>;

/// Server to client: outcome and bound address
pub type Reply = RelayMessage<ReplyCode>;

impl<C: RelayCode> RelayMessage<C> {
    pub fn new(version: ProtocolVersion, code: C, address: Address) -> Self {
        Self {
            version,
            code,
            address,
        }
    }

    pub fn address_type(&self) -> AddressType {
        self.address.address_type()
    }
}

impl Request {
    /// SOCKS5 CONNECT to `address`
    pub fn connect(address: Address) -> Self {
        Self::new(ProtocolVersion::Socks5, Command::Connect, address)
    }

    pub fn command(&self) -> Command {
        self.code
    }
}

impl Reply {
    /// SOCKS5 success reply reporting the bound address
    pub fn success(bind: Address) -> Self {
        Self::new(ProtocolVersion::Socks5, ReplyCode::Succeeded, bind)
    }

    /// SOCKS5 failure reply bound to `0.0.0.0:0`
    pub fn failure(code: ReplyCode) -> Self {
        Self::new(ProtocolVersion::Socks5, code, Address::unspecified())
    }

    pub fn reply_code(&self) -> ReplyCode {
        self.code
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

impl From<&ProtocolError> for Reply {
    fn from(err: &ProtocolError) -> Self {
        err.reply(Address::unspecified())
    }
}

impl<C: RelayCode> Packet for RelayMessage<C> {
    async fn read_from<R>(stream: &mut R) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let [version, code, reserved, address_type] =
            read_array::<RELAY_HEADER_LEN, _>(stream).await?;

        if reserved != SOCKS_RESERVED {
            warn!("Rejecting {} with reserved byte {:#04x}", C::KIND, reserved);
            return Err(ProtocolError::general(format!(
                "invalid reserved byte {:#04x} in {}",
                reserved,
                C::KIND
            )));
        }

        let version = ProtocolVersion::try_from(version)?;
        let code = C::try_from(code)?;
        let address_type = AddressType::try_from(address_type)?;
        let address = read_address(stream, address_type).await?;

        let message = Self::new(version, code, address);
        debug!("Decoded {} {}", C::KIND, message);
        Ok(message)
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());
        buf.put_u8(self.version.into());
        buf.put_u8(self.code.into());
        buf.put_u8(SOCKS_RESERVED);
        buf.put_u8(self.address_type().into());
        put_address(buf, &self.address);
    }

    fn encoded_len(&self) -> usize {
        RELAY_HEADER_LEN + self.address.encoded_len()
    }
}

impl<C: RelayCode> fmt::Display for RelayMessage<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} {} {} {}>",
            self.version,
            self.code,
            self.address_type(),
            self.address
        )
    }
}

/// Read DST.ADDR and DST.PORT for the given address type
async fn read_address<R>(stream: &mut R, address_type: AddressType) -> Result<Address>
where
    R: AsyncRead + Unpin,
{
    let host = match address_type {
        AddressType::DomainName => {
            let [len] = read_array::<1, _>(stream).await?;
            if len == 0 {
                return Err(ProtocolError::general("domain name length cannot be zero"));
            }
            let raw = read_vec(stream, len as usize).await?;
            let name = String::from_utf8(raw).map_err(|e| {
                ProtocolError::general(format!("invalid UTF-8 in domain name: {}", e))
            })?;
            Host::Domain(DomainName::new(name)?)
        }
        AddressType::Ipv4 => Host::Ipv4(Ipv4Addr::from(
            read_array::<IPV4_ADDR_LEN, _>(stream).await?,
        )),
        AddressType::Ipv6 => Host::Ipv6(Ipv6Addr::from(
            read_array::<IPV6_ADDR_LEN, _>(stream).await?,
        )),
    };
    let port = u16::from_be_bytes(read_array::<PORT_LEN, _>(stream).await?);
    Ok(Address::new(host, port))
}

fn put_address(buf: &mut BytesMut, address: &Address) {
    match &address.host {
        Host::Ipv4(ip) => buf.put_slice(&ip.octets()),
        Host::Ipv6(ip) => buf.put_slice(&ip.octets()),
        Host::Domain(name) => {
            buf.put_u8(name.wire_len());
            buf.put_slice(name.as_str().as_bytes());
        }
    }
    buf.put_u16(address.port);
}

/// A relay message whose direction was chosen at runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Relay {
    Request(Request),
    Reply(Reply),
}

impl Relay {
    pub fn address(&self) -> &Address {
        match self {
            Relay::Request(request) => &request.address,
            Relay::Reply(reply) => &reply.address,
        }
    }

    pub fn to_bytes(&self) -> bytes::Bytes {
        match self {
            Relay::Request(request) => request.to_bytes(),
            Relay::Reply(reply) => reply.to_bytes(),
        }
    }
}

impl fmt::Display for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relay::Request(request) => fmt::Display::fmt(request, f),
            Relay::Reply(reply) => fmt::Display::fmt(reply, f),
        }
    }
}

/// Decode a relay message, reading byte 1 as a command when `is_request`
/// and as a reply code otherwise
pub async fn read_relay<R>(stream: &mut R, is_request: bool) -> Result<Relay>
where
    R: AsyncRead + Unpin,
{
    if is_request {
        Ok(Relay::Request(Request::read_from(stream).await?))
    } else {
        Ok(Relay::Reply(Reply::read_from(stream).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_decode_ipv4_connect() {
        let data = [0x05u8, 0x01, 0x00, 0x01, 0x7F, 0x00, 0x00, 0x01, 0x00, 0x50];
        let mut stream = Builder::new().read(&data).build();
        let request = Request::read_from(&mut stream).await.unwrap();
        assert_eq!(
            request,
            Request::connect("127.0.0.1:80".parse().unwrap())
        );
        assert_eq!(request.to_string(), "<SOCKS5 CONNECT IPV4 127.0.0.1:80>");
    }

    #[tokio::test]
    async fn test_decode_domain_udp_associate() {
        let data = [
            0x05u8, 0x03, 0x00, 0x03, 0x09, b'l', b'o', b'c', b'a', b'l', b'h', b'o', b's', b't',
            0x01, 0xBB,
        ];
        let request = Request::read_from(&mut &data[..]).await.unwrap();
        assert_eq!(request.command(), Command::UdpAssociate);
        assert_eq!(request.address, Address::domain("localhost", 443).unwrap());
    }

    #[tokio::test]
    async fn test_same_byte_read_as_reply() {
        let data = [0x05u8, 0x01, 0x00, 0x01, 0x7F, 0x00, 0x00, 0x01, 0x00, 0x50];
        let reply = Reply::read_from(&mut &data[..]).await.unwrap();
        assert_eq!(reply.reply_code(), ReplyCode::GeneralFailure);
        assert!(!reply.is_success());
    }

    #[tokio::test]
    async fn test_reserved_byte_rejected_before_address() {
        // Only the header is available: the address must not be read
        let mut stream = Builder::new().read(&[0x05, 0x01, 0x01, 0x01]).build();
        let err = Request::read_from(&mut stream).await.unwrap_err();
        assert_eq!(err.code(), ReplyCode::GeneralFailure);
        assert!(err.reason().contains("reserved"));
    }

    #[tokio::test]
    async fn test_unknown_address_type() {
        let data = [0x05u8, 0x01, 0x00, 0x02, 0x00, 0x00];
        let err = Request::read_from(&mut &data[..]).await.unwrap_err();
        assert_eq!(err.code(), ReplyCode::AddressTypeNotSupported);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let data = [0x05u8, 0x04, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        let err = Request::read_from(&mut &data[..]).await.unwrap_err();
        assert_eq!(err.code(), ReplyCode::CommandNotSupported);

        // 0x04 is a valid reply code
        let reply = Reply::read_from(&mut &data[..]).await.unwrap();
        assert_eq!(reply.reply_code(), ReplyCode::HostUnreachable);
    }

    #[tokio::test]
    async fn test_zero_length_domain_rejected() {
        let data = [0x05u8, 0x01, 0x00, 0x03, 0x00, 0x00, 0x50];
        assert!(Request::read_from(&mut &data[..]).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_utf8_domain_rejected() {
        let data = [0x05u8, 0x01, 0x00, 0x03, 0x02, 0xC3, 0x28, 0x00, 0x50];
        let err = Request::read_from(&mut &data[..]).await.unwrap_err();
        assert!(err.reason().contains("UTF-8"));
    }

    #[test]
    fn test_encode_ipv6_reply() {
        let reply = Reply::success("[2001:db8::1]:1080".parse().unwrap());
        let bytes = reply.to_bytes();
        assert_eq!(bytes.len(), 4 + 16 + 2);
        assert_eq!(&bytes[..4], &[0x05, 0x00, 0x00, 0x04]);
        assert_eq!(&bytes[4..6], &[0x20, 0x01]);
        assert_eq!(&bytes[20..], &1080u16.to_be_bytes());
    }

    #[test]
    fn test_failure_reply_from_error() {
        let err = ProtocolError::new(ReplyCode::AddressTypeNotSupported, "unknown address type 0x02");
        let reply = Reply::from(&err);
        assert_eq!(
            &reply.to_bytes()[..],
            &[0x05, 0x08, 0x00, 0x01, 0, 0, 0, 0, 0, 0]
        );
    }

    #[tokio::test]
    async fn test_read_relay_by_direction() {
        let data = [0x05u8, 0x02, 0x00, 0x01, 0x0A, 0x00, 0x00, 0x01, 0x1F, 0x90];
        match read_relay(&mut &data[..], true).await.unwrap() {
            Relay::Request(request) => assert_eq!(request.command(), Command::Bind),
            other => panic!("expected request, got {}", other),
        }
        match read_relay(&mut &data[..], false).await.unwrap() {
            Relay::Reply(reply) => {
                assert_eq!(reply.reply_code(), ReplyCode::ConnectionNotAllowed)
            }
            other => panic!("expected reply, got {}", other),
        }
    }
}
