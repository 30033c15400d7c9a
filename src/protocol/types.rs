//! SOCKS Protocol Types

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use tracing::warn;

use super::constants::*;
use super::error::{ProtocolError, Result};

/// Declares a closed wire enumeration: every defined byte maps to exactly one
/// variant and any other byte is rejected with the given reply code.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($what:literal, $code:expr) {
            $( $(#[$vmeta:meta])* $variant:ident = $value:path => $label:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant, )+
        }

        impl $name {
            /// Every defined value, in wire order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Protocol name of this value
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                match value {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl TryFrom<u8> for $name {
            type Error = ProtocolError;

            fn try_from(byte: u8) -> Result<Self> {
                match byte {
                    $($value => Ok($name::$variant),)+
                    other => {
                        warn!("Rejecting unknown {} {:#04x}", $what, other);
                        Err(ProtocolError::new(
                            $code,
                            format!("unknown {} {:#04x}", $what, other),
                        ))
                    }
                }
            }
        }

        impl FromStr for $name {
            type Err = ProtocolError;

            fn from_str(s: &str) -> Result<Self> {
                let wanted = s.trim().replace('-', "_");
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name().eq_ignore_ascii_case(&wanted))
                    .ok_or_else(|| {
                        ProtocolError::new($code, format!("unknown {} '{}'", $what, s))
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

wire_enum! {
    /// Protocol version, selected once per connection
    pub enum ProtocolVersion ("protocol version", ReplyCode::GeneralFailure) {
        Socks4 = SOCKS4_VERSION => "SOCKS4",
        Socks5 = SOCKS5_VERSION => "SOCKS5",
    }
}

wire_enum! {
    /// Authentication method offered by a client or chosen by a server
    pub enum AuthMethod ("authentication method", ReplyCode::GeneralFailure) {
        NoAuth = SOCKS_AUTH_NONE => "NO_AUTH",
        Gssapi = SOCKS_AUTH_GSSAPI => "GSSAPI",
        UsernamePassword = SOCKS_AUTH_USERPASS => "USERNAME_PASSWORD",
        /// Sentinel sent by a server when negotiation fails
        NoAcceptableMethods = SOCKS_AUTH_NO_ACCEPTABLE => "NO_ACCEPTABLE_METHODS",
    }
}

wire_enum! {
    /// Command carried by a relay request
    pub enum Command ("command", ReplyCode::CommandNotSupported) {
        Connect = SOCKS_CMD_CONNECT => "CONNECT",
        Bind = SOCKS_CMD_BIND => "BIND",
        UdpAssociate = SOCKS_CMD_UDP_ASSOCIATE => "UDP_ASSOCIATE",
    }
}

wire_enum! {
    /// Reply code carried by a relay reply, also used to classify errors
    pub enum ReplyCode ("reply code", ReplyCode::GeneralFailure) {
        Succeeded = SOCKS_REPLY_SUCCESS => "SUCCEEDED",
        GeneralFailure = SOCKS_REPLY_GENERAL_FAILURE => "GENERAL_SOCKS_SERVER_FAILURE",
        ConnectionNotAllowed = SOCKS_REPLY_CONNECTION_NOT_ALLOWED => "CONNECTION_NOT_ALLOWED_BY_RULESET",
        NetworkUnreachable = SOCKS_REPLY_NETWORK_UNREACHABLE => "NETWORK_UNREACHABLE",
        HostUnreachable = SOCKS_REPLY_HOST_UNREACHABLE => "HOST_UNREACHABLE",
        ConnectionRefused = SOCKS_REPLY_CONNECTION_REFUSED => "CONNECTION_REFUSED",
        TtlExpired = SOCKS_REPLY_TTL_EXPIRED => "TTL_EXPIRED",
        CommandNotSupported = SOCKS_REPLY_COMMAND_NOT_SUPPORTED => "COMMAND_NOT_SUPPORTED",
        AddressTypeNotSupported = SOCKS_REPLY_ADDRESS_TYPE_NOT_SUPPORTED => "ADDRESS_TYPE_NOT_SUPPORTED",
    }
}

wire_enum! {
    /// How the destination address is encoded on the wire
    pub enum AddressType ("address type", ReplyCode::AddressTypeNotSupported) {
        Ipv4 = SOCKS_ADDR_IPV4 => "IPV4",
        DomainName = SOCKS_ADDR_DOMAIN => "DOMAIN_NAME",
        Ipv6 = SOCKS_ADDR_IPV6 => "IPV6",
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        ProtocolVersion::Socks5
    }
}

impl ReplyCode {
    /// Whether this code reports success
    pub fn is_success(self) -> bool {
        self == ReplyCode::Succeeded
    }
}

impl From<io::ErrorKind> for ReplyCode {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::ConnectionRefused => ReplyCode::ConnectionRefused,
            io::ErrorKind::TimedOut => ReplyCode::TtlExpired,
            io::ErrorKind::NotConnected | io::ErrorKind::AddrNotAvailable => {
                ReplyCode::HostUnreachable
            }
            io::ErrorKind::PermissionDenied => ReplyCode::ConnectionNotAllowed,
            _ => ReplyCode::GeneralFailure,
        }
    }
}

/// Domain name that fits the one-byte length prefix (1 to 255 bytes of UTF-8)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainName(String);

impl DomainName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ProtocolError::general("domain name cannot be empty"));
        }
        if name.len() > MAX_DOMAIN_LEN {
            return Err(ProtocolError::general(format!(
                "domain name is {} bytes, limit is {}",
                name.len(),
                MAX_DOMAIN_LEN
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the length prefix, always within `1..=255`
    pub fn wire_len(&self) -> u8 {
        self.0.len() as u8
    }
}

impl TryFrom<String> for DomainName {
    type Error = ProtocolError;

    fn try_from(name: String) -> Result<Self> {
        Self::new(name)
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Destination or bound host
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Host {
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Domain(DomainName),
}

impl Host {
    /// Address type code for this host
    pub fn address_type(&self) -> AddressType {
        match self {
            Host::Ipv4(_) => AddressType::Ipv4,
            Host::Ipv6(_) => AddressType::Ipv6,
            Host::Domain(_) => AddressType::DomainName,
        }
    }

    /// Number of bytes the host occupies in DST.ADDR
    pub fn encoded_len(&self) -> usize {
        match self {
            Host::Ipv4(_) => IPV4_ADDR_LEN,
            Host::Ipv6(_) => IPV6_ADDR_LEN,
            Host::Domain(name) => 1 + name.wire_len() as usize,
        }
    }
}

impl From<IpAddr> for Host {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Host::Ipv4(v4),
            IpAddr::V6(v6) => Host::Ipv6(v6),
        }
    }
}

impl FromStr for Host {
    type Err = ProtocolError;

    /// IP literals become IP hosts, anything else a domain name
    fn from_str(s: &str) -> Result<Self> {
        if let Some(inner) = s.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            return inner.parse::<Ipv6Addr>().map(Host::Ipv6).map_err(|_| {
                ProtocolError::general(format!("bracketed host '{}' is not an IPv6 address", s))
            });
        }
        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(ip.into());
        }
        if s.contains(|c| matches!(c, ':' | '[' | ']')) {
            return Err(ProtocolError::general(format!("invalid host '{}'", s)));
        }
        Ok(Host::Domain(DomainName::new(s)?))
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Ipv4(ip) => fmt::Display::fmt(ip, f),
            Host::Ipv6(ip) => fmt::Display::fmt(ip, f),
            Host::Domain(name) => f.write_str(name.as_str()),
        }
    }
}

/// Host and port pair carried by relay messages
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub host: Host,
    pub port: u16,
}

impl Address {
    pub fn new(host: Host, port: u16) -> Self {
        Self { host, port }
    }

    /// Build a domain-name address, rejecting names that do not fit the wire format
    pub fn domain(name: impl Into<String>, port: u16) -> Result<Self> {
        Ok(Self::new(Host::Domain(DomainName::new(name)?), port))
    }

    /// `0.0.0.0:0`, the bind address of a failure reply
    pub fn unspecified() -> Self {
        Self::new(Host::Ipv4(Ipv4Addr::UNSPECIFIED), 0)
    }

    pub fn address_type(&self) -> AddressType {
        self.host.address_type()
    }

    /// Socket address, when the host is an IP literal
    pub fn to_socket_addr(&self) -> Option<SocketAddr> {
        match &self.host {
            Host::Ipv4(ip) => Some(SocketAddr::new(IpAddr::V4(*ip), self.port)),
            Host::Ipv6(ip) => Some(SocketAddr::new(IpAddr::V6(*ip), self.port)),
            Host::Domain(_) => None,
        }
    }

    /// Number of bytes DST.ADDR and DST.PORT occupy together
    pub fn encoded_len(&self) -> usize {
        self.host.encoded_len() + PORT_LEN
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().into(), addr.port())
    }
}

impl FromStr for Address {
    type Err = ProtocolError;

    /// Parses `host:port`, with IPv6 hosts in brackets
    fn from_str(s: &str) -> Result<Self> {
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(addr.into());
        }
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ProtocolError::general(format!("missing port in address '{}'", s)))?;
        let port = port
            .parse::<u16>()
            .map_err(|e| ProtocolError::general(format!("invalid port in address '{}': {}", s, e)))?;
        Ok(Self::new(host.parse()?, port))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Host::Ipv6(ip) => write!(f, "[{}]:{}", ip, self.port),
            host => write!(f, "{}:{}", host, self.port),
        }
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Address", 3)?;
        state.serialize_field("address_type", &self.address_type())?;
        state.serialize_field("host", &self.host.to_string())?;
        state.serialize_field("port", &self.port)?;
        state.end()
    }
}
