//! SOCKS Wire Constants

// Protocol versions
pub const SOCKS4_VERSION: u8 = 0x04;
pub const SOCKS5_VERSION: u8 = 0x05;

// Commands
pub const SOCKS_CMD_CONNECT: u8 = 0x01;
pub const SOCKS_CMD_BIND: u8 = 0x02;
pub const SOCKS_CMD_UDP_ASSOCIATE: u8 = 0x03;

// Address types
pub const SOCKS_ADDR_IPV4: u8 = 0x01;
pub const SOCKS_ADDR_DOMAIN: u8 = 0x03;
pub const SOCKS_ADDR_IPV6: u8 = 0x04;

// Authentication methods
pub const SOCKS_AUTH_NONE: u8 = 0x00;
pub const SOCKS_AUTH_GSSAPI: u8 = 0x01;
pub const SOCKS_AUTH_USERPASS: u8 = 0x02;
pub const SOCKS_AUTH_NO_ACCEPTABLE: u8 = 0xFF;

// Reply codes
pub const SOCKS_REPLY_SUCCESS: u8 = 0x00;
pub const SOCKS_REPLY_GENERAL_FAILURE: u8 = 0x01;
pub const SOCKS_REPLY_CONNECTION_NOT_ALLOWED: u8 = 0x02;
pub const SOCKS_REPLY_NETWORK_UNREACHABLE: u8 = 0x03;
pub const SOCKS_REPLY_HOST_UNREACHABLE: u8 = 0x04;
pub const SOCKS_REPLY_CONNECTION_REFUSED: u8 = 0x05;
pub const SOCKS_REPLY_TTL_EXPIRED: u8 = 0x06;
pub const SOCKS_REPLY_COMMAND_NOT_SUPPORTED: u8 = 0x07;
pub const SOCKS_REPLY_ADDRESS_TYPE_NOT_SUPPORTED: u8 = 0x08;

// Reserved field value
pub const SOCKS_RESERVED: u8 = 0x00;

// Fixed sizes
pub const RELAY_HEADER_LEN: usize = 4;
pub const IPV4_ADDR_LEN: usize = 4;
pub const IPV6_ADDR_LEN: usize = 16;
pub const PORT_LEN: usize = 2;
pub const MAX_DOMAIN_LEN: usize = u8::MAX as usize;
pub const MAX_METHODS: usize = u8::MAX as usize;
