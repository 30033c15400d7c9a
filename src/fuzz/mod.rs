//! Obfuscation Stage
//!
//! Symmetric byte transforms applied around already-framed SOCKS bytes.
//! None of them understands message structure, and the protocol codec does
//! not know which one, if any, is active.

pub mod codec;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use codec::{AtBash, Base16, Base32, Base64, Plain, UuEncode, XxEncode};

/// Failure to undo an obfuscation transform
#[derive(Debug, Error)]
pub enum FuzzError {
    #[error("invalid base64 input: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid hex input: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("{codec}: input length {len} is not valid")]
    InvalidLength { codec: &'static str, len: usize },

    #[error("{codec}: invalid symbol {symbol:#04x} at offset {offset}")]
    InvalidSymbol {
        codec: &'static str,
        symbol: u8,
        offset: usize,
    },

    #[error("{codec}: invalid padding")]
    InvalidPadding { codec: &'static str },
}

/// Inverse byte transforms: `decode(encode(x)) == x`
pub trait Fuzz: Send + Sync {
    fn name(&self) -> &'static str;

    fn encode(&self, data: &[u8]) -> Vec<u8>;

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, FuzzError>;
}

/// Selectable obfuscation transforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuzzKind {
    #[default]
    Plain,
    Base64,
    Base32,
    Base16,
    XxEncode,
    UuEncode,
    AtBash,
}

impl FuzzKind {
    pub const ALL: &'static [FuzzKind] = &[
        FuzzKind::Plain,
        FuzzKind::Base64,
        FuzzKind::Base32,
        FuzzKind::Base16,
        FuzzKind::XxEncode,
        FuzzKind::UuEncode,
        FuzzKind::AtBash,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FuzzKind::Plain => "plain",
            FuzzKind::Base64 => "base64",
            FuzzKind::Base32 => "base32",
            FuzzKind::Base16 => "base16",
            FuzzKind::XxEncode => "xxencode",
            FuzzKind::UuEncode => "uuencode",
            FuzzKind::AtBash => "atbash",
        }
    }

    /// Instantiate the transform
    pub fn build(self) -> Box<dyn Fuzz> {
        match self {
            FuzzKind::Plain => Box::new(Plain),
            FuzzKind::Base64 => Box::new(Base64),
            FuzzKind::Base32 => Box::new(Base32),
            FuzzKind::Base16 => Box::new(Base16),
            FuzzKind::XxEncode => Box::new(XxEncode),
            FuzzKind::UuEncode => Box::new(UuEncode),
            FuzzKind::AtBash => Box::new(AtBash),
        }
    }
}

impl FromStr for FuzzKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FuzzKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<&str> = FuzzKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown fuzz '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

impl fmt::Display for FuzzKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in FuzzKind::ALL {
            assert_eq!(kind.name().parse::<FuzzKind>().unwrap(), *kind);
            assert_eq!(kind.build().name(), kind.name());
        }
        assert!("rot13".parse::<FuzzKind>().is_err());
    }

    #[test]
    fn test_every_kind_inverts_itself() {
        let packet = [
            0x05u8, 0x01, 0x00, 0x03, 0x09, b'l', b'o', b'c', b'a', b'l', b'h', b'o', b's', b't',
            0x01, 0xBB,
        ];
        for kind in FuzzKind::ALL {
            let fuzz = kind.build();
            for len in 0..packet.len() {
                let encoded = fuzz.encode(&packet[..len]);
                assert_eq!(fuzz.decode(&encoded).unwrap(), &packet[..len], "{}", kind);
            }
        }
    }
}
