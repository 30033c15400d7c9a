//! Encoding-based obfuscation transforms
//!
//! These are not ciphers. They only change how the bytes look on the wire.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::{Fuzz, FuzzError};

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
const BASE16_ALPHABET: &[u8; 16] = b"0123456789ABCDEF";
const XX_TABLE: &[u8; 64] = b"+-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const UU_TABLE: [u8; 64] = {
    let mut table = [0u8; 64];
    let mut i = 0;
    while i < 64 {
        table[i] = 32 + i as u8;
        i += 1;
    }
    table
};

/// Identity transform
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

impl Fuzz for Plain {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn encode(&self, data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, FuzzError> {
        Ok(data.to_vec())
    }
}

/// RFC 4648 base64, standard alphabet, padded
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64;

impl Fuzz for Base64 {
    fn name(&self) -> &'static str {
        "base64"
    }

    fn encode(&self, data: &[u8]) -> Vec<u8> {
        STANDARD.encode(data).into_bytes()
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, FuzzError> {
        Ok(STANDARD.decode(data)?)
    }
}

/// RFC 4648 base32, upper-case, padded
#[derive(Debug, Clone, Copy, Default)]
pub struct Base32;

impl Fuzz for Base32 {
    fn name(&self) -> &'static str {
        "base32"
    }

    fn encode(&self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity((data.len() + 4) / 5 * 8);
        for chunk in data.chunks(5) {
            let mut block = [0u8; 8];
            block[3..3 + chunk.len()].copy_from_slice(chunk);
            let bits = u64::from_be_bytes(block);
            let symbols = (chunk.len() * 8 + 4) / 5;
            for i in 0..8 {
                if i < symbols {
                    out.push(BASE32_ALPHABET[((bits >> (35 - 5 * i)) & 0x1F) as usize]);
                } else {
                    out.push(b'=');
                }
            }
        }
        out
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, FuzzError> {
        let codec = self.name();
        if data.len() % 8 != 0 {
            return Err(FuzzError::InvalidLength {
                codec,
                len: data.len(),
            });
        }

        let blocks = data.len() / 8;
        let mut out = Vec::with_capacity(blocks * 5);
        for (i, chunk) in data.chunks(8).enumerate() {
            let symbols = chunk.iter().position(|&c| c == b'=').unwrap_or(8);
            // Padding only at the tail of the last block
            if chunk[symbols..].iter().any(|&c| c != b'=') || (symbols < 8 && i + 1 != blocks) {
                return Err(FuzzError::InvalidPadding { codec });
            }
            let bytes = match symbols {
                8 => 5,
                7 => 4,
                5 => 3,
                4 => 2,
                2 => 1,
                _ => return Err(FuzzError::InvalidPadding { codec }),
            };

            let mut bits = 0u64;
            for (j, &symbol) in chunk[..symbols].iter().enumerate() {
                let value = lookup(BASE32_ALPHABET, symbol).ok_or(FuzzError::InvalidSymbol {
                    codec,
                    symbol,
                    offset: i * 8 + j,
                })?;
                bits = (bits << 5) | value as u64;
            }
            bits <<= 5 * (8 - symbols);
            out.extend_from_slice(&bits.to_be_bytes()[3..3 + bytes]);
        }
        Ok(out)
    }
}

/// Upper-case hexadecimal
#[derive(Debug, Clone, Copy, Default)]
pub struct Base16;

impl Fuzz for Base16 {
    fn name(&self) -> &'static str {
        "base16"
    }

    fn encode(&self, data: &[u8]) -> Vec<u8> {
        hex::encode_upper(data).into_bytes()
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, FuzzError> {
        let codec = self.name();
        if data.len() % 2 != 0 {
            return Err(FuzzError::InvalidLength {
                codec,
                len: data.len(),
            });
        }
        if let Some(offset) = data.iter().position(|&c| lookup(BASE16_ALPHABET, c).is_none()) {
            return Err(FuzzError::InvalidSymbol {
                codec,
                symbol: data[offset],
                offset,
            });
        }
        Ok(hex::decode(data)?)
    }
}

/// XXencode: a padding-count byte, then 4 table symbols per 3 input bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct XxEncode;

impl Fuzz for XxEncode {
    fn name(&self) -> &'static str {
        "xxencode"
    }

    fn encode(&self, data: &[u8]) -> Vec<u8> {
        table_encode(XX_TABLE, data)
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, FuzzError> {
        table_decode(self.name(), XX_TABLE, data)
    }
}

/// UUencode symbols with the XXencode framing
#[derive(Debug, Clone, Copy, Default)]
pub struct UuEncode;

impl Fuzz for UuEncode {
    fn name(&self) -> &'static str {
        "uuencode"
    }

    fn encode(&self, data: &[u8]) -> Vec<u8> {
        table_encode(&UU_TABLE, data)
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, FuzzError> {
        table_decode(self.name(), &UU_TABLE, data)
    }
}

/// Maps every byte `b` to `0xFF - b`; its own inverse
#[derive(Debug, Clone, Copy, Default)]
pub struct AtBash;

impl Fuzz for AtBash {
    fn name(&self) -> &'static str {
        "atbash"
    }

    fn encode(&self, data: &[u8]) -> Vec<u8> {
        data.iter().map(|b| 0xFF - b).collect()
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, FuzzError> {
        Ok(self.encode(data))
    }
}

fn lookup(table: &[u8], symbol: u8) -> Option<usize> {
    table.iter().position(|&c| c == symbol)
}

fn table_encode(table: &[u8; 64], data: &[u8]) -> Vec<u8> {
    let padding = (3 - data.len() % 3) % 3;
    let mut out = Vec::with_capacity(1 + (data.len() + padding) / 3 * 4);
    out.push(padding as u8);
    for chunk in data.chunks(3) {
        let mut block = [0u8; 4];
        block[1..1 + chunk.len()].copy_from_slice(chunk);
        let bits = u32::from_be_bytes(block);
        for shift in [18, 12, 6, 0] {
            out.push(table[((bits >> shift) & 0x3F) as usize]);
        }
    }
    out
}

fn table_decode(codec: &'static str, table: &[u8; 64], data: &[u8]) -> Result<Vec<u8>, FuzzError> {
    let (&padding, body) = data
        .split_first()
        .ok_or(FuzzError::InvalidLength { codec, len: 0 })?;
    if body.len() % 4 != 0 {
        return Err(FuzzError::InvalidLength {
            codec,
            len: data.len(),
        });
    }
    let padding = padding as usize;
    if padding > 2 || (padding > 0 && body.is_empty()) {
        return Err(FuzzError::InvalidPadding { codec });
    }

    let mut out = Vec::with_capacity(body.len() / 4 * 3);
    for (i, chunk) in body.chunks(4).enumerate() {
        let mut bits = 0u32;
        for (j, &symbol) in chunk.iter().enumerate() {
            let value = lookup(table, symbol).ok_or(FuzzError::InvalidSymbol {
                codec,
                symbol,
                offset: 1 + i * 4 + j,
            })?;
            bits = (bits << 6) | value as u32;
        }
        out.extend_from_slice(&bits.to_be_bytes()[1..]);
    }
    out.truncate(out.len() - padding);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_known_vector() {
        assert_eq!(Base64.encode(b"\x05\x01\x00"), b"BQEA");
        assert!(Base64.decode(b"B?EA").is_err());
    }

    #[test]
    fn test_base32_known_vectors() {
        assert_eq!(Base32.encode(b"f"), b"MY======");
        assert_eq!(Base32.encode(b"foobar"), b"MZXW6YTBOI======");
        assert_eq!(Base32.decode(b"MZXW6YQ=").unwrap(), b"foob");
        assert!(matches!(
            Base32.decode(b"MY======MY======"),
            Err(FuzzError::InvalidPadding { .. })
        ));
        assert!(Base32.decode(b"MY=====").is_err());
    }

    #[test]
    fn test_base16_is_upper_case() {
        assert_eq!(Base16.encode(&[0x05, 0xAB]), b"05AB");
        assert_eq!(Base16.decode(b"05AB").unwrap(), vec![0x05, 0xAB]);
        assert_eq!(Base16.encode(&[0xDE, 0xAD, 0xBE, 0xEF]), b"DEADBEEF");
        assert!(matches!(
            Base16.decode(b"05ab"),
            Err(FuzzError::InvalidSymbol { symbol: b'a', offset: 2, .. })
        ));
        assert!(Base16.decode(b"050").is_err());
    }

    #[test]
    fn test_xxencode_layout() {
        // 0x05 0x01 -> one padding byte, 24 bits 000001 010000 000100 000000
        assert_eq!(XxEncode.encode(&[0x05, 0x01]), vec![1, b'-', b'E', b'2', b'+']);
        assert_eq!(XxEncode.encode(&[]), vec![0]);
        assert!(XxEncode.decode(&[]).is_err());
        assert!(XxEncode.decode(&[3, b'+', b'+', b'+', b'+']).is_err());
    }

    #[test]
    fn test_uuencode_uses_printable_table() {
        let encoded = UuEncode.encode(b"Cat");
        assert_eq!(encoded, vec![0, b'0', b'V', b'%', b'T']);
        assert!(encoded[1..].iter().all(|b| (32..96).contains(b)));
    }

    #[test]
    fn test_atbash_flips_bytes() {
        assert_eq!(AtBash.encode(&[0x00, 0x05, 0xFF]), vec![0xFF, 0xFA, 0x00]);
    }
}
