//! # Hex Encoding
//!
//! Lower-case hex helpers shared by every crate in the workspace. Decoding
//! accepts an optional `0x` prefix and either case; encoding always emits
//! lower-case digits.

use thiserror::Error;

/// Errors produced while decoding hex text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HexError {
    /// The digit count is odd.
    #[error("hex string has odd length: {0}")]
    OddLength(usize),

    /// A character outside `[0-9a-fA-F]` was found.
    #[error("invalid hex character at position {0}")]
    InvalidChar(usize),

    /// The decoded byte count does not match the expected width.
    #[error("expected {expected} bytes, got {actual}")]
    WrongLength {
        /// Expected byte count.
        expected: usize,
        /// Decoded byte count.
        actual: usize,
    },
}

/// Encode bytes as lower-case hex without a prefix.
pub fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Encode bytes as lower-case hex with a `0x` prefix.
pub fn encode_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", encode(bytes))
}

/// Decode hex text into bytes. Surrounding whitespace and a leading `0x`
/// are ignored.
pub fn decode(s: &str) -> Result<Vec<u8>, HexError> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if s.len() % 2 != 0 {
        return Err(HexError::OddLength(s.len()));
    }
    let digits = s.as_bytes();
    let mut out = Vec::with_capacity(digits.len() / 2);
    for (i, pair) in digits.chunks(2).enumerate() {
        let hi = nibble(pair[0]).ok_or(HexError::InvalidChar(i * 2))?;
        let lo = nibble(pair[1]).ok_or(HexError::InvalidChar(i * 2 + 1))?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

/// Decode hex text into a fixed-width array.
pub fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], HexError> {
    let bytes = decode(s)?;
    if bytes.len() != N {
        return Err(HexError::WrongLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Serde adapter for `Vec<u8>` fields carried as `0x`-prefixed hex.
///
/// Use with `#[serde(with = "ers_core::hex::serde_bytes")]`.
pub mod serde_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as a `0x`-prefixed hex string.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_prefixed(bytes))
    }

    /// Deserialize bytes from hex text, with or without a `0x` prefix.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::decode(&s).map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Decoding an encoding returns the original bytes.
        #[test]
        fn hex_decode_inverts_encode(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
            prop_assert_eq!(decode(&encode(&bytes)).unwrap(), bytes.clone());
            prop_assert_eq!(decode(&encode_prefixed(&bytes)).unwrap(), bytes);
        }
    }
}
