//! # Primitive Value Types
//!
//! `Address` (20 bytes) identifies accounts, chips and deployed registrars.
//! `Bytes32` is the 32-byte word every hash, root and identifier is built on.
//!
//! Both render and serialize as `0x`-prefixed lower-case hex so that JSON
//! documents (gateway responses, CLI output, event logs) stay readable and
//! round-trip exactly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hex::{self, HexError};

macro_rules! fixed_bytes {
    ($name:ident, $len:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// The all-zero value.
            pub const ZERO: Self = Self([0u8; $len]);

            /// Width in bytes.
            pub const LEN: usize = $len;

            /// Wrap raw bytes.
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Borrow the raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Whether every byte is zero.
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            /// `0x`-prefixed lower-case hex.
            pub fn to_hex(&self) -> String {
                hex::encode_prefixed(&self.0)
            }

            /// Lower-case hex without the `0x` prefix.
            pub fn to_hex_unprefixed(&self) -> String {
                hex::encode(&self.0)
            }

            /// Parse from hex text, with or without a `0x` prefix.
            pub fn from_hex(s: &str) -> Result<Self, HexError> {
                hex::decode_fixed::<$len>(s).map(Self)
            }

            /// Copy from a slice of exactly the right width.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, HexError> {
                if bytes.len() != $len {
                    return Err(HexError::WrongLength {
                        expected: $len,
                        actual: bytes.len(),
                    });
                }
                let mut out = [0u8; $len];
                out.copy_from_slice(bytes);
                Ok(Self(out))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = HexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_bytes!(
    Address,
    20,
    "A 20-byte account address: an externally owned key, a chip, or a deployed registrar."
);

fixed_bytes!(
    Bytes32,
    32,
    "A 32-byte word: hashes, merkle roots, identifiers and namespace nodes."
);

impl Address {
    /// Take the low 20 bytes of a 32-byte word.
    ///
    /// Account addresses and deterministic deployment addresses are both
    /// derived this way from a SHA-256 digest.
    pub fn from_word(word: &Bytes32) -> Self {
        let mut out = [0u8; 20];
        out.copy_from_slice(&word.0[12..]);
        Self(out)
    }

    /// Left-pad to a 32-byte word.
    pub fn to_word(&self) -> Bytes32 {
        let mut out = [0u8; 32];
        out[12..].copy_from_slice(&self.0);
        Bytes32(out)
    }
}

impl Bytes32 {
    /// Encode an unsigned integer big-endian into the low bytes of a word.
    pub fn from_u64(value: u64) -> Self {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }
}
