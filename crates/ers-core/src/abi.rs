//! # ABI-Style Encoding
//!
//! Byte layouts fed to SHA-256 when deriving identifiers, merkle leaves and
//! signed messages. Two layouts exist:
//!
//! - **Words** (`Encoder::words()`): every value occupies one 32-byte word.
//!   Addresses are left-padded, integers are big-endian `uint256`, and
//!   dynamic byte strings are committed to by their SHA-256 hash.
//! - **Packed** (`Encoder::packed()`): addresses take 20 bytes, words take 32,
//!   integers are still full 32-byte `uint256`, and dynamic byte strings are
//!   appended raw.
//!
//! ## Security Invariant
//!
//! Signers and verifiers must build the same layout for the same message.
//! Every message constructor in the workspace goes through this encoder so
//! the layout is defined in exactly one place.

use crate::hash::sha256;
use crate::primitives::{Address, Bytes32};

/// Which byte layout an [`Encoder`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One 32-byte word per value.
    Words,
    /// Tightly packed values.
    Packed,
}

/// Builder for hash preimages.
#[derive(Debug, Clone)]
pub struct Encoder {
    layout: Layout,
    buf: Vec<u8>,
}

impl Encoder {
    /// Start a word-aligned encoding.
    pub fn words() -> Self {
        Self {
            layout: Layout::Words,
            buf: Vec::new(),
        }
    }

    /// Start a packed encoding.
    pub fn packed() -> Self {
        Self {
            layout: Layout::Packed,
            buf: Vec::new(),
        }
    }

    /// Append an address.
    pub fn address(mut self, address: &Address) -> Self {
        match self.layout {
            Layout::Words => self.buf.extend_from_slice(address.to_word().as_bytes()),
            Layout::Packed => self.buf.extend_from_slice(address.as_bytes()),
        }
        self
    }

    /// Append a 32-byte word.
    pub fn word(mut self, word: &Bytes32) -> Self {
        self.buf.extend_from_slice(word.as_bytes());
        self
    }

    /// Append an unsigned integer as a big-endian `uint256`.
    pub fn uint(mut self, value: u64) -> Self {
        self.buf.extend_from_slice(Bytes32::from_u64(value).as_bytes());
        self
    }

    /// Append a boolean as a `uint256` 0 or 1.
    pub fn boolean(self, value: bool) -> Self {
        self.uint(u64::from(value))
    }

    /// Append a dynamic byte string.
    pub fn bytes(mut self, data: &[u8]) -> Self {
        match self.layout {
            Layout::Words => self.buf.extend_from_slice(sha256(data).as_bytes()),
            Layout::Packed => self.buf.extend_from_slice(data),
        }
        self
    }

    /// Consume the encoder and return the preimage bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Consume the encoder and return the SHA-256 of the preimage.
    pub fn hash(self) -> Bytes32 {
        sha256(&self.buf)
    }
}
