//! Errors raised while parsing keys and signatures.

use ers_core::hex::HexError;
use ers_core::ErsError;
use thiserror::Error;

/// Failure to decode or use key material.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Hex text could not be decoded.
    #[error("hex decoding failed: {0}")]
    Hex(#[from] HexError),

    /// Key bytes are not a valid Ed25519 point.
    #[error("key error: {0}")]
    KeyError(String),

    /// Signature bytes have the wrong width.
    #[error("signature must be {expected} bytes, got {actual}")]
    SignatureLength {
        /// Required width.
        expected: usize,
        /// Supplied width.
        actual: usize,
    },

    /// Merkle proof requested for a leaf that does not exist.
    #[error("leaf index {index} out of range for tree of {len} leaves")]
    LeafOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of leaves.
        len: usize,
    },
}

impl From<CryptoError> for ErsError {
    fn from(e: CryptoError) -> Self {
        ErsError::Malformed {
            what: "key material",
            reason: e.to_string(),
        }
    }
}
