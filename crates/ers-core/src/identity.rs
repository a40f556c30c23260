//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every 32-byte identifier in the registry. These
//! prevent identifier confusion: an `EnrollmentId` cannot be passed where a
//! `ServiceId` is expected, and a namespace `Node` is never mistaken for a
//! merkle root.
//!
//! Chips are identified by the address derived from their embedded key, so
//! [`ChipId`] is an alias of [`Address`] rather than a distinct type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::sha256;
use crate::primitives::{Address, Bytes32};

/// A chip's identifier: the address of the key pair embedded in the chip.
pub type ChipId = Address;

macro_rules! word_id {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Bytes32);

        impl $name {
            /// The all-zero identifier, never valid as a live id.
            pub const ZERO: Self = Self(Bytes32::ZERO);

            /// Whether this is the all-zero identifier.
            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }

            /// Borrow the underlying word.
            pub fn as_word(&self) -> &Bytes32 {
                &self.0
            }
        }

        impl From<Bytes32> for $name {
            fn from(word: Bytes32) -> Self {
                Self(word)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }
    };
}

word_id!(
    ManufacturerId,
    "manufacturer",
    "Opaque manufacturer identifier assigned by governance."
);

word_id!(
    EnrollmentId,
    "enrollment",
    "Manufacturer enrollment identifier, `hash(manufacturerId, nonce)`."
);

word_id!(ServiceId, "service", "Identifier of a service bundle.");

word_id!(
    RecordType,
    "record",
    "Identifier of a record type inside a service (e.g. `tokenUri`)."
);

word_id!(
    Node,
    "node",
    "A namespace node hash, `hash(parentNode, hash(label))`."
);

impl ManufacturerId {
    /// Derive a manufacturer id from a human-readable name.
    pub fn from_label(label: &str) -> Self {
        Self(sha256(label.as_bytes()))
    }
}

impl ServiceId {
    /// Derive a service id from a human-readable name.
    pub fn from_label(label: &str) -> Self {
        Self(sha256(label.as_bytes()))
    }
}

impl RecordType {
    /// Derive a record type from its human-readable name.
    pub fn from_label(label: &str) -> Self {
        Self(sha256(label.as_bytes()))
    }
}

impl Node {
    /// The namespace root's parent (all zeroes).
    pub const ROOT_PARENT: Self = Self::ZERO;
}

/// Label bytes used for a chip's namespace node.
pub fn chip_label(chip: &ChipId) -> [u8; 20] {
    chip.0
}
