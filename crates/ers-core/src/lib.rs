//! # ers-core — Foundational Types for the ERS Chip Registry
//!
//! This crate is the bedrock of the ERS workspace. It defines the primitive
//! value types every registry speaks in, the hashing and encoding pipeline
//! used for identifiers and signed messages, the ledger clock, and the
//! error taxonomy. Every other crate depends on `ers-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `ManufacturerId`, `EnrollmentId`,
//!    `ServiceId`, `RecordType` and `Node` are distinct types over a 32-byte
//!    word. A service id cannot be passed where an enrollment id is expected.
//!
//! 2. **One hashing pipeline.** Identifiers, namespace nodes, merkle leaves and
//!    signed messages are all produced by SHA-256 over an [`abi::Encoder`]
//!    byte layout, so two components never disagree on how a value is hashed.
//!
//! 3. **Ledger time only.** Time-based gating reads the externally supplied
//!    [`chain::Chain`] (block number and block timestamp), never the wall
//!    clock.
//!
//! 4. **Categorised errors.** Every rejection is an [`ErsError`] whose
//!    [`ErrorKind`] tells callers *why* an operation was refused.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `ers-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod abi;
pub mod chain;
pub mod error;
pub mod hash;
pub mod hex;
pub mod identity;
pub mod lookup;
pub mod primitives;

// Re-export primary types for ergonomic imports.
pub use abi::Encoder;
pub use chain::{timestamp_to_iso8601, Chain};
pub use error::{require_nonzero_address, ErrorKind, ErsError, ProofKind, Role};
pub use hash::{label_hash, namehash, sha256, subnode};
pub use identity::{ChipId, EnrollmentId, ManufacturerId, Node, RecordType, ServiceId};
pub use lookup::OffchainLookup;
pub use primitives::{Address, Bytes32};
