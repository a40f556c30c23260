//! # ers-crypto — Cryptographic Primitives
//!
//! Provides the cryptographic building blocks for the ERS registries:
//!
//! - **Ed25519** account keys. Accounts and chips share one address
//!   derivation, `last20(sha256(public_key))`.
//! - **Account signatures** (`public_key || signature`) and signed-message
//!   hashing for custody, ownership and certificate proofs.
//! - **Signature checker** dispatching to raw-key or contract signers.
//! - **Sorted-pair merkle trees** for manufacturer and project claim trees.
//! - **Deterministic addresses** for registrar deployment.
//!
//! ## Crate Policy
//!
//! - Depends only on `ers-core` internally.
//! - No mocking of cryptographic operations in tests. All tests use real
//!   SHA-256 and real Ed25519.
//! - No `unsafe` code.

pub mod deterministic;
pub mod ed25519;
pub mod error;
pub mod merkle;
pub mod signature;

pub use deterministic::compute_address;
pub use ed25519::{KeyPair, PublicKey, Signature};
pub use error::CryptoError;
pub use merkle::MerkleTree;
pub use signature::{
    to_signed_message_hash, AccountSignature, ContractSigner, OwnerSetWallet, SignatureChecker,
};
