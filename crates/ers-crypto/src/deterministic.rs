//! Deterministic deployment addresses.
//!
//! `address = last20(sha256(0xff || deployer || salt || initCodeHash))`.
//! The function is pure so a project key can sign its ownership proof
//! before the registrar exists. Whether the address is already occupied is
//! the deployer's concern, not this module's.

use ers_core::{sha256, Address, Bytes32};

/// Leading marker byte of the preimage.
pub const DEPLOY_MARKER: u8 = 0xff;

/// Compute where `deployer` would place code with `init_code_hash` under
/// `salt`.
pub fn compute_address(deployer: &Address, salt: &Bytes32, init_code_hash: &Bytes32) -> Address {
    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(DEPLOY_MARKER);
    preimage.extend_from_slice(deployer.as_bytes());
    preimage.extend_from_slice(salt.as_bytes());
    preimage.extend_from_slice(init_code_hash.as_bytes());
    Address::from_word(&sha256(&preimage))
}
