//! # Message and Leaf Digests
//!
//! Every hash a registry verifies a signature or merkle proof against is
//! built here, and nowhere else. Off-chain tooling (the CLI, gateways,
//! manufacturers' provisioning lines) must reproduce these byte layouts
//! exactly.
//!
//! Signatures are never over these digests directly: signers sign
//! `ers_crypto::to_signed_message_hash(digest)` and verifiers check against
//! the same wrapped value.

use ers_core::{Address, Bytes32, ChipId, EnrollmentId, Encoder, ManufacturerId, ServiceId};

/// `hash(manufacturerId, nonce)`.
pub fn enrollment_id(manufacturer: &ManufacturerId, nonce: u64) -> EnrollmentId {
    EnrollmentId(Encoder::words().word(manufacturer.as_word()).uint(nonce).hash())
}

/// Manufacturer merkle leaf, `hash(index, chipId)`.
pub fn manufacturer_leaf(index: u64, chip: &ChipId) -> Bytes32 {
    Encoder::words().uint(index).address(chip).hash()
}

/// `hash(chipId)`, signed by a manufacturer certificate signer or a project
/// public key to vouch for a single chip.
pub fn chip_certificate(chip: &ChipId) -> Bytes32 {
    Encoder::words().address(chip).hash()
}

/// `hash(chainId, projectRegistrar)`, signed by the project public key.
pub fn project_ownership(chain_id: u64, project_registrar: &Address) -> Bytes32 {
    Encoder::packed()
        .uint(chain_id)
        .address(project_registrar)
        .hash()
}

/// `hash(chainId, claimant)`, signed by the chip.
pub fn chip_custody(chain_id: u64, claimant: &Address) -> Bytes32 {
    Encoder::packed().uint(chain_id).address(claimant).hash()
}

/// Project claim-tree leaf over
/// `(index, chipId, enrollmentId, lockinPeriod, serviceId, tokenUri)`.
pub fn project_claim_leaf(
    index: u64,
    chip: &ChipId,
    enrollment: &EnrollmentId,
    lockin_period: u64,
    service: &ServiceId,
    token_uri: &str,
) -> Bytes32 {
    Encoder::words()
        .uint(index)
        .address(chip)
        .word(enrollment.as_word())
        .uint(lockin_period)
        .word(service.as_word())
        .bytes(token_uri.as_bytes())
        .hash()
}

/// `hash(owner, blockhash(commitBlock), payload)`, signed by the chip to
/// authorise a service binding change.
pub fn service_change(owner: &Address, commit_block_hash: &Bytes32, payload: &Bytes32) -> Bytes32 {
    Encoder::words()
        .address(owner)
        .word(commit_block_hash)
        .word(payload)
        .hash()
}

/// Payload of a primary service change.
pub fn primary_service_payload(service: &ServiceId, timelock: u64) -> Bytes32 {
    Encoder::words()
        .bytes(b"setNewPrimaryService")
        .word(service.as_word())
        .uint(timelock)
        .hash()
}

/// Payload of a secondary service addition.
pub fn add_secondary_payload(service: &ServiceId) -> Bytes32 {
    Encoder::words()
        .bytes(b"addSecondaryService")
        .word(service.as_word())
        .hash()
}

/// Payload of a secondary service removal.
pub fn remove_secondary_payload(service: &ServiceId) -> Bytes32 {
    Encoder::words()
        .bytes(b"removeSecondaryService")
        .word(service.as_word())
        .hash()
}
