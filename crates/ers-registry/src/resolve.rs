//! # Chip Resolution
//!
//! `resolveChipId` answers from ledger state for enrolled chips. For a chip
//! nobody has claimed it raises an [`OffchainLookup`]: the client fetches a
//! [`GatewayResponse`] from one of the gateway URLs and hands it to
//! [`resolve_unclaimed_chip`], which re-verifies every embedded proof before
//! trusting any of it.
//!
//! ## Security Invariant
//!
//! The callback is a pure view. A gateway can withhold data but cannot make
//! a chip resolve to a service unless the manufacturer proof, the project's
//! developer certificate and the claim-tree inclusion all verify against
//! state already on the ledger.

use ers_core::{
    hex, sha256, Address, Bytes32, ChipId, Encoder, ErsError, OffchainLookup, ProofKind,
    RecordType,
};
use ers_crypto::{merkle, to_signed_message_hash, SignatureChecker};
use serde::{Deserialize, Serialize};

use crate::chip::{ChipRegistry, ClaimModel, ProjectClaim};
use crate::digest;
use crate::governance::ProtocolParams;
use crate::manufacturer::{ManufacturerRegistry, ManufacturerValidation};
use crate::services::{RecordContent, ServicesRegistry};

/// Method the gateway is asked to answer.
pub const RESOLVE_UNCLAIMED_SIGNATURE: &str = "resolveUnclaimedChip(address)";

/// Callback that verifies the gateway's answer.
pub const RESOLVE_CALLBACK_SIGNATURE: &str = "resolveUnclaimedChipCallback(bytes,bytes)";

/// Record type of the manufacturer fallback.
pub const BOOTLOADER_RECORD: &str = "bootloader";

/// First four bytes of the hash of a method signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = sha256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash.as_bytes()[..4]);
    out
}

/// One project's candidate claim on the chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeveloperEntry {
    /// Project registrar making the claim.
    pub project_registrar: Address,
    /// Claim-tree leaf and proof.
    pub claim: ProjectClaim,
    /// Project public key signature over `hash(chipId)`.
    #[serde(with = "hex::serde_bytes")]
    pub developer_certificate: Vec<u8>,
}

/// What a gateway returns for an unclaimed chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// Manufacturer provenance of the chip.
    pub manufacturer_validation: ManufacturerValidation,
    /// Candidate projects, tried in order.
    #[serde(default)]
    pub developer_entries: Vec<DeveloperEntry>,
}

/// Resolve `chip` to its primary service records, or raise an off-chain
/// lookup if it has not been claimed.
pub fn resolve_chip_id(
    chips: &ChipRegistry,
    services: &ServicesRegistry,
    params: &ProtocolParams,
    chip: &ChipId,
) -> Result<Vec<RecordContent>, ErsError> {
    ers_core::require_nonzero_address(chip, "chip_id")?;
    if chips.is_enrolled(chip) {
        return services.primary_service_content(chip);
    }
    let mut call_data = selector(RESOLVE_UNCLAIMED_SIGNATURE).to_vec();
    call_data.extend(Encoder::words().address(chip).finish());
    tracing::debug!(chip = %chip, "unclaimed chip, deferring to gateway");
    Err(ErsError::OffchainLookup(Box::new(OffchainLookup {
        sender: chips.address(),
        urls: params.gateway_urls.clone(),
        call_data,
        callback: selector(RESOLVE_CALLBACK_SIGNATURE),
        extra_data: Encoder::words().address(chip).finish(),
    })))
}

/// Verify a gateway `response` for the chip encoded in `extra_data`.
///
/// Returns the content of the first developer entry whose certificate and
/// claim inclusion verify, or the enrollment's bootloader record when none
/// does. A chip that was claimed since the lookup was raised resolves from
/// ledger state and the response is ignored.
pub fn resolve_unclaimed_chip(
    chips: &ChipRegistry,
    services: &ServicesRegistry,
    manufacturers: &ManufacturerRegistry,
    signatures: &SignatureChecker,
    response: &[u8],
    extra_data: &[u8],
) -> Result<Vec<RecordContent>, ErsError> {
    let word = Bytes32::from_slice(extra_data).map_err(|e| ErsError::Malformed {
        what: "extra data",
        reason: e.to_string(),
    })?;
    let chip = Address::from_word(&word);
    if chips.is_enrolled(&chip) {
        return services.primary_service_content(&chip);
    }

    let response: GatewayResponse =
        serde_json::from_slice(response).map_err(|e| ErsError::Malformed {
            what: "gateway response",
            reason: e.to_string(),
        })?;
    let validation = &response.manufacturer_validation;
    if !manufacturers.is_enrolled_chip(signatures, &validation.enrollment_id, &chip, &validation.proof) {
        return Err(ErsError::invalid_proof(ProofKind::ManufacturerEnrollment));
    }

    let certificate = to_signed_message_hash(&digest::chip_certificate(&chip));
    for entry in &response.developer_entries {
        let Some(project) = chips.project(&entry.project_registrar) else {
            tracing::debug!(project = %entry.project_registrar, "gateway entry for unknown project");
            continue;
        };
        let ClaimModel::Merkle { root } = project.claim else {
            continue;
        };
        if !signatures.is_valid_signature_now(
            &project.public_key,
            &certificate,
            &entry.developer_certificate,
        ) {
            tracing::debug!(project = %entry.project_registrar, chip = %chip, "developer certificate rejected");
            continue;
        }
        let leaf = entry.claim.leaf(&chip, &validation.enrollment_id);
        if !merkle::verify(&entry.claim.proof, &root, &leaf) {
            tracing::debug!(project = %entry.project_registrar, chip = %chip, "claim inclusion rejected");
            continue;
        }
        return services.service_content(&entry.claim.service_id, &chip);
    }

    let enrollment = manufacturers
        .enrollment(&validation.enrollment_id)
        .ok_or(ErsError::EnrollmentNotFound {
            enrollment: validation.enrollment_id,
        })?;
    Ok(vec![RecordContent {
        record_type: RecordType::from_label(BOOTLOADER_RECORD),
        content: enrollment.metadata.bootloader_uri.as_bytes().to_vec(),
    }])
}
