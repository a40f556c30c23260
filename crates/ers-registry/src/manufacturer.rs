//! # Manufacturer Enrollment Registry
//!
//! Manufacturers and the enrollments that vouch for the chips they produce.
//!
//! ## Lifecycle
//!
//! ```text
//! Unregistered ──register──▶ Active(owner) ──revoke──▶ Revoked(owner = 0)
//!                                 │  ▲
//!                                 └──┘ transfer owner
//! ```
//!
//! `registered` is sticky: a revoked manufacturer id can never be registered
//! again, and its existing enrollments remain readable and keep verifying.
//!
//! ## Verification Strategies
//!
//! Each enrollment stores one [`EnrollmentAuth`] tag, and
//! [`ManufacturerRegistry::is_enrolled_chip`] dispatches on it:
//!
//! - `MerkleVerified { root }`: leaf `hash(index, chipId)` must prove into
//!   the root.
//! - `SignerVerified`: the certificate signer must have signed
//!   `hash(chipId)`.
//!
//! An inactive enrollment verifies nothing.

use std::collections::BTreeMap;

use ers_core::{hex, Address, Bytes32, ChipId, EnrollmentId, ErsError, ManufacturerId, Role};
use ers_crypto::{merkle, to_signed_message_hash, SignatureChecker};
use serde::{Deserialize, Serialize};

use crate::context::CallContext;
use crate::digest;
use crate::event::ProtocolEvent;

/// How an enrollment proves a chip belongs to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnrollmentAuth {
    /// Chips are leaves of a merkle tree with this root.
    MerkleVerified {
        /// Root of the chip tree.
        root: Bytes32,
    },
    /// Each chip carries a certificate from the enrollment's signer.
    SignerVerified,
}

/// Descriptive metadata of an enrollment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentMetadata {
    /// Where chip validation material is published.
    pub validation_uri: String,
    /// Fallback content for chips nobody has claimed yet.
    pub bootloader_uri: String,
    /// Chip model name.
    pub chip_model: String,
}

/// A manufacturer enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Owning manufacturer.
    pub manufacturer: ManufacturerId,
    /// Verification strategy.
    pub auth: EnrollmentAuth,
    /// Certificate signer.
    pub cert_signer: Address,
    /// Reference to the chip's authentication model.
    pub auth_model: Address,
    /// Descriptive metadata.
    pub metadata: EnrollmentMetadata,
    /// Inactive enrollments fail every provenance check.
    pub active: bool,
}

/// A manufacturer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manufacturer {
    /// Current owner; zero once revoked.
    pub owner: Address,
    /// Set on registration, never cleared.
    pub registered: bool,
    /// Enrollments in creation order.
    pub enrollments: Vec<EnrollmentId>,
    /// Next enrollment nonce.
    pub nonce: u64,
}

/// Proof that a chip belongs to an enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManufacturerProof {
    /// Inclusion in the enrollment's chip tree.
    Merkle {
        /// Leaf index.
        index: u64,
        /// Sibling path.
        proof: Vec<Bytes32>,
    },
    /// Certificate signature by the enrollment's signer.
    Certificate {
        /// Signature bytes.
        #[serde(with = "hex::serde_bytes")]
        signature: Vec<u8>,
    },
}

/// An enrollment id plus the proof for a specific chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturerValidation {
    /// Enrollment the chip claims to belong to.
    pub enrollment_id: EnrollmentId,
    /// Proof for that enrollment's strategy.
    pub proof: ManufacturerProof,
}

/// Arguments of `addEnrollment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEnrollment {
    /// Verification strategy.
    pub auth: EnrollmentAuth,
    /// Certificate signer; must be non-zero.
    pub cert_signer: Address,
    /// Authentication model reference.
    pub auth_model: Address,
    /// Descriptive metadata.
    pub metadata: EnrollmentMetadata,
}

/// Manufacturers and their enrollments.
#[derive(Debug, Clone, Default)]
pub struct ManufacturerRegistry {
    manufacturers: BTreeMap<ManufacturerId, Manufacturer>,
    enrollments: BTreeMap<EnrollmentId, Enrollment>,
}

impl ManufacturerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` under `owner`. Governance only; ids are never reused.
    pub fn register_manufacturer(
        &mut self,
        ctx: &mut CallContext<'_>,
        id: ManufacturerId,
        owner: Address,
    ) -> Result<(), ErsError> {
        ctx.params.require_governance(&ctx.caller)?;
        if id.is_zero() {
            return Err(ErsError::ZeroValue {
                field: "manufacturer_id",
            });
        }
        ers_core::require_nonzero_address(&owner, "owner")?;
        let entry = self.manufacturers.entry(id).or_default();
        if entry.registered {
            return Err(ErsError::ManufacturerAlreadyRegistered { manufacturer: id });
        }
        entry.owner = owner;
        entry.registered = true;
        ctx.emit(ProtocolEvent::ManufacturerRegistered {
            manufacturer: id,
            owner,
        });
        Ok(())
    }

    /// Zero the owner of `id`. Governance only.
    pub fn revoke_manufacturer(
        &mut self,
        ctx: &mut CallContext<'_>,
        id: ManufacturerId,
    ) -> Result<(), ErsError> {
        ctx.params.require_governance(&ctx.caller)?;
        let m = self.active_manufacturer_mut(&id)?;
        m.owner = Address::ZERO;
        ctx.emit(ProtocolEvent::ManufacturerRevoked { manufacturer: id });
        Ok(())
    }

    /// Hand `id` to `new_owner`. Current owner only.
    pub fn transfer_manufacturer_owner(
        &mut self,
        ctx: &mut CallContext<'_>,
        id: ManufacturerId,
        new_owner: Address,
    ) -> Result<(), ErsError> {
        let caller = ctx.caller;
        let m = self.active_manufacturer_mut(&id)?;
        if m.owner != caller {
            return Err(ErsError::unauthorized(Role::ManufacturerOwner, caller));
        }
        ers_core::require_nonzero_address(&new_owner, "owner")?;
        m.owner = new_owner;
        ctx.emit(ProtocolEvent::ManufacturerOwnerTransferred {
            manufacturer: id,
            owner: new_owner,
        });
        Ok(())
    }

    /// Add an enrollment to `id`. Current owner only.
    pub fn add_enrollment(
        &mut self,
        ctx: &mut CallContext<'_>,
        id: ManufacturerId,
        new: NewEnrollment,
    ) -> Result<EnrollmentId, ErsError> {
        let caller = ctx.caller;
        let m = self.active_manufacturer_mut(&id)?;
        if m.owner != caller {
            return Err(ErsError::unauthorized(Role::ManufacturerOwner, caller));
        }
        ers_core::require_nonzero_address(&new.cert_signer, "cert_signer")?;
        if let EnrollmentAuth::MerkleVerified { root } = new.auth {
            if root.is_zero() {
                return Err(ErsError::ZeroValue {
                    field: "merkle_root",
                });
            }
        }

        let enrollment_id = digest::enrollment_id(&id, m.nonce);
        m.nonce += 1;
        m.enrollments.push(enrollment_id);

        let merkle_verified = matches!(new.auth, EnrollmentAuth::MerkleVerified { .. });
        self.enrollments.insert(
            enrollment_id,
            Enrollment {
                manufacturer: id,
                auth: new.auth,
                cert_signer: new.cert_signer,
                auth_model: new.auth_model,
                metadata: new.metadata,
                active: true,
            },
        );
        ctx.emit(ProtocolEvent::EnrollmentAdded {
            manufacturer: id,
            enrollment: enrollment_id,
            merkle_verified,
            cert_signer: new.cert_signer,
        });
        Ok(enrollment_id)
    }

    /// Activate or deactivate an enrollment. Current owner only.
    pub fn update_enrollment_status(
        &mut self,
        ctx: &mut CallContext<'_>,
        enrollment_id: EnrollmentId,
        active: bool,
    ) -> Result<(), ErsError> {
        let enrollment = self
            .enrollments
            .get_mut(&enrollment_id)
            .ok_or(ErsError::EnrollmentNotFound {
                enrollment: enrollment_id,
            })?;
        let owner = self
            .manufacturers
            .get(&enrollment.manufacturer)
            .map_or(Address::ZERO, |m| m.owner);
        if owner.is_zero() || owner != ctx.caller {
            return Err(ErsError::unauthorized(Role::ManufacturerOwner, ctx.caller));
        }
        enrollment.active = active;
        ctx.emit(ProtocolEvent::EnrollmentStatusUpdated {
            enrollment: enrollment_id,
            active,
        });
        Ok(())
    }

    /// Whether `chip` belongs to `enrollment_id` according to `proof`.
    ///
    /// Pure: unknown enrollments, inactive enrollments and proofs of the
    /// wrong strategy all yield `false`.
    pub fn is_enrolled_chip(
        &self,
        signatures: &SignatureChecker,
        enrollment_id: &EnrollmentId,
        chip: &ChipId,
        proof: &ManufacturerProof,
    ) -> bool {
        let Some(enrollment) = self.enrollments.get(enrollment_id) else {
            return false;
        };
        if !enrollment.active {
            tracing::debug!(enrollment = %enrollment_id, "enrollment inactive");
            return false;
        }
        match (&enrollment.auth, proof) {
            (EnrollmentAuth::MerkleVerified { root }, ManufacturerProof::Merkle { index, proof }) => {
                merkle::verify(proof, root, &digest::manufacturer_leaf(*index, chip))
            }
            (EnrollmentAuth::SignerVerified, ManufacturerProof::Certificate { signature }) => {
                let hash = to_signed_message_hash(&digest::chip_certificate(chip));
                signatures.is_valid_signature_now(&enrollment.cert_signer, &hash, signature)
            }
            _ => false,
        }
    }

    /// Manufacturer record, if ever registered.
    pub fn manufacturer(&self, id: &ManufacturerId) -> Option<&Manufacturer> {
        self.manufacturers.get(id).filter(|m| m.registered)
    }

    /// Enrollment record.
    pub fn enrollment(&self, id: &EnrollmentId) -> Option<&Enrollment> {
        self.enrollments.get(id)
    }

    /// Enrollment ids of a manufacturer, oldest first.
    pub fn enrollments_of(&self, id: &ManufacturerId) -> &[EnrollmentId] {
        self.manufacturers
            .get(id)
            .map(|m| m.enrollments.as_slice())
            .unwrap_or(&[])
    }

    fn active_manufacturer_mut(&mut self, id: &ManufacturerId) -> Result<&mut Manufacturer, ErsError> {
        match self.manufacturers.get_mut(id) {
            Some(m) if m.registered && !m.owner.is_zero() => Ok(m),
            Some(m) if m.registered => Err(ErsError::ManufacturerRevoked { manufacturer: *id }),
            _ => Err(ErsError::ManufacturerNotFound { manufacturer: *id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_env::TestEnv;
    use ers_core::ErrorKind;
    use ers_crypto::{KeyPair, MerkleTree};

    const GOV: Address = Address::new([0xee; 20]);
    const OWNER: Address = Address::new([0x0a; 20]);

    fn acme() -> ManufacturerId {
        ManufacturerId::from_label("acme")
    }

    fn setup() -> (ManufacturerRegistry, TestEnv) {
        let mut env = TestEnv::new(GOV);
        let mut reg = ManufacturerRegistry::new();
        reg.register_manufacturer(&mut env.ctx(GOV), acme(), OWNER)
            .unwrap();
        (reg, env)
    }

    fn merkle_enrollment(root: Bytes32) -> NewEnrollment {
        NewEnrollment {
            auth: EnrollmentAuth::MerkleVerified { root },
            cert_signer: Address::new([0x5e; 20]),
            auth_model: Address::new([0xa0; 20]),
            metadata: EnrollmentMetadata {
                bootloader_uri: "https://boot.test".into(),
                ..EnrollmentMetadata::default()
            },
        }
    }

    #[test]
    fn test_register_is_governance_only_and_sticky() {
        let (mut reg, mut env) = setup();
        let err = reg
            .register_manufacturer(&mut env.ctx(OWNER), ManufacturerId::from_label("x"), OWNER)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        reg.revoke_manufacturer(&mut env.ctx(GOV), acme()).unwrap();
        let m = reg.manufacturer(&acme()).unwrap();
        assert!(m.registered);
        assert!(m.owner.is_zero());

        let err = reg
            .register_manufacturer(&mut env.ctx(GOV), acme(), OWNER)
            .unwrap_err();
        assert_eq!(
            err,
            ErsError::ManufacturerAlreadyRegistered {
                manufacturer: acme()
            }
        );
    }

    #[test]
    fn test_revoke_twice_fails() {
        let (mut reg, mut env) = setup();
        reg.revoke_manufacturer(&mut env.ctx(GOV), acme()).unwrap();
        let err = reg.revoke_manufacturer(&mut env.ctx(GOV), acme()).unwrap_err();
        assert!(matches!(err, ErsError::ManufacturerRevoked { .. }));
    }

    #[test]
    fn test_enrollment_ids_and_nonce() {
        let (mut reg, mut env) = setup();
        let root = Bytes32::from_u64(1);
        let e0 = reg
            .add_enrollment(&mut env.ctx(OWNER), acme(), merkle_enrollment(root))
            .unwrap();
        let e1 = reg
            .add_enrollment(&mut env.ctx(OWNER), acme(), merkle_enrollment(root))
            .unwrap();
        assert_eq!(e0, digest::enrollment_id(&acme(), 0));
        assert_eq!(e1, digest::enrollment_id(&acme(), 1));
        assert_eq!(reg.enrollments_of(&acme()), &[e0, e1]);
        assert_eq!(reg.manufacturer(&acme()).unwrap().nonce, 2);
    }

    #[test]
    fn test_add_enrollment_requires_owner_and_signer() {
        let (mut reg, mut env) = setup();
        let err = reg
            .add_enrollment(&mut env.ctx(GOV), acme(), merkle_enrollment(Bytes32::from_u64(1)))
            .unwrap_err();
        assert_eq!(err, ErsError::unauthorized(Role::ManufacturerOwner, GOV));

        let mut e = merkle_enrollment(Bytes32::from_u64(1));
        e.cert_signer = Address::ZERO;
        let err = reg.add_enrollment(&mut env.ctx(OWNER), acme(), e).unwrap_err();
        assert_eq!(
            err,
            ErsError::ZeroAddress {
                field: "cert_signer"
            }
        );
    }

    #[test]
    fn test_revoked_manufacturer_cannot_enroll() {
        let (mut reg, mut env) = setup();
        reg.revoke_manufacturer(&mut env.ctx(GOV), acme()).unwrap();
        let err = reg
            .add_enrollment(&mut env.ctx(OWNER), acme(), merkle_enrollment(Bytes32::from_u64(1)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }

    #[test]
    fn test_merkle_enrolled_chips_verify() {
        let (mut reg, mut env) = setup();
        let chips = [Address::new([1; 20]), Address::new([2; 20])];
        let leaves = chips
            .iter()
            .enumerate()
            .map(|(i, c)| digest::manufacturer_leaf(i as u64, c))
            .collect();
        let tree = MerkleTree::new(leaves);
        let e = reg
            .add_enrollment(&mut env.ctx(OWNER), acme(), merkle_enrollment(tree.root()))
            .unwrap();

        for (i, chip) in chips.iter().enumerate() {
            let proof = ManufacturerProof::Merkle {
                index: i as u64,
                proof: tree.proof(i).unwrap(),
            };
            assert!(reg.is_enrolled_chip(&env.signatures, &e, chip, &proof));
        }
        // B's proof presented for A's id.
        let proof = ManufacturerProof::Merkle {
            index: 0,
            proof: tree.proof(1).unwrap(),
        };
        assert!(!reg.is_enrolled_chip(&env.signatures, &e, &chips[0], &proof));
        // Wrong index, wrong chip.
        let proof = ManufacturerProof::Merkle {
            index: 1,
            proof: tree.proof(0).unwrap(),
        };
        assert!(!reg.is_enrolled_chip(&env.signatures, &e, &chips[0], &proof));
        let proof = ManufacturerProof::Merkle {
            index: 0,
            proof: tree.proof(0).unwrap(),
        };
        assert!(!reg.is_enrolled_chip(&env.signatures, &e, &Address::new([3; 20]), &proof));
    }

    #[test]
    fn test_signer_enrolled_chips_verify() {
        let (mut reg, mut env) = setup();
        let signer = KeyPair::from_seed(&[7; 32]);
        let e = reg
            .add_enrollment(
                &mut env.ctx(OWNER),
                acme(),
                NewEnrollment {
                    auth: EnrollmentAuth::SignerVerified,
                    cert_signer: signer.address(),
                    auth_model: Address::ZERO,
                    metadata: EnrollmentMetadata::default(),
                },
            )
            .unwrap();
        let chip = Address::new([9; 20]);
        let cert = signer.sign_message(&digest::chip_certificate(&chip)).to_bytes();
        let proof = ManufacturerProof::Certificate { signature: cert };
        assert!(reg.is_enrolled_chip(&env.signatures, &e, &chip, &proof));
        assert!(!reg.is_enrolled_chip(&env.signatures, &e, &Address::new([8; 20]), &proof));

        // Strategy mismatch.
        let merkle = ManufacturerProof::Merkle {
            index: 0,
            proof: vec![],
        };
        assert!(!reg.is_enrolled_chip(&env.signatures, &e, &chip, &merkle));
    }

    #[test]
    fn test_inactive_enrollment_fails_and_revocation_does_not() {
        let (mut reg, mut env) = setup();
        let chip = Address::new([1; 20]);
        let root = digest::manufacturer_leaf(0, &chip);
        let e = reg
            .add_enrollment(&mut env.ctx(OWNER), acme(), merkle_enrollment(root))
            .unwrap();
        let proof = ManufacturerProof::Merkle {
            index: 0,
            proof: vec![],
        };

        reg.update_enrollment_status(&mut env.ctx(OWNER), e, false)
            .unwrap();
        assert!(!reg.is_enrolled_chip(&env.signatures, &e, &chip, &proof));
        reg.update_enrollment_status(&mut env.ctx(OWNER), e, true)
            .unwrap();
        assert!(reg.is_enrolled_chip(&env.signatures, &e, &chip, &proof));

        reg.revoke_manufacturer(&mut env.ctx(GOV), acme()).unwrap();
        assert!(reg.is_enrolled_chip(&env.signatures, &e, &chip, &proof));
        assert!(reg.enrollment(&e).is_some());
    }

    #[test]
    fn test_transfer_owner() {
        let (mut reg, mut env) = setup();
        let next = Address::new([0x0b; 20]);
        reg.transfer_manufacturer_owner(&mut env.ctx(OWNER), acme(), next)
            .unwrap();
        assert_eq!(reg.manufacturer(&acme()).unwrap().owner, next);
        let err = reg
            .transfer_manufacturer_owner(&mut env.ctx(OWNER), acme(), OWNER)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_unknown_enrollment_is_not_enrolled() {
        let (reg, env) = setup();
        let proof = ManufacturerProof::Certificate { signature: vec![] };
        assert!(!reg.is_enrolled_chip(
            &env.signatures,
            &EnrollmentId::ZERO,
            &Address::new([1; 20]),
            &proof
        ));
    }

    #[test]
    fn test_validation_json_shape() {
        let v = ManufacturerValidation {
            enrollment_id: EnrollmentId::ZERO,
            proof: ManufacturerProof::Certificate {
                signature: vec![0xab],
            },
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["proof"]["kind"], "certificate");
        assert_eq!(json["proof"]["signature"], "0xab");
    }
}
