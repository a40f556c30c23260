//! # Chip Registry — Verification Core
//!
//! Holds project enrollments and chip enrollments, and runs the verification
//! chain that turns a physical chip into a named, owned identity.
//!
//! ## States
//!
//! ```text
//! Project:  Unenrolled ──enroll──▶ Enrolled(chipsAdded = false) ──first chip──▶ Enrolled(chipsAdded = true)
//!                 ▲                          │
//!                 └──────── remove ──────────┘
//!
//! Chip:     NotEnrolled ──add / claim──▶ Enrolled   (immutable)
//! ```
//!
//! ## Security Invariant
//!
//! `add_chip` and `claim_chip` run the same ordered chain and abort on the
//! first failure:
//!
//! 1. zero chip id or owner
//! 2. chip already enrolled
//! 3. calling registrar has no project enrollment
//! 4. chip possession signature over `hash(chainId, owner)`
//! 5. manufacturer provenance
//! 6. project-side proof: claim-tree inclusion, or the attested call itself
//! 7. effective lock-in `min(lockinPeriod, creation + maxLockinPeriod)`
//! 8. chip namespace node creation
//! 9. chip record, initial service binding, `chipsAdded`
//! 10. chip-added event
//!
//! The "already enrolled" check is the first state read, so of two racing
//! claims for one chip the first ordered one wins and the second fails
//! with a state conflict.

use std::collections::BTreeMap;

use ers_core::{
    hex, Address, Bytes32, ChipId, EnrollmentId, ErsError, Node, ProofKind, Role, ServiceId,
};
use ers_crypto::{merkle, to_signed_message_hash};
use serde::{Deserialize, Serialize};

use crate::context::CallContext;
use crate::developer::DeveloperRegistry;
use crate::digest;
use crate::event::ProtocolEvent;
use crate::manufacturer::{ManufacturerRegistry, ManufacturerValidation};
use crate::naming::NamingRegistry;
use crate::services::{ChipOwnership, ServicesRegistry};

/// How a project proves a chip belongs to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClaimModel {
    /// The project registrar's direct call is the proof.
    Attested,
    /// Chips are leaves of a claim tree with this root.
    Merkle {
        /// Root of the claim tree.
        root: Bytes32,
    },
}

/// A project's enrollment in the Chip Registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEnrollment {
    /// The project's namespace node.
    pub name_hash: Node,
    /// Developer registrar that enrolled the project.
    pub developer_registrar: Address,
    /// Signer of the project's ownership proof and developer certificates.
    pub public_key: Address,
    /// Default primary service for attested chips.
    pub service_id: ServiceId,
    /// Default lock-in timestamp for attested chips.
    pub lockin_period: u64,
    /// Ledger timestamp at enrollment.
    pub creation_timestamp: u64,
    /// Set by the first chip; blocks removal.
    pub chips_added: bool,
    /// Project-side proof strategy.
    pub claim: ClaimModel,
}

/// Arguments of `addProjectEnrollment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectEnrollmentRequest {
    /// Deployed address of the project registrar.
    pub project_registrar: Address,
    /// The project's namespace node.
    pub name_hash: Node,
    /// Project public key (signer address).
    pub public_key: Address,
    /// Default service.
    pub service_id: ServiceId,
    /// Default lock-in timestamp.
    pub lockin_period: u64,
    /// Claim model.
    pub claim: ClaimModel,
    /// Signature by `public_key` over `hash(chainId, project_registrar)`.
    pub ownership_proof: Vec<u8>,
}

/// A chip's enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipInfo {
    /// The chip's namespace node.
    pub node: Node,
    /// Project the chip belongs to.
    pub project_registrar: Address,
    /// Manufacturer enrollment that vouched for it.
    pub enrollment_id: EnrollmentId,
    /// Token metadata URI.
    pub token_uri: String,
    /// Always true for a stored record.
    pub added: bool,
}

/// One leaf of a project claim tree, with its inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectClaim {
    /// Leaf index.
    pub index: u64,
    /// Primary service to bind.
    pub service_id: ServiceId,
    /// Requested lock-in timestamp.
    pub lockin_period: u64,
    /// Token metadata URI.
    pub token_uri: String,
    /// Sibling path.
    pub proof: Vec<Bytes32>,
}

impl ProjectClaim {
    /// The leaf this claim proves for `chip` under `enrollment`.
    pub fn leaf(&self, chip: &ChipId, enrollment: &EnrollmentId) -> Bytes32 {
        digest::project_claim_leaf(
            self.index,
            chip,
            enrollment,
            self.lockin_period,
            &self.service_id,
            &self.token_uri,
        )
    }
}

/// Proof of chip possession by the claimant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyProof(#[serde(with = "hex::serde_bytes")] pub Vec<u8>);

/// The project-side part of a chip enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSide<'a> {
    /// Registrar-attested chip with its token URI.
    Attested {
        /// Token metadata URI.
        token_uri: &'a str,
    },
    /// Claim-tree leaf.
    Claim(&'a ProjectClaim),
}

/// Registries the Chip Registry calls into while enrolling chips.
pub struct ChipDeps<'a> {
    /// Namespace for chip nodes.
    pub naming: &'a mut NamingRegistry,
    /// Initial service bindings.
    pub services: &'a mut ServicesRegistry,
    /// Provenance checks.
    pub manufacturers: &'a ManufacturerRegistry,
}

/// The Chip Registry.
#[derive(Debug, Clone)]
pub struct ChipRegistry {
    address: Address,
    initialized: bool,
    projects: BTreeMap<Address, ProjectEnrollment>,
    chips: BTreeMap<ChipId, ChipInfo>,
}

impl ChipRegistry {
    /// An uninitialised registry at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            initialized: false,
            projects: BTreeMap::new(),
            chips: BTreeMap::new(),
        }
    }

    /// This registry's address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// One-time wiring. Governance only.
    pub fn initialize(&mut self, ctx: &CallContext<'_>) -> Result<(), ErsError> {
        ctx.params.require_governance(&ctx.caller)?;
        if self.initialized {
            return Err(ErsError::AlreadyInitialized {
                component: "chip registry",
            });
        }
        self.initialized = true;
        Ok(())
    }

    /// Whether [`ChipRegistry::initialize`] has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ── Projects ─────────────────────────────────────────────────────

    /// Enroll a project. Caller must be a registered developer registrar.
    pub fn add_project_enrollment(
        &mut self,
        ctx: &mut CallContext<'_>,
        developers: &DeveloperRegistry,
        services: &ServicesRegistry,
        req: ProjectEnrollmentRequest,
    ) -> Result<(), ErsError> {
        if !developers.is_developer_registrar(&ctx.caller) {
            return Err(ErsError::unauthorized(Role::DeveloperRegistrar, ctx.caller));
        }
        if self.projects.contains_key(&req.project_registrar) {
            return Err(ErsError::ProjectAlreadyEnrolled {
                registrar: req.project_registrar,
            });
        }
        ers_core::require_nonzero_address(&req.project_registrar, "project_registrar")?;
        ers_core::require_nonzero_address(&req.public_key, "public_key")?;
        if req.lockin_period == 0 {
            return Err(ErsError::ZeroValue {
                field: "lockin_period",
            });
        }
        if let ClaimModel::Merkle { root } = req.claim {
            if root.is_zero() {
                return Err(ErsError::ZeroValue {
                    field: "merkle_root",
                });
            }
        }
        if !services.is_valid_service(&req.service_id) {
            return Err(ErsError::ServiceNotFound {
                service: req.service_id,
            });
        }
        let message = to_signed_message_hash(&digest::project_ownership(
            ctx.chain.chain_id(),
            &req.project_registrar,
        ));
        if !ctx
            .signatures
            .is_valid_signature_now(&req.public_key, &message, &req.ownership_proof)
        {
            return Err(ErsError::invalid_proof(ProofKind::ProjectOwnership));
        }

        self.projects.insert(
            req.project_registrar,
            ProjectEnrollment {
                name_hash: req.name_hash,
                developer_registrar: ctx.caller,
                public_key: req.public_key,
                service_id: req.service_id,
                lockin_period: req.lockin_period,
                creation_timestamp: ctx.now(),
                chips_added: false,
                claim: req.claim,
            },
        );
        ctx.emit(ProtocolEvent::ProjectEnrolled {
            project_registrar: req.project_registrar,
            public_key: req.public_key,
            service_id: req.service_id,
            node: req.name_hash,
        });
        Ok(())
    }

    /// Delete a project enrollment that never received chips. Enrolling
    /// developer registrar only.
    pub fn remove_project_enrollment(
        &mut self,
        ctx: &mut CallContext<'_>,
        project_registrar: &Address,
    ) -> Result<(), ErsError> {
        let project = self.project_of_caller(ctx, project_registrar)?;
        if project.chips_added {
            return Err(ErsError::ChipsAlreadyAdded {
                registrar: *project_registrar,
            });
        }
        self.projects.remove(project_registrar);
        ctx.emit(ProtocolEvent::ProjectEnrollmentRemoved {
            project_registrar: *project_registrar,
        });
        Ok(())
    }

    /// Replace a merkle project's claim root inside the update window.
    /// Enrolling developer registrar only.
    pub fn update_project_merkle_root(
        &mut self,
        ctx: &mut CallContext<'_>,
        project_registrar: &Address,
        new_root: Bytes32,
    ) -> Result<(), ErsError> {
        let project = self.project_of_caller(ctx, project_registrar)?;
        if !matches!(project.claim, ClaimModel::Merkle { .. }) {
            return Err(ErsError::ClaimModelMismatch {
                registrar: *project_registrar,
            });
        }
        let deadline = project
            .creation_timestamp
            .saturating_add(ctx.params.project_update_window);
        let now = ctx.now();
        if now > deadline {
            return Err(ErsError::UpdateWindowClosed {
                registrar: *project_registrar,
                deadline,
                now,
            });
        }
        if new_root.is_zero() {
            return Err(ErsError::ZeroValue {
                field: "merkle_root",
            });
        }
        if let Some(project) = self.projects.get_mut(project_registrar) {
            project.claim = ClaimModel::Merkle { root: new_root };
        }
        ctx.emit(ProtocolEvent::ProjectMerkleRootUpdated {
            project_registrar: *project_registrar,
            root: new_root,
        });
        Ok(())
    }

    // ── Chips ────────────────────────────────────────────────────────

    /// Enroll a chip attested by the calling project registrar.
    #[allow(clippy::too_many_arguments)]
    pub fn add_chip(
        &mut self,
        ctx: &mut CallContext<'_>,
        deps: &mut ChipDeps<'_>,
        chip: ChipId,
        owner: Address,
        token_uri: &str,
        validation: &ManufacturerValidation,
        custody: &CustodyProof,
    ) -> Result<Node, ErsError> {
        self.enroll_chip(
            ctx,
            deps,
            chip,
            owner,
            ProjectSide::Attested { token_uri },
            validation,
            custody,
        )
    }

    /// Enroll a chip through the calling project registrar's claim tree.
    #[allow(clippy::too_many_arguments)]
    pub fn claim_chip(
        &mut self,
        ctx: &mut CallContext<'_>,
        deps: &mut ChipDeps<'_>,
        chip: ChipId,
        owner: Address,
        claim: &ProjectClaim,
        validation: &ManufacturerValidation,
        custody: &CustodyProof,
    ) -> Result<Node, ErsError> {
        self.enroll_chip(
            ctx,
            deps,
            chip,
            owner,
            ProjectSide::Claim(claim),
            validation,
            custody,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn enroll_chip(
        &mut self,
        ctx: &mut CallContext<'_>,
        deps: &mut ChipDeps<'_>,
        chip: ChipId,
        owner: Address,
        side: ProjectSide<'_>,
        validation: &ManufacturerValidation,
        custody: &CustodyProof,
    ) -> Result<Node, ErsError> {
        // 1. shape
        ers_core::require_nonzero_address(&chip, "chip_id")?;
        ers_core::require_nonzero_address(&owner, "owner")?;

        // 2. single claim
        if self.chips.contains_key(&chip) {
            return Err(ErsError::ChipAlreadyEnrolled { chip });
        }

        // 3. calling project
        let registrar = ctx.caller;
        let project = self
            .projects
            .get(&registrar)
            .ok_or(ErsError::ProjectNotEnrolled { registrar })?;

        // 4. possession
        let custody_hash =
            to_signed_message_hash(&digest::chip_custody(ctx.chain.chain_id(), &owner));
        if !ctx
            .signatures
            .is_valid_signature_now(&chip, &custody_hash, &custody.0)
        {
            return Err(ErsError::invalid_proof(ProofKind::ChipCustody));
        }

        // 5. manufacturer provenance
        if !deps.manufacturers.is_enrolled_chip(
            ctx.signatures,
            &validation.enrollment_id,
            &chip,
            &validation.proof,
        ) {
            return Err(ErsError::invalid_proof(ProofKind::ManufacturerEnrollment));
        }

        // 6. project-side proof
        let (service_id, lockin_period, token_uri) = match (side, &project.claim) {
            (ProjectSide::Claim(claim), ClaimModel::Merkle { root }) => {
                let leaf = claim.leaf(&chip, &validation.enrollment_id);
                if !merkle::verify(&claim.proof, root, &leaf) {
                    return Err(ErsError::invalid_proof(ProofKind::ProjectInclusion));
                }
                (claim.service_id, claim.lockin_period, claim.token_uri.clone())
            }
            (ProjectSide::Attested { token_uri }, ClaimModel::Attested) => {
                (project.service_id, project.lockin_period, token_uri.to_string())
            }
            _ => return Err(ErsError::ClaimModelMismatch { registrar }),
        };

        // 7. lock-in ceiling
        let ceiling = project
            .creation_timestamp
            .saturating_add(ctx.params.max_lockin_period);
        let timelock = lockin_period.min(ceiling);
        let project_node = project.name_hash;

        // 8. namespace
        let services_address = deps.services.address();
        let node = deps.naming.create_chip_subnode_record(
            &mut ctx.as_caller(self.address),
            &project_node,
            &chip,
            owner,
            services_address,
        )?;

        // 9. persist and bind
        self.chips.insert(
            chip,
            ChipInfo {
                node,
                project_registrar: registrar,
                enrollment_id: validation.enrollment_id,
                token_uri,
                added: true,
            },
        );
        deps.services.set_initial_service(
            &mut ctx.as_caller(self.address),
            chip,
            service_id,
            timelock,
        )?;
        if let Some(project) = self.projects.get_mut(&registrar) {
            project.chips_added = true;
        }

        // 10. announce
        ctx.emit(ProtocolEvent::ChipAdded {
            chip,
            owner,
            service_id,
            node,
            enrollment: validation.enrollment_id,
            timelock,
        });
        Ok(node)
    }

    // ── Views ────────────────────────────────────────────────────────

    /// Project enrollment of `project_registrar`.
    pub fn project(&self, project_registrar: &Address) -> Option<&ProjectEnrollment> {
        self.projects.get(project_registrar)
    }

    /// Chip enrollment of `chip`.
    pub fn chip(&self, chip: &ChipId) -> Option<&ChipInfo> {
        self.chips.get(chip)
    }

    /// Whether `chip` has been added or claimed.
    pub fn is_enrolled(&self, chip: &ChipId) -> bool {
        self.chips.contains_key(chip)
    }

    /// Owner of `chip`, read through its namespace node.
    pub fn owner_of(&self, naming: &NamingRegistry, chip: &ChipId) -> Result<Address, ErsError> {
        let info = self
            .chips
            .get(chip)
            .ok_or(ErsError::ChipNotEnrolled { chip: *chip })?;
        Ok(naming.owner(&info.node))
    }

    fn project_of_caller(
        &self,
        ctx: &CallContext<'_>,
        project_registrar: &Address,
    ) -> Result<&ProjectEnrollment, ErsError> {
        let project = self
            .projects
            .get(project_registrar)
            .ok_or(ErsError::ProjectNotEnrolled {
                registrar: *project_registrar,
            })?;
        if project.developer_registrar != ctx.caller {
            return Err(ErsError::unauthorized(Role::DeveloperRegistrar, ctx.caller));
        }
        Ok(project)
    }
}

/// [`ChipOwnership`] view over the Chip Registry and the namespace.
pub struct ChipOwners<'a> {
    /// Chip records.
    pub chips: &'a ChipRegistry,
    /// Namespace owners.
    pub naming: &'a NamingRegistry,
}

impl ChipOwnership for ChipOwners<'_> {
    fn owner_of(&self, chip: &ChipId) -> Result<Address, ErsError> {
        self.chips.owner_of(self.naming, chip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_env::TestEnv;
    use crate::deploy::Deployer;
    use crate::manufacturer::{EnrollmentAuth, EnrollmentMetadata, ManufacturerProof, NewEnrollment};
    use crate::services::ServiceRecord;
    use ers_core::{ErrorKind, ManufacturerId, RecordType};
    use ers_crypto::KeyPair;

    const GOV: Address = Address::new([0x60; 20]);
    const DEVELOPERS: Address = Address::new([0xde; 20]);
    const NAMING: Address = Address::new([0xaa; 20]);
    const CHIPS: Address = Address::new([0xcc; 20]);
    const SERVICES: Address = Address::new([0x5e; 20]);
    const FACTORY: Address = Address::new([0xfa; 20]);
    const DEV: Address = Address::new([0x01; 20]);
    const MAKER: Address = Address::new([0x02; 20]);
    const PROJECT: Address = Address::new([0x70; 20]);
    const ALICE: Address = Address::new([0xa1; 20]);

    fn key(seed: u8) -> KeyPair {
        KeyPair::from_seed(&[seed; 32])
    }

    struct Fixture {
        env: TestEnv,
        chips: ChipRegistry,
        naming: NamingRegistry,
        developers: DeveloperRegistry,
        services: ServicesRegistry,
        manufacturers: ManufacturerRegistry,
        registrar: Address,
        enrollment: EnrollmentId,
        service: ServiceId,
        project_key: KeyPair,
        cert_signer: KeyPair,
    }

    impl Fixture {
        fn enroll_project(&mut self, claim: ClaimModel, lockin_period: u64) -> Result<(), ErsError> {
            let proof = self
                .project_key
                .sign_message(&digest::project_ownership(self.env.chain.chain_id(), &PROJECT))
                .to_bytes();
            let req = ProjectEnrollmentRequest {
                project_registrar: PROJECT,
                name_hash: ers_core::namehash("tap.acme.ers"),
                public_key: self.project_key.address(),
                service_id: self.service,
                lockin_period,
                claim,
                ownership_proof: proof,
            };
            let registrar = self.registrar;
            self.chips.add_project_enrollment(
                &mut self.env.ctx(registrar),
                &self.developers,
                &self.services,
                req,
            )
        }

        fn validation(&self, chip: &ChipId) -> ManufacturerValidation {
            ManufacturerValidation {
                enrollment_id: self.enrollment,
                proof: ManufacturerProof::Certificate {
                    signature: self
                        .cert_signer
                        .sign_message(&digest::chip_certificate(chip))
                        .to_bytes(),
                },
            }
        }

        fn custody(&self, chip: &KeyPair, owner: &Address) -> CustodyProof {
            CustodyProof(
                chip.sign_message(&digest::chip_custody(self.env.chain.chain_id(), owner))
                    .to_bytes(),
            )
        }

        fn add_chip(
            &mut self,
            caller: Address,
            chip: ChipId,
            owner: Address,
            validation: &ManufacturerValidation,
            custody: &CustodyProof,
        ) -> Result<Node, ErsError> {
            let mut deps = ChipDeps {
                naming: &mut self.naming,
                services: &mut self.services,
                manufacturers: &self.manufacturers,
            };
            self.chips.add_chip(
                &mut self.env.ctx(caller),
                &mut deps,
                chip,
                owner,
                "https://meta.test/1",
                validation,
                custody,
            )
        }
    }

    fn fixture() -> Fixture {
        let mut env = TestEnv::new(GOV);
        let mut naming = NamingRegistry::new(NAMING, CHIPS);
        let root = naming
            .create_root_node(&mut env.ctx(GOV), "ers", DEVELOPERS, DEVELOPERS)
            .unwrap();

        let mut developers = DeveloperRegistry::new(DEVELOPERS);
        developers.initialize(&env.ctx(GOV), root).unwrap();
        developers
            .add_registrar_factory(&mut env.ctx(GOV), FACTORY)
            .unwrap();
        developers
            .add_allowed_developer(&mut env.ctx(GOV), DEV, "acme")
            .unwrap();
        let registrar = developers
            .create_developer_registrar(
                &mut env.ctx(DEV),
                &FACTORY,
                &mut naming,
                &mut Deployer::new(FACTORY),
            )
            .unwrap()
            .address();

        let service = ServiceId::from_label("acme-nft");
        let mut services = ServicesRegistry::new(SERVICES, CHIPS);
        services
            .create_service(
                &mut env.ctx(MAKER),
                service,
                vec![ServiceRecord::text(
                    RecordType::from_label("tokenUri"),
                    "https://nft.test/",
                    true,
                )],
            )
            .unwrap();

        let cert_signer = key(0x65);
        let manufacturer = ManufacturerId::from_label("acme-silicon");
        let mut manufacturers = ManufacturerRegistry::new();
        manufacturers
            .register_manufacturer(&mut env.ctx(GOV), manufacturer, MAKER)
            .unwrap();
        let enrollment = manufacturers
            .add_enrollment(
                &mut env.ctx(MAKER),
                manufacturer,
                NewEnrollment {
                    auth: EnrollmentAuth::SignerVerified,
                    cert_signer: cert_signer.address(),
                    auth_model: Address::new([0xa0; 20]),
                    metadata: EnrollmentMetadata::default(),
                },
            )
            .unwrap();

        let mut chips = ChipRegistry::new(CHIPS);
        chips.initialize(&env.ctx(GOV)).unwrap();
        Fixture {
            env,
            chips,
            naming,
            developers,
            services,
            manufacturers,
            registrar,
            enrollment,
            service,
            project_key: key(0x71),
            cert_signer,
        }
    }

    #[test]
    fn test_initialize_is_governance_only_and_once() {
        let mut env = TestEnv::new(GOV);
        let mut chips = ChipRegistry::new(CHIPS);
        let err = chips.initialize(&env.ctx(DEV)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        chips.initialize(&env.ctx(GOV)).unwrap();
        assert!(chips.is_initialized());
        assert_eq!(
            chips.initialize(&env.ctx(GOV)).unwrap_err(),
            ErsError::AlreadyInitialized {
                component: "chip registry"
            }
        );
    }

    #[test]
    fn test_project_enrollment_checks() {
        let mut f = fixture();

        // Caller must be a registered developer registrar.
        let proof = f
            .project_key
            .sign_message(&digest::project_ownership(f.env.chain.chain_id(), &PROJECT))
            .to_bytes();
        let req = ProjectEnrollmentRequest {
            project_registrar: PROJECT,
            name_hash: Node::ZERO,
            public_key: f.project_key.address(),
            service_id: f.service,
            lockin_period: 1,
            claim: ClaimModel::Attested,
            ownership_proof: proof,
        };
        let err = f
            .chips
            .add_project_enrollment(&mut f.env.ctx(DEV), &f.developers, &f.services, req.clone())
            .unwrap_err();
        assert_eq!(err, ErsError::unauthorized(Role::DeveloperRegistrar, DEV));

        // Ownership proof by the wrong key.
        let forged = ProjectEnrollmentRequest {
            ownership_proof: key(0x7f)
                .sign_message(&digest::project_ownership(f.env.chain.chain_id(), &PROJECT))
                .to_bytes(),
            ..req
        };
        let registrar = f.registrar;
        let err = f
            .chips
            .add_project_enrollment(&mut f.env.ctx(registrar), &f.developers, &f.services, forged)
            .unwrap_err();
        assert_eq!(err, ErsError::invalid_proof(ProofKind::ProjectOwnership));

        let lockin = f.env.chain.timestamp() + 100;
        f.enroll_project(ClaimModel::Attested, lockin).unwrap();
        let project = f.chips.project(&PROJECT).unwrap();
        assert_eq!(project.developer_registrar, registrar);
        assert!(!project.chips_added);
        assert_eq!(
            f.enroll_project(ClaimModel::Attested, lockin).unwrap_err(),
            ErsError::ProjectAlreadyEnrolled { registrar: PROJECT }
        );
    }

    #[test]
    fn test_attested_chip_enrollment() {
        let mut f = fixture();
        let lockin = f.env.chain.timestamp() + 100;
        f.enroll_project(ClaimModel::Attested, lockin).unwrap();

        let chip = key(1);
        let id = chip.address();
        let validation = f.validation(&id);
        let custody = f.custody(&chip, &ALICE);
        let node = f.add_chip(PROJECT, id, ALICE, &validation, &custody).unwrap();

        assert!(f.chips.is_enrolled(&id));
        assert_eq!(f.chips.owner_of(&f.naming, &id).unwrap(), ALICE);
        assert_eq!(f.naming.resolver(&node), SERVICES);
        let info = f.chips.chip(&id).unwrap();
        assert_eq!(info.project_registrar, PROJECT);
        assert_eq!(info.enrollment_id, f.enrollment);
        assert!(f.chips.project(&PROJECT).unwrap().chips_added);

        let bound = f.services.chip_services(&id).unwrap();
        assert_eq!(bound.primary, f.service);
        assert_eq!(bound.timelock, lockin);

        // Single claim.
        let err = f.add_chip(PROJECT, id, ALICE, &validation, &custody).unwrap_err();
        assert_eq!(err, ErsError::ChipAlreadyEnrolled { chip: id });

        // A project with chips cannot be removed.
        let registrar = f.registrar;
        let err = f
            .chips
            .remove_project_enrollment(&mut f.env.ctx(registrar), &PROJECT)
            .unwrap_err();
        assert_eq!(err, ErsError::ChipsAlreadyAdded { registrar: PROJECT });
    }

    #[test]
    fn test_chip_checks_abort_in_order() {
        let mut f = fixture();
        f.enroll_project(ClaimModel::Attested, f.env.chain.timestamp() + 100)
            .unwrap();
        let chip = key(1);
        let id = chip.address();
        let validation = f.validation(&id);
        let custody = f.custody(&chip, &ALICE);

        let err = f
            .add_chip(PROJECT, id, Address::ZERO, &validation, &custody)
            .unwrap_err();
        assert_eq!(err, ErsError::ZeroAddress { field: "owner" });

        let stranger = Address::new([0x99; 20]);
        let err = f.add_chip(stranger, id, ALICE, &validation, &custody).unwrap_err();
        assert_eq!(err, ErsError::ProjectNotEnrolled { registrar: stranger });

        let for_bob = f.custody(&chip, &Address::new([0xb0; 20]));
        let err = f.add_chip(PROJECT, id, ALICE, &validation, &for_bob).unwrap_err();
        assert_eq!(err, ErsError::invalid_proof(ProofKind::ChipCustody));

        let other_chip = f.validation(&key(2).address());
        let err = f.add_chip(PROJECT, id, ALICE, &other_chip, &custody).unwrap_err();
        assert_eq!(err, ErsError::invalid_proof(ProofKind::ManufacturerEnrollment));

        assert!(!f.chips.is_enrolled(&id));
        assert!(!f.chips.project(&PROJECT).unwrap().chips_added);
    }

    #[test]
    fn test_lockin_capped_at_ceiling() {
        let mut f = fixture();
        let creation = f.env.chain.timestamp();
        let ceiling = creation + f.env.params.max_lockin_period;
        f.enroll_project(ClaimModel::Attested, ceiling + 10_000).unwrap();

        let chip = key(1);
        let id = chip.address();
        let validation = f.validation(&id);
        let custody = f.custody(&chip, &ALICE);
        f.add_chip(PROJECT, id, ALICE, &validation, &custody).unwrap();
        assert_eq!(f.services.chip_services(&id).unwrap().timelock, ceiling);
        assert!(matches!(
            f.env.events.last(),
            Some(ProtocolEvent::ChipAdded { timelock, .. }) if *timelock == ceiling
        ));
    }

    #[test]
    fn test_merkle_root_update_window() {
        let mut f = fixture();
        let root = Bytes32::new([1; 32]);
        f.enroll_project(ClaimModel::Merkle { root }, f.env.chain.timestamp() + 100)
            .unwrap();
        let registrar = f.registrar;
        let new_root = Bytes32::new([2; 32]);

        let err = f
            .chips
            .update_project_merkle_root(&mut f.env.ctx(DEV), &PROJECT, new_root)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        f.chips
            .update_project_merkle_root(&mut f.env.ctx(registrar), &PROJECT, new_root)
            .unwrap();
        assert_eq!(
            f.chips.project(&PROJECT).unwrap().claim,
            ClaimModel::Merkle { root: new_root }
        );

        let window = f.env.params.project_update_window;
        f.env.chain.advance(1, window + 1);
        let err = f
            .chips
            .update_project_merkle_root(&mut f.env.ctx(registrar), &PROJECT, root)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Temporal);
    }
}
