//! # Developer and Project Registrars
//!
//! A [`DeveloperRegistrar`] owns a developer's namespace node and lists the
//! developer's projects. A [`ProjectRegistrar`] is the address the Chip
//! Registry knows a project by; chips enter the registry through it.
//!
//! ## Project Kinds
//!
//! - [`ProjectKind::Attested`]: the registrar owner submits chips in
//!   batches and the call itself is the project-side proof.
//! - [`ProjectKind::MerkleClaim`]: anyone holding a chip submits its claim
//!   with an inclusion proof against the project's claim root.
//!
//! ## Project List
//!
//! The developer registrar keeps its projects in an [`IndexedSet`], so
//! enumeration is ordered and removal is O(1) swap-and-pop.

use std::collections::BTreeMap;

use ers_core::{label_hash, Address, Bytes32, ChipId, ErsError, Node, Role, ServiceId};
use serde::{Deserialize, Serialize};

use crate::chip::{ChipDeps, ChipRegistry, ClaimModel, CustodyProof, ProjectClaim, ProjectEnrollmentRequest};
use crate::context::CallContext;
use crate::deploy::{Deployer, ProjectRegistrarInit};
use crate::developer::DeveloperRegistry;
use crate::event::ProtocolEvent;
use crate::indexed::IndexedSet;
use crate::manufacturer::ManufacturerValidation;
use crate::naming::NamingRegistry;
use crate::services::ServicesRegistry;

/// Claim flavour of a project registrar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectKind {
    /// Owner-submitted chip batches.
    Attested,
    /// Holder-submitted claims against a claim tree.
    MerkleClaim,
}

/// Arguments of `addProject`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddProject {
    /// Label of the project node under the developer node.
    pub label: String,
    /// Project public key (signer address).
    pub public_key: Address,
    /// Default primary service.
    pub service_id: ServiceId,
    /// Default lock-in timestamp.
    pub lockin_period: u64,
    /// Claim root; ignored for attested projects.
    #[serde(default)]
    pub merkle_root: Bytes32,
    /// Signature by `public_key` over `hash(chainId, projectRegistrar)`.
    #[serde(with = "ers_core::hex::serde_bytes")]
    pub ownership_proof: Vec<u8>,
}

/// One chip of an attested batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestedChip {
    /// Chip id.
    pub chip: ChipId,
    /// Initial owner.
    pub owner: Address,
    /// Token metadata URI.
    pub token_uri: String,
    /// Manufacturer provenance.
    pub validation: ManufacturerValidation,
    /// Chip signature over `hash(chainId, owner)`.
    pub custody: CustodyProof,
}

/// A holder's claim on a merkle project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleChipClaim {
    /// Chip id.
    pub chip: ChipId,
    /// Claimed owner.
    pub owner: Address,
    /// Claim-tree leaf and proof.
    pub claim: ProjectClaim,
    /// Manufacturer provenance.
    pub validation: ManufacturerValidation,
    /// Chip signature over `hash(chainId, owner)`.
    pub custody: CustodyProof,
}

// ── Developer registrar ──────────────────────────────────────────────

/// A developer's registrar.
#[derive(Debug, Clone)]
pub struct DeveloperRegistrar {
    address: Address,
    owner: Address,
    node: Node,
    projects: IndexedSet<Address>,
    labels: BTreeMap<Address, Bytes32>,
}

impl DeveloperRegistrar {
    /// A freshly deployed registrar owning `node`.
    pub fn new(address: Address, owner: Address, node: Node) -> Self {
        Self {
            address,
            owner,
            node,
            projects: IndexedSet::new(),
            labels: BTreeMap::new(),
        }
    }

    /// Deployed address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current owner.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// The developer's namespace node.
    pub fn node(&self) -> Node {
        self.node
    }

    /// Listed project registrars in list order.
    pub fn projects(&self) -> &[Address] {
        self.projects.as_slice()
    }

    /// Whether `project_registrar` is listed.
    pub fn has_project(&self, project_registrar: &Address) -> bool {
        self.projects.contains(project_registrar)
    }

    /// Create the project's node and enroll it with the Chip Registry.
    /// Owner only.
    #[allow(clippy::too_many_arguments)]
    pub fn add_project(
        &mut self,
        ctx: &mut CallContext<'_>,
        project: &ProjectRegistrar,
        req: AddProject,
        naming: &mut NamingRegistry,
        chips: &mut ChipRegistry,
        developers: &DeveloperRegistry,
        services: &ServicesRegistry,
    ) -> Result<Node, ErsError> {
        self.require_owner(ctx)?;
        let project_registrar = project.address();
        if self.projects.contains(&project_registrar) {
            return Err(ErsError::ProjectAlreadyListed {
                registrar: project_registrar,
            });
        }
        if project.developer_registrar() != self.address {
            return Err(ErsError::unauthorized(Role::DeveloperRegistrar, self.address));
        }
        let claim = match project.kind() {
            ProjectKind::Attested => ClaimModel::Attested,
            ProjectKind::MerkleClaim => ClaimModel::Merkle {
                root: req.merkle_root,
            },
        };

        let mut inner = ctx.as_caller(self.address);
        let node = naming.create_subnode_record(
            &mut inner,
            &self.node,
            req.label.as_bytes(),
            project_registrar,
            self.address,
        )?;
        chips.add_project_enrollment(
            &mut inner,
            developers,
            services,
            ProjectEnrollmentRequest {
                project_registrar,
                name_hash: node,
                public_key: req.public_key,
                service_id: req.service_id,
                lockin_period: req.lockin_period,
                claim,
                ownership_proof: req.ownership_proof,
            },
        )?;

        self.projects.insert(project_registrar);
        self.labels
            .insert(project_registrar, label_hash(req.label.as_bytes()));
        ctx.emit(ProtocolEvent::ProjectAdded {
            developer_registrar: self.address,
            project_registrar,
            node,
        });
        Ok(node)
    }

    /// Unlist a project that never received chips, dropping its enrollment
    /// and node. Owner only.
    pub fn remove_project(
        &mut self,
        ctx: &mut CallContext<'_>,
        project_registrar: &Address,
        naming: &mut NamingRegistry,
        chips: &mut ChipRegistry,
    ) -> Result<(), ErsError> {
        self.require_owner(ctx)?;
        let label = self
            .labels
            .get(project_registrar)
            .copied()
            .ok_or(ErsError::ProjectNotListed {
                registrar: *project_registrar,
            })?;

        let mut inner = ctx.as_caller(self.address);
        chips.remove_project_enrollment(&mut inner, project_registrar)?;
        naming.delete_subnode_record(&mut inner, &self.node, &label)?;

        self.projects.remove(project_registrar);
        self.labels.remove(project_registrar);
        ctx.emit(ProtocolEvent::ProjectRemoved {
            developer_registrar: self.address,
            project_registrar: *project_registrar,
        });
        Ok(())
    }

    /// Replace a listed merkle project's claim root. Owner only.
    pub fn update_project_merkle_root(
        &self,
        ctx: &mut CallContext<'_>,
        project_registrar: &Address,
        root: Bytes32,
        chips: &mut ChipRegistry,
    ) -> Result<(), ErsError> {
        self.require_owner(ctx)?;
        if !self.projects.contains(project_registrar) {
            return Err(ErsError::ProjectNotListed {
                registrar: *project_registrar,
            });
        }
        chips.update_project_merkle_root(&mut ctx.as_caller(self.address), project_registrar, root)
    }

    /// Hand the registrar to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        ctx: &mut CallContext<'_>,
        new_owner: Address,
    ) -> Result<(), ErsError> {
        self.require_owner(ctx)?;
        ers_core::require_nonzero_address(&new_owner, "owner")?;
        self.owner = new_owner;
        ctx.emit(ProtocolEvent::RegistrarOwnershipTransferred {
            registrar: self.address,
            owner: new_owner,
        });
        Ok(())
    }

    fn require_owner(&self, ctx: &CallContext<'_>) -> Result<(), ErsError> {
        if ctx.caller != self.owner {
            return Err(ErsError::unauthorized(Role::RegistrarOwner, ctx.caller));
        }
        Ok(())
    }
}

// ── Project registrar ────────────────────────────────────────────────

/// A project's registrar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRegistrar {
    address: Address,
    owner: Address,
    developer_registrar: Address,
    kind: ProjectKind,
}

impl ProjectRegistrar {
    /// Deploy a registrar at its deterministic address. The caller becomes
    /// the owner.
    pub fn deploy(
        ctx: &mut CallContext<'_>,
        deployer: &mut Deployer,
        developer_registrar: Address,
        kind: ProjectKind,
        salt: &Bytes32,
    ) -> Result<Self, ErsError> {
        ers_core::require_nonzero_address(&developer_registrar, "developer_registrar")?;
        let init = ProjectRegistrarInit {
            owner: ctx.caller,
            developer_registrar,
            kind,
        };
        let deployer_address = deployer.address();
        let address = deployer.deploy(&deployer_address, salt, &init.init_code_hash())?;
        ctx.emit(ProtocolEvent::ProjectRegistrarDeployed {
            registrar: address,
            owner: ctx.caller,
            merkle_claim: kind == ProjectKind::MerkleClaim,
        });
        Ok(Self {
            address,
            owner: ctx.caller,
            developer_registrar,
            kind,
        })
    }

    /// Deployed address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current owner.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Developer registrar this project is meant for.
    pub fn developer_registrar(&self) -> Address {
        self.developer_registrar
    }

    /// Claim flavour.
    pub fn kind(&self) -> ProjectKind {
        self.kind
    }

    /// Enroll a batch of chips. Owner of an attested project only; the
    /// batch is all-or-nothing.
    pub fn add_chips(
        &self,
        ctx: &mut CallContext<'_>,
        chips: &mut ChipRegistry,
        deps: &mut ChipDeps<'_>,
        batch: &[AttestedChip],
    ) -> Result<Vec<Node>, ErsError> {
        if ctx.caller != self.owner {
            return Err(ErsError::unauthorized(Role::ProjectRegistrarOwner, ctx.caller));
        }
        self.require_kind(ProjectKind::Attested)?;
        let mut inner = ctx.as_caller(self.address);
        batch
            .iter()
            .map(|item| {
                chips.add_chip(
                    &mut inner,
                    deps,
                    item.chip,
                    item.owner,
                    &item.token_uri,
                    &item.validation,
                    &item.custody,
                )
            })
            .collect()
    }

    /// Claim one chip of a merkle project. Open to any caller; the proofs
    /// carry the authorization.
    pub fn claim_chip(
        &self,
        ctx: &mut CallContext<'_>,
        chips: &mut ChipRegistry,
        deps: &mut ChipDeps<'_>,
        claim: &MerkleChipClaim,
    ) -> Result<Node, ErsError> {
        self.require_kind(ProjectKind::MerkleClaim)?;
        chips.claim_chip(
            &mut ctx.as_caller(self.address),
            deps,
            claim.chip,
            claim.owner,
            &claim.claim,
            &claim.validation,
            &claim.custody,
        )
    }

    /// Hand the registrar to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        ctx: &mut CallContext<'_>,
        new_owner: Address,
    ) -> Result<(), ErsError> {
        if ctx.caller != self.owner {
            return Err(ErsError::unauthorized(Role::ProjectRegistrarOwner, ctx.caller));
        }
        ers_core::require_nonzero_address(&new_owner, "owner")?;
        self.owner = new_owner;
        ctx.emit(ProtocolEvent::RegistrarOwnershipTransferred {
            registrar: self.address,
            owner: new_owner,
        });
        Ok(())
    }

    fn require_kind(&self, kind: ProjectKind) -> Result<(), ErsError> {
        if self.kind != kind {
            return Err(ErsError::ClaimModelMismatch {
                registrar: self.address,
            });
        }
        Ok(())
    }
}
