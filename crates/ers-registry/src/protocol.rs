//! # Protocol Facade
//!
//! [`Ers`] owns one deployment: the ledger clock, governance parameters,
//! the signature checker, the event log and every registry. Each public
//! mutating method is one transaction.
//!
//! ## Security Invariant
//!
//! A transaction either commits all of its state changes and events or
//! none of them. [`Ers::transact`] snapshots the registries and the event
//! log length before running, and restores both when the operation returns
//! an error, so a claim that fails at step 9 leaves no chip node behind
//! from step 8.
//!
//! ## Addresses
//!
//! System registries live at fixed addresses derived from their names
//! (`last20(sha256("ers.<name>"))`), so proofs that name a registry can be
//! produced before the deployment exists.

use std::collections::BTreeMap;

use ers_core::{
    sha256, Address, Bytes32, Chain, ChipId, EnrollmentId, ErsError, ManufacturerId, Node,
    RecordType, ServiceId,
};
use ers_crypto::SignatureChecker;

use crate::chip::{ChipDeps, ChipOwners, ChipRegistry};
use crate::config::ProtocolConfig;
use crate::context::CallContext;
use crate::deploy::{Deployer, ProjectRegistrarInit};
use crate::developer::DeveloperRegistry;
use crate::event::{EventLog, ProtocolEvent};
use crate::governance::ProtocolParams;
use crate::manufacturer::{ManufacturerProof, ManufacturerRegistry, NewEnrollment};
use crate::naming::NamingRegistry;
use crate::registrar::{
    AddProject, AttestedChip, DeveloperRegistrar, MerkleChipClaim, ProjectKind, ProjectRegistrar,
};
use crate::resolve;
use crate::services::{ChipAuthorization, RecordContent, ServiceRecord, ServicesRegistry};

/// Fixed addresses of the system registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemAddresses {
    /// Naming Registry.
    pub naming: Address,
    /// Manufacturer Registry.
    pub manufacturers: Address,
    /// Developer Registry.
    pub developers: Address,
    /// Chip Registry.
    pub chips: Address,
    /// Services Registry.
    pub services: Address,
    /// Shared project registrar deployer.
    pub deployer: Address,
}

impl SystemAddresses {
    /// Derive every system address from its registry name.
    pub fn derive() -> Self {
        let at = |name: &str| Address::from_word(&sha256(format!("ers.{name}").as_bytes()));
        Self {
            naming: at("naming"),
            manufacturers: at("manufacturers"),
            developers: at("developers"),
            chips: at("chips"),
            services: at("services"),
            deployer: at("deployer"),
        }
    }
}

/// All registry state, cloned as a unit for rollback.
#[derive(Debug, Clone)]
pub struct Registries {
    /// Namespace.
    pub naming: NamingRegistry,
    /// Manufacturer enrollments.
    pub manufacturers: ManufacturerRegistry,
    /// Developer allow-lists and registrar registrations.
    pub developers: DeveloperRegistry,
    /// Deployed developer registrars by address.
    pub developer_registrars: BTreeMap<Address, DeveloperRegistrar>,
    /// Deployed project registrars by address.
    pub project_registrars: BTreeMap<Address, ProjectRegistrar>,
    /// Project and chip enrollments.
    pub chips: ChipRegistry,
    /// Services and chip bindings.
    pub services: ServicesRegistry,
    /// Occupied deterministic addresses.
    pub deployer: Deployer,
}

impl Registries {
    fn new(addresses: &SystemAddresses) -> Self {
        Self {
            naming: NamingRegistry::new(addresses.naming, addresses.chips),
            manufacturers: ManufacturerRegistry::new(),
            developers: DeveloperRegistry::new(addresses.developers),
            developer_registrars: BTreeMap::new(),
            project_registrars: BTreeMap::new(),
            chips: ChipRegistry::new(addresses.chips),
            services: ServicesRegistry::new(addresses.services, addresses.chips),
            deployer: Deployer::new(addresses.deployer),
        }
    }

    fn developer_registrar_mut(
        &mut self,
        registrar: &Address,
    ) -> Result<&mut DeveloperRegistrar, ErsError> {
        self.developer_registrars
            .get_mut(registrar)
            .ok_or(ErsError::DeveloperRegistrarNotFound {
                registrar: *registrar,
            })
    }

    fn project_registrar(&self, registrar: &Address) -> Result<&ProjectRegistrar, ErsError> {
        self.project_registrars
            .get(registrar)
            .ok_or(ErsError::ProjectRegistrarNotFound {
                registrar: *registrar,
            })
    }
}

/// One ERS deployment.
#[derive(Debug)]
pub struct Ers {
    config: ProtocolConfig,
    addresses: SystemAddresses,
    chain: Chain,
    params: ProtocolParams,
    signatures: SignatureChecker,
    events: EventLog,
    state: Registries,
    root_node: Option<Node>,
}

impl Ers {
    /// An uninitialised deployment administered by `governance`.
    pub fn new(config: ProtocolConfig, governance: Address) -> Self {
        let addresses = SystemAddresses::derive();
        Self {
            chain: Chain::new(config.chain_id, config.genesis_timestamp),
            params: ProtocolParams::from_config(&config, governance),
            signatures: SignatureChecker::new(),
            events: EventLog::new(),
            state: Registries::new(&addresses),
            root_node: None,
            addresses,
            config,
        }
    }

    /// A deployment with the root node created and every registry wired.
    pub fn bootstrap(config: ProtocolConfig, governance: Address) -> Result<Self, ErsError> {
        let mut ers = Self::new(config, governance);
        ers.initialize(governance)?;
        Ok(ers)
    }

    /// Create the root namespace node, owned by the Developer Registry, and
    /// run the one-time wiring of the Chip and Developer registries.
    /// Governance only.
    pub fn initialize(&mut self, caller: Address) -> Result<Node, ErsError> {
        let label = self.config.root_label.clone();
        let developers = self.addresses.developers;
        let root = self.transact(caller, "initialize", |s, ctx| {
            let root = s
                .naming
                .create_root_node(ctx, &label, developers, developers)?;
            s.chips.initialize(ctx)?;
            s.developers.initialize(ctx, root)?;
            Ok(root)
        })?;
        self.root_node = Some(root);
        tracing::info!(root = %root, label = %label, chain_id = self.chain.chain_id(), "protocol initialized");
        Ok(root)
    }

    /// Run `op` as one atomic transaction sent by `caller`.
    pub fn transact<T>(
        &mut self,
        caller: Address,
        op: &'static str,
        f: impl FnOnce(&mut Registries, &mut CallContext<'_>) -> Result<T, ErsError>,
    ) -> Result<T, ErsError> {
        let snapshot = self.state.clone();
        let mark = self.events.len();
        let result = {
            let mut ctx = CallContext::new(
                caller,
                &self.chain,
                &self.params,
                &self.signatures,
                &mut self.events,
            );
            f(&mut self.state, &mut ctx)
        };
        match &result {
            Ok(_) => self.events.log_committed(mark),
            Err(e) => {
                self.state = snapshot;
                self.events.truncate(mark);
                tracing::debug!(op, caller = %caller, kind = %e.kind(), error = %e, "transaction rejected");
            }
        }
        result
    }

    // ── Environment ──────────────────────────────────────────────────

    /// Deployment configuration.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// System registry addresses.
    pub fn addresses(&self) -> &SystemAddresses {
        &self.addresses
    }

    /// Ledger clock.
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Mine `blocks` blocks spanning `seconds`.
    pub fn advance(&mut self, blocks: u64, seconds: u64) {
        self.chain.advance(blocks, seconds);
    }

    /// Current governance parameters.
    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    /// Signature checker, for registering contract signers.
    pub fn signatures_mut(&mut self) -> &mut SignatureChecker {
        &mut self.signatures
    }

    /// Committed events.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Registry state.
    pub fn registries(&self) -> &Registries {
        &self.state
    }

    /// The root namespace node, once initialised.
    pub fn root_node(&self) -> Option<Node> {
        self.root_node
    }

    // ── Governance ───────────────────────────────────────────────────

    /// Change the lock-in ceiling.
    pub fn set_max_lockin_period(&mut self, caller: Address, value: u64) -> Result<(), ErsError> {
        let result = self.params.set_max_lockin_period(&caller, value);
        self.settle_parameter(caller, "max_lockin_period", value.to_string(), result)
    }

    /// Change the service-change signature window.
    pub fn set_max_block_window(&mut self, caller: Address, value: u64) -> Result<(), ErsError> {
        let result = self.params.set_max_block_window(&caller, value);
        self.settle_parameter(caller, "max_block_window", value.to_string(), result)
    }

    /// Change the claim-root update window.
    pub fn set_project_update_window(
        &mut self,
        caller: Address,
        value: u64,
    ) -> Result<(), ErsError> {
        let result = self.params.set_project_update_window(&caller, value);
        self.settle_parameter(caller, "project_update_window", value.to_string(), result)
    }

    /// Replace the gateway URLs.
    pub fn set_gateway_urls(&mut self, caller: Address, urls: Vec<String>) -> Result<(), ErsError> {
        let value = urls.join(",");
        let result = self.params.set_gateway_urls(&caller, urls);
        self.settle_parameter(caller, "gateway_urls", value, result)
    }

    /// Hand governance to `new`.
    pub fn transfer_governance(&mut self, caller: Address, new: Address) -> Result<(), ErsError> {
        if let Err(e) = self.params.transfer_governance(&caller, new) {
            tracing::debug!(caller = %caller, kind = %e.kind(), error = %e, "governance transfer rejected");
            return Err(e);
        }
        self.record(ProtocolEvent::GovernanceTransferred { governance: new });
        Ok(())
    }

    fn settle_parameter(
        &mut self,
        caller: Address,
        parameter: &str,
        value: String,
        result: Result<(), ErsError>,
    ) -> Result<(), ErsError> {
        if let Err(e) = result {
            tracing::debug!(caller = %caller, parameter, kind = %e.kind(), error = %e, "parameter update rejected");
            return Err(e);
        }
        self.record(ProtocolEvent::ParameterUpdated {
            parameter: parameter.to_string(),
            value,
        });
        Ok(())
    }

    fn record(&mut self, event: ProtocolEvent) {
        let mark = self.events.len();
        self.events
            .push(self.chain.block_number(), self.chain.timestamp(), event);
        self.events.log_committed(mark);
    }

    // ── Naming ───────────────────────────────────────────────────────

    /// Replace the owner of `node`. Resolver only.
    pub fn set_node_owner(
        &mut self,
        caller: Address,
        node: Node,
        new_owner: Address,
    ) -> Result<(), ErsError> {
        self.transact(caller, "set_node_owner", |s, ctx| {
            s.naming.set_node_owner(ctx, &node, new_owner)
        })
    }

    // ── Manufacturers ────────────────────────────────────────────────

    /// Register a manufacturer. Governance only.
    pub fn register_manufacturer(
        &mut self,
        caller: Address,
        id: ManufacturerId,
        owner: Address,
    ) -> Result<(), ErsError> {
        self.transact(caller, "register_manufacturer", |s, ctx| {
            s.manufacturers.register_manufacturer(ctx, id, owner)
        })
    }

    /// Revoke a manufacturer. Governance only.
    pub fn revoke_manufacturer(&mut self, caller: Address, id: ManufacturerId) -> Result<(), ErsError> {
        self.transact(caller, "revoke_manufacturer", |s, ctx| {
            s.manufacturers.revoke_manufacturer(ctx, id)
        })
    }

    /// Hand a manufacturer to a new owner. Current owner only.
    pub fn transfer_manufacturer_owner(
        &mut self,
        caller: Address,
        id: ManufacturerId,
        new_owner: Address,
    ) -> Result<(), ErsError> {
        self.transact(caller, "transfer_manufacturer_owner", |s, ctx| {
            s.manufacturers.transfer_manufacturer_owner(ctx, id, new_owner)
        })
    }

    /// Add an enrollment. Manufacturer owner only.
    pub fn add_enrollment(
        &mut self,
        caller: Address,
        id: ManufacturerId,
        enrollment: NewEnrollment,
    ) -> Result<EnrollmentId, ErsError> {
        self.transact(caller, "add_enrollment", |s, ctx| {
            s.manufacturers.add_enrollment(ctx, id, enrollment)
        })
    }

    /// Activate or deactivate an enrollment. Manufacturer owner only.
    pub fn update_enrollment_status(
        &mut self,
        caller: Address,
        enrollment: EnrollmentId,
        active: bool,
    ) -> Result<(), ErsError> {
        self.transact(caller, "update_enrollment_status", |s, ctx| {
            s.manufacturers.update_enrollment_status(ctx, enrollment, active)
        })
    }

    /// Whether `proof` places `chip` in `enrollment`.
    pub fn is_enrolled_chip(
        &self,
        enrollment: &EnrollmentId,
        chip: &ChipId,
        proof: &ManufacturerProof,
    ) -> bool {
        self.state
            .manufacturers
            .is_enrolled_chip(&self.signatures, enrollment, chip, proof)
    }

    // ── Developers ───────────────────────────────────────────────────

    /// Allow-list a developer under `label`. Governance only.
    pub fn add_allowed_developer(
        &mut self,
        caller: Address,
        developer: Address,
        label: &str,
    ) -> Result<(), ErsError> {
        self.transact(caller, "add_allowed_developer", |s, ctx| {
            s.developers.add_allowed_developer(ctx, developer, label)
        })
    }

    /// Withdraw a developer's allow-list entry. Governance only.
    pub fn remove_allowed_developer(
        &mut self,
        caller: Address,
        developer: Address,
    ) -> Result<(), ErsError> {
        self.transact(caller, "remove_allowed_developer", |s, ctx| {
            s.developers.remove_allowed_developer(ctx, &developer)
        })
    }

    /// Allow a registrar factory. Governance only.
    pub fn add_registrar_factory(&mut self, caller: Address, factory: Address) -> Result<(), ErsError> {
        self.transact(caller, "add_registrar_factory", |s, ctx| {
            s.developers.add_registrar_factory(ctx, factory)
        })
    }

    /// Remove a registrar factory. Governance only.
    pub fn remove_registrar_factory(
        &mut self,
        caller: Address,
        factory: Address,
    ) -> Result<(), ErsError> {
        self.transact(caller, "remove_registrar_factory", |s, ctx| {
            s.developers.remove_registrar_factory(ctx, &factory)
        })
    }

    /// Create the calling developer's registrar through `factory`.
    pub fn create_developer_registrar(
        &mut self,
        caller: Address,
        factory: Address,
    ) -> Result<Address, ErsError> {
        self.transact(caller, "create_developer_registrar", |s, ctx| {
            let registrar = s.developers.create_developer_registrar(
                ctx,
                &factory,
                &mut s.naming,
                &mut s.deployer,
            )?;
            let address = registrar.address();
            s.developer_registrars.insert(address, registrar);
            Ok(address)
        })
    }

    /// Revoke a developer registrar. Governance only.
    pub fn revoke_developer_registrar(
        &mut self,
        caller: Address,
        registrar: Address,
    ) -> Result<(), ErsError> {
        self.transact(caller, "revoke_developer_registrar", |s, ctx| {
            s.developers
                .revoke_developer_registrar(ctx, &registrar, &mut s.naming)?;
            s.developer_registrars.remove(&registrar);
            Ok(())
        })
    }

    /// Where `factory` would deploy `developer`'s registrar under `label`.
    pub fn predict_developer_registrar(
        &self,
        factory: &Address,
        developer: &Address,
        label: &str,
    ) -> Address {
        self.state
            .developers
            .predict_developer_registrar(factory, developer, label)
    }

    // ── Registrars ───────────────────────────────────────────────────

    /// Deploy a project registrar owned by the caller.
    pub fn deploy_project_registrar(
        &mut self,
        caller: Address,
        developer_registrar: Address,
        kind: ProjectKind,
        salt: Bytes32,
    ) -> Result<Address, ErsError> {
        self.transact(caller, "deploy_project_registrar", |s, ctx| {
            let project =
                ProjectRegistrar::deploy(ctx, &mut s.deployer, developer_registrar, kind, &salt)?;
            let address = project.address();
            s.project_registrars.insert(address, project);
            Ok(address)
        })
    }

    /// Where a project registrar with these arguments would be deployed.
    pub fn predict_project_registrar(
        &self,
        owner: Address,
        developer_registrar: Address,
        kind: ProjectKind,
        salt: &Bytes32,
    ) -> Address {
        self.state.deployer.predict_project_registrar(
            &ProjectRegistrarInit {
                owner,
                developer_registrar,
                kind,
            },
            salt,
        )
    }

    /// Add a project to a developer registrar. Registrar owner only.
    pub fn add_project(
        &mut self,
        caller: Address,
        developer_registrar: Address,
        project_registrar: Address,
        req: AddProject,
    ) -> Result<Node, ErsError> {
        self.transact(caller, "add_project", |s, ctx| {
            let project = s.project_registrar(&project_registrar)?.clone();
            let registrar = s
                .developer_registrars
                .get_mut(&developer_registrar)
                .ok_or(ErsError::DeveloperRegistrarNotFound {
                    registrar: developer_registrar,
                })?;
            registrar.add_project(
                ctx,
                &project,
                req,
                &mut s.naming,
                &mut s.chips,
                &s.developers,
                &s.services,
            )
        })
    }

    /// Remove a chipless project. Registrar owner only.
    pub fn remove_project(
        &mut self,
        caller: Address,
        developer_registrar: Address,
        project_registrar: Address,
    ) -> Result<(), ErsError> {
        self.transact(caller, "remove_project", |s, ctx| {
            let registrar = s
                .developer_registrars
                .get_mut(&developer_registrar)
                .ok_or(ErsError::DeveloperRegistrarNotFound {
                    registrar: developer_registrar,
                })?;
            registrar.remove_project(ctx, &project_registrar, &mut s.naming, &mut s.chips)
        })
    }

    /// Replace a merkle project's claim root. Registrar owner only.
    pub fn update_project_merkle_root(
        &mut self,
        caller: Address,
        developer_registrar: Address,
        project_registrar: Address,
        root: Bytes32,
    ) -> Result<(), ErsError> {
        self.transact(caller, "update_project_merkle_root", |s, ctx| {
            let registrar = s
                .developer_registrars
                .get(&developer_registrar)
                .ok_or(ErsError::DeveloperRegistrarNotFound {
                    registrar: developer_registrar,
                })?;
            registrar.update_project_merkle_root(ctx, &project_registrar, root, &mut s.chips)
        })
    }

    /// Hand a developer registrar to `new_owner`. Owner only.
    pub fn transfer_developer_registrar(
        &mut self,
        caller: Address,
        registrar: Address,
        new_owner: Address,
    ) -> Result<(), ErsError> {
        self.transact(caller, "transfer_developer_registrar", |s, ctx| {
            s.developer_registrar_mut(&registrar)?
                .transfer_ownership(ctx, new_owner)
        })
    }

    /// Hand a project registrar to `new_owner`. Owner only.
    pub fn transfer_project_registrar(
        &mut self,
        caller: Address,
        registrar: Address,
        new_owner: Address,
    ) -> Result<(), ErsError> {
        self.transact(caller, "transfer_project_registrar", |s, ctx| {
            s.project_registrars
                .get_mut(&registrar)
                .ok_or(ErsError::ProjectRegistrarNotFound { registrar })?
                .transfer_ownership(ctx, new_owner)
        })
    }

    /// Developer registrar at `address`.
    pub fn developer_registrar(&self, address: &Address) -> Option<&DeveloperRegistrar> {
        self.state.developer_registrars.get(address)
    }

    /// Project registrar at `address`.
    pub fn project_registrar(&self, address: &Address) -> Option<&ProjectRegistrar> {
        self.state.project_registrars.get(address)
    }

    // ── Chips ────────────────────────────────────────────────────────

    /// Enroll an attested batch through `project_registrar`. Registrar
    /// owner only; all-or-nothing.
    pub fn add_chips(
        &mut self,
        caller: Address,
        project_registrar: Address,
        batch: &[AttestedChip],
    ) -> Result<Vec<Node>, ErsError> {
        self.transact(caller, "add_chips", |s, ctx| {
            let project = s
                .project_registrars
                .get(&project_registrar)
                .ok_or(ErsError::ProjectRegistrarNotFound {
                    registrar: project_registrar,
                })?;
            let mut deps = ChipDeps {
                naming: &mut s.naming,
                services: &mut s.services,
                manufacturers: &s.manufacturers,
            };
            project.add_chips(ctx, &mut s.chips, &mut deps, batch)
        })
    }

    /// Claim a chip of a merkle project.
    pub fn claim_chip(
        &mut self,
        caller: Address,
        project_registrar: Address,
        claim: &MerkleChipClaim,
    ) -> Result<Node, ErsError> {
        self.transact(caller, "claim_chip", |s, ctx| {
            let project = s
                .project_registrars
                .get(&project_registrar)
                .ok_or(ErsError::ProjectRegistrarNotFound {
                    registrar: project_registrar,
                })?;
            let mut deps = ChipDeps {
                naming: &mut s.naming,
                services: &mut s.services,
                manufacturers: &s.manufacturers,
            };
            project.claim_chip(ctx, &mut s.chips, &mut deps, claim)
        })
    }

    /// Owner of `chip`.
    pub fn owner_of(&self, chip: &ChipId) -> Result<Address, ErsError> {
        self.state.chips.owner_of(&self.state.naming, chip)
    }

    /// Resolve `chip` to its primary service records. Unclaimed chips raise
    /// [`ErsError::OffchainLookup`].
    pub fn resolve_chip_id(&self, chip: &ChipId) -> Result<Vec<RecordContent>, ErsError> {
        resolve::resolve_chip_id(&self.state.chips, &self.state.services, &self.params, chip)
    }

    /// Verify a gateway response for an unclaimed chip.
    pub fn resolve_unclaimed_chip(
        &self,
        response: &[u8],
        extra_data: &[u8],
    ) -> Result<Vec<RecordContent>, ErsError> {
        resolve::resolve_unclaimed_chip(
            &self.state.chips,
            &self.state.services,
            &self.state.manufacturers,
            &self.signatures,
            response,
            extra_data,
        )
    }

    // ── Services ─────────────────────────────────────────────────────

    /// Create a service owned by the caller.
    pub fn create_service(
        &mut self,
        caller: Address,
        service_id: ServiceId,
        records: Vec<ServiceRecord>,
    ) -> Result<(), ErsError> {
        self.transact(caller, "create_service", |s, ctx| {
            s.services.create_service(ctx, service_id, records)
        })
    }

    /// Add records to a service. Service owner only.
    pub fn add_service_records(
        &mut self,
        caller: Address,
        service_id: ServiceId,
        records: Vec<ServiceRecord>,
    ) -> Result<(), ErsError> {
        self.transact(caller, "add_service_records", |s, ctx| {
            s.services.add_service_records(ctx, service_id, records)
        })
    }

    /// Replace existing records of a service. Service owner only.
    pub fn edit_service_records(
        &mut self,
        caller: Address,
        service_id: ServiceId,
        records: Vec<ServiceRecord>,
    ) -> Result<(), ErsError> {
        self.transact(caller, "edit_service_records", |s, ctx| {
            s.services.edit_service_records(ctx, service_id, records)
        })
    }

    /// Remove records from a service. Service owner only.
    pub fn remove_service_records(
        &mut self,
        caller: Address,
        service_id: ServiceId,
        record_types: Vec<RecordType>,
    ) -> Result<(), ErsError> {
        self.transact(caller, "remove_service_records", |s, ctx| {
            s.services.remove_service_records(ctx, service_id, record_types)
        })
    }

    /// Hand a service to `new_owner`. Service owner only.
    pub fn transfer_service_owner(
        &mut self,
        caller: Address,
        service_id: ServiceId,
        new_owner: Address,
    ) -> Result<(), ErsError> {
        self.transact(caller, "transfer_service_owner", |s, ctx| {
            s.services.transfer_service_owner(ctx, service_id, new_owner)
        })
    }

    /// Change a chip's primary service. Chip owner only.
    pub fn set_new_primary_service(
        &mut self,
        caller: Address,
        chip: ChipId,
        service_id: ServiceId,
        timelock: u64,
        auth: &ChipAuthorization,
    ) -> Result<(), ErsError> {
        self.transact(caller, "set_new_primary_service", |s, ctx| {
            let owners = ChipOwners {
                chips: &s.chips,
                naming: &s.naming,
            };
            s.services
                .set_new_primary_service(ctx, &owners, chip, service_id, timelock, auth)
        })
    }

    /// Bind a secondary service. Chip owner only.
    pub fn add_secondary_service(
        &mut self,
        caller: Address,
        chip: ChipId,
        service_id: ServiceId,
        auth: &ChipAuthorization,
    ) -> Result<(), ErsError> {
        self.transact(caller, "add_secondary_service", |s, ctx| {
            let owners = ChipOwners {
                chips: &s.chips,
                naming: &s.naming,
            };
            s.services
                .add_secondary_service(ctx, &owners, chip, service_id, auth)
        })
    }

    /// Unbind a secondary service. Chip owner only.
    pub fn remove_secondary_service(
        &mut self,
        caller: Address,
        chip: ChipId,
        service_id: ServiceId,
        auth: &ChipAuthorization,
    ) -> Result<(), ErsError> {
        self.transact(caller, "remove_secondary_service", |s, ctx| {
            let owners = ChipOwners {
                chips: &s.chips,
                naming: &s.naming,
            };
            s.services
                .remove_secondary_service(ctx, &owners, chip, service_id, auth)
        })
    }
}
