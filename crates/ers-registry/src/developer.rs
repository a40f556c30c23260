//! # Developer Registry
//!
//! Governance-curated entry point for developers. Governance allow-lists a
//! developer together with the label their namespace node will carry, and
//! allow-lists the registrar factories that may deploy developer
//! registrars.
//!
//! ## Lifecycle
//!
//! ```text
//! Unknown ──addAllowedDeveloper──▶ Allowed ──createDeveloperRegistrar──▶ Registered
//!                                     │                                      │
//!                             removeAllowedDeveloper              revokeDeveloperRegistrar
//!                                     ▼                                      ▼
//!                                  Unknown                                Revoked
//! ```
//!
//! ## Security Invariant
//!
//! An allow-list entry is consumed by `createDeveloperRegistrar`; a
//! developer gets exactly one registrar per allow-listing. The Chip Registry
//! accepts project enrollments only from addresses registered here.

use std::collections::{BTreeMap, BTreeSet};

use ers_core::{label_hash, Address, Bytes32, ErsError, Node, Role};
use serde::{Deserialize, Serialize};

use crate::context::CallContext;
use crate::deploy::{developer_registrar_init_code_hash, Deployer};
use crate::event::ProtocolEvent;
use crate::naming::NamingRegistry;
use crate::registrar::DeveloperRegistrar;

/// Registration record of a deployed developer registrar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrarEntry {
    /// Developer that created it.
    pub developer: Address,
    /// The developer's namespace node.
    pub node: Node,
    /// Hash of the developer label, used to delete the node on revocation.
    pub label_hash: Bytes32,
    /// Factory that deployed it.
    pub factory: Address,
}

/// The Developer Registry.
#[derive(Debug, Clone)]
pub struct DeveloperRegistry {
    address: Address,
    root_node: Option<Node>,
    allowed: BTreeMap<Address, String>,
    factories: BTreeSet<Address>,
    registrars: BTreeMap<Address, RegistrarEntry>,
}

impl DeveloperRegistry {
    /// An uninitialised registry at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            root_node: None,
            allowed: BTreeMap::new(),
            factories: BTreeSet::new(),
            registrars: BTreeMap::new(),
        }
    }

    /// This registry's address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Wire the root namespace node developer nodes are created under.
    /// Governance only, once.
    pub fn initialize(&mut self, ctx: &CallContext<'_>, root_node: Node) -> Result<(), ErsError> {
        ctx.params.require_governance(&ctx.caller)?;
        if self.root_node.is_some() {
            return Err(ErsError::AlreadyInitialized {
                component: "developer registry",
            });
        }
        self.root_node = Some(root_node);
        Ok(())
    }

    /// The root node, once initialised.
    pub fn root_node(&self) -> Option<Node> {
        self.root_node
    }

    // ── Allow-lists ──────────────────────────────────────────────────

    /// Allow `developer` to create one registrar under `label`.
    pub fn add_allowed_developer(
        &mut self,
        ctx: &mut CallContext<'_>,
        developer: Address,
        label: &str,
    ) -> Result<(), ErsError> {
        ctx.params.require_governance(&ctx.caller)?;
        ers_core::require_nonzero_address(&developer, "developer")?;
        if label.is_empty() {
            return Err(ErsError::EmptyValue { field: "label" });
        }
        if self.allowed.contains_key(&developer) {
            return Err(ErsError::DeveloperAlreadyAllowed { developer });
        }
        self.allowed.insert(developer, label.to_string());
        ctx.emit(ProtocolEvent::DeveloperAllowed {
            developer,
            label: label.to_string(),
        });
        Ok(())
    }

    /// Withdraw an unused allow-list entry.
    pub fn remove_allowed_developer(
        &mut self,
        ctx: &mut CallContext<'_>,
        developer: &Address,
    ) -> Result<(), ErsError> {
        ctx.params.require_governance(&ctx.caller)?;
        if self.allowed.remove(developer).is_none() {
            return Err(ErsError::unauthorized(Role::AllowedDeveloper, *developer));
        }
        ctx.emit(ProtocolEvent::DeveloperDisallowed {
            developer: *developer,
        });
        Ok(())
    }

    /// Allow `factory` to deploy developer registrars.
    pub fn add_registrar_factory(
        &mut self,
        ctx: &mut CallContext<'_>,
        factory: Address,
    ) -> Result<(), ErsError> {
        ctx.params.require_governance(&ctx.caller)?;
        ers_core::require_nonzero_address(&factory, "factory")?;
        if !self.factories.insert(factory) {
            return Err(ErsError::RegistrarFactoryAlreadyAllowed { factory });
        }
        ctx.emit(ProtocolEvent::RegistrarFactoryAllowed { factory });
        Ok(())
    }

    /// Stop `factory` from deploying further registrars.
    pub fn remove_registrar_factory(
        &mut self,
        ctx: &mut CallContext<'_>,
        factory: &Address,
    ) -> Result<(), ErsError> {
        ctx.params.require_governance(&ctx.caller)?;
        if !self.factories.remove(factory) {
            return Err(ErsError::UnknownRegistrarFactory { factory: *factory });
        }
        ctx.emit(ProtocolEvent::RegistrarFactoryRemoved { factory: *factory });
        Ok(())
    }

    // ── Registrars ───────────────────────────────────────────────────

    /// Deploy the calling developer's registrar through `factory` and give
    /// it the developer's namespace node. Consumes the allow-list entry.
    pub fn create_developer_registrar(
        &mut self,
        ctx: &mut CallContext<'_>,
        factory: &Address,
        naming: &mut NamingRegistry,
        deployer: &mut Deployer,
    ) -> Result<DeveloperRegistrar, ErsError> {
        let developer = ctx.caller;
        let label = self
            .allowed
            .get(&developer)
            .cloned()
            .ok_or(ErsError::unauthorized(Role::AllowedDeveloper, developer))?;
        if !self.factories.contains(factory) {
            return Err(ErsError::UnknownRegistrarFactory { factory: *factory });
        }
        let root = self.root_node.ok_or(ErsError::NodeNotFound {
            node: Node::ROOT_PARENT,
        })?;

        let salt = label_hash(label.as_bytes());
        let registrar = deployer.deploy(
            factory,
            &salt,
            &developer_registrar_init_code_hash(&developer, &self.address),
        )?;
        let node = naming.create_subnode_record(
            &mut ctx.as_caller(self.address),
            &root,
            label.as_bytes(),
            registrar,
            self.address,
        )?;

        self.allowed.remove(&developer);
        self.registrars.insert(
            registrar,
            RegistrarEntry {
                developer,
                node,
                label_hash: salt,
                factory: *factory,
            },
        );
        tracing::info!(registrar = %registrar, developer = %developer, label = %label, "developer registrar created");
        ctx.emit(ProtocolEvent::DeveloperRegistrarCreated {
            registrar,
            owner: developer,
            node,
            factory: *factory,
        });
        Ok(DeveloperRegistrar::new(registrar, developer, node))
    }

    /// Deregister `registrar` and delete its namespace node. Governance only.
    pub fn revoke_developer_registrar(
        &mut self,
        ctx: &mut CallContext<'_>,
        registrar: &Address,
        naming: &mut NamingRegistry,
    ) -> Result<(), ErsError> {
        ctx.params.require_governance(&ctx.caller)?;
        let entry = self
            .registrars
            .get(registrar)
            .cloned()
            .ok_or(ErsError::DeveloperRegistrarNotFound {
                registrar: *registrar,
            })?;
        let root = self.root_node.ok_or(ErsError::NodeNotFound {
            node: Node::ROOT_PARENT,
        })?;
        naming.delete_subnode_record(&mut ctx.as_caller(self.address), &root, &entry.label_hash)?;
        self.registrars.remove(registrar);
        ctx.emit(ProtocolEvent::DeveloperRegistrarRevoked {
            registrar: *registrar,
            node: entry.node,
        });
        Ok(())
    }

    // ── Views ────────────────────────────────────────────────────────

    /// Whether `address` is a live developer registrar.
    pub fn is_developer_registrar(&self, address: &Address) -> bool {
        self.registrars.contains_key(address)
    }

    /// Registration record of `registrar`.
    pub fn registrar(&self, registrar: &Address) -> Option<&RegistrarEntry> {
        self.registrars.get(registrar)
    }

    /// Pending label of an allow-listed developer.
    pub fn allowed_label(&self, developer: &Address) -> Option<&str> {
        self.allowed.get(developer).map(String::as_str)
    }

    /// Whether `factory` may deploy registrars.
    pub fn is_registrar_factory(&self, factory: &Address) -> bool {
        self.factories.contains(factory)
    }

    /// Where `factory` would deploy the registrar of `developer` under `label`.
    pub fn predict_developer_registrar(
        &self,
        factory: &Address,
        developer: &Address,
        label: &str,
    ) -> Address {
        ers_crypto::compute_address(
            factory,
            &label_hash(label.as_bytes()),
            &developer_registrar_init_code_hash(developer, &self.address),
        )
    }
}
