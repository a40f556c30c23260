//! Deterministic deployment.
//!
//! Registrars are deployed at `compute_address(deployer, salt, initCodeHash)`
//! so that proofs naming the address (the project ownership proof) can be
//! signed before the registrar exists. Prediction is pure; deploying to an
//! address that is already occupied fails.

use std::collections::BTreeSet;

use ers_core::{Address, Bytes32, Encoder, ErsError};
use ers_crypto::compute_address;

use crate::registrar::ProjectKind;

/// Constructor arguments of a project registrar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectRegistrarInit {
    /// Initial owner.
    pub owner: Address,
    /// Developer registrar the project will be added to.
    pub developer_registrar: Address,
    /// Claim flavour.
    pub kind: ProjectKind,
}

impl ProjectRegistrarInit {
    /// Hash of the registrar's init code with these constructor arguments.
    pub fn init_code_hash(&self) -> Bytes32 {
        Encoder::words()
            .bytes(b"ers.ProjectRegistrar")
            .address(&self.owner)
            .address(&self.developer_registrar)
            .boolean(self.kind == ProjectKind::MerkleClaim)
            .hash()
    }
}

/// Init code hash of a developer registrar owned by `owner`.
pub fn developer_registrar_init_code_hash(owner: &Address, developer_registry: &Address) -> Bytes32 {
    Encoder::words()
        .bytes(b"ers.DeveloperRegistrar")
        .address(owner)
        .address(developer_registry)
        .hash()
}

/// Tracks which deterministic addresses hold code.
#[derive(Debug, Clone)]
pub struct Deployer {
    address: Address,
    deployed: BTreeSet<Address>,
}

impl Deployer {
    /// A deployer contract at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            deployed: BTreeSet::new(),
        }
    }

    /// The shared deployer address used for project registrars.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Where this deployer would place a project registrar.
    pub fn predict_project_registrar(&self, init: &ProjectRegistrarInit, salt: &Bytes32) -> Address {
        compute_address(&self.address, salt, &init.init_code_hash())
    }

    /// Occupy `compute_address(deployer, salt, init_code_hash)`.
    pub fn deploy(
        &mut self,
        deployer: &Address,
        salt: &Bytes32,
        init_code_hash: &Bytes32,
    ) -> Result<Address, ErsError> {
        let address = compute_address(deployer, salt, init_code_hash);
        if !self.deployed.insert(address) {
            return Err(ErsError::AlreadyDeployed { address });
        }
        tracing::debug!(address = %address, deployer = %deployer, "contract deployed");
        Ok(address)
    }

    /// Whether `address` holds code.
    pub fn is_deployed(&self, address: &Address) -> bool {
        self.deployed.contains(address)
    }
}
