//! # Error Types — Categorised Rejections
//!
//! Defines the single error type every registry operation returns. All
//! errors use `thiserror` for derive-based `Display` and `Error`.
//!
//! ## Design
//!
//! - Every rejection is synchronous and final for the current operation.
//!   Nothing is retried internally and nothing is partially committed.
//! - Each variant names one specific reason and carries the identifiers
//!   needed to diagnose it (addresses, ids, block numbers, timestamps).
//! - [`ErsError::kind()`] folds the variants into the seven categories
//!   callers branch on: authorization, state conflict, referential, proof
//!   invalid, temporal, shape, and the off-chain lookup signal.

use std::fmt;

use thiserror::Error;

use crate::identity::{ChipId, EnrollmentId, ManufacturerId, Node, RecordType, ServiceId};
use crate::lookup::OffchainLookup;
use crate::primitives::Address;

/// The category of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller is not the governance, owner or registrar the operation requires.
    Authorization,
    /// The target already exists, is already claimed, or is already enrolled.
    StateConflict,
    /// A referenced manufacturer, enrollment, service, project or node does not exist.
    Referential,
    /// A signature or merkle-proof check failed.
    ProofInvalid,
    /// A timelock, signature window or update window forbids the operation now.
    Temporal,
    /// A zero address, zero identifier or malformed value was supplied.
    Shape,
    /// Data must be resolved off-chain and resubmitted through a callback.
    OffchainLookup,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Authorization => "authorization",
            Self::StateConflict => "state-conflict",
            Self::Referential => "referential",
            Self::ProofInvalid => "proof-invalid",
            Self::Temporal => "temporal",
            Self::Shape => "shape",
            Self::OffchainLookup => "offchain-lookup",
        };
        f.write_str(s)
    }
}

/// The role an operation expected its caller to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Protocol governance.
    Governance,
    /// The current owner of a manufacturer.
    ManufacturerOwner,
    /// The owner of a namespace node.
    NodeOwner,
    /// The resolver of a namespace node.
    NodeResolver,
    /// The Chip Registry contract.
    ChipRegistry,
    /// A registered developer registrar.
    DeveloperRegistrar,
    /// A developer on the governance allow-list.
    AllowedDeveloper,
    /// The owner of a developer registrar.
    RegistrarOwner,
    /// The owner of a project registrar.
    ProjectRegistrarOwner,
    /// The current owner of a chip.
    ChipOwner,
    /// The owner of a service.
    ServiceOwner,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Governance => "governance",
            Self::ManufacturerOwner => "manufacturer owner",
            Self::NodeOwner => "node owner",
            Self::NodeResolver => "node resolver",
            Self::ChipRegistry => "chip registry",
            Self::DeveloperRegistrar => "developer registrar",
            Self::AllowedDeveloper => "allowed developer",
            Self::RegistrarOwner => "developer registrar owner",
            Self::ProjectRegistrarOwner => "project registrar owner",
            Self::ChipOwner => "chip owner",
            Self::ServiceOwner => "service owner",
        };
        f.write_str(s)
    }
}

/// Which proof failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofKind {
    /// Project public key signature over `(chainId, projectRegistrar)`.
    ProjectOwnership,
    /// Chip signature over `(chainId, owner)`.
    ChipCustody,
    /// Manufacturer merkle inclusion or certificate.
    ManufacturerEnrollment,
    /// Project claim-tree inclusion.
    ProjectInclusion,
    /// Chip signature authorising a service binding change.
    ServiceChange,
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ProjectOwnership => "project ownership proof",
            Self::ChipCustody => "chip custody proof",
            Self::ManufacturerEnrollment => "manufacturer enrollment proof",
            Self::ProjectInclusion => "project inclusion proof",
            Self::ServiceChange => "service change signature",
        };
        f.write_str(s)
    }
}

/// Top-level error type for every registry operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErsError {
    // ── Authorization ────────────────────────────────────────────────
    /// The caller does not hold the required role.
    #[error("caller {caller} is not the {role}")]
    Unauthorized {
        /// Role the operation requires.
        role: Role,
        /// The rejected caller.
        caller: Address,
    },

    // ── State conflict ───────────────────────────────────────────────
    /// A one-time initialisation ran twice.
    #[error("{component} already initialized")]
    AlreadyInitialized {
        /// The component whose initializer was re-entered.
        component: &'static str,
    },

    /// Manufacturer id was registered before (ids are never reused).
    #[error("{manufacturer} already registered")]
    ManufacturerAlreadyRegistered {
        /// The manufacturer.
        manufacturer: ManufacturerId,
    },

    /// Manufacturer has no current owner.
    #[error("{manufacturer} has no current owner")]
    ManufacturerRevoked {
        /// The manufacturer.
        manufacturer: ManufacturerId,
    },

    /// A namespace node with this hash already has an owner.
    #[error("subnode already exists: {node}")]
    SubnodeAlreadyExists {
        /// The node.
        node: Node,
    },

    /// The developer is already on the allow-list.
    #[error("developer {developer} already allowed")]
    DeveloperAlreadyAllowed {
        /// The developer.
        developer: Address,
    },

    /// The registrar factory is already on the allow-list.
    #[error("registrar factory {factory} already allowed")]
    RegistrarFactoryAlreadyAllowed {
        /// The factory.
        factory: Address,
    },

    /// The project registrar has an enrollment already.
    #[error("project {registrar} already enrolled")]
    ProjectAlreadyEnrolled {
        /// The project registrar.
        registrar: Address,
    },

    /// The project registrar is already in the developer's project list.
    #[error("project {registrar} already listed")]
    ProjectAlreadyListed {
        /// The project registrar.
        registrar: Address,
    },

    /// Chips were added to the project; it can no longer be removed.
    #[error("project {registrar} already has chips")]
    ChipsAlreadyAdded {
        /// The project registrar.
        registrar: Address,
    },

    /// The project's claim model does not support the operation.
    #[error("project {registrar} does not use a merkle claim tree")]
    ClaimModelMismatch {
        /// The project registrar.
        registrar: Address,
    },

    /// The chip has been added or claimed before.
    #[error("chip {chip} already enrolled")]
    ChipAlreadyEnrolled {
        /// The chip.
        chip: ChipId,
    },

    /// The chip already has a primary service.
    #[error("chip {chip} already has an initial service")]
    InitialServiceAlreadySet {
        /// The chip.
        chip: ChipId,
    },

    /// A service with this id exists.
    #[error("{service} already exists")]
    ServiceAlreadyExists {
        /// The service.
        service: ServiceId,
    },

    /// The record type is already present in the service.
    #[error("{record_type} already present in {service}")]
    RecordTypeAlreadyExists {
        /// The service.
        service: ServiceId,
        /// The duplicate record type.
        record_type: RecordType,
    },

    /// The service is already the chip's primary service.
    #[error("{service} is already the primary service of chip {chip}")]
    ServiceAlreadyPrimary {
        /// The chip.
        chip: ChipId,
        /// The service.
        service: ServiceId,
    },

    /// The service is already one of the chip's secondary services.
    #[error("{service} is already a secondary service of chip {chip}")]
    ServiceAlreadyEnrolled {
        /// The chip.
        chip: ChipId,
        /// The service.
        service: ServiceId,
    },

    /// Something is already deployed at the deterministic address.
    #[error("address {address} already deployed")]
    AlreadyDeployed {
        /// The occupied address.
        address: Address,
    },

    // ── Referential ──────────────────────────────────────────────────
    /// No manufacturer with this id was ever registered.
    #[error("{manufacturer} not found")]
    ManufacturerNotFound {
        /// The manufacturer.
        manufacturer: ManufacturerId,
    },

    /// No enrollment with this id exists.
    #[error("{enrollment} not found")]
    EnrollmentNotFound {
        /// The enrollment.
        enrollment: EnrollmentId,
    },

    /// The namespace node has no owner.
    #[error("{node} not found")]
    NodeNotFound {
        /// The node.
        node: Node,
    },

    /// The factory is not on the governance allow-list.
    #[error("registrar factory {factory} not allowed")]
    UnknownRegistrarFactory {
        /// The factory.
        factory: Address,
    },

    /// No developer registrar is registered at this address.
    #[error("developer registrar {registrar} not found")]
    DeveloperRegistrarNotFound {
        /// The registrar address.
        registrar: Address,
    },

    /// No project registrar is deployed at this address.
    #[error("project registrar {registrar} not deployed")]
    ProjectRegistrarNotFound {
        /// The registrar address.
        registrar: Address,
    },

    /// The project registrar has no enrollment.
    #[error("project {registrar} not enrolled")]
    ProjectNotEnrolled {
        /// The project registrar.
        registrar: Address,
    },

    /// The project registrar is not in the developer's project list.
    #[error("project {registrar} not listed")]
    ProjectNotListed {
        /// The project registrar.
        registrar: Address,
    },

    /// The chip has never been added or claimed.
    #[error("chip {chip} not enrolled")]
    ChipNotEnrolled {
        /// The chip.
        chip: ChipId,
    },

    /// No service with this id exists.
    #[error("{service} not found")]
    ServiceNotFound {
        /// The service.
        service: ServiceId,
    },

    /// The service has no record of this type.
    #[error("{record_type} not found in {service}")]
    RecordTypeNotFound {
        /// The service.
        service: ServiceId,
        /// The missing record type.
        record_type: RecordType,
    },

    /// The service is not one of the chip's secondary services.
    #[error("{service} is not a secondary service of chip {chip}")]
    ServiceNotEnrolled {
        /// The chip.
        chip: ChipId,
        /// The service.
        service: ServiceId,
    },

    /// The chip has no primary service binding.
    #[error("chip {chip} has no primary service")]
    NoPrimaryService {
        /// The chip.
        chip: ChipId,
    },

    // ── Proof invalid ────────────────────────────────────────────────
    /// A signature or merkle-proof check failed.
    #[error("invalid {proof}")]
    InvalidProof {
        /// Which proof failed.
        proof: ProofKind,
    },

    // ── Temporal ─────────────────────────────────────────────────────
    /// The chip's primary service timelock has not expired.
    #[error("timelock {timelock} for chip {chip} has not expired (now {now})")]
    TimelockNotExpired {
        /// The chip.
        chip: ChipId,
        /// The active timelock.
        timelock: u64,
        /// The ledger timestamp at the check.
        now: u64,
    },

    /// The requested timelock is not in the future.
    #[error("timelock {timelock} is not in the future (now {now})")]
    TimelockNotInFuture {
        /// The requested timelock.
        timelock: u64,
        /// The ledger timestamp at the check.
        now: u64,
    },

    /// The signature's commit block is older than the allowed window.
    #[error("signature expired: committed at block {commit_block}, now {current_block}, window {window}")]
    SignatureExpired {
        /// Block the signature committed to.
        commit_block: u64,
        /// Current block.
        current_block: u64,
        /// Allowed window in blocks.
        window: u64,
    },

    /// The signature commits to a block that has not been produced.
    #[error("commit block {commit_block} is ahead of current block {current_block}")]
    CommitBlockInFuture {
        /// Block the signature committed to.
        commit_block: u64,
        /// Current block.
        current_block: u64,
    },

    /// The project's merkle-root update window has closed.
    #[error("update window for project {registrar} closed at {deadline} (now {now})")]
    UpdateWindowClosed {
        /// The project registrar.
        registrar: Address,
        /// Last timestamp at which updates were allowed.
        deadline: u64,
        /// The ledger timestamp at the check.
        now: u64,
    },

    // ── Shape ────────────────────────────────────────────────────────
    /// A required address was zero.
    #[error("{field} must not be the zero address")]
    ZeroAddress {
        /// The offending field.
        field: &'static str,
    },

    /// A required identifier or amount was zero.
    #[error("{field} must not be zero")]
    ZeroValue {
        /// The offending field.
        field: &'static str,
    },

    /// A required collection or string was empty.
    #[error("{field} must not be empty")]
    EmptyValue {
        /// The offending field.
        field: &'static str,
    },

    /// A value could not be decoded.
    #[error("malformed {what}: {reason}")]
    Malformed {
        /// What was being decoded.
        what: &'static str,
        /// Decoder message.
        reason: String,
    },

    // ── Off-chain lookup ─────────────────────────────────────────────
    /// Resolve off-chain and resubmit through the callback.
    #[error("offchain lookup required via {} gateway(s)", .0.urls.len())]
    OffchainLookup(Box<OffchainLookup>),
}

impl ErsError {
    /// The category of this rejection.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Authorization,

            Self::AlreadyInitialized { .. }
            | Self::ManufacturerAlreadyRegistered { .. }
            | Self::ManufacturerRevoked { .. }
            | Self::SubnodeAlreadyExists { .. }
            | Self::DeveloperAlreadyAllowed { .. }
            | Self::RegistrarFactoryAlreadyAllowed { .. }
            | Self::ProjectAlreadyEnrolled { .. }
            | Self::ProjectAlreadyListed { .. }
            | Self::ChipsAlreadyAdded { .. }
            | Self::ClaimModelMismatch { .. }
            | Self::ChipAlreadyEnrolled { .. }
            | Self::InitialServiceAlreadySet { .. }
            | Self::ServiceAlreadyExists { .. }
            | Self::RecordTypeAlreadyExists { .. }
            | Self::ServiceAlreadyPrimary { .. }
            | Self::ServiceAlreadyEnrolled { .. }
            | Self::AlreadyDeployed { .. } => ErrorKind::StateConflict,

            Self::ManufacturerNotFound { .. }
            | Self::EnrollmentNotFound { .. }
            | Self::NodeNotFound { .. }
            | Self::UnknownRegistrarFactory { .. }
            | Self::DeveloperRegistrarNotFound { .. }
            | Self::ProjectRegistrarNotFound { .. }
            | Self::ProjectNotEnrolled { .. }
            | Self::ProjectNotListed { .. }
            | Self::ChipNotEnrolled { .. }
            | Self::ServiceNotFound { .. }
            | Self::RecordTypeNotFound { .. }
            | Self::ServiceNotEnrolled { .. }
            | Self::NoPrimaryService { .. } => ErrorKind::Referential,

            Self::InvalidProof { .. } => ErrorKind::ProofInvalid,

            Self::TimelockNotExpired { .. }
            | Self::TimelockNotInFuture { .. }
            | Self::SignatureExpired { .. }
            | Self::CommitBlockInFuture { .. }
            | Self::UpdateWindowClosed { .. } => ErrorKind::Temporal,

            Self::ZeroAddress { .. }
            | Self::ZeroValue { .. }
            | Self::EmptyValue { .. }
            | Self::Malformed { .. } => ErrorKind::Shape,

            Self::OffchainLookup(_) => ErrorKind::OffchainLookup,
        }
    }

    /// Shorthand for an authorization failure.
    pub fn unauthorized(role: Role, caller: Address) -> Self {
        Self::Unauthorized { role, caller }
    }

    /// Shorthand for a failed proof.
    pub fn invalid_proof(proof: ProofKind) -> Self {
        Self::InvalidProof { proof }
    }
}

/// Reject the zero address for `field`.
pub fn require_nonzero_address(address: &Address, field: &'static str) -> Result<(), ErsError> {
    if address.is_zero() {
        return Err(ErsError::ZeroAddress { field });
    }
    Ok(())
}
