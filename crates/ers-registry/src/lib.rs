//! # ers-registry — The ERS Registries
//!
//! Binds physical chips to on-ledger identities. A chip is provably made by
//! an enrolled manufacturer, claimed into a developer's project, given a
//! node in a hierarchical namespace, and bound to the services that
//! describe what it does.
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | `root → developer → project → chip` namespace |
//! | [`manufacturer`] | manufacturer enrollments and chip provenance |
//! | [`developer`] | developer allow-list and registrar factories |
//! | [`registrar`] | developer and project registrars |
//! | [`chip`] | project enrollment and the chip verification chain |
//! | [`services`] | service records and per-chip bindings |
//! | [`resolve`] | chip resolution and off-chain lookup verification |
//! | [`protocol`] | the transactional [`Ers`] facade |
//!
//! Registries hold no references to each other. A call that crosses
//! registries receives its collaborators as explicit arguments and reaches
//! them through a [`CallContext`] reborrowed with its own address as the
//! caller.
//!
//! ## Crate Policy
//!
//! - All state changes go through a [`CallContext`] and emit a
//!   [`ProtocolEvent`].
//! - Every hash a proof is checked against is built in [`digest`].
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod chip;
pub mod config;
pub mod context;
pub mod deploy;
pub mod developer;
pub mod digest;
pub mod event;
pub mod governance;
pub mod indexed;
pub mod manufacturer;
pub mod naming;
pub mod protocol;
pub mod registrar;
pub mod resolve;
pub mod services;

pub use chip::{ChipInfo, ChipRegistry, ClaimModel, CustodyProof, ProjectClaim, ProjectEnrollment};
pub use config::{ConfigError, ProtocolConfig};
pub use context::CallContext;
pub use event::{EventLog, EventRecord, ProtocolEvent};
pub use governance::ProtocolParams;
pub use manufacturer::{
    EnrollmentAuth, EnrollmentMetadata, ManufacturerProof, ManufacturerValidation, NewEnrollment,
};
pub use protocol::{Ers, Registries, SystemAddresses};
pub use registrar::{AddProject, AttestedChip, MerkleChipClaim, ProjectKind};
pub use resolve::{DeveloperEntry, GatewayResponse};
pub use services::{ChipAuthorization, RecordContent, ServiceRecord};
