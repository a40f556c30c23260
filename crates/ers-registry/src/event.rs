//! # Protocol Events
//!
//! Every state change emits a [`ProtocolEvent`] into the [`EventLog`]. The
//! log is ordered, stamped with the block it was emitted in, and truncated
//! back together with registry state when a transaction fails, so readers
//! only ever see events of committed operations.

use ers_core::{
    timestamp_to_iso8601, Address, Bytes32, ChipId, EnrollmentId, ManufacturerId, Node, RecordType,
    ServiceId,
};
use serde::{Deserialize, Serialize};

/// A state change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProtocolEvent {
    // ── Naming ───────────────────────────────────────────────────────
    /// A namespace node was created.
    SubnodeCreated {
        node: Node,
        parent: Node,
        owner: Address,
        resolver: Address,
    },
    /// A node's owner was replaced by its resolver.
    NodeOwnerChanged { node: Node, owner: Address },
    /// A node's owner and resolver were zeroed.
    SubnodeDeleted { node: Node, parent: Node },

    // ── Manufacturers ────────────────────────────────────────────────
    ManufacturerRegistered {
        manufacturer: ManufacturerId,
        owner: Address,
    },
    ManufacturerRevoked { manufacturer: ManufacturerId },
    ManufacturerOwnerTransferred {
        manufacturer: ManufacturerId,
        owner: Address,
    },
    EnrollmentAdded {
        manufacturer: ManufacturerId,
        enrollment: EnrollmentId,
        merkle_verified: bool,
        cert_signer: Address,
    },
    EnrollmentStatusUpdated {
        enrollment: EnrollmentId,
        active: bool,
    },

    // ── Developers ───────────────────────────────────────────────────
    DeveloperAllowed { developer: Address, label: String },
    DeveloperDisallowed { developer: Address },
    RegistrarFactoryAllowed { factory: Address },
    RegistrarFactoryRemoved { factory: Address },
    DeveloperRegistrarCreated {
        registrar: Address,
        owner: Address,
        node: Node,
        factory: Address,
    },
    DeveloperRegistrarRevoked { registrar: Address, node: Node },
    RegistrarOwnershipTransferred { registrar: Address, owner: Address },

    // ── Projects ─────────────────────────────────────────────────────
    ProjectRegistrarDeployed {
        registrar: Address,
        owner: Address,
        merkle_claim: bool,
    },
    ProjectAdded {
        developer_registrar: Address,
        project_registrar: Address,
        node: Node,
    },
    ProjectRemoved {
        developer_registrar: Address,
        project_registrar: Address,
    },
    ProjectEnrolled {
        project_registrar: Address,
        public_key: Address,
        service_id: ServiceId,
        node: Node,
    },
    ProjectEnrollmentRemoved { project_registrar: Address },
    ProjectMerkleRootUpdated {
        project_registrar: Address,
        root: Bytes32,
    },

    // ── Chips ────────────────────────────────────────────────────────
    ChipAdded {
        chip: ChipId,
        owner: Address,
        service_id: ServiceId,
        node: Node,
        enrollment: EnrollmentId,
        timelock: u64,
    },

    // ── Services ─────────────────────────────────────────────────────
    ServiceCreated { service: ServiceId, owner: Address },
    ServiceRecordsAdded {
        service: ServiceId,
        record_types: Vec<RecordType>,
    },
    ServiceRecordsEdited {
        service: ServiceId,
        record_types: Vec<RecordType>,
    },
    ServiceRecordsRemoved {
        service: ServiceId,
        record_types: Vec<RecordType>,
    },
    ServiceOwnershipTransferred { service: ServiceId, owner: Address },
    /// A chip's primary service binding changed. `old_primary` is zero for
    /// the initial binding.
    ServiceStateChanged {
        chip: ChipId,
        old_primary: ServiceId,
        new_primary: ServiceId,
        timelock: u64,
    },
    SecondaryServiceAdded { chip: ChipId, service: ServiceId },
    SecondaryServiceRemoved { chip: ChipId, service: ServiceId },

    // ── Governance ───────────────────────────────────────────────────
    ParameterUpdated { parameter: String, value: String },
    GovernanceTransferred { governance: Address },
}

impl ProtocolEvent {
    /// Stable snake_case name of the event variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubnodeCreated { .. } => "subnode_created",
            Self::NodeOwnerChanged { .. } => "node_owner_changed",
            Self::SubnodeDeleted { .. } => "subnode_deleted",
            Self::ManufacturerRegistered { .. } => "manufacturer_registered",
            Self::ManufacturerRevoked { .. } => "manufacturer_revoked",
            Self::ManufacturerOwnerTransferred { .. } => "manufacturer_owner_transferred",
            Self::EnrollmentAdded { .. } => "enrollment_added",
            Self::EnrollmentStatusUpdated { .. } => "enrollment_status_updated",
            Self::DeveloperAllowed { .. } => "developer_allowed",
            Self::DeveloperDisallowed { .. } => "developer_disallowed",
            Self::RegistrarFactoryAllowed { .. } => "registrar_factory_allowed",
            Self::RegistrarFactoryRemoved { .. } => "registrar_factory_removed",
            Self::DeveloperRegistrarCreated { .. } => "developer_registrar_created",
            Self::DeveloperRegistrarRevoked { .. } => "developer_registrar_revoked",
            Self::RegistrarOwnershipTransferred { .. } => "registrar_ownership_transferred",
            Self::ProjectRegistrarDeployed { .. } => "project_registrar_deployed",
            Self::ProjectAdded { .. } => "project_added",
            Self::ProjectRemoved { .. } => "project_removed",
            Self::ProjectEnrolled { .. } => "project_enrolled",
            Self::ProjectEnrollmentRemoved { .. } => "project_enrollment_removed",
            Self::ProjectMerkleRootUpdated { .. } => "project_merkle_root_updated",
            Self::ChipAdded { .. } => "chip_added",
            Self::ServiceCreated { .. } => "service_created",
            Self::ServiceRecordsAdded { .. } => "service_records_added",
            Self::ServiceRecordsEdited { .. } => "service_records_edited",
            Self::ServiceRecordsRemoved { .. } => "service_records_removed",
            Self::ServiceOwnershipTransferred { .. } => "service_ownership_transferred",
            Self::ServiceStateChanged { .. } => "service_state_changed",
            Self::SecondaryServiceAdded { .. } => "secondary_service_added",
            Self::SecondaryServiceRemoved { .. } => "secondary_service_removed",
            Self::ParameterUpdated { .. } => "parameter_updated",
            Self::GovernanceTransferred { .. } => "governance_transferred",
        }
    }
}

/// An event stamped with the block that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Block number at emission.
    pub block: u64,
    /// Block timestamp at emission.
    pub timestamp: u64,
    /// The event.
    #[serde(flatten)]
    pub event: ProtocolEvent,
}

/// Append-only (except for rollback) ordered event log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. Nothing is logged until [`EventLog::log_committed`].
    pub fn push(&mut self, block: u64, timestamp: u64, event: ProtocolEvent) {
        self.records.push(EventRecord {
            block,
            timestamp,
            event,
        });
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every event recorded after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }

    /// Log every record from index `from` on. Called once the records can no
    /// longer be rolled back.
    pub fn log_committed(&self, from: usize) {
        for record in self.records.iter().skip(from) {
            let time = timestamp_to_iso8601(record.timestamp).unwrap_or_default();
            tracing::info!(
                block = record.block,
                time = %time,
                event = record.event.name(),
                "{}",
                event_summary(&record.event)
            );
        }
    }

    /// All records in emission order.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// The most recent event, if any.
    pub fn last(&self) -> Option<&ProtocolEvent> {
        self.records.last().map(|r| &r.event)
    }

    /// Events whose variant name is `name`.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ProtocolEvent> + 'a {
        self.records
            .iter()
            .map(|r| &r.event)
            .filter(move |e| e.name() == name)
    }
}

fn event_summary(event: &ProtocolEvent) -> String {
    match event {
        ProtocolEvent::ChipAdded { chip, owner, .. } => format!("chip {chip} added for {owner}"),
        ProtocolEvent::ProjectEnrolled {
            project_registrar, ..
        } => format!("project {project_registrar} enrolled"),
        ProtocolEvent::ServiceStateChanged {
            chip, new_primary, ..
        } => format!("chip {chip} primary service now {new_primary}"),
        other => other.name().replace('_', " "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_truncate() {
        let mut log = EventLog::new();
        log.push(
            1,
            100,
            ProtocolEvent::ServiceCreated {
                service: ServiceId::ZERO,
                owner: Address::ZERO,
            },
        );
        log.push(2, 112, ProtocolEvent::GovernanceTransferred {
            governance: Address::ZERO,
        });
        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[1].block, 2);
        log.truncate(1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().map(ProtocolEvent::name), Some("service_created"));
    }

    #[test]
    fn test_log_committed_leaves_records_intact() {
        let mut log = EventLog::new();
        log.push(1, 1_768_478_400, ProtocolEvent::GovernanceTransferred {
            governance: Address::ZERO,
        });
        log.push(2, u64::MAX, ProtocolEvent::GovernanceTransferred {
            governance: Address::ZERO,
        });
        log.log_committed(0);
        log.log_committed(5);
        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[1].timestamp, u64::MAX);
    }

    #[test]
    fn test_named_filter() {
        let mut log = EventLog::new();
        for i in 0..3u8 {
            log.push(1, 0, ProtocolEvent::DeveloperDisallowed {
                developer: Address::new([i; 20]),
            });
        }
        log.push(1, 0, ProtocolEvent::ManufacturerRevoked {
            manufacturer: ManufacturerId::ZERO,
        });
        assert_eq!(log.named("developer_disallowed").count(), 3);
        assert_eq!(log.named("manufacturer_revoked").count(), 1);
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = EventRecord {
            block: 7,
            timestamp: 9,
            event: ProtocolEvent::SecondaryServiceAdded {
                chip: Address::new([1; 20]),
                service: ServiceId::ZERO,
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event"], "secondary_service_added");
        assert_eq!(json["block"], 7);
        assert!(json["chip"].as_str().unwrap().starts_with("0x01"));
    }
}
