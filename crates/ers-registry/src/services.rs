//! # Services Registry
//!
//! Services are named bundles of records; every chip is bound to one primary
//! service and any number of secondary services.
//!
//! ## Invariants
//!
//! - A record type appears at most once per service.
//! - The primary service is never also a secondary service.
//! - The initial binding is set once per chip, by the Chip Registry only,
//!   with a non-zero timelock.
//! - The primary can only change once the current timelock has expired
//!   (`timelock < now`), and only to a new timelock in the future.
//! - Every binding change the owner requests carries a chip signature over
//!   `hash(owner, blockhash(commitBlock), payload)`. It is accepted while
//!   `current - commitBlock <= maxBlockWindow` and never for a commit block
//!   that has not been produced.

use std::collections::BTreeMap;

use ers_core::{hex, Address, ChipId, ErsError, ProofKind, RecordType, Role, ServiceId};
use ers_crypto::to_signed_message_hash;
use serde::{Deserialize, Serialize};

use crate::context::CallContext;
use crate::digest;
use crate::event::ProtocolEvent;
use crate::indexed::IndexedSet;

/// Resolves the current owner of a chip.
pub trait ChipOwnership {
    /// The owner of `chip`, or a referential error if it was never enrolled.
    fn owner_of(&self, chip: &ChipId) -> Result<Address, ErsError>;
}

/// One record of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Record type.
    pub record_type: RecordType,
    /// Content blob.
    #[serde(with = "hex::serde_bytes")]
    pub content: Vec<u8>,
    /// Whether the chip id is appended to the content on lookup.
    pub append_id: bool,
}

impl ServiceRecord {
    /// A record with UTF-8 content.
    pub fn text(record_type: RecordType, content: &str, append_id: bool) -> Self {
        Self {
            record_type,
            content: content.as_bytes().to_vec(),
            append_id,
        }
    }
}

/// A resolved record: content with the chip id already appended if needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordContent {
    /// Record type.
    pub record_type: RecordType,
    /// Resolved content.
    #[serde(with = "hex::serde_bytes")]
    pub content: Vec<u8>,
}

impl RecordContent {
    /// Content as UTF-8 text, lossily.
    pub fn as_text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// A service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Controls the records.
    pub owner: Address,
    /// Records in insertion order.
    pub records: Vec<ServiceRecord>,
}

impl Service {
    fn position(&self, record_type: &RecordType) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.record_type == *record_type)
    }

    /// Resolve every record for `chip`.
    pub fn content_for(&self, chip: &ChipId) -> Vec<RecordContent> {
        let suffix = chip.to_hex_unprefixed();
        self.records
            .iter()
            .map(|r| {
                let mut content = r.content.clone();
                if r.append_id {
                    content.extend_from_slice(suffix.as_bytes());
                }
                RecordContent {
                    record_type: r.record_type,
                    content,
                }
            })
            .collect()
    }
}

/// A chip's service bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipServices {
    /// Primary service.
    pub primary: ServiceId,
    /// Until when the primary cannot change.
    pub timelock: u64,
    /// Secondary services, enumerable.
    pub secondary: IndexedSet<ServiceId>,
}

/// A chip's signed authorisation for a binding change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipAuthorization {
    /// Block whose hash the signature commits to.
    pub commit_block: u64,
    /// Account signature by the chip.
    #[serde(with = "hex::serde_bytes")]
    pub signature: Vec<u8>,
}

/// Services and chip bindings.
#[derive(Debug, Clone)]
pub struct ServicesRegistry {
    address: Address,
    chip_registry: Address,
    services: BTreeMap<ServiceId, Service>,
    chips: BTreeMap<ChipId, ChipServices>,
}

impl ServicesRegistry {
    /// A registry at `address` that accepts initial bindings from
    /// `chip_registry`.
    pub fn new(address: Address, chip_registry: Address) -> Self {
        Self {
            address,
            chip_registry,
            services: BTreeMap::new(),
            chips: BTreeMap::new(),
        }
    }

    /// This registry's address.
    pub fn address(&self) -> Address {
        self.address
    }

    // ── Service management ───────────────────────────────────────────

    /// Create `service_id` owned by the caller.
    pub fn create_service(
        &mut self,
        ctx: &mut CallContext<'_>,
        service_id: ServiceId,
        records: Vec<ServiceRecord>,
    ) -> Result<(), ErsError> {
        if service_id.is_zero() {
            return Err(ErsError::ZeroValue {
                field: "service_id",
            });
        }
        if self.services.contains_key(&service_id) {
            return Err(ErsError::ServiceAlreadyExists {
                service: service_id,
            });
        }
        let mut service = Service {
            owner: ctx.caller,
            records: Vec::new(),
        };
        let record_types = push_new_records(&mut service, service_id, records)?;
        self.services.insert(service_id, service);
        ctx.emit(ProtocolEvent::ServiceCreated {
            service: service_id,
            owner: ctx.caller,
        });
        if !record_types.is_empty() {
            ctx.emit(ProtocolEvent::ServiceRecordsAdded {
                service: service_id,
                record_types,
            });
        }
        Ok(())
    }

    /// Add records whose types are not yet present. Service owner only.
    pub fn add_service_records(
        &mut self,
        ctx: &mut CallContext<'_>,
        service_id: ServiceId,
        records: Vec<ServiceRecord>,
    ) -> Result<(), ErsError> {
        let service = self.owned_service_mut(ctx, &service_id)?;
        let record_types = push_new_records(service, service_id, records)?;
        ctx.emit(ProtocolEvent::ServiceRecordsAdded {
            service: service_id,
            record_types,
        });
        Ok(())
    }

    /// Replace existing records. Service owner only.
    pub fn edit_service_records(
        &mut self,
        ctx: &mut CallContext<'_>,
        service_id: ServiceId,
        records: Vec<ServiceRecord>,
    ) -> Result<(), ErsError> {
        let service = self.owned_service_mut(ctx, &service_id)?;
        let mut record_types = Vec::with_capacity(records.len());
        for record in records {
            let pos = service
                .position(&record.record_type)
                .ok_or(ErsError::RecordTypeNotFound {
                    service: service_id,
                    record_type: record.record_type,
                })?;
            record_types.push(record.record_type);
            service.records[pos] = record;
        }
        ctx.emit(ProtocolEvent::ServiceRecordsEdited {
            service: service_id,
            record_types,
        });
        Ok(())
    }

    /// Remove records by type. Service owner only.
    pub fn remove_service_records(
        &mut self,
        ctx: &mut CallContext<'_>,
        service_id: ServiceId,
        record_types: Vec<RecordType>,
    ) -> Result<(), ErsError> {
        let service = self.owned_service_mut(ctx, &service_id)?;
        for record_type in &record_types {
            let pos = service
                .position(record_type)
                .ok_or(ErsError::RecordTypeNotFound {
                    service: service_id,
                    record_type: *record_type,
                })?;
            service.records.swap_remove(pos);
        }
        ctx.emit(ProtocolEvent::ServiceRecordsRemoved {
            service: service_id,
            record_types,
        });
        Ok(())
    }

    /// Hand a service to `new_owner`. Service owner only.
    pub fn transfer_service_owner(
        &mut self,
        ctx: &mut CallContext<'_>,
        service_id: ServiceId,
        new_owner: Address,
    ) -> Result<(), ErsError> {
        ers_core::require_nonzero_address(&new_owner, "owner")?;
        let service = self.owned_service_mut(ctx, &service_id)?;
        service.owner = new_owner;
        ctx.emit(ProtocolEvent::ServiceOwnershipTransferred {
            service: service_id,
            owner: new_owner,
        });
        Ok(())
    }

    // ── Chip bindings ────────────────────────────────────────────────

    /// Bind a freshly enrolled chip to its first primary service.
    pub fn set_initial_service(
        &mut self,
        ctx: &mut CallContext<'_>,
        chip: ChipId,
        service_id: ServiceId,
        timelock: u64,
    ) -> Result<(), ErsError> {
        if ctx.caller != self.chip_registry {
            return Err(ErsError::unauthorized(Role::ChipRegistry, ctx.caller));
        }
        if self.chips.contains_key(&chip) {
            return Err(ErsError::InitialServiceAlreadySet { chip });
        }
        self.require_service(&service_id)?;
        if timelock == 0 {
            return Err(ErsError::ZeroValue { field: "timelock" });
        }
        self.chips.insert(
            chip,
            ChipServices {
                primary: service_id,
                timelock,
                secondary: IndexedSet::new(),
            },
        );
        ctx.emit(ProtocolEvent::ServiceStateChanged {
            chip,
            old_primary: ServiceId::ZERO,
            new_primary: service_id,
            timelock,
        });
        Ok(())
    }

    /// Move `chip` to a new primary service. Chip owner only.
    pub fn set_new_primary_service(
        &mut self,
        ctx: &mut CallContext<'_>,
        owners: &dyn ChipOwnership,
        chip: ChipId,
        service_id: ServiceId,
        new_timelock: u64,
        auth: &ChipAuthorization,
    ) -> Result<(), ErsError> {
        let owner = require_chip_owner(ctx, owners, &chip)?;
        let now = ctx.now();
        let bindings = self
            .chips
            .get(&chip)
            .ok_or(ErsError::NoPrimaryService { chip })?;
        if bindings.timelock >= now {
            return Err(ErsError::TimelockNotExpired {
                chip,
                timelock: bindings.timelock,
                now,
            });
        }
        if new_timelock <= now {
            return Err(ErsError::TimelockNotInFuture {
                timelock: new_timelock,
                now,
            });
        }
        self.require_service(&service_id)?;
        if bindings.primary == service_id {
            return Err(ErsError::ServiceAlreadyPrimary {
                chip,
                service: service_id,
            });
        }
        if bindings.secondary.contains(&service_id) {
            return Err(ErsError::ServiceAlreadyEnrolled {
                chip,
                service: service_id,
            });
        }
        let payload = digest::primary_service_payload(&service_id, new_timelock);
        verify_chip_authorization(ctx, &chip, &owner, &payload, auth)?;

        let bindings = self
            .chips
            .get_mut(&chip)
            .ok_or(ErsError::NoPrimaryService { chip })?;
        let old_primary = bindings.primary;
        bindings.primary = service_id;
        bindings.timelock = new_timelock;
        ctx.emit(ProtocolEvent::ServiceStateChanged {
            chip,
            old_primary,
            new_primary: service_id,
            timelock: new_timelock,
        });
        Ok(())
    }

    /// Add a secondary service to `chip`. Chip owner only.
    pub fn add_secondary_service(
        &mut self,
        ctx: &mut CallContext<'_>,
        owners: &dyn ChipOwnership,
        chip: ChipId,
        service_id: ServiceId,
        auth: &ChipAuthorization,
    ) -> Result<(), ErsError> {
        let owner = require_chip_owner(ctx, owners, &chip)?;
        self.require_service(&service_id)?;
        let bindings = self
            .chips
            .get(&chip)
            .ok_or(ErsError::NoPrimaryService { chip })?;
        if bindings.secondary.contains(&service_id) {
            return Err(ErsError::ServiceAlreadyEnrolled {
                chip,
                service: service_id,
            });
        }
        if bindings.primary == service_id {
            return Err(ErsError::ServiceAlreadyPrimary {
                chip,
                service: service_id,
            });
        }
        let payload = digest::add_secondary_payload(&service_id);
        verify_chip_authorization(ctx, &chip, &owner, &payload, auth)?;

        if let Some(bindings) = self.chips.get_mut(&chip) {
            bindings.secondary.insert(service_id);
        }
        ctx.emit(ProtocolEvent::SecondaryServiceAdded {
            chip,
            service: service_id,
        });
        Ok(())
    }

    /// Remove a secondary service from `chip`. Chip owner only.
    pub fn remove_secondary_service(
        &mut self,
        ctx: &mut CallContext<'_>,
        owners: &dyn ChipOwnership,
        chip: ChipId,
        service_id: ServiceId,
        auth: &ChipAuthorization,
    ) -> Result<(), ErsError> {
        let owner = require_chip_owner(ctx, owners, &chip)?;
        let enrolled = self
            .chips
            .get(&chip)
            .is_some_and(|b| b.secondary.contains(&service_id));
        if !enrolled {
            return Err(ErsError::ServiceNotEnrolled {
                chip,
                service: service_id,
            });
        }
        let payload = digest::remove_secondary_payload(&service_id);
        verify_chip_authorization(ctx, &chip, &owner, &payload, auth)?;

        if let Some(bindings) = self.chips.get_mut(&chip) {
            bindings.secondary.remove(&service_id);
        }
        ctx.emit(ProtocolEvent::SecondaryServiceRemoved {
            chip,
            service: service_id,
        });
        Ok(())
    }

    // ── Views ────────────────────────────────────────────────────────

    /// Whether `service_id` exists.
    pub fn is_valid_service(&self, service_id: &ServiceId) -> bool {
        self.services.contains_key(service_id)
    }

    /// Service record.
    pub fn service(&self, service_id: &ServiceId) -> Result<&Service, ErsError> {
        self.services
            .get(service_id)
            .ok_or(ErsError::ServiceNotFound {
                service: *service_id,
            })
    }

    /// Bindings of `chip`.
    pub fn chip_services(&self, chip: &ChipId) -> Result<&ChipServices, ErsError> {
        self.chips
            .get(chip)
            .ok_or(ErsError::NoPrimaryService { chip: *chip })
    }

    /// Whether `service_id` is bound to `chip`, as primary or secondary.
    pub fn is_chip_service_enrolled(&self, chip: &ChipId, service_id: &ServiceId) -> bool {
        self.chips
            .get(chip)
            .is_some_and(|b| b.primary == *service_id || b.secondary.contains(service_id))
    }

    /// Records of `service_id` resolved for `chip`.
    pub fn service_content(
        &self,
        service_id: &ServiceId,
        chip: &ChipId,
    ) -> Result<Vec<RecordContent>, ErsError> {
        Ok(self.service(service_id)?.content_for(chip))
    }

    /// Records of `chip`'s primary service.
    pub fn primary_service_content(&self, chip: &ChipId) -> Result<Vec<RecordContent>, ErsError> {
        let bindings = self.chip_services(chip)?;
        self.service_content(&bindings.primary, chip)
    }

    fn require_service(&self, service_id: &ServiceId) -> Result<(), ErsError> {
        self.service(service_id).map(|_| ())
    }

    fn owned_service_mut(
        &mut self,
        ctx: &CallContext<'_>,
        service_id: &ServiceId,
    ) -> Result<&mut Service, ErsError> {
        let service = self
            .services
            .get_mut(service_id)
            .ok_or(ErsError::ServiceNotFound {
                service: *service_id,
            })?;
        if service.owner != ctx.caller {
            return Err(ErsError::unauthorized(Role::ServiceOwner, ctx.caller));
        }
        Ok(service)
    }
}

fn push_new_records(
    service: &mut Service,
    service_id: ServiceId,
    records: Vec<ServiceRecord>,
) -> Result<Vec<RecordType>, ErsError> {
    let mut record_types = Vec::with_capacity(records.len());
    for record in records {
        if record.record_type.is_zero() {
            return Err(ErsError::ZeroValue {
                field: "record_type",
            });
        }
        if service.position(&record.record_type).is_some() {
            return Err(ErsError::RecordTypeAlreadyExists {
                service: service_id,
                record_type: record.record_type,
            });
        }
        record_types.push(record.record_type);
        service.records.push(record);
    }
    Ok(record_types)
}

fn require_chip_owner(
    ctx: &CallContext<'_>,
    owners: &dyn ChipOwnership,
    chip: &ChipId,
) -> Result<Address, ErsError> {
    let owner = owners.owner_of(chip)?;
    if owner != ctx.caller {
        return Err(ErsError::unauthorized(Role::ChipOwner, ctx.caller));
    }
    Ok(owner)
}

/// Check the block window and the chip's signature over
/// `hash(owner, blockhash(commitBlock), payload)`.
fn verify_chip_authorization(
    ctx: &CallContext<'_>,
    chip: &ChipId,
    owner: &Address,
    payload: &ers_core::Bytes32,
    auth: &ChipAuthorization,
) -> Result<(), ErsError> {
    let current = ctx.chain.block_number();
    if auth.commit_block > current {
        return Err(ErsError::CommitBlockInFuture {
            commit_block: auth.commit_block,
            current_block: current,
        });
    }
    let window = ctx.params.max_block_window;
    if current - auth.commit_block > window {
        return Err(ErsError::SignatureExpired {
            commit_block: auth.commit_block,
            current_block: current,
            window,
        });
    }
    let block_hash = ctx.chain.block_hash(auth.commit_block);
    let message = to_signed_message_hash(&digest::service_change(owner, &block_hash, payload));
    if !ctx
        .signatures
        .is_valid_signature_now(chip, &message, &auth.signature)
    {
        return Err(ErsError::invalid_proof(ProofKind::ServiceChange));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_env::TestEnv;
    use ers_core::ErrorKind;
    use ers_crypto::KeyPair;
    use std::collections::HashMap;

    const GOV: Address = Address::new([0xee; 20]);
    const CHIPS: Address = Address::new([0xc0; 20]);
    const DEV: Address = Address::new([0xde; 20]);
    const OWNER: Address = Address::new([0x0a; 20]);

    struct Owners(HashMap<ChipId, Address>);

    impl ChipOwnership for Owners {
        fn owner_of(&self, chip: &ChipId) -> Result<Address, ErsError> {
            self.0
                .get(chip)
                .copied()
                .ok_or(ErsError::ChipNotEnrolled { chip: *chip })
        }
    }

    fn svc(name: &str) -> ServiceId {
        ServiceId::from_label(name)
    }

    fn token_uri() -> RecordType {
        RecordType::from_label("tokenUri")
    }

    struct Fixture {
        reg: ServicesRegistry,
        env: TestEnv,
        chip: KeyPair,
        owners: Owners,
    }

    impl Fixture {
        fn new() -> Self {
            let mut env = TestEnv::new(GOV);
            let mut reg = ServicesRegistry::new(Address::new([0x5e; 20]), CHIPS);
            for name in ["primary", "other", "extra"] {
                reg.create_service(
                    &mut env.ctx(DEV),
                    svc(name),
                    vec![ServiceRecord::text(token_uri(), &format!("https://{name}.test/"), true)],
                )
                .unwrap();
            }
            let chip = KeyPair::from_seed(&[0x31; 32]);
            let start = env.chain.timestamp();
            reg.set_initial_service(&mut env.ctx(CHIPS), chip.address(), svc("primary"), start + 100)
                .unwrap();
            let owners = Owners([(chip.address(), OWNER)].into_iter().collect());
            Self {
                reg,
                env,
                chip,
                owners,
            }
        }

        fn sign(&self, payload: &ers_core::Bytes32, commit_block: u64) -> ChipAuthorization {
            let block_hash = self.env.chain.block_hash(commit_block);
            let msg = digest::service_change(&OWNER, &block_hash, payload);
            ChipAuthorization {
                commit_block,
                signature: self.chip.sign_message(&msg).to_bytes(),
            }
        }

        fn add_secondary(&mut self, service: ServiceId, commit_block: u64) -> Result<(), ErsError> {
            let auth = self.sign(&digest::add_secondary_payload(&service), commit_block);
            let chip = self.chip.address();
            self.reg
                .add_secondary_service(&mut self.env.ctx(OWNER), &self.owners, chip, service, &auth)
        }
    }

    #[test]
    fn test_initial_service_rules() {
        let mut f = Fixture::new();
        let chip = f.chip.address();
        let err = f
            .reg
            .set_initial_service(&mut f.env.ctx(CHIPS), chip, svc("other"), 1)
            .unwrap_err();
        assert_eq!(err, ErsError::InitialServiceAlreadySet { chip });

        let other = Address::new([0x99; 20]);
        let err = f
            .reg
            .set_initial_service(&mut f.env.ctx(DEV), other, svc("other"), 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        let err = f
            .reg
            .set_initial_service(&mut f.env.ctx(CHIPS), other, svc("missing"), 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Referential);
        let err = f
            .reg
            .set_initial_service(&mut f.env.ctx(CHIPS), other, svc("other"), 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
    }

    #[test]
    fn test_content_appends_chip_id() {
        let f = Fixture::new();
        let chip = f.chip.address();
        let content = f.reg.primary_service_content(&chip).unwrap();
        assert_eq!(
            content[0].as_text(),
            format!("https://primary.test/{}", chip.to_hex_unprefixed())
        );
    }

    #[test]
    fn test_record_management() {
        let mut f = Fixture::new();
        let media = RecordType::from_label("media");
        f.reg
            .add_service_records(
                &mut f.env.ctx(DEV),
                svc("extra"),
                vec![ServiceRecord::text(media, "ipfs://m", false)],
            )
            .unwrap();
        let dup = f.reg.add_service_records(
            &mut f.env.ctx(DEV),
            svc("extra"),
            vec![ServiceRecord::text(media, "ipfs://n", false)],
        );
        assert!(matches!(dup, Err(ErsError::RecordTypeAlreadyExists { .. })));

        f.reg
            .edit_service_records(
                &mut f.env.ctx(DEV),
                svc("extra"),
                vec![ServiceRecord::text(media, "ipfs://edited", false)],
            )
            .unwrap();
        let service = f.reg.service(&svc("extra")).unwrap();
        assert_eq!(service.records[1].content, b"ipfs://edited".to_vec());

        f.reg
            .remove_service_records(&mut f.env.ctx(DEV), svc("extra"), vec![media])
            .unwrap();
        assert_eq!(f.reg.service(&svc("extra")).unwrap().records.len(), 1);

        let err = f
            .reg
            .remove_service_records(&mut f.env.ctx(OWNER), svc("extra"), vec![token_uri()])
            .unwrap_err();
        assert_eq!(err, ErsError::unauthorized(Role::ServiceOwner, OWNER));
    }

    #[test]
    fn test_duplicate_service_rejected() {
        let mut f = Fixture::new();
        let err = f
            .reg
            .create_service(&mut f.env.ctx(OWNER), svc("primary"), vec![])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }

    #[test]
    fn test_primary_change_waits_for_timelock() {
        let mut f = Fixture::new();
        let chip = f.chip.address();
        let new_lock = f.env.chain.timestamp() + 1_000;
        let auth = f.sign(&digest::primary_service_payload(&svc("other"), new_lock), 1);
        let err = f
            .reg
            .set_new_primary_service(&mut f.env.ctx(OWNER), &f.owners, chip, svc("other"), new_lock, &auth)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Temporal);

        // Exactly at the timelock is still locked.
        f.env.chain.advance(1, 100);
        let auth = f.sign(&digest::primary_service_payload(&svc("other"), new_lock), 2);
        let err = f
            .reg
            .set_new_primary_service(&mut f.env.ctx(OWNER), &f.owners, chip, svc("other"), new_lock, &auth)
            .unwrap_err();
        assert!(matches!(err, ErsError::TimelockNotExpired { .. }));

        f.env.chain.advance(1, 1);
        let auth = f.sign(&digest::primary_service_payload(&svc("other"), new_lock), 3);
        f.reg
            .set_new_primary_service(&mut f.env.ctx(OWNER), &f.owners, chip, svc("other"), new_lock, &auth)
            .unwrap();
        let bindings = f.reg.chip_services(&chip).unwrap();
        assert_eq!(bindings.primary, svc("other"));
        assert_eq!(bindings.timelock, new_lock);
    }

    #[test]
    fn test_primary_change_rejects_past_timelock_and_current_primary() {
        let mut f = Fixture::new();
        let chip = f.chip.address();
        f.env.chain.advance(1, 200);
        let now = f.env.chain.timestamp();

        let auth = f.sign(&digest::primary_service_payload(&svc("other"), now), 2);
        let err = f
            .reg
            .set_new_primary_service(&mut f.env.ctx(OWNER), &f.owners, chip, svc("other"), now, &auth)
            .unwrap_err();
        assert!(matches!(err, ErsError::TimelockNotInFuture { .. }));

        let auth = f.sign(&digest::primary_service_payload(&svc("primary"), now + 5), 2);
        let err = f
            .reg
            .set_new_primary_service(&mut f.env.ctx(OWNER), &f.owners, chip, svc("primary"), now + 5, &auth)
            .unwrap_err();
        assert!(matches!(err, ErsError::ServiceAlreadyPrimary { .. }));
    }

    #[test]
    fn test_primary_and_secondary_are_exclusive() {
        let mut f = Fixture::new();
        let chip = f.chip.address();
        let err = f.add_secondary(svc("primary"), 1).unwrap_err();
        assert!(matches!(err, ErsError::ServiceAlreadyPrimary { .. }));

        f.add_secondary(svc("other"), 1).unwrap();
        let err = f.add_secondary(svc("other"), 1).unwrap_err();
        assert!(matches!(err, ErsError::ServiceAlreadyEnrolled { .. }));

        f.env.chain.advance(1, 200);
        let lock = f.env.chain.timestamp() + 10;
        let auth = f.sign(&digest::primary_service_payload(&svc("other"), lock), 2);
        let err = f
            .reg
            .set_new_primary_service(&mut f.env.ctx(OWNER), &f.owners, chip, svc("other"), lock, &auth)
            .unwrap_err();
        assert!(matches!(err, ErsError::ServiceAlreadyEnrolled { .. }));
        assert!(f.reg.is_chip_service_enrolled(&chip, &svc("other")));
        assert!(f.reg.is_chip_service_enrolled(&chip, &svc("primary")));
        assert!(!f.reg.is_chip_service_enrolled(&chip, &svc("extra")));
    }

    #[test]
    fn test_remove_secondary() {
        let mut f = Fixture::new();
        let chip = f.chip.address();
        f.add_secondary(svc("other"), 1).unwrap();
        f.add_secondary(svc("extra"), 1).unwrap();

        let auth = f.sign(&digest::remove_secondary_payload(&svc("other")), 1);
        f.reg
            .remove_secondary_service(&mut f.env.ctx(OWNER), &f.owners, chip, svc("other"), &auth)
            .unwrap();
        let bindings = f.reg.chip_services(&chip).unwrap();
        assert_eq!(bindings.secondary.as_slice(), &[svc("extra")]);

        let err = f
            .reg
            .remove_secondary_service(&mut f.env.ctx(OWNER), &f.owners, chip, svc("other"), &auth)
            .unwrap_err();
        assert!(matches!(err, ErsError::ServiceNotEnrolled { .. }));
    }

    #[test]
    fn test_add_signature_cannot_remove() {
        let mut f = Fixture::new();
        let chip = f.chip.address();
        f.add_secondary(svc("other"), 1).unwrap();
        let add_auth = f.sign(&digest::add_secondary_payload(&svc("other")), 1);
        let err = f
            .reg
            .remove_secondary_service(&mut f.env.ctx(OWNER), &f.owners, chip, svc("other"), &add_auth)
            .unwrap_err();
        assert_eq!(err, ErsError::invalid_proof(ProofKind::ServiceChange));
    }

    #[test]
    fn test_signature_window_boundary() {
        let mut f = Fixture::new();
        let window = f.env.params.max_block_window;
        // Sign at block 1, then move exactly `window` blocks ahead.
        let auth = f.sign(&digest::add_secondary_payload(&svc("other")), 1);
        f.env.chain.advance(window, 0);
        let chip = f.chip.address();
        f.reg
            .add_secondary_service(&mut f.env.ctx(OWNER), &f.owners, chip, svc("other"), &auth)
            .unwrap();

        // One block further is too late.
        let auth = f.sign(&digest::add_secondary_payload(&svc("extra")), 1);
        f.env.chain.advance(1, 0);
        let err = f
            .reg
            .add_secondary_service(&mut f.env.ctx(OWNER), &f.owners, chip, svc("extra"), &auth)
            .unwrap_err();
        assert!(matches!(err, ErsError::SignatureExpired { .. }));
    }

    #[test]
    fn test_future_commit_block_rejected() {
        let mut f = Fixture::new();
        let current = f.env.chain.block_number();
        let err = f.add_secondary(svc("other"), current + 1).unwrap_err();
        assert_eq!(
            err,
            ErsError::CommitBlockInFuture {
                commit_block: current + 1,
                current_block: current
            }
        );
    }

    #[test]
    fn test_only_chip_owner_changes_bindings() {
        let mut f = Fixture::new();
        let chip = f.chip.address();
        let auth = f.sign(&digest::add_secondary_payload(&svc("other")), 1);
        let err = f
            .reg
            .add_secondary_service(&mut f.env.ctx(DEV), &f.owners, chip, svc("other"), &auth)
            .unwrap_err();
        assert_eq!(err, ErsError::unauthorized(Role::ChipOwner, DEV));

        let unknown = Address::new([0x77; 20]);
        let err = f
            .reg
            .add_secondary_service(&mut f.env.ctx(OWNER), &f.owners, unknown, svc("other"), &auth)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Referential);
    }

    #[test]
    fn test_transfer_service_owner() {
        let mut f = Fixture::new();
        f.reg
            .transfer_service_owner(&mut f.env.ctx(DEV), svc("extra"), OWNER)
            .unwrap();
        assert_eq!(f.reg.service(&svc("extra")).unwrap().owner, OWNER);
        assert!(f
            .reg
            .transfer_service_owner(&mut f.env.ctx(DEV), svc("extra"), DEV)
            .is_err());
    }
}
