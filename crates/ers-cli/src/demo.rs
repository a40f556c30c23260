//! # Demo Subcommand
//!
//! Bootstraps a deployment from a YAML config and runs one complete
//! lifecycle against it with deterministic keys: manufacturer enrollment,
//! developer registrar creation, service creation, project deployment and
//! enrollment, holder claims, a secondary service binding and resolution.
//! Prints a JSON report with the event log.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use ers_core::{label_hash, timestamp_to_iso8601, Address, ChipId, ManufacturerId, Node, RecordType, ServiceId};
use ers_crypto::KeyPair;
use ers_registry::event::EventRecord;
use ers_registry::{
    digest, AddProject, ChipAuthorization, CustodyProof, EnrollmentAuth, EnrollmentMetadata, Ers,
    ManufacturerProof, ManufacturerValidation, MerkleChipClaim, NewEnrollment, ProjectKind,
    ProtocolConfig, RecordContent, ServiceRecord,
};
use serde::Serialize;

use crate::merkle::{manufacturer_tree, project_tree, ProjectChipInput, ProjectInput};

/// Largest chip batch a demo run enrolls. Chip keys use seeds `1..=64` and
/// holder keys `0x80..`, clear of the role seeds at `0x60..=0x7f`.
pub const MAX_DEMO_CHIPS: u8 = 64;

/// Arguments for `ers demo`.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Protocol config (defaults plus `ERS_*` overrides when absent).
    #[arg(long, short)]
    pub config: Option<PathBuf>,
    /// Number of chips to enroll and claim.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=i64::from(MAX_DEMO_CHIPS)))]
    pub chips: u8,
    /// Report file (stdout when absent).
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// A claimed chip in the report.
#[derive(Debug, Serialize)]
pub struct ChipReport {
    /// Chip id.
    pub chip: ChipId,
    /// Owner after the claim.
    pub owner: Address,
    /// The chip's namespace node.
    pub node: Node,
    /// Primary service content.
    pub content: Vec<RecordContent>,
}

/// Outcome of a demo run.
#[derive(Debug, Serialize)]
pub struct DemoReport {
    /// Chain id used for every proof.
    pub chain_id: u64,
    /// Ledger time at the end of the run, ISO 8601.
    pub ledger_time: String,
    /// Namespace root.
    pub root_node: Option<Node>,
    /// The developer's registrar.
    pub developer_registrar: Address,
    /// The merkle-claim project registrar.
    pub project_registrar: Address,
    /// Claimed chips.
    pub chips: Vec<ChipReport>,
    /// Every event in emission order.
    pub events: Vec<EventRecord>,
}

/// Execute `ers demo`.
pub fn run_demo(args: &DemoArgs) -> Result<u8> {
    let config = match &args.config {
        Some(path) => ProtocolConfig::load(path)?,
        None => ProtocolConfig::from_env()?,
    };
    let report = run_lifecycle(config, args.chips)?;
    tracing::info!(
        chips = report.chips.len(),
        events = report.events.len(),
        "demo lifecycle complete"
    );
    crate::write_json(&report, args.output.as_deref())?;
    Ok(0)
}

fn key(seed: u8) -> KeyPair {
    KeyPair::from_seed(&[seed; 32])
}

/// Run the full lifecycle with `chip_count` chips.
pub fn run_lifecycle(config: ProtocolConfig, chip_count: u8) -> Result<DemoReport> {
    if chip_count == 0 || chip_count > MAX_DEMO_CHIPS {
        bail!("chip count must be between 1 and {MAX_DEMO_CHIPS}, got {chip_count}");
    }
    let gov = key(0x60).address();
    let maker = key(0x61).address();
    let developer = key(0x62).address();
    let project_owner = key(0x63).address();
    let service_owner = key(0x64).address();
    let project_key = key(0x70);
    let factory = Address::from_word(&label_hash(b"ers.demo.factory"));
    let manufacturer = ManufacturerId::from_label("acme-silicon");
    let primary = ServiceId::from_label("acme-nft");
    let secondary = ServiceId::from_label("acme-redirect");

    let mut ers = Ers::bootstrap(config, gov).context("bootstrap")?;
    let chain_id = ers.chain().chain_id();

    // Manufacturer batch.
    let chips: Vec<KeyPair> = (1..=chip_count).map(key).collect();
    let ids: Vec<ChipId> = chips.iter().map(KeyPair::address).collect();
    let mtree = manufacturer_tree(&ids)?;
    ers.register_manufacturer(gov, manufacturer, maker)?;
    let enrollment = ers.add_enrollment(
        maker,
        manufacturer,
        NewEnrollment {
            auth: EnrollmentAuth::MerkleVerified { root: mtree.root },
            cert_signer: key(0x65).address(),
            auth_model: Address::from_word(&label_hash(b"ers.demo.auth-model")),
            metadata: EnrollmentMetadata {
                validation_uri: "https://validate.acme.example/".into(),
                bootloader_uri: "https://boot.acme.example/".into(),
                chip_model: "HaLo-v2".into(),
            },
        },
    )?;

    // Developer and services.
    ers.add_registrar_factory(gov, factory)?;
    ers.add_allowed_developer(gov, developer, "acme")?;
    let dev_registrar = ers.create_developer_registrar(developer, factory)?;
    ers.create_service(
        service_owner,
        primary,
        vec![ServiceRecord::text(
            RecordType::from_label("tokenUri"),
            "https://nft.acme.example/chip/",
            true,
        )],
    )?;
    ers.create_service(
        service_owner,
        secondary,
        vec![ServiceRecord::text(
            RecordType::from_label("redirectUrl"),
            "https://acme.example",
            false,
        )],
    )?;

    // Project.
    let lockin = ers.chain().timestamp() + 30 * 24 * 60 * 60;
    let claims = project_tree(&ProjectInput {
        enrollment_id: enrollment,
        chips: ids
            .iter()
            .map(|chip| ProjectChipInput {
                chip: *chip,
                service: primary.as_word().to_hex(),
                lockin_period: lockin,
                token_uri: format!("https://meta.acme.example/{}", chip.to_hex_unprefixed()),
            })
            .collect(),
    })?;
    let project = ers.deploy_project_registrar(
        project_owner,
        dev_registrar,
        ProjectKind::MerkleClaim,
        label_hash(b"tap"),
    )?;
    ers.add_project(
        developer,
        dev_registrar,
        project,
        AddProject {
            label: "tap".into(),
            public_key: project_key.address(),
            service_id: primary,
            lockin_period: lockin,
            merkle_root: claims.root,
            ownership_proof: project_key
                .sign_message(&digest::project_ownership(chain_id, &project))
                .to_bytes(),
        },
    )?;

    // Holders claim, each with its own account.
    let mut claimed = Vec::with_capacity(chips.len());
    for (i, chip) in chips.iter().enumerate() {
        let owner = key(0x80 + i as u8).address();
        let claim = MerkleChipClaim {
            chip: ids[i],
            owner,
            claim: claims.claims[i].claim.clone(),
            validation: ManufacturerValidation {
                enrollment_id: enrollment,
                proof: ManufacturerProof::Merkle {
                    index: mtree.chips[i].index,
                    proof: mtree.chips[i].proof.clone(),
                },
            },
            custody: CustodyProof(
                chip.sign_message(&digest::chip_custody(chain_id, &owner))
                    .to_bytes(),
            ),
        };
        let node = ers.claim_chip(owner, project, &claim)?;
        claimed.push((owner, node));
    }

    // First holder binds the secondary service.
    ers.advance(1, 12);
    let (first_owner, _) = claimed[0];
    let commit_block = ers.chain().block_number();
    let block_hash = ers.chain().block_hash(commit_block);
    let auth = ChipAuthorization {
        commit_block,
        signature: chips[0]
            .sign_message(&digest::service_change(
                &first_owner,
                &block_hash,
                &digest::add_secondary_payload(&secondary),
            ))
            .to_bytes(),
    };
    ers.add_secondary_service(first_owner, ids[0], secondary, &auth)?;

    let chips = ids
        .iter()
        .zip(claimed)
        .map(|(chip, (owner, node))| {
            Ok(ChipReport {
                chip: *chip,
                owner,
                node,
                content: ers.resolve_chip_id(chip)?,
            })
        })
        .collect::<Result<_>>()?;

    let ledger_time =
        timestamp_to_iso8601(ers.chain().timestamp()).context("ledger timestamp out of range")?;
    Ok(DemoReport {
        chain_id,
        ledger_time,
        root_node: ers.root_node(),
        developer_registrar: dev_registrar,
        project_registrar: project,
        chips,
        events: ers.events().records().to_vec(),
    })
}
