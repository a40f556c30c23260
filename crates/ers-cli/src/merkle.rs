//! # Merkle Subcommand
//!
//! Builds the two claim trees of the protocol from JSON input:
//!
//! - **manufacturer**: a JSON array of chip ids. Leaves are
//!   `hash(index, chipId)`; the root goes into a merkle-verified enrollment
//!   and each chip's `(index, proof)` into its `ManufacturerValidation`.
//! - **project**: an enrollment id and per-chip claim parameters. Leaves are
//!   `ProjectClaim::leaf`; the root goes into `AddProject::merkle_root` and
//!   each `ProjectClaim` is served to the chip's claimant.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use ers_core::{Bytes32, ChipId, EnrollmentId};
use ers_crypto::MerkleTree;
use ers_registry::{digest, ProjectClaim};
use serde::{Deserialize, Serialize};

/// Arguments for `ers merkle`.
#[derive(Args, Debug)]
pub struct MerkleArgs {
    #[command(subcommand)]
    pub command: MerkleCommand,
}

/// Tree kinds.
#[derive(Subcommand, Debug)]
pub enum MerkleCommand {
    /// Manufacturer enrollment tree.
    Manufacturer {
        /// JSON array of chip ids.
        #[arg(value_name = "CHIPS")]
        input: PathBuf,
        /// Output file (stdout when absent).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Project claim tree.
    Project {
        /// JSON project claim input.
        #[arg(value_name = "CLAIMS")]
        input: PathBuf,
        /// Output file (stdout when absent).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

/// A chip's position in a manufacturer tree.
#[derive(Debug, Serialize, Deserialize)]
pub struct ManufacturerLeaf {
    /// Chip id.
    pub chip: ChipId,
    /// Leaf index.
    pub index: u64,
    /// Sibling path.
    pub proof: Vec<Bytes32>,
}

/// A manufacturer tree with every chip's proof.
#[derive(Debug, Serialize, Deserialize)]
pub struct ManufacturerTree {
    /// Enrollment root.
    pub root: Bytes32,
    /// One entry per input chip, in input order.
    pub chips: Vec<ManufacturerLeaf>,
}

/// Input of `ers merkle project`.
#[derive(Debug, Deserialize)]
pub struct ProjectInput {
    /// Manufacturer enrollment the chips belong to.
    pub enrollment_id: EnrollmentId,
    /// Per-chip claim parameters, in leaf order.
    pub chips: Vec<ProjectChipInput>,
}

/// Claim parameters for one chip.
#[derive(Debug, Deserialize)]
pub struct ProjectChipInput {
    /// Chip id.
    pub chip: ChipId,
    /// Service label or 0x-prefixed service id.
    pub service: String,
    /// Lock-in timestamp.
    pub lockin_period: u64,
    /// Token metadata URI.
    pub token_uri: String,
}

/// A chip's claim with its inclusion proof.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectLeaf {
    /// Chip id.
    pub chip: ChipId,
    /// Claim to submit with `claimChip`.
    pub claim: ProjectClaim,
}

/// A project claim tree with every chip's claim.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectTree {
    /// Claim tree root.
    pub root: Bytes32,
    /// One entry per input chip, in input order.
    pub claims: Vec<ProjectLeaf>,
}

/// Execute `ers merkle`.
pub fn run_merkle(args: &MerkleArgs) -> Result<u8> {
    match &args.command {
        MerkleCommand::Manufacturer { input, output } => {
            let chips: Vec<ChipId> = crate::read_json(input)?;
            let tree = manufacturer_tree(&chips)?;
            tracing::info!(root = %tree.root, chips = tree.chips.len(), "manufacturer tree built");
            crate::write_json(&tree, output.as_deref())?;
        }
        MerkleCommand::Project { input, output } => {
            let input: ProjectInput = crate::read_json(input)?;
            let tree = project_tree(&input)?;
            tracing::info!(root = %tree.root, chips = tree.claims.len(), "project claim tree built");
            crate::write_json(&tree, output.as_deref())?;
        }
    }
    Ok(0)
}

/// Build a manufacturer enrollment tree over `chips`.
pub fn manufacturer_tree(chips: &[ChipId]) -> Result<ManufacturerTree> {
    if chips.is_empty() {
        bail!("no chips given");
    }
    let tree = MerkleTree::new(
        chips
            .iter()
            .enumerate()
            .map(|(i, chip)| digest::manufacturer_leaf(i as u64, chip))
            .collect(),
    );
    let leaves = chips
        .iter()
        .enumerate()
        .map(|(i, chip)| {
            Ok(ManufacturerLeaf {
                chip: *chip,
                index: i as u64,
                proof: tree.proof(i).context("manufacturer proof")?,
            })
        })
        .collect::<Result<_>>()?;
    Ok(ManufacturerTree {
        root: tree.root(),
        chips: leaves,
    })
}

/// Build a project claim tree.
pub fn project_tree(input: &ProjectInput) -> Result<ProjectTree> {
    if input.chips.is_empty() {
        bail!("no chips given");
    }
    let mut claims = input
        .chips
        .iter()
        .enumerate()
        .map(|(i, c)| {
            Ok(ProjectLeaf {
                chip: c.chip,
                claim: ProjectClaim {
                    index: i as u64,
                    service_id: crate::sign::parse_service(&c.service)
                        .with_context(|| format!("chip {}", c.chip))?,
                    lockin_period: c.lockin_period,
                    token_uri: c.token_uri.clone(),
                    proof: Vec::new(),
                },
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let tree = MerkleTree::new(
        claims
            .iter()
            .map(|l| l.claim.leaf(&l.chip, &input.enrollment_id))
            .collect(),
    );
    for (i, leaf) in claims.iter_mut().enumerate() {
        leaf.claim.proof = tree.proof(i).context("claim proof")?;
    }
    Ok(ProjectTree {
        root: tree.root(),
        claims,
    })
}
