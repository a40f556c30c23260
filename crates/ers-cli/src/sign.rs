//! # Sign Subcommand
//!
//! Produces the account signatures the registries verify. Each signature is
//! over `to_signed_message_hash(digest)` for the matching digest in
//! `ers_registry::digest`, and printed as the 96-byte `publicKey || sig`
//! hex string the registries accept.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Subcommand, ValueEnum};
use ers_core::{Address, Bytes32, ServiceId};
use ers_registry::digest;

/// Arguments for `ers sign`.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Signing key file.
    #[arg(long, short, global = true)]
    pub key: Option<PathBuf>,

    #[command(subcommand)]
    pub command: SignCommand,
}

/// What to sign.
#[derive(Subcommand, Debug)]
pub enum SignCommand {
    /// Chip custody proof for a claimant (signed by the chip).
    Custody {
        /// Account that will own the chip.
        #[arg(long)]
        owner: Address,
        /// Ledger chain id.
        #[arg(long)]
        chain_id: u64,
    },
    /// Project ownership proof (signed by the project key).
    Ownership {
        /// Deployed project registrar.
        #[arg(long)]
        registrar: Address,
        /// Ledger chain id.
        #[arg(long)]
        chain_id: u64,
    },
    /// Certificate for a single chip (manufacturer signer or project key).
    Certificate {
        /// Chip id.
        #[arg(long)]
        chip: Address,
    },
    /// Service binding change (signed by the chip).
    ServiceChange {
        /// Current chip owner submitting the change.
        #[arg(long)]
        owner: Address,
        /// Hash of the commit block.
        #[arg(long)]
        block_hash: Bytes32,
        /// Change being authorised.
        #[arg(long, value_enum)]
        action: ServiceAction,
        /// Service label or 0x-prefixed service id.
        #[arg(long)]
        service: String,
        /// New timelock, required for `primary`.
        #[arg(long)]
        timelock: Option<u64>,
    },
}

/// Service binding change kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceAction {
    /// Replace the primary service.
    Primary,
    /// Add a secondary service.
    AddSecondary,
    /// Remove a secondary service.
    RemoveSecondary,
}

/// Execute `ers sign`.
pub fn run_sign(args: &SignArgs) -> Result<u8> {
    let Some(key_path) = &args.key else {
        bail!("--key is required");
    };
    let key = crate::load_key(key_path)?;
    let digest = digest_for(&args.command)?;
    let signature = key.sign_message(&digest);
    tracing::debug!(signer = %key.address(), digest = %digest, "signed");
    println!("{}", ers_core::hex::encode_prefixed(&signature.to_bytes()));
    Ok(0)
}

/// The unwrapped digest a subcommand signs.
pub fn digest_for(command: &SignCommand) -> Result<Bytes32> {
    Ok(match command {
        SignCommand::Custody { owner, chain_id } => digest::chip_custody(*chain_id, owner),
        SignCommand::Ownership {
            registrar,
            chain_id,
        } => digest::project_ownership(*chain_id, registrar),
        SignCommand::Certificate { chip } => digest::chip_certificate(chip),
        SignCommand::ServiceChange {
            owner,
            block_hash,
            action,
            service,
            timelock,
        } => {
            let service = parse_service(service)?;
            let payload = match (action, timelock) {
                (ServiceAction::Primary, Some(timelock)) => {
                    digest::primary_service_payload(&service, *timelock)
                }
                (ServiceAction::Primary, None) => bail!("--timelock is required for primary"),
                (ServiceAction::AddSecondary, _) => digest::add_secondary_payload(&service),
                (ServiceAction::RemoveSecondary, _) => digest::remove_secondary_payload(&service),
            };
            digest::service_change(owner, block_hash, &payload)
        }
    })
}

/// A service given either as its label or as a 0x-prefixed id.
pub fn parse_service(value: &str) -> Result<ServiceId> {
    if value.starts_with("0x") {
        return Ok(ServiceId(Bytes32::from_hex(value)?));
    }
    if value.is_empty() {
        bail!("service must not be empty");
    }
    Ok(ServiceId::from_label(value))
}
