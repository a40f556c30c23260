//! # Keys Subcommand
//!
//! Generates Ed25519 account keys and shows the address a key controls.
//! Chips, project keys and owners all use the same key format: a file
//! holding the hex-encoded 32-byte seed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use ers_crypto::KeyPair;
use rand::RngCore;
use serde::Serialize;

/// Arguments for `ers keys`.
#[derive(Args, Debug)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub command: KeysCommand,
}

/// Key subcommands.
#[derive(Subcommand, Debug)]
pub enum KeysCommand {
    /// Generate a new key and write `<prefix>.key`.
    Generate {
        /// Output directory.
        #[arg(long, short, default_value = ".")]
        output: PathBuf,
        /// Key filename prefix.
        #[arg(long, default_value = "ers")]
        prefix: String,
    },
    /// Show the public key and address of a key file.
    Show {
        /// Key file.
        #[arg(value_name = "KEY")]
        key: PathBuf,
    },
}

/// Public identity of a key.
#[derive(Debug, Serialize)]
pub struct KeyInfo {
    /// Hex public key.
    pub public_key: String,
    /// Account address.
    pub address: String,
}

impl KeyInfo {
    fn of(key: &KeyPair) -> Self {
        Self {
            public_key: key.public_key().to_hex(),
            address: key.address().to_hex(),
        }
    }
}

/// Execute `ers keys`.
pub fn run_keys(args: &KeysArgs) -> Result<u8> {
    match &args.command {
        KeysCommand::Generate { output, prefix } => {
            let (path, info) = generate(output, prefix)?;
            println!("OK: generated key {}", path.display());
            println!("  Address:    {}", info.address);
            println!("  Public key: {}", info.public_key);
            Ok(0)
        }
        KeysCommand::Show { key } => {
            let info = KeyInfo::of(&crate::load_key(key)?);
            crate::write_json(&info, None)?;
            Ok(0)
        }
    }
}

/// Write a fresh key to `<dir>/<prefix>.key`.
pub fn generate(dir: &Path, prefix: &str) -> Result<(PathBuf, KeyInfo)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory: {}", dir.display()))?;
    let mut seed = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut seed);
    let key = KeyPair::from_seed(&seed);

    let path = dir.join(format!("{prefix}.key"));
    std::fs::write(&path, ers_core::hex::encode(&seed))
        .with_context(|| format!("failed to write key: {}", path.display()))?;
    tracing::info!(path = %path.display(), address = %key.address(), "key generated");
    Ok((path, KeyInfo::of(&key)))
}
