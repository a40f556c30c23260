//! # ers-cli — Command-line Tooling for the ERS Registry
//!
//! Provides the `ers` binary. Everything a manufacturer line, a project
//! operator or a chip holder has to compute off-ledger lives here, built on
//! the same digest functions the registries verify against.
//!
//! ## Subcommands
//!
//! - `ers keys`: generate keys, show addresses.
//! - `ers sign`: custody, ownership, certificate and service-change
//!   signatures.
//! - `ers merkle`: manufacturer and project claim trees with proofs.
//! - `ers predict`: deterministic registrar addresses.
//! - `ers demo`: bootstrap a deployment from YAML config and run a full
//!   claim flow against it.
//!
//! ```bash
//! ers keys generate --prefix chip
//! ers sign custody --key chip.key --owner 0x… --chain-id 1
//! ers merkle manufacturer chips.json --output tree.json
//! ```

pub mod demo;
pub mod keys;
pub mod merkle;
pub mod predict;
pub mod sign;

use std::path::Path;

use anyhow::{bail, Context, Result};
use ers_crypto::KeyPair;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Read a key file holding a hex-encoded 32-byte seed.
pub fn load_key(path: &Path) -> Result<KeyPair> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key file: {}", path.display()))?;
    let bytes = ers_core::hex::decode(&text).context("invalid key hex")?;
    let Ok(seed) = <[u8; 32]>::try_from(bytes.as_slice()) else {
        bail!(
            "key seed must be 32 bytes (64 hex chars), got {} bytes",
            bytes.len()
        );
    };
    Ok(KeyPair::from_seed(&seed))
}

/// Parse a JSON input file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Write `value` as pretty JSON to `output`, or to stdout when absent.
pub fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    match output {
        Some(path) => std::fs::write(path, format!("{text}\n"))
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_key_round_trips_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k.key");
        std::fs::write(&path, format!("{}\n", "11".repeat(32))).unwrap();
        let key = load_key(&path).unwrap();
        assert_eq!(key.address(), KeyPair::from_seed(&[0x11; 32]).address());
    }

    #[test]
    fn test_load_key_rejects_short_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k.key");
        std::fs::write(&path, "abcd").unwrap();
        let err = load_key(&path).unwrap_err();
        assert!(format!("{err:#}").contains("32 bytes"));
    }

    #[test]
    fn test_write_and_read_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v.json");
        write_json(&vec![1u8, 2, 3], Some(&path)).unwrap();
        let back: Vec<u8> = read_json(&path).unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }
}
