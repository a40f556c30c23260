//! # Ledger Clock
//!
//! Defines [`Chain`], the externally supplied monotonic clock every
//! time-gated check reads: chain id, block number, block timestamp and
//! block hashes.
//!
//! ## Invariants
//!
//! - Block number and timestamp only move forward ([`Chain::advance`] takes
//!   unsigned deltas).
//! - Registries read `timestamp()` / `block_number()` at the point of each
//!   check and never cache them across calls.
//! - Wall-clock time is never consulted. Tests drive time explicitly.
//!
//! Block hashes are a deterministic function of `(chainId, number)` so that
//! a signer can commit to a recent block and a verifier can recompute the
//! same value. Hashes of blocks that have not been produced yet are zero.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::abi::Encoder;
use crate::primitives::Bytes32;

/// The ledger's view of time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    chain_id: u64,
    number: u64,
    timestamp: u64,
}

impl Chain {
    /// Start a chain at block 1 with the given genesis timestamp.
    pub fn new(chain_id: u64, genesis_timestamp: u64) -> Self {
        Self {
            chain_id,
            number: 1,
            timestamp: genesis_timestamp,
        }
    }

    /// The chain id bound into every possession and ownership proof.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// The current block number.
    pub fn block_number(&self) -> u64 {
        self.number
    }

    /// The current block timestamp (Unix seconds).
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Produce `blocks` new blocks spanning `seconds` of ledger time.
    pub fn advance(&mut self, blocks: u64, seconds: u64) {
        self.number = self.number.saturating_add(blocks);
        self.timestamp = self.timestamp.saturating_add(seconds);
        tracing::trace!(
            block = self.number,
            timestamp = self.timestamp,
            "ledger advanced"
        );
    }

    /// The hash of block `number`, or zero if it is in the future.
    pub fn block_hash(&self, number: u64) -> Bytes32 {
        if number > self.number {
            return Bytes32::ZERO;
        }
        Encoder::words()
            .bytes(b"ers.block")
            .uint(self.chain_id)
            .uint(number)
            .hash()
    }
}

/// Render a ledger timestamp as ISO 8601 with a `Z` suffix, e.g.
/// `2026-01-15T12:00:00Z`. Returns `None` if the value is out of range.
pub fn timestamp_to_iso8601(secs: u64) -> Option<String> {
    let secs = i64::try_from(secs).ok()?;
    let dt = DateTime::from_timestamp(secs, 0)?;
    Some(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}
