//! # Sorted-Pair Merkle Trees
//!
//! Binary merkle trees whose interior nodes hash the two children in
//! ascending byte order: `node = sha256(min(a, b) || max(a, b))`. Because
//! the pair is sorted, a proof is just the list of sibling hashes; the
//! verifier needs no left/right flags and no leaf index.
//!
//! ## Construction
//!
//! Leaves are supplied already hashed. Each level pairs adjacent nodes left
//! to right; an unpaired last node is promoted to the next level unchanged
//! and contributes no sibling to proofs passing through it.
//!
//! ## Uses
//!
//! - Manufacturer enrollments: leaf `sha256(words(index, chipId))`.
//! - Project claim trees: leaf `sha256(words(index, chipId, enrollmentId,
//!   lockinPeriod, serviceId, tokenUri))`.

use ers_core::Bytes32;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// Hash two sibling nodes in sorted order.
pub fn hash_pair(a: &Bytes32, b: &Bytes32) -> Bytes32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Sha256::new();
    hasher.update(lo.as_bytes());
    hasher.update(hi.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Bytes32(out)
}

/// Fold `proof` over `leaf` and compare against `root`.
pub fn verify(proof: &[Bytes32], root: &Bytes32, leaf: &Bytes32) -> bool {
    let computed = proof.iter().fold(*leaf, |acc, sibling| hash_pair(&acc, sibling));
    computed == *root
}

/// A fully materialised merkle tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    layers: Vec<Vec<Bytes32>>,
}

impl MerkleTree {
    /// Build a tree over already-hashed leaves.
    pub fn new(leaves: Vec<Bytes32>) -> Self {
        let mut layers = vec![leaves];
        while layers.last().map_or(0, Vec::len) > 1 {
            let prev = &layers[layers.len() - 1];
            let next: Vec<Bytes32> = prev
                .chunks(2)
                .map(|pair| {
                    if pair.len() == 2 {
                        hash_pair(&pair[0], &pair[1])
                    } else {
                        pair[0]
                    }
                })
                .collect();
            layers.push(next);
        }
        Self { layers }
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.layers[0].len()
    }

    /// Whether the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    /// The leaf at `index`.
    pub fn leaf(&self, index: usize) -> Option<&Bytes32> {
        self.layers[0].get(index)
    }

    /// The root hash. An empty tree has the zero root.
    pub fn root(&self) -> Bytes32 {
        self.layers
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or(Bytes32::ZERO)
    }

    /// Sibling path for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Result<Vec<Bytes32>, CryptoError> {
        if index >= self.len() {
            return Err(CryptoError::LeafOutOfRange {
                index,
                len: self.len(),
            });
        }
        let mut proof = Vec::new();
        let mut i = index;
        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling = i ^ 1;
            if let Some(node) = layer.get(sibling) {
                proof.push(*node);
            }
            i /= 2;
        }
        Ok(proof)
    }
}
