//! # SHA-256 Hashing and Namehash
//!
//! The single hash function of the registry and the namespace node
//! derivation built on it.
//!
//! ## Namespace Nodes
//!
//! A node is `sha256(parentNode || sha256(label))`. The root's parent is the
//! zero node, so `namehash("chip.project.dev.ers")` folds labels right to
//! left starting from zero. Two identical labels under different parents
//! produce unrelated nodes; the same label under the same parent always
//! produces the same node, which is what makes "subnode already exists"
//! detectable.

use sha2::{Digest, Sha256};

use crate::identity::Node;
use crate::primitives::Bytes32;

/// SHA-256 of raw bytes.
pub fn sha256(data: &[u8]) -> Bytes32 {
    let hash = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    Bytes32(out)
}

/// Hash a namespace label.
pub fn label_hash(label: &[u8]) -> Bytes32 {
    sha256(label)
}

/// Derive the node for `label_hash` under `parent`.
pub fn subnode(parent: &Node, label_hash: &Bytes32) -> Node {
    let mut input = [0u8; 64];
    input[..32].copy_from_slice(parent.0.as_bytes());
    input[32..].copy_from_slice(label_hash.as_bytes());
    Node(sha256(&input))
}

/// Derive the node of a dotted name, e.g. `"project.dev.ers"`.
///
/// The empty name maps to the zero node.
pub fn namehash(name: &str) -> Node {
    if name.is_empty() {
        return Node::ZERO;
    }
    name.rsplit('.').fold(Node::ZERO, |parent, label| {
        subnode(&parent, &label_hash(label.as_bytes()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            sha256(b"").to_hex_unprefixed(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_namehash_empty_is_zero() {
        assert_eq!(namehash(""), Node::ZERO);
    }

    #[test]
    fn test_namehash_folds_right_to_left() {
        let root = subnode(&Node::ZERO, &label_hash(b"ers"));
        let dev = subnode(&root, &label_hash(b"acme"));
        assert_eq!(namehash("ers"), root);
        assert_eq!(namehash("acme.ers"), dev);
    }

    #[test]
    fn test_same_label_different_parents() {
        let a = subnode(&namehash("a.ers"), &label_hash(b"x"));
        let b = subnode(&namehash("b.ers"), &label_hash(b"x"));
        assert_ne!(a, b);
    }
}
