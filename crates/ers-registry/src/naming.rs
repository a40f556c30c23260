//! # Naming Registry
//!
//! Hierarchical namespace `root → developer → project → chip`. Each node
//! has an owner and a resolver.
//!
//! ## Invariants
//!
//! - A node id is `hash(parentNode, hash(label))`; the tree is strictly
//!   top-down and nodes are never re-parented.
//! - A node whose owner is non-zero can never be overwritten. Deleting a
//!   node zeroes both owner and resolver, after which the label may be
//!   reused.
//! - Only the parent's owner creates or deletes subnodes. Chip nodes are the
//!   exception: the Chip Registry creates them under project nodes it does
//!   not own.
//! - Only a node's resolver may change its owner.

use std::collections::BTreeMap;

use ers_core::identity::chip_label;
use ers_core::{label_hash, subnode, Address, Bytes32, ChipId, ErsError, Node, Role};
use serde::{Deserialize, Serialize};

use crate::context::CallContext;
use crate::event::ProtocolEvent;

/// Owner and resolver of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Controls subnode creation and deletion.
    pub owner: Address,
    /// Allowed to replace the owner.
    pub resolver: Address,
}

/// The namespace tree.
#[derive(Debug, Clone)]
pub struct NamingRegistry {
    address: Address,
    chip_registry: Address,
    records: BTreeMap<Node, NodeRecord>,
}

impl NamingRegistry {
    /// A registry at `address` that lets `chip_registry` create chip nodes.
    pub fn new(address: Address, chip_registry: Address) -> Self {
        Self {
            address,
            chip_registry,
            records: BTreeMap::new(),
        }
    }

    /// This registry's address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Create a top-level node. Governance only; each root label once.
    pub fn create_root_node(
        &mut self,
        ctx: &mut CallContext<'_>,
        label: &str,
        owner: Address,
        resolver: Address,
    ) -> Result<Node, ErsError> {
        ctx.params.require_governance(&ctx.caller)?;
        self.insert(ctx, Node::ROOT_PARENT, &label_hash(label.as_bytes()), owner, resolver)
    }

    /// Create `label` under `parent`. Parent owner only.
    pub fn create_subnode_record(
        &mut self,
        ctx: &mut CallContext<'_>,
        parent: &Node,
        label: &[u8],
        owner: Address,
        resolver: Address,
    ) -> Result<Node, ErsError> {
        self.require_parent_owner(ctx, parent)?;
        self.insert(ctx, *parent, &label_hash(label), owner, resolver)
    }

    /// Create the node of `chip` under a project node. Chip Registry only.
    pub fn create_chip_subnode_record(
        &mut self,
        ctx: &mut CallContext<'_>,
        parent: &Node,
        chip: &ChipId,
        owner: Address,
        resolver: Address,
    ) -> Result<Node, ErsError> {
        if ctx.caller != self.chip_registry {
            return Err(ErsError::unauthorized(Role::ChipRegistry, ctx.caller));
        }
        self.insert(ctx, *parent, &label_hash(&chip_label(chip)), owner, resolver)
    }

    /// Replace the owner of `node`. Resolver only.
    pub fn set_node_owner(
        &mut self,
        ctx: &mut CallContext<'_>,
        node: &Node,
        new_owner: Address,
    ) -> Result<(), ErsError> {
        let record = self
            .records
            .get_mut(node)
            .ok_or(ErsError::NodeNotFound { node: *node })?;
        if ctx.caller != record.resolver {
            return Err(ErsError::unauthorized(Role::NodeResolver, ctx.caller));
        }
        record.owner = new_owner;
        ctx.emit(ProtocolEvent::NodeOwnerChanged {
            node: *node,
            owner: new_owner,
        });
        Ok(())
    }

    /// Zero the owner and resolver of `parent / label`. Parent owner only.
    pub fn delete_subnode_record(
        &mut self,
        ctx: &mut CallContext<'_>,
        parent: &Node,
        label_hash: &Bytes32,
    ) -> Result<Node, ErsError> {
        self.require_parent_owner(ctx, parent)?;
        let node = subnode(parent, label_hash);
        if self.records.remove(&node).is_none() {
            return Err(ErsError::NodeNotFound { node });
        }
        tracing::debug!(node = %node, parent = %parent, "subnode deleted");
        ctx.emit(ProtocolEvent::SubnodeDeleted {
            node,
            parent: *parent,
        });
        Ok(node)
    }

    /// Owner of `node`, zero if it does not exist.
    pub fn owner(&self, node: &Node) -> Address {
        self.records.get(node).map_or(Address::ZERO, |r| r.owner)
    }

    /// Resolver of `node`, zero if it does not exist.
    pub fn resolver(&self, node: &Node) -> Address {
        self.records.get(node).map_or(Address::ZERO, |r| r.resolver)
    }

    /// Whether `node` has a record.
    pub fn exists(&self, node: &Node) -> bool {
        self.records.contains_key(node)
    }

    /// Full record of `node`.
    pub fn record(&self, node: &Node) -> Option<&NodeRecord> {
        self.records.get(node)
    }

    fn require_parent_owner(&self, ctx: &CallContext<'_>, parent: &Node) -> Result<(), ErsError> {
        let owner = self.owner(parent);
        if owner.is_zero() {
            return Err(ErsError::NodeNotFound { node: *parent });
        }
        if owner != ctx.caller {
            return Err(ErsError::unauthorized(Role::NodeOwner, ctx.caller));
        }
        Ok(())
    }

    fn insert(
        &mut self,
        ctx: &mut CallContext<'_>,
        parent: Node,
        label_hash: &Bytes32,
        owner: Address,
        resolver: Address,
    ) -> Result<Node, ErsError> {
        ers_core::require_nonzero_address(&owner, "owner")?;
        let node = subnode(&parent, label_hash);
        if self.exists(&node) {
            return Err(ErsError::SubnodeAlreadyExists { node });
        }
        self.records.insert(node, NodeRecord { owner, resolver });
        ctx.emit(ProtocolEvent::SubnodeCreated {
            node,
            parent,
            owner,
            resolver,
        });
        Ok(node)
    }
}
