//! Interfaces the acquisition engine treats as externally supplied: the
//! SHAMap tree, the `Ledger` object built from a base record, and the
//! node-id addressing scheme that ties the two together.
//!
//! Neither the tree algorithm nor the ledger's internal representation is
//! this crate's concern; `ledgersync-core` is generic over the traits below
//! and never reaches past them. The `testing` module (behind the
//! `test-support` feature) supplies a minimal but real implementation so
//! the engine can be driven end-to-end in tests.

use ledgersync_base::{Hash256, Result};

#[cfg(feature = "test-support")]
pub mod testing;

/// The position of a node within a SHAMap: a path prefix from the root.
/// `ROOT` is the empty prefix.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(Vec<u8>);

impl NodeId {
    pub const ROOT: NodeId = NodeId(Vec::new());

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_bytes(bytes: &[u8]) -> NodeId {
        NodeId(bytes.to_vec())
    }

    /// Extends this id by one path component, naming a child of the node
    /// this id addresses.
    pub fn child(&self, selector: u8) -> NodeId {
        let mut raw = self.0.clone();
        raw.push(selector);
        NodeId(raw)
    }
}

/// A radix-trie Merkle structure whose internal nodes commit to their
/// children's hashes, supporting incremental, verifiable reconstruction
/// from an untrusted source.
pub trait ShaMap: Send + Sync {
    /// The hash of the root node currently held, or `Hash256::ZERO` if no
    /// root has been placed yet. This is the map's *current* state, not a
    /// target it is syncing towards. The target is supplied by the caller
    /// to [`ShaMap::add_root_node`].
    fn hash(&self) -> Hash256;

    /// Inserts the root node, which must hash to `expected_hash`. Returns
    /// `true` if the node was already held or was accepted; `false` if
    /// `data` does not hash to `expected_hash`.
    fn add_root_node(&self, expected_hash: Hash256, data: &[u8]) -> bool;

    /// Inserts an interior or leaf node at a position this map has already
    /// identified as missing (via a prior root or interior insertion).
    /// Returns `true` if the node was already held or was accepted;
    /// `false` if `id` was not expected or `data` does not hash to the
    /// expected value.
    fn add_known_node(&self, id: &NodeId, data: &[u8]) -> bool;

    /// Up to `limit` node-ids this map still needs in order to become
    /// fully resolved.
    fn missing_nodes(&self, limit: usize) -> Vec<NodeId>;

    /// Whether the map, as currently resolved, is internally consistent.
    /// Only meaningful to call once `missing_nodes` returns empty.
    fn is_valid(&self) -> bool;

    /// Whether the map still has unresolved nodes.
    fn is_synching(&self) -> bool;
}

/// A versioned snapshot of ledger state: a base record (header plus the
/// two subtree root hashes) binding a transaction SHAMap and an
/// account-state SHAMap.
pub trait LedgerObject: Send + Sync + Sized {
    type Map: ShaMap;

    /// Parses a candidate base record. Fails only if `bytes` cannot be
    /// parsed at all; a parseable base with the wrong hash is the caller's
    /// concern (compare `.hash()` against the target), not this method's.
    fn from_base_bytes(bytes: &[u8]) -> Result<Self>;

    fn hash(&self) -> Hash256;
    fn seq(&self) -> u32;
    fn trans_hash(&self) -> Hash256;
    fn account_hash(&self) -> Hash256;
    fn tx_map(&self) -> &Self::Map;
    fn account_map(&self) -> &Self::Map;

    /// Marks the ledger as under reconstruction: not yet fit for
    /// consensus use.
    fn mark_acquiring(&self);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn root_is_empty_path() {
        assert!(NodeId::ROOT.is_root());
        assert_eq!(NodeId::ROOT.raw_bytes(), &[] as &[u8]);
    }

    #[test]
    fn child_extends_path() {
        let child = NodeId::ROOT.child(3);
        assert!(!child.is_root());
        assert_eq!(child.raw_bytes(), &[3]);
        let grandchild = child.child(7);
        assert_eq!(grandchild.raw_bytes(), &[3, 7]);
    }

    #[test]
    fn from_bytes_roundtrips_raw_bytes() {
        let id = NodeId::from_bytes(&[1, 2, 3]);
        assert_eq!(id.raw_bytes(), &[1, 2, 3]);
    }
}
