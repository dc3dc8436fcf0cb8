//! A minimal, real (not stubbed-out) `ShaMap`/`LedgerObject` pair used to
//! drive the acquisition engine end-to-end in tests. The node encoding here
//! is this module's own invention (the real wire-level SHAMap node format
//! is out of this crate's scope), but hashing and child resolution behave
//! like a real radix-trie sync: a node's bytes hash to its claimed hash, and
//! a node's prefix declares the hashes of its children.

use crate::{LedgerObject, NodeId, ShaMap};
use ledgersync_base::{err, ErrorKind, Hash256, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Encodes a node's children as a length-prefixed list of
/// `(selector, hash)` pairs followed by an opaque payload. This is the
/// format [`TestShaMap`] expects from both `encode_node` and any producer
/// of test fixtures.
pub fn encode_node(children: &[(u8, Hash256)], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + children.len() * 33 + payload.len());
    out.push(children.len() as u8);
    for (selector, hash) in children {
        out.push(*selector);
        out.extend_from_slice(hash.as_bytes());
    }
    out.extend_from_slice(payload);
    out
}

fn decode_children(data: &[u8]) -> Vec<(u8, Hash256)> {
    let Some(&count) = data.first() else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(count as usize);
    let mut pos = 1usize;
    for _ in 0..count {
        if data.len() < pos + 33 {
            break;
        }
        let selector = data[pos];
        let hash = Hash256::from_slice(&data[pos + 1..pos + 33]).expect("33-byte slice");
        out.push((selector, hash));
        pos += 33;
    }
    out
}

#[derive(Default)]
struct Inner {
    root_present: bool,
    root_hash: Hash256,
    nodes: HashMap<NodeId, Vec<u8>>,
    pending: HashMap<NodeId, Hash256>,
    invalid: bool,
}

/// A SHAMap stand-in good enough to exercise the acquisition protocol: it
/// really does verify every inserted node against a hash it was told to
/// expect, and really does track which child hashes remain unresolved.
pub struct TestShaMap {
    inner: Mutex<Inner>,
}

impl Default for TestShaMap {
    fn default() -> Self {
        TestShaMap {
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl TestShaMap {
    pub fn new() -> TestShaMap {
        TestShaMap::default()
    }

    /// Test-only hook to simulate a SHAMap that resolves fully but fails
    /// its own internal consistency check (the `InvalidSubtree` case).
    pub fn poison(&self) {
        self.inner.lock().unwrap().invalid = true;
    }
}

impl ShaMap for TestShaMap {
    fn hash(&self) -> Hash256 {
        self.inner.lock().unwrap().root_hash
    }

    fn add_root_node(&self, expected_hash: Hash256, data: &[u8]) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.root_present {
            return true;
        }
        if Hash256::sha256(data) != expected_hash {
            return false;
        }
        for (selector, hash) in decode_children(data) {
            inner.pending.insert(NodeId::ROOT.child(selector), hash);
        }
        inner.nodes.insert(NodeId::ROOT, data.to_vec());
        inner.root_present = true;
        inner.root_hash = expected_hash;
        true
    }

    fn add_known_node(&self, id: &NodeId, data: &[u8]) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.nodes.contains_key(id) {
            return true;
        }
        let Some(&expected) = inner.pending.get(id) else {
            return false;
        };
        if Hash256::sha256(data) != expected {
            return false;
        }
        inner.pending.remove(id);
        let children = decode_children(data);
        inner.nodes.insert(id.clone(), data.to_vec());
        for (selector, hash) in children {
            inner.pending.insert(id.child(selector), hash);
        }
        true
    }

    fn missing_nodes(&self, limit: usize) -> Vec<NodeId> {
        let inner = self.inner.lock().unwrap();
        let mut ids: Vec<NodeId> = inner.pending.keys().cloned().collect();
        ids.sort();
        ids.truncate(limit);
        ids
    }

    fn is_valid(&self) -> bool {
        !self.inner.lock().unwrap().invalid
    }

    fn is_synching(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        !inner.root_present || !inner.pending.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct BaseRecord {
    seq: u32,
    trans_hash: Hash256,
    account_hash: Hash256,
}

/// Encodes a base record. The resulting bytes' `sha256` is the ledger hash
/// a caller should use as the acquisition's target.
pub fn encode_base(seq: u32, trans_hash: Hash256, account_hash: Hash256) -> Vec<u8> {
    rmp_serde::to_vec(&BaseRecord {
        seq,
        trans_hash,
        account_hash,
    })
    .expect("base record always serializes")
}

/// A [`LedgerObject`] built on [`TestShaMap`].
pub struct TestLedger {
    hash: Hash256,
    seq: u32,
    trans_hash: Hash256,
    account_hash: Hash256,
    tx_map: TestShaMap,
    account_map: TestShaMap,
    acquiring: AtomicBool,
}

impl LedgerObject for TestLedger {
    type Map = TestShaMap;

    fn from_base_bytes(bytes: &[u8]) -> Result<Self> {
        let record: BaseRecord = rmp_serde::from_slice(bytes)
            .map_err(|_| err(ErrorKind::BadPayload, "malformed ledger base record"))?;
        Ok(TestLedger {
            hash: Hash256::sha256(bytes),
            seq: record.seq,
            trans_hash: record.trans_hash,
            account_hash: record.account_hash,
            tx_map: TestShaMap::new(),
            account_map: TestShaMap::new(),
            acquiring: AtomicBool::new(false),
        })
    }

    fn hash(&self) -> Hash256 {
        self.hash
    }

    fn seq(&self) -> u32 {
        self.seq
    }

    fn trans_hash(&self) -> Hash256 {
        self.trans_hash
    }

    fn account_hash(&self) -> Hash256 {
        self.account_hash
    }

    fn tx_map(&self) -> &TestShaMap {
        &self.tx_map
    }

    fn account_map(&self) -> &TestShaMap {
        &self.account_map
    }

    fn mark_acquiring(&self) {
        self.acquiring.store(true, Ordering::SeqCst);
    }
}

impl TestLedger {
    pub fn is_acquiring(&self) -> bool {
        self.acquiring.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_tree_round_trip() {
        let root = encode_node(&[], b"leaf");
        let map = TestShaMap::new();
        assert!(map.is_synching());
        assert!(map.add_root_node(Hash256::sha256(&root), &root));
        assert!(!map.is_synching());
        assert!(map.missing_nodes(128).is_empty());
        assert!(map.is_valid());
    }

    #[test]
    fn tree_with_children_requires_all_before_synched() {
        let leaf_a = encode_node(&[], b"a");
        let leaf_b = encode_node(&[], b"b");
        let root = encode_node(
            &[(0, Hash256::sha256(&leaf_a)), (1, Hash256::sha256(&leaf_b))],
            b"root",
        );
        let map = TestShaMap::new();
        assert!(map.add_root_node(Hash256::sha256(&root), &root));
        assert!(map.is_synching());
        let missing = map.missing_nodes(128);
        assert_eq!(missing.len(), 2);

        assert!(map.add_known_node(&NodeId::ROOT.child(0), &leaf_a));
        assert!(map.is_synching());
        assert!(map.add_known_node(&NodeId::ROOT.child(1), &leaf_b));
        assert!(!map.is_synching());
        assert!(map.is_valid());
    }

    #[test]
    fn rejects_node_with_wrong_hash() {
        let root = encode_node(&[], b"leaf");
        let map = TestShaMap::new();
        assert!(!map.add_root_node(Hash256::sha256(b"not the root"), &root));
        assert!(map.is_synching());
    }

    #[test]
    fn rejects_unexpected_node_id() {
        let root = encode_node(&[], b"leaf");
        let map = TestShaMap::new();
        assert!(map.add_root_node(Hash256::sha256(&root), &root));
        assert!(!map.add_known_node(&NodeId::ROOT.child(9), b"surprise"));
    }

    #[test]
    fn poison_marks_invalid() {
        let map = TestShaMap::new();
        assert!(map.is_valid());
        map.poison();
        assert!(!map.is_valid());
    }

    #[test]
    fn ledger_base_hash_matches_sha256_of_bytes() {
        let bytes = encode_base(1, Hash256::ZERO, Hash256::ZERO);
        let ledger = TestLedger::from_base_bytes(&bytes).expect("parses");
        assert_eq!(ledger.hash(), Hash256::sha256(&bytes));
        assert_eq!(ledger.seq(), 1);
        assert!(!ledger.is_acquiring());
    }

    #[test]
    fn ledger_rejects_malformed_base() {
        assert!(TestLedger::from_base_bytes(&[0xff, 0x01]).is_err());
    }
}
