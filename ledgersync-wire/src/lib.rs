//! Wire message shapes for the ledger-acquisition protocol.
//!
//! This crate specifies *shapes*, not a mandated byte layout: the
//! `encode`/`decode` helpers below pick MessagePack because that is the
//! codec this crate family already uses for inter-node traffic, not because
//! the acquisition protocol requires it. Nothing in `ledgersync-core`
//! depends on this codec; it only exchanges these structs in memory.

use ledgersync_base::{Error, ErrorKind, Hash256, Result};
use serde::{Deserialize, Serialize};

/// Which part of a ledger a `GetLedger`/`LedgerData` exchange concerns.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum ItemType {
    /// The base record: header plus the two subtree root hashes.
    Base,
    /// A node of the transaction SHAMap.
    TxNode,
    /// A node of the account-state SHAMap.
    AsNode,
}

/// A request for one piece of a ledger, addressed to a single peer.
///
/// For `ItemType::Base`, `ledger_seq` and `node_ids` are omitted (a base
/// request names only the ledger hash). For `TxNode`/`AsNode`, `ledger_seq`
/// and a non-empty `node_ids` are required.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GetLedger {
    pub ledger_hash: Hash256,
    pub ledger_seq: Option<u32>,
    pub item_type: ItemType,
    pub node_ids: Vec<Vec<u8>>,
}

impl GetLedger {
    pub fn base(ledger_hash: Hash256) -> GetLedger {
        GetLedger {
            ledger_hash,
            ledger_seq: None,
            item_type: ItemType::Base,
            node_ids: Vec::new(),
        }
    }

    pub fn nodes(
        ledger_hash: Hash256,
        ledger_seq: u32,
        item_type: ItemType,
        node_ids: Vec<Vec<u8>>,
    ) -> GetLedger {
        debug_assert!(!node_ids.is_empty());
        debug_assert!(item_type != ItemType::Base);
        GetLedger {
            ledger_hash,
            ledger_seq: Some(ledger_seq),
            item_type,
            node_ids,
        }
    }
}

/// One entry of a `LedgerData` response.
///
/// For `ItemType::Base` responses `node_id` is absent (there is exactly one
/// node and it has no position). For `TxNode`/`AsNode` both fields are
/// required.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LedgerNode {
    pub node_id: Option<Vec<u8>>,
    pub node_data: Vec<u8>,
}

/// A response carrying one or more nodes of a single ledger/item-type.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LedgerData {
    pub ledger_hash: Hash256,
    pub item_type: ItemType,
    pub nodes: Vec<LedgerNode>,
}

pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    rmp_serde::to_vec(msg).map_err(|e| Error::new(ErrorKind::BadPayload, e))
}

pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    rmp_serde::from_slice(bytes).map_err(|e| Error::new(ErrorKind::BadPayload, e))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn get_ledger_base_has_no_seq_or_nodes() {
        let req = GetLedger::base(Hash256::sha256(b"ledger"));
        assert_eq!(req.item_type, ItemType::Base);
        assert!(req.ledger_seq.is_none());
        assert!(req.node_ids.is_empty());
    }

    #[test]
    fn get_ledger_roundtrips_through_codec() {
        let req = GetLedger::nodes(
            Hash256::sha256(b"ledger"),
            42,
            ItemType::TxNode,
            vec![vec![1, 2, 3], vec![4, 5]],
        );
        let bytes = encode(&req).expect("encode");
        let back: GetLedger = decode(&bytes).expect("decode");
        assert_eq!(req, back);
    }

    #[test]
    fn ledger_data_roundtrips_through_codec() {
        let resp = LedgerData {
            ledger_hash: Hash256::sha256(b"ledger"),
            item_type: ItemType::Base,
            nodes: vec![LedgerNode {
                node_id: None,
                node_data: vec![9, 9, 9],
            }],
        };
        let bytes = encode(&resp).expect("encode");
        let back: LedgerData = decode(&bytes).expect("decode");
        assert_eq!(resp, back);
    }
}
