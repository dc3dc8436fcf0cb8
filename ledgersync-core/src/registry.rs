//! The entry point a node wires into its network layer: one registry per
//! running node, tracking every ledger currently being reconstructed.

use crate::acquisition::Acquisition;
use crate::config::AcquireConfig;
use crate::peer::PeerHandle;
use crate::timer::TimerService;
use ledgersync_base::Hash256;
use ledgersync_shamap::{LedgerObject, NodeId};
use ledgersync_wire::{ItemType, LedgerData};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Owns every in-flight [`Acquisition`] for a node, keyed by ledger hash.
pub struct AcquisitionRegistry<L: LedgerObject, P: PeerHandle> {
    ledgers: Mutex<HashMap<Hash256, Arc<Acquisition<L, P>>>>,
    timer: Arc<dyn TimerService>,
    config: AcquireConfig,
}

impl<L: LedgerObject + 'static, P: PeerHandle + 'static> AcquisitionRegistry<L, P> {
    pub fn new(timer: Arc<dyn TimerService>, config: AcquireConfig) -> Self {
        AcquisitionRegistry {
            ledgers: Mutex::new(HashMap::new()),
            timer,
            config,
        }
    }

    /// Returns the acquisition tracking `hash`, creating and arming one if
    /// none exists yet.
    pub fn find_create(&self, hash: Hash256) -> Arc<Acquisition<L, P>> {
        let mut ledgers = self.ledgers.lock().unwrap();
        if let Some(existing) = ledgers.get(&hash) {
            return existing.clone();
        }
        let acquisition = Arc::new(Acquisition::new(hash, self.config, self.timer.clone()));
        ledgers.insert(hash, acquisition.clone());
        drop(ledgers);
        acquisition.reset_timer();
        acquisition
    }

    pub fn find(&self, hash: Hash256) -> Option<Arc<Acquisition<L, P>>> {
        self.ledgers.lock().unwrap().get(&hash).cloned()
    }

    pub fn has_ledger(&self, hash: Hash256) -> bool {
        self.ledgers.lock().unwrap().contains_key(&hash)
    }

    /// Stops tracking `hash`. Returns `false` if nothing was being tracked.
    pub fn drop_ledger(&self, hash: Hash256) -> bool {
        self.ledgers.lock().unwrap().remove(&hash).is_some()
    }

    /// Routes an inbound `LedgerData` response to the matching acquisition.
    /// Returns `false` if there is no such acquisition, or the payload was
    /// malformed or failed verification.
    pub fn got_ledger_data(&self, packet: LedgerData) -> bool {
        let Some(acquisition) = self.find(packet.ledger_hash) else {
            return false;
        };
        match packet.item_type {
            ItemType::Base => {
                if packet.nodes.len() != 1 {
                    warn!(target: "ledgersync", "base response carried other than one node");
                    return false;
                }
                acquisition.take_base(&packet.nodes[0].node_data)
            }
            ItemType::TxNode | ItemType::AsNode => {
                if packet.nodes.is_empty() {
                    warn!(target: "ledgersync", "node response carried no nodes");
                    return false;
                }
                let mut ids = Vec::with_capacity(packet.nodes.len());
                let mut data = Vec::with_capacity(packet.nodes.len());
                for node in &packet.nodes {
                    let Some(id_bytes) = node.node_id.as_ref() else {
                        warn!(target: "ledgersync", "node response entry missing a node-id");
                        return false;
                    };
                    ids.push(NodeId::from_bytes(id_bytes));
                    data.push(node.node_data.clone());
                }
                if packet.item_type == ItemType::TxNode {
                    acquisition.take_tx_node(&ids, &data)
                } else {
                    acquisition.take_as_node(&ids, &data)
                }
            }
        }
    }
}
