//! The per-ledger state machine: tracks what has been verified so far and
//! decides, each time it is triggered, what single request (if any) would
//! move it closer to complete.

use crate::config::AcquireConfig;
use crate::peer::PeerHandle;
use crate::timer::TimerService;
use ledgersync_base::Hash256;
use ledgersync_shamap::{LedgerObject, NodeId, ShaMap};
use ledgersync_wire::{GetLedger, ItemType};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, warn};

#[derive(Clone, Copy, Eq, PartialEq)]
enum Subtree {
    Tx,
    As,
}

enum SubtreeStep {
    Request(GetLedger),
    Resolved,
    Invalid,
}

fn subtree_step<M: ShaMap>(
    map: &M,
    ledger_hash: Hash256,
    ledger_seq: u32,
    item_type: ItemType,
    batch: usize,
) -> SubtreeStep {
    if map.hash().is_zero() {
        let root_id = NodeId::ROOT.raw_bytes().to_vec();
        return SubtreeStep::Request(GetLedger::nodes(ledger_hash, ledger_seq, item_type, vec![root_id]));
    }
    let missing = map.missing_nodes(batch);
    if missing.is_empty() {
        if map.is_valid() {
            SubtreeStep::Resolved
        } else {
            SubtreeStep::Invalid
        }
    } else {
        let ids = missing.iter().map(|id| id.raw_bytes().to_vec()).collect();
        SubtreeStep::Request(GetLedger::nodes(ledger_hash, ledger_seq, item_type, ids))
    }
}

struct Inner<L: LedgerObject, P: PeerHandle> {
    ledger: Option<Arc<L>>,
    have_base: bool,
    have_transactions: bool,
    have_state: bool,
    complete: bool,
    failed: bool,
    peers: Vec<Weak<P>>,
    on_complete: Vec<Box<dyn FnOnce(Arc<Acquisition<L, P>>) + Send>>,
}

impl<L: LedgerObject, P: PeerHandle> Default for Inner<L, P> {
    fn default() -> Self {
        Inner {
            ledger: None,
            have_base: false,
            have_transactions: false,
            have_state: false,
            complete: false,
            failed: false,
            peers: Vec::new(),
            on_complete: Vec::new(),
        }
    }
}

enum Decision {
    AlreadyTerminal,
    JustTerminated,
    SendRequest(GetLedger),
    Rearm,
}

/// Tracks the reconstruction of a single ledger by hash: a base record, a
/// transaction SHAMap and an account-state SHAMap, each independently
/// fetched and verified from whichever peers claim to have them.
pub struct Acquisition<L: LedgerObject, P: PeerHandle> {
    hash: Hash256,
    inner: Mutex<Inner<L, P>>,
    timer: Arc<dyn TimerService>,
    config: AcquireConfig,
}

impl<L: LedgerObject + 'static, P: PeerHandle + 'static> Acquisition<L, P> {
    pub(crate) fn new(hash: Hash256, config: AcquireConfig, timer: Arc<dyn TimerService>) -> Self {
        Acquisition {
            hash,
            inner: Mutex::new(Inner::default()),
            timer,
            config,
        }
    }

    pub fn hash(&self) -> Hash256 {
        self.hash
    }

    pub fn is_complete(&self) -> bool {
        self.inner.lock().unwrap().complete
    }

    pub fn is_failed(&self) -> bool {
        self.inner.lock().unwrap().failed
    }

    pub fn have_base(&self) -> bool {
        self.inner.lock().unwrap().have_base
    }

    pub fn have_transactions(&self) -> bool {
        self.inner.lock().unwrap().have_transactions
    }

    pub fn have_state(&self) -> bool {
        self.inner.lock().unwrap().have_state
    }

    pub fn ledger(&self) -> Option<Arc<L>> {
        self.inner.lock().unwrap().ledger.clone()
    }

    /// Records that `peer` claims to have this ledger, unless it (or an
    /// already-dead entry standing in its place) is already on the list.
    pub fn peer_has(&self, peer: Arc<P>) {
        let mut inner = self.inner.lock().unwrap();
        let mut i = 0;
        while i < inner.peers.len() {
            match inner.peers[i].upgrade() {
                Some(existing) => {
                    if existing.same_peer(&peer) {
                        return;
                    }
                    i += 1;
                }
                None => {
                    inner.peers.remove(i);
                }
            }
        }
        inner.peers.push(Arc::downgrade(&peer));
    }

    /// Removes `peer` from the candidate list, e.g. after it sent back
    /// data that failed verification.
    pub fn bad_peer(&self, peer: &P) {
        let mut inner = self.inner.lock().unwrap();
        let mut i = 0;
        while i < inner.peers.len() {
            match inner.peers[i].upgrade() {
                Some(existing) => {
                    if peer.same_peer(&existing) {
                        inner.peers.remove(i);
                        return;
                    }
                    i += 1;
                }
                None => {
                    inner.peers.remove(i);
                }
            }
        }
    }

    /// Accepts a candidate base record. Returns `false` if it doesn't
    /// parse or doesn't hash to this acquisition's target; idempotent
    /// once a base is already held.
    pub fn take_base(&self, bytes: &[u8]) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.have_base {
            return true;
        }
        let ledger = match L::from_base_bytes(bytes) {
            Ok(ledger) => ledger,
            Err(err) => {
                warn!(target: "ledgersync", kind = %err.kind(), "base record failed to parse");
                return false;
            }
        };
        if ledger.hash() != self.hash {
            warn!(target: "ledgersync", "base record hash does not match target");
            return false;
        }
        let ledger = Arc::new(ledger);
        ledger.mark_acquiring();
        if ledger.trans_hash().is_zero() {
            inner.have_transactions = true;
        }
        if ledger.account_hash().is_zero() {
            inner.have_state = true;
        }
        inner.ledger = Some(ledger);
        inner.have_base = true;
        true
    }

    pub fn take_tx_node(self: &Arc<Self>, ids: &[NodeId], data: &[Vec<u8>]) -> bool {
        self.take_map_nodes(ids, data, Subtree::Tx)
    }

    pub fn take_as_node(self: &Arc<Self>, ids: &[NodeId], data: &[Vec<u8>]) -> bool {
        self.take_map_nodes(ids, data, Subtree::As)
    }

    fn take_map_nodes(self: &Arc<Self>, ids: &[NodeId], data: &[Vec<u8>], subtree: Subtree) -> bool {
        let ledger = {
            let inner = self.inner.lock().unwrap();
            if !inner.have_base {
                return false;
            }
            inner.ledger.clone().expect("have_base implies ledger present")
        };
        let declared_hash = match subtree {
            Subtree::Tx => ledger.trans_hash(),
            Subtree::As => ledger.account_hash(),
        };
        for (id, bytes) in ids.iter().zip(data.iter()) {
            let accepted = if id.is_root() {
                match subtree {
                    Subtree::Tx => ledger.tx_map().add_root_node(declared_hash, bytes),
                    Subtree::As => ledger.account_map().add_root_node(declared_hash, bytes),
                }
            } else {
                match subtree {
                    Subtree::Tx => ledger.tx_map().add_known_node(id, bytes),
                    Subtree::As => ledger.account_map().add_known_node(id, bytes),
                }
            };
            if !accepted {
                return false;
            }
        }
        let synching = match subtree {
            Subtree::Tx => ledger.tx_map().is_synching(),
            Subtree::As => ledger.account_map().is_synching(),
        };
        if !synching {
            let valid = match subtree {
                Subtree::Tx => ledger.tx_map().is_valid(),
                Subtree::As => ledger.account_map().is_valid(),
            };
            let newly_terminal = {
                let mut inner = self.inner.lock().unwrap();
                Self::apply_subtree_resolution(&mut inner, subtree, valid)
            };
            if newly_terminal {
                self.done();
            }
        }
        true
    }

    /// Records that `subtree` finished synching, either marking it failed
    /// (if the reassembled tree doesn't hash to what its parent declared)
    /// or recording it and completing the acquisition if both subtrees are
    /// now in hand. Shared by `take_map_nodes` (a subtree can resolve the
    /// instant its last node arrives) and `decide` (which also discovers
    /// resolution when it scans for missing nodes on a `trigger`). Returns
    /// whether this call is what made the acquisition terminal, so the
    /// caller knows whether it's responsible for firing `done`.
    fn apply_subtree_resolution(inner: &mut Inner<L, P>, subtree: Subtree, valid: bool) -> bool {
        if inner.complete || inner.failed {
            return false;
        }
        if !valid {
            inner.failed = true;
            return true;
        }
        match subtree {
            Subtree::Tx => inner.have_transactions = true,
            Subtree::As => inner.have_state = true,
        }
        if inner.have_transactions && inner.have_state {
            inner.complete = true;
            true
        } else {
            false
        }
    }

    /// Registers a callback to run once this acquisition reaches a
    /// terminal state. If it already has, the callback runs immediately,
    /// synchronously, on the calling thread.
    pub fn add_on_complete(self: &Arc<Self>, callback: impl FnOnce(Arc<Self>) + Send + 'static) {
        let mut inner = self.inner.lock().unwrap();
        if inner.complete || inner.failed {
            drop(inner);
            callback(self.clone());
            return;
        }
        inner.on_complete.push(Box::new(callback));
    }

    fn decide(&self) -> Decision {
        let mut inner = self.inner.lock().unwrap();
        if inner.complete || inner.failed {
            return Decision::AlreadyTerminal;
        }
        if !inner.have_base {
            return Decision::SendRequest(GetLedger::base(self.hash));
        }
        let ledger = inner.ledger.clone().expect("have_base implies ledger present");
        let batch = self.config.missing_node_batch;
        if !inner.have_transactions {
            match subtree_step(ledger.tx_map(), self.hash, ledger.seq(), ItemType::TxNode, batch) {
                SubtreeStep::Request(msg) => Decision::SendRequest(msg),
                SubtreeStep::Invalid => {
                    Self::apply_subtree_resolution(&mut inner, Subtree::Tx, false);
                    Decision::JustTerminated
                }
                SubtreeStep::Resolved => {
                    if Self::apply_subtree_resolution(&mut inner, Subtree::Tx, true) {
                        Decision::JustTerminated
                    } else {
                        Decision::Rearm
                    }
                }
            }
        } else if !inner.have_state {
            match subtree_step(ledger.account_map(), self.hash, ledger.seq(), ItemType::AsNode, batch) {
                SubtreeStep::Request(msg) => Decision::SendRequest(msg),
                SubtreeStep::Invalid => {
                    Self::apply_subtree_resolution(&mut inner, Subtree::As, false);
                    Decision::JustTerminated
                }
                SubtreeStep::Resolved => {
                    // have_transactions is already true here, so resolving
                    // the state subtree always finalizes one way or the other.
                    Self::apply_subtree_resolution(&mut inner, Subtree::As, true);
                    Decision::JustTerminated
                }
            }
        } else {
            inner.complete = true;
            Decision::JustTerminated
        }
    }

    /// Advances this acquisition by one step: sends at most one request,
    /// or finalizes it if every subtree is already resolved.
    pub fn trigger(self: &Arc<Self>) {
        debug!(target: "ledgersync", hash = %self.hash, "trigger");
        match self.decide() {
            Decision::AlreadyTerminal => {}
            Decision::JustTerminated => self.done(),
            Decision::SendRequest(msg) => {
                self.send_request(msg);
                self.reset_timer();
            }
            Decision::Rearm => self.reset_timer(),
        }
    }

    fn send_request(&self, msg: GetLedger) {
        let mut inner = self.inner.lock().unwrap();
        let mut i = 0;
        while i < inner.peers.len() {
            match inner.peers[i].upgrade() {
                Some(peer) => {
                    // FIXME: Track last peer sent to and time sent
                    peer.send(msg);
                    return;
                }
                None => {
                    inner.peers.remove(i);
                }
            }
        }
    }

    fn done(self: &Arc<Self>) {
        debug!(target: "ledgersync", hash = %self.hash, "done");
        let callbacks = {
            let mut inner = self.inner.lock().unwrap();
            std::mem::take(&mut inner.on_complete)
        };
        for callback in callbacks {
            callback(self.clone());
        }
    }

    /// Schedules the next `trigger()` call. Holds only a weak reference to
    /// this acquisition, so an acquisition dropped from the registry does
    /// not keep its timer (and thus itself) alive.
    pub fn reset_timer(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.timer.schedule(
            self.config.acquire_timeout(),
            Box::new(move || {
                if let Some(acquisition) = weak.upgrade() {
                    acquisition.trigger();
                }
            }),
        );
    }
}
