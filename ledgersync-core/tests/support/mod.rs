use ledgersync_core::{PeerHandle, TimerService};
use ledgersync_wire::GetLedger;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A `TimerService` that never fires on its own: scheduled callbacks sit
/// until the test calls `fire_due`, so tests control time explicitly
/// instead of racing real sleeps.
#[derive(Default)]
pub struct ManualTimerService {
    pending: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl TimerService for ManualTimerService {
    fn schedule(&self, _delay: Duration, callback: Box<dyn FnOnce() + Send>) {
        self.pending.lock().unwrap().push(callback);
    }
}

impl ManualTimerService {
    /// Runs every callback scheduled so far, returning how many fired.
    pub fn fire_due(&self) -> usize {
        let due = std::mem::take(&mut *self.pending.lock().unwrap());
        let count = due.len();
        for callback in due {
            callback();
        }
        count
    }
}

/// A peer whose outbound requests land in a queue the test can inspect,
/// identified by an opaque id for `same_peer` comparisons.
pub struct TestPeer {
    id: u64,
    sent: Mutex<Vec<GetLedger>>,
}

impl TestPeer {
    pub fn new(id: u64) -> Arc<TestPeer> {
        Arc::new(TestPeer {
            id,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn drain_sent(&self) -> Vec<GetLedger> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

impl PeerHandle for TestPeer {
    fn send(&self, msg: GetLedger) {
        self.sent.lock().unwrap().push(msg);
    }

    fn same_peer(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
