//! The ledger-acquisition engine: reconstructs a full ledger (a base
//! record plus its two SHAMap subtrees) from untrusted peers, verifying
//! every piece against the hashes the ledger itself declares.
//!
//! This crate is generic over what a ledger and a peer actually are
//! (see [`ledgersync_shamap::LedgerObject`] and [`PeerHandle`]); it owns
//! only the state machine that decides what to ask for next and when.

mod acquisition;
mod config;
mod peer;
mod registry;
mod timer;

pub use acquisition::Acquisition;
pub use config::AcquireConfig;
pub use peer::PeerHandle;
pub use registry::AcquisitionRegistry;
pub use timer::{ThreadTimerService, TimerService};
