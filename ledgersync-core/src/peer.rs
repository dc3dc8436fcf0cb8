use ledgersync_wire::GetLedger;

/// An opaque, transport-agnostic handle to a remote node.
///
/// The engine only ever holds these behind a `Weak`, so a peer that
/// disconnects is reclaimed by the transport layer without the engine's
/// help. It just finds the weak reference dead on its next scan.
pub trait PeerHandle: Send + Sync {
    /// Sends a request to this peer. Does not block on a reply; responses
    /// arrive later through `AcquisitionRegistry::got_ledger_data`.
    fn send(&self, msg: GetLedger);

    /// Whether `other` names the same remote node as `self`, for
    /// deduplicating and removing peers from an acquisition's candidate
    /// list.
    fn same_peer(&self, other: &Self) -> bool;
}
