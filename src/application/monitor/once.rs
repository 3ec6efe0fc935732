//! Hash-keyed handle-once gate.

use alloy_primitives::TxHash;
use dashmap::DashSet;

/// Records which transaction hashes have had their outcome handled.
///
/// Entries are never removed, so late duplicate signals for a hash stay
/// no-ops for the lifetime of the process.
#[derive(Debug, Default)]
pub struct HandleOnce {
    handled: DashSet<TxHash>,
}

impl HandleOnce {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `hash`. Returns `true` only for the first caller.
    pub fn try_claim(&self, hash: TxHash) -> bool {
        self.handled.insert(hash)
    }

    #[must_use]
    pub fn is_handled(&self, hash: &TxHash) -> bool {
        self.handled.contains(hash)
    }
}
