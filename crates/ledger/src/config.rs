use std::time::Duration;

/// Policy knobs for a [`Ledger`](crate::Ledger) instance.
///
/// The defaults match the club treasurer expectations: member accounts may
/// not go below zero, and a writer stuck behind a lock gives up after five
/// seconds (the rolled-back operation is safe to retry).
#[derive(Clone, Copy, Debug)]
pub struct LedgerConfig {
    /// Allow member debits to push the balance below zero.
    ///
    /// The cash fund ignores this flag; it can never overdraft.
    pub allow_member_overdraft: bool,
    /// Upper bound on waiting for a per-owner row lock.
    pub lock_wait: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            allow_member_overdraft: false,
            lock_wait: Duration::from_secs(5),
        }
    }
}
