//! # Shared Ledger
//!
//! [`VaultLedger`] has no internal locking and expects its host to serialize
//! calls. `SharedLedger` provides that serialization for multi-threaded
//! hosts: every mutating closure runs under one exclusive lock, so two
//! concurrent releases of the same vault resolve to one success and one
//! `NotFound`.
//!
//! Writers hold the lock for a whole operation. Queries take the shared
//! side and never observe a half-applied transition.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::ledger::VaultLedger;

/// Cloneable handle to one ledger behind a global lock.
#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<RwLock<VaultLedger>>,
}

impl SharedLedger {
    pub fn new(ledger: VaultLedger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Run `op` with exclusive access to the ledger.
    pub fn execute<T>(&self, op: impl FnOnce(&mut VaultLedger) -> T) -> T {
        let mut guard = self.inner.write();
        op(&mut guard)
    }

    /// Run `query` with shared access.
    pub fn read<T>(&self, query: impl FnOnce(&VaultLedger) -> T) -> T {
        let guard = self.inner.read();
        query(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use lockbox_protocol::clock::ManualClock;
    use lockbox_protocol::crypto::Ed25519Verifier;
    use lockbox_protocol::identity::Principal;

    use crate::config::LedgerConfig;
    use crate::error::VaultError;

    const DAY: u64 = 86_400;

    fn shared() -> SharedLedger {
        SharedLedger::new(VaultLedger::new(
            LedgerConfig::new(Principal::new("admin")),
            Arc::new(ManualClock::new(DAY * 10)),
            Arc::new(Ed25519Verifier),
        ))
    }

    #[test]
    fn concurrent_creates_get_distinct_ids() {
        let ledger = shared();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    let owner = Principal::new(format!("user-{i}"));
                    (0..25)
                        .map(|_| ledger.execute(|l| l.create_vault(&owner, 1, DAY).unwrap()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..200).collect::<Vec<_>>());
        assert_eq!(ledger.read(|l| l.vault_count()), 200);
    }

    #[test]
    fn racing_releases_resolve_to_one_success() {
        let clock = Arc::new(ManualClock::new(0));
        let ledger = SharedLedger::new(VaultLedger::new(
            LedgerConfig::new(Principal::new("admin")),
            clock.clone(),
            Arc::new(Ed25519Verifier),
        ));
        let alice = Principal::new("alice");
        let id = ledger.execute(|l| l.create_vault(&alice, 100, DAY).unwrap());
        clock.advance(DAY);

        let results: Vec<_> = (0..4)
            .map(|_| {
                let ledger = ledger.clone();
                let alice = alice.clone();
                thread::spawn(move || ledger.execute(|l| l.release_vault(id, &alice)))
            })
            .map(|h| h.join().unwrap())
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == VaultError::NotFound { vault_id: id }));
    }
}
