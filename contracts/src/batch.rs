//! # Batch Release
//!
//! Releases several vaults in one call. The batch as a whole is only rejected
//! when it is too large; individual ids fail softly. The result holds one
//! flag per input id, in input order, and a `false` entry carries no reason.
//! Per-item failure reasons are logged at `debug`.
//!
//! Each item is an ordinary owner release, so a duplicated id succeeds on its
//! first occurrence and fails on the second.

use lockbox_protocol::config::MAX_BATCH_SIZE;
use lockbox_protocol::identity::Principal;
use tracing::{debug, info};

use crate::error::VaultError;
use crate::ledger::VaultLedger;
use crate::vault::{ReleasePath, VaultId};

/// Applies owner releases in sequence against a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchCoordinator {
    max_batch_size: usize,
}

impl Default for BatchCoordinator {
    fn default() -> Self {
        Self::new(MAX_BATCH_SIZE)
    }
}

impl BatchCoordinator {
    pub fn new(max_batch_size: usize) -> Self {
        Self { max_batch_size }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Release each of `vault_ids` as `caller`.
    ///
    /// # Errors
    ///
    /// [`VaultError::BatchSizeExceeded`] when more ids are given than the
    /// configured maximum. Nothing is released in that case.
    pub fn release_all(
        &self,
        ledger: &mut VaultLedger,
        caller: &Principal,
        vault_ids: &[VaultId],
    ) -> Result<Vec<bool>, VaultError> {
        if vault_ids.len() > self.max_batch_size {
            let err = VaultError::BatchSizeExceeded {
                size: vault_ids.len(),
                max: self.max_batch_size,
            };
            debug!(caller = %caller, error = %err, "batch rejected");
            return Err(err);
        }

        let outcomes: Vec<bool> = vault_ids
            .iter()
            .map(|&vault_id| match ledger.release_as(vault_id, caller, ReleasePath::Batch) {
                Ok(()) => true,
                Err(e) => {
                    debug!(vault_id, code = e.code(), error = %e, "batch item not released");
                    false
                }
            })
            .collect();

        let released = outcomes.iter().filter(|ok| **ok).count();
        info!(caller = %caller, size = vault_ids.len(), released, "batch release processed");
        Ok(outcomes)
    }
}
