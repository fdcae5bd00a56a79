//! # Release Callbacks
//!
//! `release_to_callback` hands the released value to an external target by
//! calling its single capability, [`ReleaseCallback::on_release`].
//!
//! The ledger commits the release *before* making the call and never rolls
//! it back. A failing callback surfaces as `VaultError::Callback` while the
//! vault stays released; any compensation is the caller's job.
//!
//! The two halves are also available separately:
//! [`VaultLedger::commit_callback_release`](crate::ledger::VaultLedger::commit_callback_release)
//! then [`notify_release`]. A host with durable storage saves in between.

use lockbox_protocol::identity::{ContractId, Principal};
use thiserror::Error;
use tracing::warn;

use crate::error::VaultError;
use crate::vault::VaultId;

/// Failure reported by a callback target.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallbackError {
    /// The target refused the notification.
    #[error("callback rejected release: {0}")]
    Rejected(String),

    /// The target could not be reached or could not record the release.
    #[error("callback target unavailable: {0}")]
    Unavailable(String),
}

/// An external recipient of released vault value.
pub trait ReleaseCallback {
    /// Identity used for trust-registry lookups and release records.
    fn contract_id(&self) -> ContractId;

    /// Invoked once, after the vault has been marked released.
    fn on_release(&mut self, recipient: &Principal, amount: u64) -> Result<(), CallbackError>;
}

/// Second half of a callback release: tell `target` that `amount` from
/// `vault_id` was released to `recipient`.
///
/// The vault must already be committed as released. A target error becomes
/// [`VaultError::Callback`].
pub fn notify_release(
    target: &mut dyn ReleaseCallback,
    vault_id: VaultId,
    recipient: &Principal,
    amount: u64,
) -> Result<(), VaultError> {
    target.on_release(recipient, amount).map_err(|e| {
        let contract = target.contract_id();
        warn!(vault_id, contract = %contract, error = %e, "release callback failed; vault stays released");
        VaultError::Callback(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Refusing;

    impl ReleaseCallback for Refusing {
        fn contract_id(&self) -> ContractId {
            ContractId::new("refusing")
        }

        fn on_release(&mut self, _: &Principal, _: u64) -> Result<(), CallbackError> {
            Err(CallbackError::Rejected("closed".to_string()))
        }
    }

    #[test]
    fn target_error_becomes_callback_error() {
        assert_eq!(
            notify_release(&mut Refusing, 4, &Principal::new("alice"), 10),
            Err(VaultError::Callback(CallbackError::Rejected("closed".to_string())))
        );
    }
}
