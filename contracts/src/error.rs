//! Ledger error taxonomy.
//!
//! The first eight variants are the stable error kinds of the vault ledger
//! and carry fixed numeric codes (see [`VaultError::code`]). Hosts that
//! surface errors over a wire should send the code, not the message.

use lockbox_protocol::clock::Timestamp;
use lockbox_protocol::identity::Principal;
use thiserror::Error;

use crate::callback::CallbackError;
use crate::vault::VaultId;

/// Errors that can occur during vault ledger operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VaultError {
    /// The caller is not allowed to perform this operation on this record.
    #[error("unauthorized: {caller} may not perform this operation")]
    Unauthorized {
        /// The principal that attempted the operation.
        caller: Principal,
    },

    /// The vault does not exist, or has already been released. Both look the
    /// same from the outside.
    #[error("vault {vault_id} not found or already released")]
    NotFound {
        /// The id that was looked up.
        vault_id: VaultId,
    },

    /// The vault's unlock time has not been reached.
    #[error("vault {vault_id} is locked until {unlock_time} (now {now})")]
    StillLocked {
        vault_id: VaultId,
        unlock_time: Timestamp,
        now: Timestamp,
    },

    /// A zero or overflowing amount, or a lock duration/extension outside
    /// policy.
    #[error("invalid amount: {0}")]
    InvalidAmount(&'static str),

    /// The presented signature does not verify against the caller's
    /// registered key.
    #[error("invalid signature")]
    InvalidSignature,

    /// A beneficiary claim was made against a vault without a beneficiary.
    #[error("vault {vault_id} has no beneficiary")]
    NoBeneficiary { vault_id: VaultId },

    /// The beneficiary grace window after unlock has not elapsed.
    #[error("vault {vault_id} is claimable by its beneficiary from {claimable_at} (now {now})")]
    GracePeriodNotPassed {
        vault_id: VaultId,
        claimable_at: Timestamp,
        now: Timestamp,
    },

    /// Too many ids in one batch. Nothing was released.
    #[error("batch of {size} vaults exceeds the maximum of {max}")]
    BatchSizeExceeded { size: usize, max: usize },

    /// Vault metadata longer than the configured character limit.
    #[error("metadata is {length} characters, maximum is {max}")]
    MetadataTooLong { length: usize, max: usize },

    /// The callback target failed after the vault was released. The release
    /// itself stands.
    #[error("release callback failed: {0}")]
    Callback(#[from] CallbackError),
}

impl VaultError {
    /// Stable numeric code for this error kind.
    pub fn code(&self) -> u8 {
        match self {
            VaultError::Unauthorized { .. } => 1,
            VaultError::NotFound { .. } => 2,
            VaultError::StillLocked { .. } => 3,
            VaultError::InvalidAmount(_) => 4,
            VaultError::InvalidSignature => 5,
            VaultError::NoBeneficiary { .. } => 6,
            VaultError::GracePeriodNotPassed { .. } => 7,
            VaultError::BatchSizeExceeded { .. } => 8,
            VaultError::MetadataTooLong { .. } => 9,
            VaultError::Callback(_) => 10,
        }
    }

    pub(crate) fn unauthorized(caller: &Principal) -> Self {
        VaultError::Unauthorized {
            caller: caller.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let errors = [
            VaultError::unauthorized(&Principal::new("mallory")),
            VaultError::NotFound { vault_id: 0 },
            VaultError::StillLocked {
                vault_id: 0,
                unlock_time: 10,
                now: 5,
            },
            VaultError::InvalidAmount("zero"),
            VaultError::InvalidSignature,
            VaultError::NoBeneficiary { vault_id: 0 },
            VaultError::GracePeriodNotPassed {
                vault_id: 0,
                claimable_at: 10,
                now: 5,
            },
            VaultError::BatchSizeExceeded { size: 11, max: 10 },
        ];
        let codes: Vec<u8> = errors.iter().map(VaultError::code).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn callback_error_converts() {
        let err: VaultError = CallbackError::Rejected("recipient frozen".into()).into();
        assert_eq!(err.code(), 10);
        assert!(err.to_string().contains("recipient frozen"));
    }
}
