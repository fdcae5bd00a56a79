//! Runtime policy for a [`VaultLedger`](crate::ledger::VaultLedger).
//!
//! Defaults come from `lockbox_protocol::config`. The administrative owner is
//! the only field without a default. It is configuration rather than a
//! constant so tests and hosts can pick their own.

use lockbox_protocol::config::{
    BENEFICIARY_GRACE_PERIOD_SECS, MAX_BATCH_SIZE, MAX_METADATA_LENGTH, MIN_LOCK_DURATION_SECS,
};
use lockbox_protocol::identity::Principal;
use serde::{Deserialize, Serialize};

/// Policy knobs of the vault ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// The only principal allowed to allow-list callback contracts.
    pub admin: Principal,
    /// Minimum `lock_duration` accepted by `create_vault`, in seconds.
    pub min_lock_duration: u64,
    /// Seconds after `unlock_time` before a beneficiary may claim.
    pub beneficiary_grace_period: u64,
    /// Maximum ids per batch release.
    pub max_batch_size: usize,
    /// Maximum metadata length in characters.
    pub max_metadata_length: usize,
    /// Optional cap on a single `extend_vault_lock` call. `None` means an
    /// owner may extend without bound.
    pub max_lock_extension: Option<u64>,
    /// When set, `release_to_callback` only accepts targets that the admin
    /// has verified.
    pub require_verified_callbacks: bool,
}

impl LedgerConfig {
    /// Protocol defaults with the given administrative owner.
    pub fn new(admin: Principal) -> Self {
        Self {
            admin,
            min_lock_duration: MIN_LOCK_DURATION_SECS,
            beneficiary_grace_period: BENEFICIARY_GRACE_PERIOD_SECS,
            max_batch_size: MAX_BATCH_SIZE,
            max_metadata_length: MAX_METADATA_LENGTH,
            max_lock_extension: None,
            require_verified_callbacks: false,
        }
    }

    pub fn with_min_lock_duration(mut self, secs: u64) -> Self {
        self.min_lock_duration = secs;
        self
    }

    pub fn with_beneficiary_grace_period(mut self, secs: u64) -> Self {
        self.beneficiary_grace_period = secs;
        self
    }

    pub fn with_max_lock_extension(mut self, secs: Option<u64>) -> Self {
        self.max_lock_extension = secs;
        self
    }

    pub fn with_verified_callbacks(mut self, required: bool) -> Self {
        self.require_verified_callbacks = required;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_protocol_constants() {
        let cfg = LedgerConfig::new(Principal::new("admin"));
        assert_eq!(cfg.min_lock_duration, 86_400);
        assert_eq!(cfg.beneficiary_grace_period, 2_592_000);
        assert_eq!(cfg.max_batch_size, 10);
        assert_eq!(cfg.max_metadata_length, 100);
        assert_eq!(cfg.max_lock_extension, None);
        assert!(!cfg.require_verified_callbacks);
    }

    #[test]
    fn builders_override() {
        let cfg = LedgerConfig::new(Principal::new("admin"))
            .with_max_lock_extension(Some(3_600))
            .with_verified_callbacks(true)
            .with_min_lock_duration(60)
            .with_beneficiary_grace_period(120);
        assert_eq!(cfg.max_lock_extension, Some(3_600));
        assert!(cfg.require_verified_callbacks);
        assert_eq!(cfg.min_lock_duration, 60);
        assert_eq!(cfg.beneficiary_grace_period, 120);
    }
}
