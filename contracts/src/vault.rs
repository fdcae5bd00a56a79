//! # Vault Records
//!
//! A vault is locked value with an owner, an unlock time and an optional
//! fallback beneficiary. Its lifecycle has exactly two states:
//!
//! ```text
//!   create ──► Locked ──(owner | passkey | callback | batch | beneficiary)──► Released
//! ```
//!
//! `Released` is terminal. Records are never deleted; a released vault keeps
//! its amount, owner and timestamps as an audit trail.

use lockbox_protocol::clock::Timestamp;
use lockbox_protocol::identity::{ContractId, Principal};
use serde::{Deserialize, Serialize};

/// Vault identifier. Assigned from a monotonically increasing counter and
/// never reused.
pub type VaultId = u64;

/// Which release path moved a vault to its terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePath {
    /// Plain owner release.
    Owner,
    /// Owner release authorized with the registered alternate-auth key.
    Passkey,
    /// Fallback claim by the designated beneficiary after the grace period.
    Beneficiary,
    /// Owner release that notified an external callback target.
    Callback { target: ContractId },
    /// Owner release driven by the batch coordinator.
    Batch,
}

impl std::fmt::Display for ReleasePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleasePath::Owner => write!(f, "owner"),
            ReleasePath::Passkey => write!(f, "passkey"),
            ReleasePath::Beneficiary => write!(f, "beneficiary"),
            ReleasePath::Callback { target } => write!(f, "callback({target})"),
            ReleasePath::Batch => write!(f, "batch"),
        }
    }
}

/// Lifecycle state of a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultStatus {
    /// Value is locked; owner-only mutations are allowed.
    Locked,
    /// Terminal. Only metadata may still change.
    Released {
        /// Ledger time at which the release was committed.
        at: Timestamp,
        /// How the vault was released.
        path: ReleasePath,
    },
}

/// A single vault record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Unique id, assigned at creation.
    pub vault_id: VaultId,
    /// Current owner. Transferable while locked.
    pub owner: Principal,
    /// Locked value units. Always > 0.
    pub amount: u64,
    /// Earliest time the owner may release.
    pub unlock_time: Timestamp,
    /// Creation time. Never changes.
    pub created_at: Timestamp,
    /// Locked or released.
    pub status: VaultStatus,
    /// Fallback claimant once the grace period after unlock has passed.
    pub beneficiary: Option<Principal>,
    /// Free-form note from the owner, bounded in length.
    pub metadata: Option<String>,
}

impl Vault {
    pub(crate) fn new(
        vault_id: VaultId,
        owner: Principal,
        amount: u64,
        created_at: Timestamp,
        unlock_time: Timestamp,
    ) -> Self {
        Self {
            vault_id,
            owner,
            amount,
            unlock_time,
            created_at,
            status: VaultStatus::Locked,
            beneficiary: None,
            metadata: None,
        }
    }

    /// `true` once any release path has fired.
    pub fn is_released(&self) -> bool {
        matches!(self.status, VaultStatus::Released { .. })
    }

    /// Whether the owner's unlock time has been reached at `now`.
    pub fn is_unlocked_at(&self, now: Timestamp) -> bool {
        now >= self.unlock_time
    }

    /// First instant a beneficiary may claim, given the grace period.
    /// Saturates rather than wrapping for absurdly distant unlock times.
    pub fn beneficiary_claimable_at(&self, grace_period: u64) -> Timestamp {
        self.unlock_time.saturating_add(grace_period)
    }

    /// The release path, if the vault has been released.
    pub fn release_path(&self) -> Option<&ReleasePath> {
        match &self.status {
            VaultStatus::Released { path, .. } => Some(path),
            VaultStatus::Locked => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vault {
        Vault::new(7, Principal::new("alice"), 1_000, 100, 86_500)
    }

    #[test]
    fn new_vault_is_locked() {
        let v = sample();
        assert!(!v.is_released());
        assert!(v.release_path().is_none());
        assert!(v.beneficiary.is_none());
        assert!(v.metadata.is_none());
    }

    #[test]
    fn unlock_boundary_is_inclusive() {
        let v = sample();
        assert!(!v.is_unlocked_at(86_499));
        assert!(v.is_unlocked_at(86_500));
    }

    #[test]
    fn claimable_at_saturates() {
        let mut v = sample();
        v.unlock_time = u64::MAX - 5;
        assert_eq!(v.beneficiary_claimable_at(100), u64::MAX);
    }

    #[test]
    fn released_status_serializes_with_path() {
        let mut v = sample();
        v.status = VaultStatus::Released {
            at: 90_000,
            path: ReleasePath::Callback {
                target: ContractId::new("payout"),
            },
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["status"]["released"]["at"], 90_000);
        assert_eq!(
            json["status"]["released"]["path"]["callback"]["target"],
            "payout"
        );
        let back: Vault = serde_json::from_value(json).unwrap();
        assert_eq!(back, v);
    }
}
