//! Ledger events.
//!
//! Every committed transition appends one event. Rejected operations append
//! nothing, so the event stream is an exact log of state changes. Hosts pull
//! the queue with [`VaultLedger::drain_events`](crate::ledger::VaultLedger::drain_events).

use lockbox_protocol::clock::Timestamp;
use lockbox_protocol::crypto::CodeHash;
use lockbox_protocol::identity::{ContractId, Principal};
use serde::{Deserialize, Serialize};

use crate::vault::{ReleasePath, VaultId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    VaultCreated {
        vault_id: VaultId,
        owner: Principal,
        amount: u64,
        unlock_time: Timestamp,
    },
    VaultReleased {
        vault_id: VaultId,
        /// Who the value goes to: the owner, or the beneficiary on a claim.
        released_to: Principal,
        amount: u64,
        path: ReleasePath,
        at: Timestamp,
    },
    VaultToppedUp {
        vault_id: VaultId,
        added: u64,
        new_amount: u64,
    },
    LockExtended {
        vault_id: VaultId,
        added_secs: u64,
        new_unlock_time: Timestamp,
    },
    OwnershipTransferred {
        vault_id: VaultId,
        from: Principal,
        to: Principal,
    },
    BeneficiarySet {
        vault_id: VaultId,
        beneficiary: Principal,
    },
    MetadataUpdated {
        vault_id: VaultId,
    },
    AuthKeyRegistered {
        principal: Principal,
    },
    ContractVerified {
        target: ContractId,
        code_hash: CodeHash,
    },
}

impl LedgerEvent {
    /// The vault this event concerns, if any.
    pub fn vault_id(&self) -> Option<VaultId> {
        match self {
            LedgerEvent::VaultCreated { vault_id, .. }
            | LedgerEvent::VaultReleased { vault_id, .. }
            | LedgerEvent::VaultToppedUp { vault_id, .. }
            | LedgerEvent::LockExtended { vault_id, .. }
            | LedgerEvent::OwnershipTransferred { vault_id, .. }
            | LedgerEvent::BeneficiarySet { vault_id, .. }
            | LedgerEvent::MetadataUpdated { vault_id } => Some(*vault_id),
            LedgerEvent::AuthKeyRegistered { .. } | LedgerEvent::ContractVerified { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_tag() {
        let event = LedgerEvent::VaultReleased {
            vault_id: 3,
            released_to: Principal::new("alice"),
            amount: 1_000,
            path: ReleasePath::Passkey,
            at: 42,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "vault_released");
        assert_eq!(json["path"], "passkey");
        assert_eq!(event.vault_id(), Some(3));
    }

    #[test]
    fn registry_events_have_no_vault() {
        let event = LedgerEvent::AuthKeyRegistered {
            principal: Principal::new("alice"),
        };
        assert_eq!(event.vault_id(), None);
    }
}
