//! # Contract Trust Registry
//!
//! An administrative allow-list of callback targets. Each entry records that
//! the admin vouched for a target and which code hash they expect it to run.
//!
//! Trust here is asserted, not derived: nothing recomputes the target's
//! actual code hash. Treat `is_verified` as "the admin said so", not as a
//! cryptographic guarantee.

use std::collections::HashMap;

use lockbox_protocol::crypto::CodeHash;
use lockbox_protocol::identity::{ContractId, Principal};
use serde::{Deserialize, Serialize};

use crate::error::VaultError;

/// Allow-list entry for a callback target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedContract {
    pub verified: bool,
    pub code_hash: CodeHash,
}

/// Callback target → trust entry, writable only by the configured admin.
#[derive(Debug, Clone)]
pub struct ContractTrustRegistry {
    admin: Principal,
    contracts: HashMap<ContractId, TrustedContract>,
}

impl ContractTrustRegistry {
    pub fn new(admin: Principal) -> Self {
        Self {
            admin,
            contracts: HashMap::new(),
        }
    }

    /// Rebuild a registry from persisted entries.
    pub fn with_entries(
        admin: Principal,
        entries: impl IntoIterator<Item = (ContractId, TrustedContract)>,
    ) -> Self {
        Self {
            admin,
            contracts: entries.into_iter().collect(),
        }
    }

    pub fn admin(&self) -> &Principal {
        &self.admin
    }

    /// Mark `target` as verified with `expected_hash`. Admin only; an
    /// existing entry is overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Unauthorized`] if `caller` is not the admin.
    pub fn verify_contract(
        &mut self,
        caller: &Principal,
        target: &ContractId,
        expected_hash: CodeHash,
    ) -> Result<(), VaultError> {
        if caller != &self.admin {
            return Err(VaultError::unauthorized(caller));
        }
        self.contracts.insert(
            target.clone(),
            TrustedContract {
                verified: true,
                code_hash: expected_hash,
            },
        );
        Ok(())
    }

    pub fn is_verified(&self, target: &ContractId) -> bool {
        self.contracts.get(target).is_some_and(|c| c.verified)
    }

    pub fn get(&self, target: &ContractId) -> Option<&TrustedContract> {
        self.contracts.get(target)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Entries sorted by contract id.
    pub fn entries(&self) -> Vec<(ContractId, TrustedContract)> {
        let mut entries: Vec<_> = self
            .contracts
            .iter()
            .map(|(id, c)| (id.clone(), *c))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ContractTrustRegistry {
        ContractTrustRegistry::new(Principal::new("admin"))
    }

    #[test]
    fn admin_can_verify() {
        let mut reg = registry();
        let target = ContractId::new("payout");
        let hash = CodeHash::from_bytes([0xCD; 32]);

        reg.verify_contract(&Principal::new("admin"), &target, hash)
            .unwrap();
        assert!(reg.is_verified(&target));
        assert_eq!(reg.get(&target).unwrap().code_hash, hash);
    }

    #[test]
    fn non_admin_rejected() {
        let mut reg = registry();
        let target = ContractId::new("payout");
        let err = reg
            .verify_contract(
                &Principal::new("mallory"),
                &target,
                CodeHash::from_bytes([0; 32]),
            )
            .unwrap_err();
        assert_eq!(err.code(), 1);
        assert!(!reg.is_verified(&target));
        assert!(reg.is_empty());
    }

    #[test]
    fn re_verification_overwrites_hash() {
        let mut reg = registry();
        let admin = Principal::new("admin");
        let target = ContractId::new("payout");
        reg.verify_contract(&admin, &target, CodeHash::from_bytes([1; 32]))
            .unwrap();
        reg.verify_contract(&admin, &target, CodeHash::from_bytes([2; 32]))
            .unwrap();
        assert_eq!(reg.len(), 1);
        assert_eq!(
            reg.get(&target).unwrap().code_hash,
            CodeHash::from_bytes([2; 32])
        );
    }

    #[test]
    fn unknown_target_is_not_verified() {
        assert!(!registry().is_verified(&ContractId::new("nobody")));
    }
}
