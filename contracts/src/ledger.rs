//! # Vault Ledger
//!
//! The state machine at the heart of Lockbox. It owns every vault record and
//! the id counter, and decides for each mutating operation whether the
//! transition is legal.
//!
//! ## Check order
//!
//! Preconditions are checked in a fixed order so error precedence is
//! deterministic:
//!
//! 1. **existence** — unknown id → `NotFound`
//! 2. **authorization** — wrong caller (or, for passkey releases, missing key
//!    or bad signature) → `Unauthorized` / `InvalidSignature`
//! 3. **terminal state** — already released → `NotFound`
//! 4. **time / arguments** — `StillLocked`, `GracePeriodNotPassed`,
//!    `InvalidAmount`
//!
//! Beneficiary claims check "is there a beneficiary" before "is it you".
//! Metadata edits skip step 3 entirely: a released vault's note may still
//! change.
//!
//! ## Concurrency
//!
//! The ledger assumes its host serializes operations. Every method takes
//! `&mut self` and runs to completion; there is no internal locking. Wrap it
//! in [`SharedLedger`](crate::shared::SharedLedger) when that assumption
//! doesn't hold.

use std::collections::BTreeMap;
use std::sync::Arc;

use lockbox_protocol::clock::{Clock, Timestamp};
use lockbox_protocol::crypto::{
    AuthPublicKey, AuthSignature, CodeHash, MessageDigest, SignatureVerifier,
};
use lockbox_protocol::identity::{ContractId, Principal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth_registry::AuthorizationRegistry;
use crate::batch::BatchCoordinator;
use crate::callback::{notify_release, ReleaseCallback};
use crate::config::LedgerConfig;
use crate::error::VaultError;
use crate::events::LedgerEvent;
use crate::trust_registry::{ContractTrustRegistry, TrustedContract};
use crate::vault::{ReleasePath, Vault, VaultId, VaultStatus};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Persistable form of the ledger state: the vault table, both registries,
/// and the id counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub next_vault_id: VaultId,
    pub vaults: Vec<Vault>,
    pub auth_keys: Vec<(Principal, AuthPublicKey)>,
    pub trusted_contracts: Vec<(ContractId, TrustedContract)>,
}

// ---------------------------------------------------------------------------
// VaultLedger
// ---------------------------------------------------------------------------

/// All vault records plus the registries consulted during releases.
pub struct VaultLedger {
    config: LedgerConfig,
    vaults: BTreeMap<VaultId, Vault>,
    next_vault_id: VaultId,
    auth: AuthorizationRegistry,
    trust: ContractTrustRegistry,
    clock: Arc<dyn Clock>,
    verifier: Arc<dyn SignatureVerifier>,
    events: Vec<LedgerEvent>,
}

fn reject(op: &'static str, vault_id: Option<VaultId>, err: VaultError) -> VaultError {
    debug!(op, ?vault_id, code = err.code(), error = %err, "operation rejected");
    err
}

impl VaultLedger {
    /// An empty ledger. The first vault gets id 0.
    pub fn new(
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        let trust = ContractTrustRegistry::new(config.admin.clone());
        Self {
            config,
            vaults: BTreeMap::new(),
            next_vault_id: 0,
            auth: AuthorizationRegistry::new(),
            trust,
            clock,
            verifier,
            events: Vec::new(),
        }
    }

    /// Rebuild a ledger from a snapshot.
    ///
    /// The counter is never allowed to fall at or below an existing id, even
    /// if the snapshot's counter says otherwise.
    pub fn restore(
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn SignatureVerifier>,
        snapshot: LedgerSnapshot,
    ) -> Self {
        let past_highest = snapshot
            .vaults
            .iter()
            .map(|v| v.vault_id.saturating_add(1))
            .max()
            .unwrap_or(0);
        let trust =
            ContractTrustRegistry::with_entries(config.admin.clone(), snapshot.trusted_contracts);

        Self {
            config,
            vaults: snapshot
                .vaults
                .into_iter()
                .map(|v| (v.vault_id, v))
                .collect(),
            next_vault_id: snapshot.next_vault_id.max(past_highest),
            auth: snapshot.auth_keys.into_iter().collect(),
            trust,
            clock,
            verifier,
            events: Vec::new(),
        }
    }

    /// Copy the persistable state out.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            next_vault_id: self.next_vault_id,
            vaults: self.vaults.values().cloned().collect(),
            auth_keys: self.auth.entries(),
            trusted_contracts: self.trust.entries(),
        }
    }

    // -- Registries ---------------------------------------------------------

    /// Register or replace the caller's alternate-auth key.
    pub fn register_auth_key(&mut self, caller: &Principal, public_key: AuthPublicKey) {
        let replaced = self.auth.register(caller, public_key).is_some();
        info!(principal = %caller, replaced, "auth key registered");
        self.events.push(LedgerEvent::AuthKeyRegistered {
            principal: caller.clone(),
        });
    }

    /// Allow-list a callback target. Admin only.
    ///
    /// # Errors
    ///
    /// [`VaultError::Unauthorized`] if `caller` is not the configured admin.
    pub fn verify_contract(
        &mut self,
        caller: &Principal,
        target: &ContractId,
        expected_hash: CodeHash,
    ) -> Result<(), VaultError> {
        self.trust
            .verify_contract(caller, target, expected_hash)
            .map_err(|e| reject("verify_contract", None, e))?;

        info!(contract = %target, code_hash = %expected_hash, "contract verified");
        self.events.push(LedgerEvent::ContractVerified {
            target: target.clone(),
            code_hash: expected_hash,
        });
        Ok(())
    }

    // -- Creation -----------------------------------------------------------

    /// Lock `amount` for at least `lock_duration` seconds.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidAmount`] for a zero amount, a duration below the
    /// configured minimum, or an unlock time that would overflow.
    pub fn create_vault(
        &mut self,
        caller: &Principal,
        amount: u64,
        lock_duration: u64,
    ) -> Result<VaultId, VaultError> {
        self.try_create_vault(caller, amount, lock_duration)
            .map_err(|e| reject("create_vault", None, e))
    }

    fn try_create_vault(
        &mut self,
        caller: &Principal,
        amount: u64,
        lock_duration: u64,
    ) -> Result<VaultId, VaultError> {
        if amount == 0 {
            return Err(VaultError::InvalidAmount("amount must be greater than zero"));
        }
        if lock_duration < self.config.min_lock_duration {
            return Err(VaultError::InvalidAmount("lock duration below minimum"));
        }

        let now = self.clock.now();
        let unlock_time = now
            .checked_add(lock_duration)
            .ok_or(VaultError::InvalidAmount("unlock time overflows"))?;
        let vault_id = self.next_vault_id;
        let next = vault_id
            .checked_add(1)
            .ok_or(VaultError::InvalidAmount("vault id space exhausted"))?;

        self.vaults.insert(
            vault_id,
            Vault::new(vault_id, caller.clone(), amount, now, unlock_time),
        );
        self.next_vault_id = next;

        info!(vault_id, owner = %caller, amount, unlock_time, "vault created");
        self.events.push(LedgerEvent::VaultCreated {
            vault_id,
            owner: caller.clone(),
            amount,
            unlock_time,
        });
        Ok(vault_id)
    }

    // -- Release paths ------------------------------------------------------

    /// Owner release once the unlock time has been reached.
    ///
    /// # Errors
    ///
    /// `NotFound` (missing or already released), `Unauthorized`,
    /// `StillLocked`, in that precedence.
    pub fn release_vault(&mut self, vault_id: VaultId, caller: &Principal) -> Result<(), VaultError> {
        self.release_as(vault_id, caller, ReleasePath::Owner)
            .map_err(|e| reject("release_vault", Some(vault_id), e))
    }

    /// Owner release with the same rules as [`release_vault`](Self::release_vault),
    /// additionally proven by a signature from the caller's registered key.
    ///
    /// # Errors
    ///
    /// As `release_vault`, plus `Unauthorized` when the caller has no
    /// registered key and `InvalidSignature` when the signature does not
    /// verify. Both are authorization failures and take precedence over the
    /// released and time checks.
    pub fn release_vault_with_passkey(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
        digest: &MessageDigest,
        signature: &AuthSignature,
    ) -> Result<(), VaultError> {
        self.try_release_with_passkey(vault_id, caller, digest, signature)
            .map_err(|e| reject("release_vault_with_passkey", Some(vault_id), e))
    }

    fn try_release_with_passkey(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
        digest: &MessageDigest,
        signature: &AuthSignature,
    ) -> Result<(), VaultError> {
        let now = self.clock.now();
        let vault = self.owned_vault(vault_id, caller)?;

        let key = self
            .auth
            .key_of(caller)
            .ok_or_else(|| VaultError::unauthorized(caller))?;
        if !self.verifier.verify(digest, signature, key) {
            return Err(VaultError::InvalidSignature);
        }

        Self::check_releasable(vault, now)?;
        self.commit_release(vault_id, now, ReleasePath::Passkey, caller.clone())?;
        Ok(())
    }

    /// Owner release that then notifies `target` via
    /// [`ReleaseCallback::on_release`] with the owner and amount.
    ///
    /// The vault is marked released before the call. If the callback fails
    /// its error is passed through as [`VaultError::Callback`] and the vault
    /// remains released.
    ///
    /// Hosts that persist state should call
    /// [`commit_callback_release`](Self::commit_callback_release), save, and
    /// then [`notify_release`] themselves, so the target never hears about a
    /// release that is not yet durable.
    ///
    /// # Errors
    ///
    /// The `release_vault` errors (nothing is called in that case);
    /// `Unauthorized` for an unverified target when
    /// `require_verified_callbacks` is on; `Callback` after a committed
    /// release whose callback failed.
    pub fn release_to_callback(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
        target: &mut dyn ReleaseCallback,
    ) -> Result<(), VaultError> {
        let amount = self.commit_callback_release(vault_id, caller, &target.contract_id())?;
        notify_release(target, vault_id, caller, amount)
    }

    /// First half of [`release_to_callback`](Self::release_to_callback):
    /// run every check and mark the vault released with
    /// `ReleasePath::Callback { target: contract }`. Returns the amount the
    /// target should be told about.
    pub fn commit_callback_release(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
        contract: &ContractId,
    ) -> Result<u64, VaultError> {
        self.try_commit_callback_release(vault_id, caller, contract)
            .map_err(|e| reject("release_to_callback", Some(vault_id), e))
    }

    fn try_commit_callback_release(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
        contract: &ContractId,
    ) -> Result<u64, VaultError> {
        let now = self.clock.now();
        let vault = self.owned_vault(vault_id, caller)?;
        Self::check_releasable(vault, now)?;

        if self.config.require_verified_callbacks && !self.trust.is_verified(contract) {
            return Err(VaultError::unauthorized(caller));
        }

        self.commit_release(
            vault_id,
            now,
            ReleasePath::Callback {
                target: contract.clone(),
            },
            caller.clone(),
        )
    }

    /// Fallback release by the designated beneficiary, available from
    /// `unlock_time + beneficiary_grace_period` onwards.
    ///
    /// # Errors
    ///
    /// `NotFound`, `NoBeneficiary`, `Unauthorized` (not the beneficiary),
    /// `NotFound` (already released), `GracePeriodNotPassed`.
    pub fn claim_as_beneficiary(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
    ) -> Result<(), VaultError> {
        self.try_claim_as_beneficiary(vault_id, caller)
            .map_err(|e| reject("claim_as_beneficiary", Some(vault_id), e))
    }

    fn try_claim_as_beneficiary(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
    ) -> Result<(), VaultError> {
        let now = self.clock.now();
        let vault = self
            .vaults
            .get(&vault_id)
            .ok_or(VaultError::NotFound { vault_id })?;

        let beneficiary = vault
            .beneficiary
            .as_ref()
            .ok_or(VaultError::NoBeneficiary { vault_id })?;
        if beneficiary != caller {
            return Err(VaultError::unauthorized(caller));
        }
        if vault.is_released() {
            return Err(VaultError::NotFound { vault_id });
        }

        let claimable_at = vault.beneficiary_claimable_at(self.config.beneficiary_grace_period);
        if now < claimable_at {
            return Err(VaultError::GracePeriodNotPassed {
                vault_id,
                claimable_at,
                now,
            });
        }

        self.commit_release(vault_id, now, ReleasePath::Beneficiary, caller.clone())?;
        Ok(())
    }

    /// Release every id in `vault_ids` as `caller`. See [`BatchCoordinator`].
    pub fn release_vaults_batch(
        &mut self,
        caller: &Principal,
        vault_ids: &[VaultId],
    ) -> Result<Vec<bool>, VaultError> {
        BatchCoordinator::new(self.config.max_batch_size).release_all(self, caller, vault_ids)
    }

    /// The plain owner release, tagged with the path that requested it.
    pub(crate) fn release_as(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
        path: ReleasePath,
    ) -> Result<(), VaultError> {
        let now = self.clock.now();
        let vault = self.owned_vault(vault_id, caller)?;
        Self::check_releasable(vault, now)?;
        self.commit_release(vault_id, now, path, caller.clone())?;
        Ok(())
    }

    /// Terminal-state guard followed by the unlock-time check.
    fn check_releasable(vault: &Vault, now: Timestamp) -> Result<(), VaultError> {
        if vault.is_released() {
            return Err(VaultError::NotFound {
                vault_id: vault.vault_id,
            });
        }
        if !vault.is_unlocked_at(now) {
            return Err(VaultError::StillLocked {
                vault_id: vault.vault_id,
                unlock_time: vault.unlock_time,
                now,
            });
        }
        Ok(())
    }

    /// Flip the vault to `Released`. Preconditions are the caller's job.
    /// Returns the released amount.
    fn commit_release(
        &mut self,
        vault_id: VaultId,
        now: Timestamp,
        path: ReleasePath,
        released_to: Principal,
    ) -> Result<u64, VaultError> {
        let vault = self
            .vaults
            .get_mut(&vault_id)
            .ok_or(VaultError::NotFound { vault_id })?;
        vault.status = VaultStatus::Released {
            at: now,
            path: path.clone(),
        };
        let amount = vault.amount;

        info!(vault_id, released_to = %released_to, amount, path = %path, "vault released");
        self.events.push(LedgerEvent::VaultReleased {
            vault_id,
            released_to,
            amount,
            path,
            at: now,
        });
        Ok(amount)
    }

    // -- Owner mutations ----------------------------------------------------

    /// Add value to a locked vault.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized`, `NotFound` (released), then
    /// `InvalidAmount` for zero or an overflowing total.
    pub fn add_to_vault(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
        additional_amount: u64,
    ) -> Result<(), VaultError> {
        self.try_add_to_vault(vault_id, caller, additional_amount)
            .map_err(|e| reject("add_to_vault", Some(vault_id), e))
    }

    fn try_add_to_vault(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
        additional_amount: u64,
    ) -> Result<(), VaultError> {
        let vault = self.live_vault_mut(vault_id, caller)?;
        if additional_amount == 0 {
            return Err(VaultError::InvalidAmount(
                "additional amount must be greater than zero",
            ));
        }
        let new_amount = vault
            .amount
            .checked_add(additional_amount)
            .ok_or(VaultError::InvalidAmount("vault amount overflows"))?;
        vault.amount = new_amount;

        info!(vault_id, added = additional_amount, new_amount, "vault topped up");
        self.events.push(LedgerEvent::VaultToppedUp {
            vault_id,
            added: additional_amount,
            new_amount,
        });
        Ok(())
    }

    /// Push the unlock time further out.
    ///
    /// There is no ceiling on the resulting unlock time. An owner can lock a
    /// vault for good. `max_lock_extension` caps a single call when set.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized`, `NotFound` (released), then
    /// `InvalidAmount` for zero, an extension above the configured cap, or
    /// an overflowing unlock time.
    pub fn extend_vault_lock(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
        additional_time: u64,
    ) -> Result<(), VaultError> {
        self.try_extend_vault_lock(vault_id, caller, additional_time)
            .map_err(|e| reject("extend_vault_lock", Some(vault_id), e))
    }

    fn try_extend_vault_lock(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
        additional_time: u64,
    ) -> Result<(), VaultError> {
        let max_extension = self.config.max_lock_extension;
        let vault = self.live_vault_mut(vault_id, caller)?;
        if additional_time == 0 {
            return Err(VaultError::InvalidAmount(
                "extension must be greater than zero",
            ));
        }
        if let Some(max) = max_extension {
            if additional_time > max {
                return Err(VaultError::InvalidAmount("extension exceeds policy maximum"));
            }
        }
        let new_unlock_time = vault
            .unlock_time
            .checked_add(additional_time)
            .ok_or(VaultError::InvalidAmount("unlock time overflows"))?;
        vault.unlock_time = new_unlock_time;

        info!(vault_id, added_secs = additional_time, new_unlock_time, "vault lock extended");
        self.events.push(LedgerEvent::LockExtended {
            vault_id,
            added_secs: additional_time,
            new_unlock_time,
        });
        Ok(())
    }

    /// Hand a locked vault to a new owner. Beneficiary and metadata stay.
    pub fn transfer_vault_ownership(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
        new_owner: &Principal,
    ) -> Result<(), VaultError> {
        let vault = self
            .live_vault_mut(vault_id, caller)
            .map_err(|e| reject("transfer_vault_ownership", Some(vault_id), e))?;
        let previous = std::mem::replace(&mut vault.owner, new_owner.clone());

        info!(vault_id, from = %previous, to = %new_owner, "vault ownership transferred");
        self.events.push(LedgerEvent::OwnershipTransferred {
            vault_id,
            from: previous,
            to: new_owner.clone(),
        });
        Ok(())
    }

    /// Set or overwrite the fallback beneficiary of a locked vault.
    pub fn set_beneficiary(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
        beneficiary: &Principal,
    ) -> Result<(), VaultError> {
        let vault = self
            .live_vault_mut(vault_id, caller)
            .map_err(|e| reject("set_beneficiary", Some(vault_id), e))?;
        vault.beneficiary = Some(beneficiary.clone());

        debug!(vault_id, beneficiary = %beneficiary, "beneficiary set");
        self.events.push(LedgerEvent::BeneficiarySet {
            vault_id,
            beneficiary: beneficiary.clone(),
        });
        Ok(())
    }

    /// Replace the vault's note. Allowed on released vaults too.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized`, then `MetadataTooLong` when `text`
    /// exceeds the configured number of characters.
    pub fn set_vault_metadata(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
        text: &str,
    ) -> Result<(), VaultError> {
        self.try_set_vault_metadata(vault_id, caller, text)
            .map_err(|e| reject("set_vault_metadata", Some(vault_id), e))
    }

    fn try_set_vault_metadata(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
        text: &str,
    ) -> Result<(), VaultError> {
        let max = self.config.max_metadata_length;
        let vault = self.owned_vault_mut(vault_id, caller)?;
        let length = text.chars().count();
        if length > max {
            return Err(VaultError::MetadataTooLong { length, max });
        }
        vault.metadata = Some(text.to_string());

        debug!(vault_id, length, "vault metadata updated");
        self.events.push(LedgerEvent::MetadataUpdated { vault_id });
        Ok(())
    }

    // -- Guards -------------------------------------------------------------

    /// Existence, then ownership.
    fn owned_vault(&self, vault_id: VaultId, caller: &Principal) -> Result<&Vault, VaultError> {
        let vault = self
            .vaults
            .get(&vault_id)
            .ok_or(VaultError::NotFound { vault_id })?;
        if &vault.owner != caller {
            return Err(VaultError::unauthorized(caller));
        }
        Ok(vault)
    }

    fn owned_vault_mut(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
    ) -> Result<&mut Vault, VaultError> {
        let vault = self
            .vaults
            .get_mut(&vault_id)
            .ok_or(VaultError::NotFound { vault_id })?;
        if &vault.owner != caller {
            return Err(VaultError::unauthorized(caller));
        }
        Ok(vault)
    }

    /// Existence, ownership, then the terminal-state guard.
    fn live_vault_mut(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
    ) -> Result<&mut Vault, VaultError> {
        let vault = self.owned_vault_mut(vault_id, caller)?;
        if vault.is_released() {
            return Err(VaultError::NotFound { vault_id });
        }
        Ok(vault)
    }

    // -- Queries ------------------------------------------------------------

    pub fn vault(&self, vault_id: VaultId) -> Option<&Vault> {
        self.vaults.get(&vault_id)
    }

    /// Number of vaults ever created (released ones included).
    pub fn vault_count(&self) -> u64 {
        self.next_vault_id
    }

    /// Every vault, released ones included, in id order.
    pub fn vaults(&self) -> impl Iterator<Item = &Vault> {
        self.vaults.values()
    }

    /// Vaults currently owned by `owner`, in id order.
    pub fn vaults_owned_by<'a>(
        &'a self,
        owner: &'a Principal,
    ) -> impl Iterator<Item = &'a Vault> + 'a {
        self.vaults.values().filter(move |v| &v.owner == owner)
    }

    pub fn has_auth_key(&self, principal: &Principal) -> bool {
        self.auth.has_key(principal)
    }

    pub fn auth_key(&self, principal: &Principal) -> Option<&AuthPublicKey> {
        self.auth.key_of(principal)
    }

    pub fn is_contract_verified(&self, target: &ContractId) -> bool {
        self.trust.is_verified(target)
    }

    pub fn trusted_contract(&self, target: &ContractId) -> Option<&TrustedContract> {
        self.trust.get(target)
    }

    pub fn current_time(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Events emitted since the last drain.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }
}
