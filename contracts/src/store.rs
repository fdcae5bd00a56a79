//! # Ledger Store
//!
//! sled-backed persistence for a [`VaultLedger`](crate::ledger::VaultLedger).
//! The ledger itself is in-memory; hosts load a [`LedgerSnapshot`] at start,
//! run operations, and then either save the whole snapshot back or write
//! just the records named by the drained events
//! ([`save_changes`](LedgerStore::save_changes)).
//!
//! ## Tree Layout
//!
//! | Tree                | Key                 | Value                    |
//! |---------------------|---------------------|--------------------------|
//! | `vaults`            | `vault_id` (8B BE)  | `bincode(Vault)`         |
//! | `auth_keys`         | principal (UTF-8)   | `bincode(AuthPublicKey)` |
//! | `trusted_contracts` | contract id (UTF-8) | `bincode(TrustedContract)` |
//! | `metadata`          | key (UTF-8)         | value (bytes)            |
//!
//! Vault ids are big-endian so sled's byte order matches id order and a full
//! scan yields vaults sorted by id.
//!
//! The ledger never deletes vaults, keys or trust entries, so saving is a
//! batched upsert per tree.

use std::collections::BTreeSet;
use std::path::Path;

use lockbox_protocol::crypto::AuthPublicKey;
use lockbox_protocol::identity::{ContractId, Principal};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Batch, Db, Tree};
use tracing::debug;

use crate::config::LedgerConfig;
use crate::events::LedgerEvent;
use crate::ledger::{LedgerSnapshot, VaultLedger};
use crate::trust_registry::TrustedContract;
use crate::vault::Vault;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt record in `{tree}`: {reason}")]
    Corrupt { tree: &'static str, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

const META_NEXT_VAULT_ID: &[u8] = b"next_vault_id";
const META_LEDGER_CONFIG: &[u8] = b"ledger_config";

fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn utf8_key(tree: &'static str, key: &[u8]) -> StoreResult<String> {
    String::from_utf8(key.to_vec()).map_err(|e| StoreError::Corrupt {
        tree,
        reason: e.to_string(),
    })
}

/// Persistent home of one ledger.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    db: Db,
    vaults: Tree,
    auth_keys: Tree,
    trusted_contracts: Tree,
    metadata: Tree,
}

impl LedgerStore {
    /// Open or create a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// In-memory store, removed on drop.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        Ok(Self {
            vaults: db.open_tree("vaults")?,
            auth_keys: db.open_tree("auth_keys")?,
            trusted_contracts: db.open_tree("trusted_contracts")?,
            metadata: db.open_tree("metadata")?,
            db,
        })
    }

    // -- Config -------------------------------------------------------------

    pub fn save_config(&self, config: &LedgerConfig) -> StoreResult<()> {
        self.metadata.insert(META_LEDGER_CONFIG, encode(config)?)?;
        self.db.flush()?;
        Ok(())
    }

    /// `None` until [`save_config`](Self::save_config) has run once.
    pub fn load_config(&self) -> StoreResult<Option<LedgerConfig>> {
        match self.metadata.get(META_LEDGER_CONFIG)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // -- Snapshot -----------------------------------------------------------

    /// Persist `snapshot` and flush.
    pub fn save_snapshot(&self, snapshot: &LedgerSnapshot) -> StoreResult<()> {
        let mut vault_batch = Batch::default();
        for vault in &snapshot.vaults {
            vault_batch.insert(vault.vault_id.to_be_bytes().to_vec(), encode(vault)?);
        }
        self.vaults.apply_batch(vault_batch)?;

        let mut key_batch = Batch::default();
        for (principal, key) in &snapshot.auth_keys {
            key_batch.insert(principal.as_bytes(), encode(key)?);
        }
        self.auth_keys.apply_batch(key_batch)?;

        let mut trust_batch = Batch::default();
        for (target, entry) in &snapshot.trusted_contracts {
            trust_batch.insert(target.as_bytes(), encode(entry)?);
        }
        self.trusted_contracts.apply_batch(trust_batch)?;

        self.metadata
            .insert(META_NEXT_VAULT_ID, snapshot.next_vault_id.to_be_bytes().to_vec())?;
        self.db.flush()?;

        debug!(
            vaults = snapshot.vaults.len(),
            next_vault_id = snapshot.next_vault_id,
            "ledger snapshot saved"
        );
        Ok(())
    }

    /// Write the records `events` touched, read back from `ledger`, plus the
    /// id counter, and flush. Untouched records are left alone.
    pub fn save_changes(&self, ledger: &VaultLedger, events: &[LedgerEvent]) -> StoreResult<()> {
        let mut vault_ids = BTreeSet::new();
        let mut key_batch = Batch::default();
        let mut trust_batch = Batch::default();

        for event in events {
            match event {
                LedgerEvent::AuthKeyRegistered { principal } => {
                    if let Some(key) = ledger.auth_key(principal) {
                        key_batch.insert(principal.as_bytes(), encode(key)?);
                    }
                }
                LedgerEvent::ContractVerified { target, .. } => {
                    if let Some(entry) = ledger.trusted_contract(target) {
                        trust_batch.insert(target.as_bytes(), encode(entry)?);
                    }
                }
                other => {
                    if let Some(vault_id) = other.vault_id() {
                        vault_ids.insert(vault_id);
                    }
                }
            }
        }

        let mut vault_batch = Batch::default();
        for vault_id in &vault_ids {
            if let Some(vault) = ledger.vault(*vault_id) {
                vault_batch.insert(vault_id.to_be_bytes().to_vec(), encode(vault)?);
            }
        }

        self.vaults.apply_batch(vault_batch)?;
        self.auth_keys.apply_batch(key_batch)?;
        self.trusted_contracts.apply_batch(trust_batch)?;
        self.metadata
            .insert(META_NEXT_VAULT_ID, ledger.vault_count().to_be_bytes().to_vec())?;
        self.db.flush()?;

        debug!(
            events = events.len(),
            vaults = vault_ids.len(),
            next_vault_id = ledger.vault_count(),
            "ledger changes saved"
        );
        Ok(())
    }

    /// Everything stored so far. An empty store yields the default snapshot.
    pub fn load_snapshot(&self) -> StoreResult<LedgerSnapshot> {
        let vaults = self
            .vaults
            .iter()
            .map(|entry| {
                let (_, bytes) = entry?;
                decode::<Vault>(&bytes)
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let auth_keys = self
            .auth_keys
            .iter()
            .map(|entry| {
                let (key, bytes) = entry?;
                let principal = Principal::new(utf8_key("auth_keys", &key)?);
                Ok((principal, decode::<AuthPublicKey>(&bytes)?))
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let trusted_contracts = self
            .trusted_contracts
            .iter()
            .map(|entry| {
                let (key, bytes) = entry?;
                let target = ContractId::new(utf8_key("trusted_contracts", &key)?);
                Ok((target, decode::<TrustedContract>(&bytes)?))
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(LedgerSnapshot {
            next_vault_id: self.next_vault_id()?,
            vaults,
            auth_keys,
            trusted_contracts,
        })
    }

    fn next_vault_id(&self) -> StoreResult<u64> {
        match self.metadata.get(META_NEXT_VAULT_ID)? {
            Some(bytes) => {
                let arr = <[u8; 8]>::try_from(&bytes[..]).map_err(|_| StoreError::Corrupt {
                    tree: "metadata",
                    reason: format!("next_vault_id has {} bytes", bytes.len()),
                })?;
                Ok(u64::from_be_bytes(arr))
            }
            None => Ok(0),
        }
    }

    /// Number of vault records on disk.
    pub fn vault_count(&self) -> usize {
        self.vaults.len()
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}
