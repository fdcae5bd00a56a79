//! # Command Execution
//!
//! Each subcommand is one ledger operation: open the store, restore the
//! ledger, run the operation, persist, and return a JSON result for stdout.
//!
//! Whatever an operation committed is saved before the command returns.
//! Callback releases are saved before the target is notified, so a target
//! never hears about a release the store does not have.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use lockbox_contracts::{
    notify_release, LedgerConfig, LedgerStore, ReleaseCallback, VaultError, VaultId, VaultLedger,
};
use lockbox_protocol::clock::{Clock, ManualClock, SystemClock};
use lockbox_protocol::crypto::{release_digest, AuthKeypair, Ed25519Verifier};
use lockbox_protocol::identity::Principal;
use serde_json::{json, Value};

use crate::cli::{Commands, InitArgs, LockboxCli};
use crate::journal::JournalCallback;

/// Database directory inside the data directory.
const DB_DIR: &str = "db";

/// An opened ledger bound to its store.
pub struct Host {
    store: LedgerStore,
    ledger: VaultLedger,
    data_dir: PathBuf,
}

impl Host {
    /// Open an initialized data directory.
    pub fn open(data_dir: &Path, now: Option<u64>) -> Result<Self> {
        let store = open_store(data_dir)?;
        let config = store
            .load_config()
            .context("failed to read ledger config")?
            .ok_or_else(|| {
                anyhow!(
                    "{} is not initialized; run `lockbox init --admin <principal>` first",
                    data_dir.display()
                )
            })?;
        let snapshot = store.load_snapshot().context("failed to read ledger state")?;

        let clock: Arc<dyn Clock> = match now {
            Some(ts) => Arc::new(ManualClock::new(ts)),
            None => Arc::new(SystemClock),
        };
        let ledger = VaultLedger::restore(config, clock, Arc::new(Ed25519Verifier), snapshot);

        Ok(Self {
            store,
            ledger,
            data_dir: data_dir.to_path_buf(),
        })
    }

    pub fn ledger(&self) -> &VaultLedger {
        &self.ledger
    }

    /// Run a mutating operation and persist whatever it committed.
    pub fn apply<T>(
        &mut self,
        op: impl FnOnce(&mut VaultLedger) -> Result<T, VaultError>,
    ) -> Result<T> {
        let outcome = op(&mut self.ledger);
        self.persist()?;
        Ok(outcome?)
    }

    /// Commit the release, save it, then notify `target`.
    pub fn release_to_callback(
        &mut self,
        vault_id: VaultId,
        caller: &Principal,
        target: &mut dyn ReleaseCallback,
    ) -> Result<()> {
        let contract = target.contract_id();
        let amount = self.apply(|l| l.commit_callback_release(vault_id, caller, &contract))?;
        notify_release(target, vault_id, caller, amount)?;
        Ok(())
    }

    fn persist(&mut self) -> Result<()> {
        let events = self.ledger.drain_events();
        if events.is_empty() {
            return Ok(());
        }
        for event in &events {
            let payload = serde_json::to_string(event)?;
            tracing::info!(vault_id = ?event.vault_id(), event = %payload, "ledger event");
        }
        self.store
            .save_changes(&self.ledger, &events)
            .context("failed to persist ledger state")
    }
}

fn open_store(data_dir: &Path) -> Result<LedgerStore> {
    let db_path = data_dir.join(DB_DIR);
    LedgerStore::open(&db_path)
        .with_context(|| format!("failed to open ledger database at {}", db_path.display()))
}

/// Create the data directory and persist the ledger policy.
fn init(data_dir: &Path, args: InitArgs) -> Result<Value> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
    let store = open_store(data_dir)?;
    if store.load_config()?.is_some() {
        bail!("{} is already initialized", data_dir.display());
    }

    let mut config = LedgerConfig::new(args.admin)
        .with_max_lock_extension(args.max_lock_extension)
        .with_verified_callbacks(args.require_verified_callbacks);
    if let Some(secs) = args.min_lock_duration {
        config = config.with_min_lock_duration(secs);
    }
    if let Some(secs) = args.grace_period {
        config = config.with_beneficiary_grace_period(secs);
    }
    store.save_config(&config).context("failed to save ledger config")?;

    tracing::info!(data_dir = %data_dir.display(), admin = %config.admin, "ledger initialized");
    Ok(json!({ "data_dir": data_dir.display().to_string(), "config": config }))
}

fn keypair_json(kp: &AuthKeypair) -> Value {
    json!({
        "secret_key": hex::encode(kp.secret_key_bytes()),
        "public_key": kp.public_key().to_hex(),
    })
}

/// Execute the parsed command. `Version` is handled by the caller.
pub fn execute(cli: LockboxCli) -> Result<Value> {
    let data_dir = cli.data_dir;

    // Commands that never touch the store.
    let command = match cli.command {
        Commands::Init(args) => return init(&data_dir, args),
        Commands::Keygen(args) => {
            let kp = args.seed.unwrap_or_else(AuthKeypair::generate);
            return Ok(keypair_json(&kp));
        }
        Commands::SignRelease(args) => {
            let digest = release_digest(args.vault_id, &args.caller.caller);
            let signature = args.secret_key.sign(&digest);
            return Ok(json!({
                "vault_id": args.vault_id,
                "caller": args.caller.caller,
                "digest": digest.to_hex(),
                "signature": signature.to_hex(),
            }));
        }
        Commands::Version => bail!("`version` is handled before the ledger is opened"),
        other => other,
    };

    let mut host = Host::open(&data_dir, cli.now)?;

    match command {
        Commands::RegisterKey(args) => {
            host.apply(|l| {
                l.register_auth_key(&args.caller.caller, args.public_key);
                Ok(())
            })?;
            Ok(json!({ "principal": args.caller.caller, "public_key": args.public_key.to_hex() }))
        }
        Commands::Create(args) => {
            let vault_id =
                host.apply(|l| l.create_vault(&args.caller.caller, args.amount, args.duration))?;
            Ok(json!({ "vault": host.ledger().vault(vault_id) }))
        }
        Commands::Release(args) => {
            host.apply(|l| l.release_vault(args.vault_id, &args.caller.caller))?;
            Ok(json!({ "vault": host.ledger().vault(args.vault_id) }))
        }
        Commands::ReleasePasskey(args) => {
            let caller = args.caller.caller;
            let digest = args
                .digest
                .unwrap_or_else(|| release_digest(args.vault_id, &caller));
            host.apply(|l| {
                l.release_vault_with_passkey(args.vault_id, &caller, &digest, &args.signature)
            })?;
            Ok(json!({ "vault": host.ledger().vault(args.vault_id) }))
        }
        Commands::VerifyContract(args) => {
            host.apply(|l| l.verify_contract(&args.caller.caller, &args.target, args.code_hash))?;
            Ok(json!({
                "target": args.target,
                "trusted": host.ledger().trusted_contract(&args.target),
            }))
        }
        Commands::ReleaseCallback(args) => {
            let mut target = JournalCallback::new(args.target, &host.data_dir);
            let journal = target.path().display().to_string();
            host.release_to_callback(args.vault_id, &args.caller.caller, &mut target)?;
            Ok(json!({ "vault": host.ledger().vault(args.vault_id), "journal": journal }))
        }
        Commands::Add(args) => {
            host.apply(|l| l.add_to_vault(args.vault_id, &args.caller.caller, args.amount))?;
            Ok(json!({ "vault": host.ledger().vault(args.vault_id) }))
        }
        Commands::Extend(args) => {
            host.apply(|l| l.extend_vault_lock(args.vault_id, &args.caller.caller, args.seconds))?;
            Ok(json!({ "vault": host.ledger().vault(args.vault_id) }))
        }
        Commands::Transfer(args) => {
            host.apply(|l| {
                l.transfer_vault_ownership(args.vault_id, &args.caller.caller, &args.new_owner)
            })?;
            Ok(json!({ "vault": host.ledger().vault(args.vault_id) }))
        }
        Commands::SetBeneficiary(args) => {
            host.apply(|l| l.set_beneficiary(args.vault_id, &args.caller.caller, &args.beneficiary))?;
            Ok(json!({ "vault": host.ledger().vault(args.vault_id) }))
        }
        Commands::Claim(args) => {
            host.apply(|l| l.claim_as_beneficiary(args.vault_id, &args.caller.caller))?;
            Ok(json!({ "vault": host.ledger().vault(args.vault_id) }))
        }
        Commands::SetMetadata(args) => {
            host.apply(|l| l.set_vault_metadata(args.vault_id, &args.caller.caller, &args.text))?;
            Ok(json!({ "vault": host.ledger().vault(args.vault_id) }))
        }
        Commands::BatchRelease(args) => {
            let released =
                host.apply(|l| l.release_vaults_batch(&args.caller.caller, &args.vault_ids))?;
            Ok(json!({ "vault_ids": args.vault_ids, "released": released }))
        }
        Commands::Show(args) => {
            let vault = host
                .ledger()
                .vault(args.vault_id)
                .ok_or(VaultError::NotFound {
                    vault_id: args.vault_id,
                })?;
            Ok(json!({ "vault": vault }))
        }
        Commands::List(args) => {
            let ledger = host.ledger();
            let vaults: Vec<_> = match &args.owner {
                Some(owner) => ledger.vaults_owned_by(owner).collect(),
                None => ledger.vaults().collect(),
            };
            Ok(json!({ "vaults": vaults }))
        }
        Commands::Status => {
            let ledger = host.ledger();
            Ok(json!({
                "node_version": env!("CARGO_PKG_VERSION"),
                "protocol_version": lockbox_protocol::config::PROTOCOL_VERSION,
                "data_dir": data_dir.display().to_string(),
                "now": ledger.current_time(),
                "vault_count": ledger.vault_count(),
                "config": ledger.config(),
            }))
        }
        Commands::Init(_) | Commands::Keygen(_) | Commands::SignRelease(_) | Commands::Version => {
            bail!("command does not operate on an opened ledger")
        }
    }
}
