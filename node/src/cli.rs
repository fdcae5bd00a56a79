//! # CLI Interface
//!
//! Defines the command-line argument structure for `lockbox` using `clap`
//! derive. Every subcommand runs one ledger operation against the store in
//! `--data-dir` and prints its result as JSON.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use lockbox_contracts::VaultId;
use lockbox_protocol::crypto::{AuthKeypair, AuthPublicKey, AuthSignature, CodeHash, MessageDigest};
use lockbox_protocol::identity::{ContractId, Principal};

use crate::logging::LogFormat;

/// Lockbox time-locked vault ledger.
///
/// Locks value for a principal until an unlock time, then releases it to the
/// owner directly, via a registered signing key, through a callback target,
/// or to a beneficiary after a grace period.
#[derive(Parser, Debug)]
#[command(
    name = "lockbox",
    about = "Lockbox time-locked vault ledger",
    version,
    propagate_version = true
)]
pub struct LockboxCli {
    /// Directory holding the ledger database and the callback journal.
    #[arg(
        long,
        short = 'd',
        global = true,
        env = "LOCKBOX_DATA_DIR",
        default_value = ".lockbox"
    )]
    pub data_dir: PathBuf,

    /// Pin the ledger clock to this Unix timestamp (seconds) instead of the
    /// system clock.
    #[arg(long, global = true, env = "LOCKBOX_NOW")]
    pub now: Option<u64>,

    /// Log output format (logs go to stderr).
    #[arg(
        long,
        global = true,
        env = "LOCKBOX_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and fix the ledger policy.
    Init(InitArgs),
    /// Generate an alternate-auth keypair.
    Keygen(KeygenArgs),
    /// Register (or replace) the caller's alternate-auth public key.
    RegisterKey(RegisterKeyArgs),
    /// Lock an amount in a new vault.
    Create(CreateArgs),
    /// Release an unlocked vault to its owner.
    Release(VaultArgs),
    /// Release an unlocked vault with a signature from the caller's key.
    ReleasePasskey(ReleasePasskeyArgs),
    /// Produce the digest and signature for `release-passkey`.
    SignRelease(SignReleaseArgs),
    /// Allow-list a callback target (admin only).
    VerifyContract(VerifyContractArgs),
    /// Release an unlocked vault and notify a callback target.
    ReleaseCallback(ReleaseCallbackArgs),
    /// Add value to a locked vault.
    Add(AddArgs),
    /// Push a vault's unlock time further out.
    Extend(ExtendArgs),
    /// Hand a locked vault to a new owner.
    Transfer(TransferArgs),
    /// Designate the fallback beneficiary of a locked vault.
    SetBeneficiary(SetBeneficiaryArgs),
    /// Claim a vault as its beneficiary after the grace period.
    Claim(VaultArgs),
    /// Attach a short note to a vault.
    SetMetadata(SetMetadataArgs),
    /// Release several vaults in one call.
    BatchRelease(BatchReleaseArgs),
    /// Print one vault.
    Show(ShowArgs),
    /// List vaults, optionally only those of one owner.
    List(ListArgs),
    /// Print ledger policy and counters.
    Status,
    /// Print version information and exit.
    Version,
}

/// The principal performing a ledger operation.
#[derive(Args, Debug, Clone)]
pub struct CallerArg {
    #[arg(long, env = "LOCKBOX_CALLER", value_parser = Principal::from_str)]
    pub caller: Principal,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Principal allowed to verify callback contracts.
    #[arg(long, value_parser = Principal::from_str)]
    pub admin: Principal,

    /// Minimum lock duration in seconds.
    #[arg(long)]
    pub min_lock_duration: Option<u64>,

    /// Seconds after unlock before a beneficiary may claim.
    #[arg(long)]
    pub grace_period: Option<u64>,

    /// Cap on a single lock extension, in seconds. Unbounded when omitted.
    #[arg(long)]
    pub max_lock_extension: Option<u64>,

    /// Refuse callback releases to targets the admin has not verified.
    #[arg(long)]
    pub require_verified_callbacks: bool,
}

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Hex-encoded 32-byte seed. A random key is generated when omitted.
    #[arg(long, value_parser = AuthKeypair::from_hex)]
    pub seed: Option<AuthKeypair>,
}

#[derive(Args, Debug)]
pub struct RegisterKeyArgs {
    #[command(flatten)]
    pub caller: CallerArg,

    /// Hex-encoded 33-byte public key.
    #[arg(long, value_parser = AuthPublicKey::from_hex)]
    pub public_key: AuthPublicKey,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[command(flatten)]
    pub caller: CallerArg,

    #[arg(long)]
    pub amount: u64,

    /// Lock duration in seconds.
    #[arg(long)]
    pub duration: u64,
}

#[derive(Args, Debug)]
pub struct VaultArgs {
    #[command(flatten)]
    pub caller: CallerArg,

    #[arg(long)]
    pub vault_id: VaultId,
}

#[derive(Args, Debug)]
pub struct ReleasePasskeyArgs {
    #[command(flatten)]
    pub caller: CallerArg,

    #[arg(long)]
    pub vault_id: VaultId,

    /// Hex-encoded 64-byte signature.
    #[arg(long, value_parser = AuthSignature::from_hex)]
    pub signature: AuthSignature,

    /// Hex-encoded 32-byte digest that was signed. Defaults to the standard
    /// release digest for this vault and caller.
    #[arg(long, value_parser = MessageDigest::from_hex)]
    pub digest: Option<MessageDigest>,
}

#[derive(Args, Debug)]
pub struct SignReleaseArgs {
    #[command(flatten)]
    pub caller: CallerArg,

    #[arg(long)]
    pub vault_id: VaultId,

    /// Hex-encoded 32-byte secret key from `keygen`.
    #[arg(long, env = "LOCKBOX_SECRET_KEY", value_parser = AuthKeypair::from_hex)]
    pub secret_key: AuthKeypair,
}

#[derive(Args, Debug)]
pub struct VerifyContractArgs {
    #[command(flatten)]
    pub caller: CallerArg,

    #[arg(long, value_parser = ContractId::from_str)]
    pub target: ContractId,

    /// Hex-encoded 32-byte code hash the target is expected to run.
    #[arg(long, value_parser = CodeHash::from_hex)]
    pub code_hash: CodeHash,
}

#[derive(Args, Debug)]
pub struct ReleaseCallbackArgs {
    #[command(flatten)]
    pub caller: CallerArg,

    #[arg(long)]
    pub vault_id: VaultId,

    /// Callback target to notify. Notifications are appended to
    /// `callbacks.jsonl` in the data directory.
    #[arg(long, value_parser = ContractId::from_str)]
    pub target: ContractId,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[command(flatten)]
    pub caller: CallerArg,

    #[arg(long)]
    pub vault_id: VaultId,

    #[arg(long)]
    pub amount: u64,
}

#[derive(Args, Debug)]
pub struct ExtendArgs {
    #[command(flatten)]
    pub caller: CallerArg,

    #[arg(long)]
    pub vault_id: VaultId,

    /// Seconds to add to the unlock time.
    #[arg(long)]
    pub seconds: u64,
}

#[derive(Args, Debug)]
pub struct TransferArgs {
    #[command(flatten)]
    pub caller: CallerArg,

    #[arg(long)]
    pub vault_id: VaultId,

    #[arg(long, value_parser = Principal::from_str)]
    pub new_owner: Principal,
}

#[derive(Args, Debug)]
pub struct SetBeneficiaryArgs {
    #[command(flatten)]
    pub caller: CallerArg,

    #[arg(long)]
    pub vault_id: VaultId,

    #[arg(long, value_parser = Principal::from_str)]
    pub beneficiary: Principal,
}

#[derive(Args, Debug)]
pub struct SetMetadataArgs {
    #[command(flatten)]
    pub caller: CallerArg,

    #[arg(long)]
    pub vault_id: VaultId,

    #[arg(long)]
    pub text: String,
}

#[derive(Args, Debug)]
pub struct BatchReleaseArgs {
    #[command(flatten)]
    pub caller: CallerArg,

    /// Comma-separated vault ids, e.g. `--vault-ids 0,3,7`.
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    pub vault_ids: Vec<VaultId>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[arg(long)]
    pub vault_id: VaultId,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only vaults currently owned by this principal.
    #[arg(long, value_parser = Principal::from_str)]
    pub owner: Option<Principal>,
}
