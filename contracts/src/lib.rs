//! # Lockbox Vault Ledger
//!
//! Time-locked vaults held on behalf of principals. A vault records an owner,
//! an amount and an unlock time; once released it is terminal. Around that
//! core sit:
//!
//! - **Release paths**: plain owner release, passkey release (a signature by
//!   a key in the Authorization Registry), callback release to an external
//!   target, beneficiary claim after a grace period, and batch release.
//! - **Registries**: one alternate-auth key per principal, and an
//!   admin-maintained allow-list of callback targets.
//! - **Persistence**: a sled store of ledger snapshots.
//!
//! ## Design Principles
//!
//! 1. Amount and time arithmetic is checked. Overflow is an
//!    `InvalidAmount`, never a wrap.
//! 2. Vault state is an enum (`Locked` / `Released { at, path }`), not a flag.
//! 3. Preconditions run in a fixed order so error precedence is stable.
//! 4. Time comes from an injected [`Clock`](lockbox_protocol::clock::Clock),
//!    read once per operation.

pub mod auth_registry;
pub mod batch;
pub mod callback;
pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod shared;
pub mod store;
pub mod trust_registry;
pub mod vault;

pub use auth_registry::AuthorizationRegistry;
pub use batch::BatchCoordinator;
pub use callback::{notify_release, CallbackError, ReleaseCallback};
pub use config::LedgerConfig;
pub use error::VaultError;
pub use events::LedgerEvent;
pub use ledger::{LedgerSnapshot, VaultLedger};
pub use shared::SharedLedger;
pub use store::{LedgerStore, StoreError};
pub use trust_registry::{ContractTrustRegistry, TrustedContract};
pub use vault::{ReleasePath, Vault, VaultId, VaultStatus};
