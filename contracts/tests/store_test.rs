//! Persistence tests: a ledger saved to a sled store and reopened must come
//! back with the same vaults, registries and id counter.

use std::sync::Arc;

use lockbox_contracts::{LedgerConfig, LedgerStore, VaultError, VaultLedger};
use lockbox_protocol::clock::ManualClock;
use lockbox_protocol::crypto::{AuthKeypair, CodeHash, Ed25519Verifier};
use lockbox_protocol::identity::{ContractId, Principal};

const DAY: u64 = 86_400;

fn config() -> LedgerConfig {
    LedgerConfig::new(Principal::new("admin")).with_max_lock_extension(Some(7 * DAY))
}

fn restore(store: &LedgerStore, clock: Arc<ManualClock>) -> VaultLedger {
    let config = store.load_config().unwrap().expect("config saved");
    let snapshot = store.load_snapshot().unwrap();
    VaultLedger::restore(config, clock, Arc::new(Ed25519Verifier), snapshot)
}

// ---------------------------------------------------------------------------
// On-disk round trip
// ---------------------------------------------------------------------------

#[test]
fn ledger_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let clock = Arc::new(ManualClock::new(10_000));
    let alice = Principal::new("alice");
    let kp = AuthKeypair::from_seed(&[8u8; 32]);

    {
        let store = LedgerStore::open(dir.path()).unwrap();
        store.save_config(&config()).unwrap();

        let mut ledger = VaultLedger::new(config(), clock.clone(), Arc::new(Ed25519Verifier));
        ledger.register_auth_key(&alice, kp.public_key());
        ledger
            .verify_contract(
                &Principal::new("admin"),
                &ContractId::new("payout"),
                CodeHash::from_bytes([3u8; 32]),
            )
            .unwrap();
        let id = ledger.create_vault(&alice, 500, DAY).unwrap();
        ledger.set_vault_metadata(id, &alice, "école").unwrap();
        ledger.create_vault(&alice, 700, DAY).unwrap();

        store.save_snapshot(&ledger.snapshot()).unwrap();
        store.flush().unwrap();
    }

    let store = LedgerStore::open(dir.path()).unwrap();
    assert_eq!(store.vault_count(), 2);

    let mut ledger = restore(&store, clock.clone());
    assert_eq!(ledger.config(), &config());
    assert_eq!(ledger.vault_count(), 2);
    assert_eq!(ledger.vault(0).unwrap().metadata.as_deref(), Some("école"));
    assert_eq!(ledger.auth_key(&alice), Some(&kp.public_key()));
    assert!(ledger.is_contract_verified(&ContractId::new("payout")));

    // The counter carries on where it left off.
    assert_eq!(ledger.create_vault(&alice, 1, DAY).unwrap(), 2);

    // So does the policy.
    assert!(matches!(
        ledger.extend_vault_lock(0, &alice, 8 * DAY),
        Err(VaultError::InvalidAmount(_))
    ));
}

#[test]
fn released_state_is_persisted() {
    let store = LedgerStore::open_temporary().unwrap();
    store.save_config(&config()).unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let alice = Principal::new("alice");

    let mut ledger = VaultLedger::new(config(), clock.clone(), Arc::new(Ed25519Verifier));
    let id = ledger.create_vault(&alice, 100, DAY).unwrap();
    clock.advance(DAY);
    ledger.release_vault(id, &alice).unwrap();
    store.save_snapshot(&ledger.snapshot()).unwrap();

    let mut reloaded = restore(&store, clock);
    assert!(reloaded.vault(id).unwrap().is_released());
    assert_eq!(
        reloaded.release_vault(id, &alice),
        Err(VaultError::NotFound { vault_id: id })
    );
}

#[test]
fn repeated_saves_overwrite_records() {
    let store = LedgerStore::open_temporary().unwrap();
    store.save_config(&config()).unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let alice = Principal::new("alice");

    let mut ledger = VaultLedger::new(config(), clock.clone(), Arc::new(Ed25519Verifier));
    let id = ledger.create_vault(&alice, 100, DAY).unwrap();
    store.save_snapshot(&ledger.snapshot()).unwrap();

    ledger.add_to_vault(id, &alice, 50).unwrap();
    store.save_snapshot(&ledger.snapshot()).unwrap();

    let reloaded = restore(&store, clock);
    assert_eq!(store.vault_count(), 1);
    assert_eq!(reloaded.vault(id).unwrap().amount, 150);
}
