// Vault ledger benchmarks.
//
// Covers vault creation, owner release, passkey release (one Ed25519
// verification per call), and batch release at increasing batch sizes.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};

use lockbox_contracts::{LedgerConfig, VaultLedger};
use lockbox_protocol::clock::ManualClock;
use lockbox_protocol::crypto::{release_digest, AuthKeypair, Ed25519Verifier};
use lockbox_protocol::identity::Principal;

const DAY: u64 = 86_400;

/// Builds a ledger holding `n` unlocked vaults owned by `owner`.
fn unlocked_ledger(n: usize, owner: &Principal) -> VaultLedger {
    let clock = Arc::new(ManualClock::new(0));
    let mut ledger = VaultLedger::new(
        LedgerConfig::new(Principal::new("admin")),
        clock.clone(),
        Arc::new(Ed25519Verifier),
    );
    for _ in 0..n {
        ledger.create_vault(owner, 1_000, DAY).unwrap();
    }
    clock.advance(DAY);
    ledger.drain_events();
    ledger
}

fn bench_create_vault(c: &mut Criterion) {
    let owner = Principal::new("alice");
    let mut ledger = unlocked_ledger(0, &owner);

    c.bench_function("ledger/create_vault", |b| {
        b.iter(|| {
            ledger.create_vault(&owner, 1_000, DAY).unwrap();
            ledger.drain_events();
        });
    });
}

fn bench_release_vault(c: &mut Criterion) {
    let owner = Principal::new("alice");

    c.bench_function("ledger/release_vault", |b| {
        b.iter_batched(
            || unlocked_ledger(1, &owner),
            |mut ledger| ledger.release_vault(0, &owner).unwrap(),
            BatchSize::SmallInput,
        );
    });
}

fn bench_passkey_release(c: &mut Criterion) {
    let owner = Principal::new("alice");
    let kp = AuthKeypair::from_seed(&[7u8; 32]);
    let digest = release_digest(0, &owner);
    let signature = kp.sign(&digest);

    c.bench_function("ledger/release_with_passkey", |b| {
        b.iter_batched(
            || {
                let mut ledger = unlocked_ledger(1, &owner);
                ledger.register_auth_key(&owner, kp.public_key());
                ledger
            },
            |mut ledger| {
                ledger
                    .release_vault_with_passkey(0, &owner, &digest, &signature)
                    .unwrap()
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_batch_release(c: &mut Criterion) {
    let owner = Principal::new("alice");
    let mut group = c.benchmark_group("ledger/batch_release");

    for size in [1usize, 5, 10] {
        let ids: Vec<u64> = (0..size as u64).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &ids, |b, ids| {
            b.iter_batched(
                || unlocked_ledger(size, &owner),
                |mut ledger| ledger.release_vaults_batch(&owner, ids).unwrap(),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_create_vault,
    bench_release_vault,
    bench_passkey_release,
    bench_batch_release,
);
criterion_main!(benches);
