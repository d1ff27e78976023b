use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::{hash::block_hash, mine::proof_of_work, Transaction};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::atomic::AtomicBool;

fn bench_pow(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let txs: Vec<Transaction> = (0..10)
        .map(|i| {
            Transaction::new(
                format!("alice-{i}"),
                "bob",
                rng.gen_range(1..10),
                1_600_000_000 + i,
                format!("sig-{i}"),
            )
        })
        .collect();
    let cancel = AtomicBool::new(false);

    c.bench_function("block_hash_10_txs", |b| {
        b.iter(|| block_hash(1, "prev", 1_600_000_000, &txs, 7));
    });

    c.bench_function("proof_of_work_difficulty_4", |b| {
        b.iter(|| proof_of_work(1, "prev", 1_600_000_000, &txs, 4, &cancel));
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
