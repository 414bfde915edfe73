//! # Membership Benchmarks
//!
//! Micro-benchmarks for the per-node registry and the full onboarding
//! scenario over an in-memory ledger with no propagation delay.
//!
//! ```bash
//! cargo bench --package bn-benchmarks --bench membership_benchmarks
//! ```

use std::collections::BTreeSet;

use bn_benchmarks::{BenchmarkHarness, HarnessConfig};
use bn_membership::{
    GroupState, InMemoryNetwork, LedgerConfig, LedgerRecord, LinearId, MembershipRegistry,
    MembershipState, MembershipStatus, NetworkId, Party, Query,
};
use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

fn records(network_id: NetworkId, members: usize) -> Vec<LedgerRecord> {
    let now = Utc::now();
    let memberships: Vec<MembershipState> = (0..members)
        .map(|i| {
            MembershipState::pending(
                network_id,
                Party::new(format!("O=Party{}, L=Dublin, C=IE", i)),
                now,
            )
        })
        .collect();
    let participants: BTreeSet<LinearId> = memberships.iter().map(|m| m.linear_id).collect();
    let group = GroupState::new(LinearId::new(), network_id, "InitialGroup", participants, now);

    memberships
        .into_iter()
        .map(LedgerRecord::from)
        .chain(std::iter::once(group.into()))
        .collect()
}

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");
    for members in [100usize, 1_000, 10_000] {
        let network_id = NetworkId::new();
        let batch = records(network_id, members);
        group.throughput(Throughput::Elements(batch.len() as u64));

        group.bench_with_input(BenchmarkId::new("observe_all", members), &batch, |b, batch| {
            b.iter(|| {
                let mut registry = MembershipRegistry::new();
                black_box(registry.observe_all(batch.iter().cloned()))
            })
        });

        let mut registry = MembershipRegistry::new();
        registry.observe_all(batch);
        let query = Query::MembershipsByStatus(vec![MembershipStatus::Pending]);
        group.bench_with_input(BenchmarkId::new("query_by_status", members), &query, |b, query| {
            b.iter(|| black_box(registry.query(query)))
        });
    }
    group.finish();
}

fn bench_scenario(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let mut group = c.benchmark_group("scenario");
    group.sample_size(20);
    for participants in [5usize, 20] {
        group.bench_with_input(
            BenchmarkId::new("single_member_join", participants),
            &participants,
            |b, &participants| {
                b.iter(|| {
                    rt.block_on(async {
                        let harness = BenchmarkHarness::new(
                            InMemoryNetwork::new(LedgerConfig::immediate()),
                            HarnessConfig::default().with_participants(participants),
                        )
                        .expect("valid config");
                        black_box(harness.run_scenario().await.expect("scenario"))
                    })
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_registry, bench_scenario);
criterion_main!(benches);
