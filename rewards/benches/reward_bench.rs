use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use daiv_rewards::RewardCalculator;
use daiv_types::params::MIB;

fn bench_base_reward(c: &mut Criterion) {
    let mut group = c.benchmark_group("base_reward");
    let calc = RewardCalculator::default();

    for size_mib in [0u64, 5, 100, 5_000] {
        group.bench_with_input(
            BenchmarkId::new("breakdown", size_mib),
            &size_mib,
            |b, &size_mib| {
                b.iter(|| black_box(calc.breakdown(black_box(size_mib * MIB), black_box(5))));
            },
        );
    }

    group.finish();
}

fn bench_retroactive_reward(c: &mut Criterion) {
    let calc = RewardCalculator::default();
    c.bench_function("retroactive_reward", |b| {
        b.iter(|| black_box(calc.retroactive_reward(black_box(123_456))));
    });
}

criterion_group!(benches, bench_base_reward, bench_retroactive_reward);
criterion_main!(benches);
