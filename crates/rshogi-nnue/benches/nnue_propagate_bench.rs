//! LayerStack NNUE の順伝播ベンチマーク
//!
//! 埋め込みの疎密度を変えて、疎入力 L1 と密な参照実装の速度を比較する

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rshogi_nnue::nnue::{
    AffineTransform, INPUT_DIMENSIONS, L1_OUTPUT_DIMENSIONS, LAYER_STACKS, LayerStackNetwork,
    Scratch,
};
use std::hint::black_box;

fn random_network(rng: &mut Xoshiro256PlusPlus) -> LayerStackNetwork {
    let mut network = LayerStackNetwork::new_zeroed();
    for fc_0 in network.fc_0.iter_mut() {
        for j in 0..L1_OUTPUT_DIMENSIONS {
            fc_0.biases[j] = rng.random_range(-4000..=4000);
            for i in 0..INPUT_DIMENSIONS {
                fc_0.set_weight(j, i, rng.random_range(-64..=64i32) as i8);
            }
        }
    }
    for w in network.fc_1.weights.iter_mut() {
        *w = rng.random_range(-64..=64i32) as i8;
    }
    for w in network.fc_2.weights.iter_mut() {
        *w = rng.random_range(-64..=64i32) as i8;
    }
    network
}

/// 非ゼロ率 `density` の埋め込みを生成
fn generate_features(rng: &mut Xoshiro256PlusPlus, density: f64, count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|_| {
            (0..INPUT_DIMENSIONS)
                .map(|_| if rng.random_bool(density) { rng.random_range(1..=127) } else { 0 })
                .collect()
        })
        .collect()
}

fn bench_propagate(c: &mut Criterion) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x5EED);
    let network = random_network(&mut rng);

    let mut group = c.benchmark_group("nnue_propagate");
    for density in [0.05, 0.25, 1.0] {
        let inputs = generate_features(&mut rng, density, 64);
        group.throughput(Throughput::Elements(inputs.len() as u64));

        group.bench_with_input(BenchmarkId::new("network", density), &inputs, |b, inputs| {
            let mut scratch = Scratch::new_boxed();
            b.iter(|| {
                let mut sum = 0i64;
                for (i, features) in inputs.iter().enumerate() {
                    sum += network.propagate(features, &mut scratch, i % LAYER_STACKS) as i64;
                }
                black_box(sum)
            });
        });
    }
    group.finish();
}

fn bench_l1(c: &mut Criterion) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0xA11CE);
    let network = random_network(&mut rng);
    let sparse = network.fc_0.select(0);
    let dense: AffineTransform<INPUT_DIMENSIONS, L1_OUTPUT_DIMENSIONS> = sparse.to_dense();

    let mut group = c.benchmark_group("nnue_l1");
    for density in [0.05, 0.25, 1.0] {
        let inputs = generate_features(&mut rng, density, 64);

        group.bench_with_input(BenchmarkId::new("sparse", density), &inputs, |b, inputs| {
            let mut out = [0i32; L1_OUTPUT_DIMENSIONS];
            b.iter(|| {
                for features in inputs {
                    black_box(sparse.propagate(black_box(features), &mut out));
                }
                black_box(out)
            });
        });

        group.bench_with_input(BenchmarkId::new("dense", density), &inputs, |b, inputs| {
            let mut out = [0i32; L1_OUTPUT_DIMENSIONS];
            b.iter(|| {
                for features in inputs {
                    dense.propagate(black_box(features), &mut out);
                }
                black_box(out)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_propagate, bench_l1);
criterion_main!(benches);
