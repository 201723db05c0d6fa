use criterion::{black_box, criterion_group, criterion_main, Criterion};
use inference_engine::{DecisionTree, EnsembleModel, LEAF};

/// Depth-6 heap-ordered tree splitting on spread-out features
fn tree(seed: usize, features: usize) -> DecisionTree {
    let depth = 6;
    let internal = (1usize << depth) - 1;
    let total = (1usize << (depth + 1)) - 1;
    let mut left = vec![LEAF; total];
    let mut right = vec![LEAF; total];
    let mut feature = vec![LEAF; total];
    let mut threshold = vec![0.0; total];
    let mut value = vec![0.0; total];
    for i in 0..internal {
        left[i] = (2 * i + 1) as i32;
        right[i] = (2 * i + 2) as i32;
        feature[i] = ((seed * 7919 + i * 104_729) % features) as i32;
        threshold[i] = ((i % 7) as f64 - 3.0) / 10.0;
    }
    for (k, v) in value.iter_mut().enumerate().skip(internal) {
        *v = ((k + seed) % 11) as f64 / 100.0 - 0.05;
    }
    DecisionTree::new(left, right, feature, threshold, value).unwrap()
}

fn bench_head_channel(c: &mut Criterion) {
    // 240 frames * 436 head points * 3 coords
    let len = 240 * 436 * 3;
    let model = EnsembleModel::new((0..300).map(|s| tree(s, len)).collect()).unwrap();
    let features: Vec<f32> = (0..len).map(|i| ((i % 13) as f32 - 6.0) / 10.0).collect();

    c.bench_function("head_channel_300_trees", |b| {
        b.iter(|| model.predict_probability(black_box(&features)).unwrap())
    });
}

criterion_group!(benches, bench_head_channel);
criterion_main!(benches);
