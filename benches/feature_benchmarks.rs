//! Benchmarks for per-frame feature extraction, classification and smoothing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use facial_gesture_control::{
    calibration::Baseline,
    classifier::{classify, ExpressionThresholds},
    constants::NUM_FACIAL_LANDMARKS,
    filters::{create_filter, FeatureSmoother},
    geometry::{FeatureVector, LandmarkSet},
};

/// A jittered, roughly face-shaped landmark set
fn noisy_landmarks() -> LandmarkSet {
    let points: Vec<(f32, f32)> = (0..NUM_FACIAL_LANDMARKS)
        .map(|i| {
            let angle = i as f32 * 0.37;
            (
                320.0 + 80.0 * angle.cos() + rand::random::<f32>(),
                240.0 + 100.0 * angle.sin() + rand::random::<f32>(),
            )
        })
        .collect();
    LandmarkSet::from_points(&points).expect("68 points")
}

fn benchmark_extraction(c: &mut Criterion) {
    let landmarks = noisy_landmarks();
    c.bench_function("feature_extract", |b| {
        b.iter(|| black_box(FeatureVector::extract(black_box(&landmarks))));
    });
}

fn benchmark_classification(c: &mut Criterion) {
    let baseline = Baseline {
        ear: 0.3,
        ebr: 0.5,
        mar: 0.25,
        smile: 0.01,
    };
    let thresholds = ExpressionThresholds::default();
    let frames: Vec<FeatureVector> = (0..100)
        .map(|_| FeatureVector {
            ear: 0.25 + 0.1 * rand::random::<f64>(),
            ear_left: 0.1 + 0.3 * rand::random::<f64>(),
            ear_right: 0.1 + 0.3 * rand::random::<f64>(),
            ebr: 0.45 + 0.15 * rand::random::<f64>(),
            mar: 0.2 + 0.2 * rand::random::<f64>(),
            smile: 0.1 * rand::random::<f64>(),
        })
        .collect();

    c.bench_function("classify_sequence_100", |b| {
        b.iter(|| {
            for features in &frames {
                black_box(classify(black_box(features), &baseline, &thresholds));
            }
        });
    });
}

fn benchmark_smoothing(c: &mut Criterion) {
    let mut group = c.benchmark_group("smoothing");
    let features = FeatureVector::extract(&noisy_landmarks());

    for spec in ["none", "moving_average:5", "median:5", "median:9", "exponential:0.5"] {
        let mut smoother = FeatureSmoother::new(spec).expect("valid spec");
        group.bench_with_input(BenchmarkId::new("feature_vector", spec), &features, |b, features| {
            b.iter(|| black_box(smoother.apply(black_box(features))));
        });

        let mut filter = create_filter(spec).expect("valid spec");
        let samples: Vec<f64> = (0..100).map(|i| 0.5 + 0.05 * (i as f64 * 0.1).sin()).collect();
        group.bench_with_input(BenchmarkId::new("scalar_sequence_100", spec), &samples, |b, data| {
            b.iter(|| {
                filter.reset();
                for &value in data {
                    black_box(filter.apply(black_box(value)));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_extraction, benchmark_classification, benchmark_smoothing);
criterion_main!(benches);
