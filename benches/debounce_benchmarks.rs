//! Benchmarks for the debounce primitives and a full session tick

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use facial_gesture_control::{
    calibration::BaselineCalibrator,
    classifier::Expression,
    controls::{ActionLog, BrowFlapController},
    debounce::{Cooldown, HysteresisTrigger, SustainedHold},
    geometry::FeatureVector,
    session::{ExpressionSession, SequencePicker, SessionConfig},
};
use std::time::{Duration, Instant};

fn brows(ebr: f64) -> FeatureVector {
    FeatureVector {
        ear: 0.3,
        ear_left: 0.3,
        ear_right: 0.3,
        ebr,
        mar: 0.25,
        smile: 0.01,
    }
}

fn benchmark_hysteresis(c: &mut Criterion) {
    let values: Vec<Option<f64>> = (0..300)
        .map(|i| (i % 17 != 0).then(|| 0.5 + 0.2 * (i as f64 * 0.2).sin()))
        .collect();
    let start = Instant::now();

    c.bench_function("hysteresis_sequence_300", |b| {
        b.iter(|| {
            let mut trigger =
                HysteresisTrigger::new(0.6, 0.4, Cooldown::Frames(10)).expect("valid levels");
            for (i, value) in values.iter().enumerate() {
                black_box(trigger.update(*value, start + Duration::from_millis(i as u64 * 33)));
            }
        });
    });
}

fn benchmark_hold(c: &mut Criterion) {
    let start = Instant::now();
    c.bench_function("sustained_hold_sequence_100", |b| {
        b.iter(|| {
            let mut hold = SustainedHold::new(Duration::from_secs(3));
            for i in 0..100u64 {
                black_box(hold.update(i % 40 != 0, start + Duration::from_millis(i * 50)));
            }
        });
    });
}

fn benchmark_flap_controller(c: &mut Criterion) {
    let start = Instant::now();
    let frames: Vec<FeatureVector> = (0..300)
        .map(|i| brows(0.5 + 0.1 * (i as f64 * 0.3).sin()))
        .collect();

    c.bench_function("flap_controller_300_frames", |b| {
        b.iter(|| {
            let calibrator = BaselineCalibrator::new(30).expect("non-zero frames");
            let mut controller = BrowFlapController::new(calibrator, 10);
            let mut actions = ActionLog::default();
            for (i, features) in frames.iter().enumerate() {
                let now = start + Duration::from_millis(i as u64 * 33);
                black_box(controller.update(Some(features), now, &mut actions));
            }
        });
    });
}

fn benchmark_session(c: &mut Criterion) {
    let start = Instant::now();
    let neutral = brows(0.5);

    c.bench_function("session_full_game", |b| {
        b.iter(|| {
            let picker = SequencePicker::new(Expression::ALL.to_vec()).expect("non-empty");
            let mut session = ExpressionSession::new(SessionConfig::default(), Box::new(picker))
                .expect("valid config");
            let mut t = 0;
            while !session.is_over() {
                black_box(session.tick(start + Duration::from_millis(t), Some(&neutral)));
                t += 33;
            }
        });
    });
}

criterion_group!(
    benches,
    benchmark_hysteresis,
    benchmark_hold,
    benchmark_flap_controller,
    benchmark_session
);
criterion_main!(benches);
