//! Baseline calibration behaviour


use facial_gesture_control::{
    calibration::{ratio, Baseline, BaselineCalibrator, CalibrationProgress},
    geometry::FeatureVector,
};
use proptest::prelude::*;
use test_helpers::{assert_close, FaceShape};

fn features(ear: f64, ebr: f64, mar: f64, smile: f64) -> FeatureVector {
    FeatureVector {
        ear,
        ear_left: ear,
        ear_right: ear,
        ebr,
        mar,
        smile,
    }
}

#[test]
fn test_completes_on_nth_frame() {
    let mut calibrator = BaselineCalibrator::new(30).unwrap();
    let neutral = FaceShape::NEUTRAL.features();

    for i in 1..30 {
        assert_eq!(
            calibrator.add_frame(&neutral),
            CalibrationProgress::Accumulating { frames: i, needed: 30 }
        );
        assert_eq!(calibrator.baseline(), Baseline::UNSET);
    }
    assert!(matches!(calibrator.add_frame(&neutral), CalibrationProgress::Completed(_)));
    assert!(calibrator.is_calibrated());
    assert_eq!(calibrator.add_frame(&neutral), CalibrationProgress::AlreadyDone);
    assert_eq!(calibrator.progress(), (30, 30));
}

#[test]
fn test_baseline_is_mean_of_frames() {
    let mut calibrator = BaselineCalibrator::new(4).unwrap();
    for ebr in [0.4, 0.5, 0.6, 0.5] {
        calibrator.add_frame(&features(0.3, ebr, 0.2, 0.01));
    }
    let baseline = calibrator.baseline();
    assert_close(baseline.ebr, 0.5);
    assert_close(baseline.ear, 0.3);

    let thresholds = calibrator.thresholds().unwrap();
    assert_close(thresholds.raise, 0.5 * 1.12);
    assert_close(thresholds.reset, 0.5 * 1.05);
}

#[test]
fn test_ratios_before_calibration_are_one() {
    let baseline = BaselineCalibrator::new(30).unwrap().baseline();
    assert_eq!(baseline.ear_ratio(0.7), 1.0);
    assert_eq!(baseline.ebr_ratio(0.0), 1.0);
    assert_eq!(baseline.mar_ratio(12.0), 1.0);
    assert_eq!(baseline.smile_ratio(-0.3), 1.0);
}

#[test]
fn test_tiny_smile_baseline_is_unset() {
    let baseline = Baseline {
        smile: 0.0005,
        ..Baseline::UNSET
    };
    assert_eq!(baseline.smile_ratio(0.1), 1.0);
    let baseline = Baseline {
        smile: 0.01,
        ..Baseline::UNSET
    };
    assert_close(baseline.smile_ratio(0.02), 2.0);
}

#[test]
fn test_reset_starts_over() {
    let mut calibrator = BaselineCalibrator::new(2).unwrap();
    calibrator.add_frame(&FaceShape::NEUTRAL.features());
    calibrator.add_frame(&FaceShape::NEUTRAL.features());
    assert!(calibrator.is_calibrated());

    calibrator.reset();
    assert!(!calibrator.is_calibrated());
    assert!(calibrator.thresholds().is_none());
    assert_eq!(calibrator.progress(), (0, 2));
}

#[test]
fn test_invalid_calibrators() {
    assert!(BaselineCalibrator::new(0).is_err());
    assert!(BaselineCalibrator::with_multipliers(30, 1.05, 1.12).is_err());
    assert!(BaselineCalibrator::with_multipliers(30, 1.1, 1.1).is_err());
    assert!(BaselineCalibrator::with_multipliers(30, 1.2, 1.1).is_ok());
}

proptest! {
    #[test]
    fn prop_constant_input_gives_exact_baseline(
        ear in 0.05f64..0.6,
        ebr in 0.1f64..2.0,
        mar in 0.0f64..1.5,
        smile in -0.2f64..0.2,
        frames in 1usize..60,
    ) {
        let mut calibrator = BaselineCalibrator::new(frames).unwrap();
        let frame = features(ear, ebr, mar, smile);
        let mut completed = None;
        for _ in 0..frames {
            if let CalibrationProgress::Completed(baseline) = calibrator.add_frame(&frame) {
                completed = Some(baseline);
            }
        }
        let baseline = completed.expect("calibration completes on the last frame");
        prop_assert_eq!(baseline.ear, ear);
        prop_assert_eq!(baseline.ebr, ebr);
        prop_assert_eq!(baseline.mar, mar);
        prop_assert_eq!(baseline.smile, smile);
        prop_assert_eq!(baseline.ebr_ratio(ebr), 1.0);
    }

    #[test]
    fn prop_ratio_against_unset_is_one(current in -10.0f64..10.0, baseline in -5.0f64..=0.0) {
        prop_assert_eq!(ratio(current, baseline), 1.0);
    }
}
