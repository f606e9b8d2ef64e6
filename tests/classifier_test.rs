//! Expression classification on synthetic landmark sets


use facial_gesture_control::{
    calibration::{BaselineCalibrator, CalibrationProgress},
    classifier::{classify, is_brow_raised, match_score, Expression, ExpressionThresholds, Rule},
    geometry::FeatureVector,
    Result,
};
use test_helpers::{assert_close, FaceShape};

fn calibrated_on(shape: FaceShape) -> Result<facial_gesture_control::calibration::Baseline> {
    let mut calibrator = BaselineCalibrator::new(30)?;
    let features = shape.features();
    for _ in 0..29 {
        assert!(matches!(
            calibrator.add_frame(&features),
            CalibrationProgress::Accumulating { .. }
        ));
    }
    match calibrator.add_frame(&features) {
        CalibrationProgress::Completed(baseline) => Ok(baseline),
        other => panic!("expected calibration to complete, got {other:?}"),
    }
}

#[test]
fn test_synthetic_face_features() {
    let features = FaceShape::NEUTRAL.features();
    assert_close(features.ear, 0.3);
    assert_close(features.ebr, 0.5);
    assert_close(features.mar, 0.25);
    assert_close(features.smile, 0.01);
}

#[test]
fn test_each_expression_end_to_end() -> Result<()> {
    let baseline = calibrated_on(FaceShape::NEUTRAL)?;
    let thresholds = ExpressionThresholds::default();

    let cases = [
        (FaceShape::NEUTRAL, Expression::Neutral, Rule::ScoredNeutral),
        (FaceShape::HAPPY, Expression::Happy, Rule::Happy),
        (FaceShape::SURPRISED, Expression::Surprised, Rule::Surprised),
        (FaceShape::WINK, Expression::Wink, Rule::Wink),
    ];
    for (shape, expression, rule) in cases {
        let result = classify(&shape.features(), &baseline, &thresholds);
        assert_eq!(result.expression, expression, "{shape:?}");
        assert_eq!(result.rule, rule);
    }
    Ok(())
}

#[test]
fn test_wink_end_to_end() -> Result<()> {
    let baseline = calibrated_on(FaceShape::NEUTRAL)?;
    let features = FaceShape::WINK.features();

    assert_close(features.ear_right, 0.1);
    assert_close(features.ear_left, 0.3);
    // closed eye well below 0.6 x baseline EAR 0.3
    assert!(features.ear_right < baseline.ear * 0.6);
    assert_eq!(
        classify(&features, &baseline, &ExpressionThresholds::default()).expression,
        Expression::Wink
    );
    Ok(())
}

#[test]
fn test_wink_beats_happy() -> Result<()> {
    let baseline = calibrated_on(FaceShape::NEUTRAL)?;
    let winking_smile = FaceShape {
        corner_lift: 2.0,
        ..FaceShape::WINK
    };
    let result = classify(&winking_smile.features(), &baseline, &ExpressionThresholds::default());
    assert_eq!(result.expression, Expression::Wink);
    Ok(())
}

#[test]
fn test_surprised_beats_happy() -> Result<()> {
    let baseline = calibrated_on(FaceShape::NEUTRAL)?;
    let amazed_smile = FaceShape {
        corner_lift: 2.0,
        ..FaceShape::SURPRISED
    };
    let result = classify(&amazed_smile.features(), &baseline, &ExpressionThresholds::default());
    assert_eq!(result.expression, Expression::Surprised);
    Ok(())
}

#[test]
fn test_brows_alone_are_not_surprised() -> Result<()> {
    // one surprised criterion out of three is not enough
    let baseline = calibrated_on(FaceShape::NEUTRAL)?;
    let thresholds = ExpressionThresholds::default();
    let result = classify(&FaceShape::BROWS_UP.features(), &baseline, &thresholds);
    assert_eq!(result.expression, Expression::Neutral);
    assert!(is_brow_raised(&FaceShape::BROWS_UP.features(), &baseline, 1.12));
    assert!(!is_brow_raised(&FaceShape::NEUTRAL.features(), &baseline, 1.12));
    Ok(())
}

#[test]
fn test_uncalibrated_baseline_reads_neutral() {
    let baseline = BaselineCalibrator::new(30).map(|c| c.baseline()).unwrap();
    for shape in [FaceShape::NEUTRAL, FaceShape::SURPRISED] {
        let result = classify(&shape.features(), &baseline, &ExpressionThresholds::default());
        assert_eq!(result.ratios.ear, 1.0);
        assert_eq!(result.ratios.ebr, 1.0);
        assert_eq!(result.expression, Expression::Neutral);
    }
    assert!(!is_brow_raised(&FaceShape::BROWS_UP.features(), &baseline, 1.12));
}

#[test]
fn test_zero_features_do_not_panic() -> Result<()> {
    let baseline = calibrated_on(FaceShape::NEUTRAL)?;
    let result = classify(&FeatureVector::default(), &baseline, &ExpressionThresholds::default());
    assert_eq!(result.expression, Expression::Neutral);
    Ok(())
}

#[test]
fn test_match_score_table() {
    for expression in Expression::ALL {
        assert_eq!(match_score(expression, expression), 100);
    }
    assert_eq!(match_score(Expression::Happy, Expression::Wink), 50);
    assert_eq!(match_score(Expression::Wink, Expression::Happy), 50);
    assert_eq!(match_score(Expression::Neutral, Expression::Surprised), 30);
    assert_eq!(match_score(Expression::Surprised, Expression::Happy), 0);
    assert_eq!(match_score(Expression::Happy, Expression::Neutral), 0);
}
