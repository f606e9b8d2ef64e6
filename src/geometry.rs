//! Per-frame geometric features computed from a 68-point landmark set.
//!
//! Every feature is a ratio of planar Euclidean distances between fixed
//! landmark indices, so it is dimensionless. Nothing here validates the
//! input: a degenerate landmark set (coincident corners) yields a
//! non-finite value and the caller decides what to do with it.

use crate::{
    constants::{landmarks as lm, NUM_FACIAL_LANDMARKS},
    Error, Result,
};

/// A 2-D landmark coordinate in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Ordered, fixed-length set of facial landmarks for one face.
///
/// The index-to-anatomy mapping is the iBUG 68-point layout and is never
/// reordered.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [Point; NUM_FACIAL_LANDMARKS],
}

impl LandmarkSet {
    /// Build a landmark set from localizer output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless exactly 68 points are given.
    pub fn from_points(points: &[(f32, f32)]) -> Result<Self> {
        if points.len() != NUM_FACIAL_LANDMARKS {
            return Err(Error::InvalidInput(format!(
                "Expected {NUM_FACIAL_LANDMARKS} landmarks, got {}",
                points.len()
            )));
        }

        let mut set = [Point::default(); NUM_FACIAL_LANDMARKS];
        for (slot, &(x, y)) in set.iter_mut().zip(points) {
            *slot = Point::new(f64::from(x), f64::from(y));
        }
        Ok(Self { points: set })
    }

    /// Build a landmark set from already converted points.
    #[must_use]
    pub const fn new(points: [Point; NUM_FACIAL_LANDMARKS]) -> Self {
        Self { points }
    }

    #[must_use]
    pub fn point(&self, index: usize) -> Point {
        self.points[index]
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Distance between two landmarks by index
    #[must_use]
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        self.points[a].distance(&self.points[b])
    }
}

/// Eye aspect ratio of both eyes and their mean
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeAspect {
    pub mean: f64,
    pub left: f64,
    pub right: f64,
}

/// Eye openness of one eye given its six landmarks in annotation order.
fn single_eye_aspect(marks: &LandmarkSet, eye: [usize; 6]) -> f64 {
    let vertical = marks.distance(eye[1], eye[5]) + marks.distance(eye[2], eye[4]);
    let horizontal = marks.distance(eye[0], eye[3]);
    vertical / (2.0 * horizontal)
}

/// Eye aspect ratio (EAR). Lower means more closed.
#[must_use]
pub fn eye_aspect_ratio(marks: &LandmarkSet) -> EyeAspect {
    let left = single_eye_aspect(marks, lm::LEFT_EYE);
    let right = single_eye_aspect(marks, lm::RIGHT_EYE);
    EyeAspect {
        mean: (left + right) / 2.0,
        left,
        right,
    }
}

/// Eyebrow aspect ratio (EBR): brow-to-eye height over brow width,
/// averaged over both brows. Higher means more raised.
#[must_use]
pub fn eyebrow_aspect_ratio(marks: &LandmarkSet) -> f64 {
    let right_height = marks.distance(lm::RIGHT_BROW_MID, lm::RIGHT_EYE[1]);
    let left_height = marks.distance(lm::LEFT_BROW_MID, lm::LEFT_EYE[2]);

    let right_width = marks.distance(lm::RIGHT_BROW_OUTER, lm::RIGHT_BROW_INNER);
    let left_width = marks.distance(lm::LEFT_BROW_INNER, lm::LEFT_BROW_OUTER);

    (right_height / right_width + left_height / left_width) / 2.0
}

/// Mouth aspect ratio (MAR). Higher means more open.
#[must_use]
pub fn mouth_aspect_ratio(marks: &LandmarkSet) -> f64 {
    let outer = marks.distance(lm::UPPER_LIP_OUTER, lm::LOWER_LIP_OUTER);
    let inner = marks.distance(lm::UPPER_LIP_INNER, lm::LOWER_LIP_INNER);
    let width = marks.distance(lm::MOUTH_LEFT_CORNER, lm::MOUTH_RIGHT_CORNER);
    (outer + inner) / (2.0 * width)
}

/// Smile score: mean lift of the mouth corners above the mouth centre,
/// normalised by mouth width. Image y grows downwards, so a positive
/// score means upturned corners.
#[must_use]
pub fn smile_score(marks: &LandmarkSet) -> f64 {
    let centre_y =
        (marks.point(lm::UPPER_LIP_OUTER).y + marks.point(lm::LOWER_LIP_OUTER).y) / 2.0;
    let left_lift = centre_y - marks.point(lm::MOUTH_LEFT_CORNER).y;
    let right_lift = centre_y - marks.point(lm::MOUTH_RIGHT_CORNER).y;
    let width = marks.distance(lm::MOUTH_LEFT_CORNER, lm::MOUTH_RIGHT_CORNER);
    (left_lift + right_lift) / (2.0 * width)
}

/// Named feature ratios for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector {
    /// Mean eye aspect ratio
    pub ear: f64,
    /// Eye aspect ratio of the subject's left eye (points 42-47)
    pub ear_left: f64,
    /// Eye aspect ratio of the subject's right eye (points 36-41)
    pub ear_right: f64,
    /// Eyebrow aspect ratio
    pub ebr: f64,
    /// Mouth aspect ratio
    pub mar: f64,
    /// Smile score
    pub smile: f64,
}

impl FeatureVector {
    /// Extract every feature from a landmark set
    #[must_use]
    pub fn extract(marks: &LandmarkSet) -> Self {
        let eyes = eye_aspect_ratio(marks);
        Self {
            ear: eyes.mean,
            ear_left: eyes.left,
            ear_right: eyes.right,
            ebr: eyebrow_aspect_ratio(marks),
            mar: mouth_aspect_ratio(marks),
            smile: smile_score(marks),
        }
    }

    /// False when any ratio came from a degenerate landmark set
    #[must_use]
    pub fn is_finite(&self) -> bool {
        [self.ear, self.ear_left, self.ear_right, self.ebr, self.mar, self.smile]
            .iter()
            .all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Face with eyes 10px wide, brows 10px wide, mouth 20px wide.
    fn face(eye_half_gap: f64, brow_gap: f64, lip_half_gap: f64, corner_lift: f64) -> LandmarkSet {
        let mut p = [Point::default(); NUM_FACIAL_LANDMARKS];

        for (eye, x0) in [(lm::RIGHT_EYE, 0.0), (lm::LEFT_EYE, 30.0)] {
            p[eye[0]] = Point::new(x0, 0.0);
            p[eye[1]] = Point::new(x0 + 3.0, -eye_half_gap);
            p[eye[2]] = Point::new(x0 + 7.0, -eye_half_gap);
            p[eye[3]] = Point::new(x0 + 10.0, 0.0);
            p[eye[4]] = Point::new(x0 + 7.0, eye_half_gap);
            p[eye[5]] = Point::new(x0 + 3.0, eye_half_gap);
        }

        // Brow mids sit straight above the upper-lid points they are measured to.
        p[lm::RIGHT_BROW_OUTER] = Point::new(-2.0, -eye_half_gap - brow_gap);
        p[lm::RIGHT_BROW_MID] = Point::new(3.0, -eye_half_gap - brow_gap);
        p[lm::RIGHT_BROW_INNER] = Point::new(8.0, -eye_half_gap - brow_gap);
        p[lm::LEFT_BROW_INNER] = Point::new(32.0, -eye_half_gap - brow_gap);
        p[lm::LEFT_BROW_MID] = Point::new(37.0, -eye_half_gap - brow_gap);
        p[lm::LEFT_BROW_OUTER] = Point::new(42.0, -eye_half_gap - brow_gap);

        p[lm::MOUTH_LEFT_CORNER] = Point::new(10.0, 40.0 - corner_lift);
        p[lm::MOUTH_RIGHT_CORNER] = Point::new(30.0, 40.0 - corner_lift);
        p[lm::UPPER_LIP_OUTER] = Point::new(20.0, 40.0 - lip_half_gap - 1.0);
        p[lm::LOWER_LIP_OUTER] = Point::new(20.0, 40.0 + lip_half_gap + 1.0);
        p[lm::UPPER_LIP_INNER] = Point::new(20.0, 40.0 - lip_half_gap);
        p[lm::LOWER_LIP_INNER] = Point::new(20.0, 40.0 + lip_half_gap);

        LandmarkSet::new(p)
    }

    #[test]
    fn test_point_distance() {
        assert_eq!(Point::new(0.0, 0.0).distance(&Point::new(3.0, 4.0)), 5.0);
    }

    #[test]
    fn test_from_points_requires_68() {
        assert!(LandmarkSet::from_points(&[(0.0, 0.0); 67]).is_err());
        assert!(LandmarkSet::from_points(&[(0.0, 0.0); 68]).is_ok());
    }

    #[test]
    fn test_eye_aspect_ratio() {
        let eyes = eye_aspect_ratio(&face(1.5, 5.0, 2.0, 0.0));
        // (3 + 3) / (2 * 10)
        assert!((eyes.left - 0.3).abs() < 1e-12);
        assert!((eyes.right - 0.3).abs() < 1e-12);
        assert!((eyes.mean - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_eyebrow_aspect_ratio() {
        // height 5 over width 10 for both brows
        assert!((eyebrow_aspect_ratio(&face(1.5, 5.0, 2.0, 0.0)) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mouth_aspect_ratio() {
        // outer gap 6, inner gap 4, width 20 -> 10 / 40
        assert!((mouth_aspect_ratio(&face(1.5, 5.0, 2.0, 0.0)) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_smile_score_sign() {
        assert!(smile_score(&face(1.5, 5.0, 2.0, 0.0)).abs() < 1e-12);
        assert!((smile_score(&face(1.5, 5.0, 2.0, 2.0)) - 0.1).abs() < 1e-12);
        assert!(smile_score(&face(1.5, 5.0, 2.0, -2.0)) < 0.0);
    }

    #[test]
    fn test_degenerate_set_is_not_finite() {
        let degenerate = LandmarkSet::new([Point::default(); NUM_FACIAL_LANDMARKS]);
        let features = FeatureVector::extract(&degenerate);
        assert!(!features.is_finite());
    }

    #[test]
    fn test_extract_does_not_mutate() {
        let marks = face(1.5, 5.0, 2.0, 1.0);
        let copy = marks.clone();
        let _ = FeatureVector::extract(&marks);
        assert_eq!(marks, copy);
    }
}
