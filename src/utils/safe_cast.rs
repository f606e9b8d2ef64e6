//! Checked numeric conversions between model, geometry and pixel space

use crate::{Error, Result};

/// Convert a tensor index or size to an `OpenCV` coordinate
///
/// # Errors
///
/// Returns an error if the value exceeds `i32::MAX`
pub fn usize_to_i32(value: usize) -> Result<i32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Clamp a model coordinate into `[min, max]` pixels; non-finite input maps to `min`
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn f32_to_i32_clamp(value: f32, min: i32, max: i32) -> i32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    if !value.is_finite() {
        return min;
    }
    (value.clamp(min as f32, max as f32) as i32).clamp(min, max)
}

/// Clamp a geometry coordinate into `[min, max]` pixels for drawing;
/// non-finite input maps to `min`
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn f64_to_i32_clamp(value: f64, min: i32, max: i32) -> i32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    if !value.is_finite() {
        return min;
    }
    value.round().clamp(f64::from(min), f64::from(max)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_usize_to_i32() {
        assert_eq!(usize_to_i32(136).unwrap(), 136);
        if std::mem::size_of::<usize>() > 4 {
            assert!(usize_to_i32(i32::MAX as usize + 1).is_err());
        }
    }

    #[test]
    fn test_f32_to_i32_clamp() {
        assert_eq!(f32_to_i32_clamp(50.7, 0, 100), 50);
        assert_eq!(f32_to_i32_clamp(-10.0, 0, 100), 0);
        assert_eq!(f32_to_i32_clamp(150.0, 0, 100), 100);
        assert_eq!(f32_to_i32_clamp(f32::NAN, 0, 100), 0);
        assert_eq!(f32_to_i32_clamp(5.0, 100, 0), 5);
    }

    #[test]
    fn test_f64_to_i32_clamp() {
        assert_eq!(f64_to_i32_clamp(223.6, 0, 640), 224);
        assert_eq!(f64_to_i32_clamp(-3.0, 0, 640), 0);
        assert_eq!(f64_to_i32_clamp(f64::INFINITY, 0, 640), 0);
        assert_eq!(f64_to_i32_clamp(1e12, 0, 640), 640);
    }

    proptest! {
        #[test]
        fn prop_clamp_within_bounds(value in any::<f64>(), a in any::<i32>(), b in any::<i32>()) {
            let (min, max) = if a <= b { (a, b) } else { (b, a) };
            let result = f64_to_i32_clamp(value, a, b);
            prop_assert!(result >= min && result <= max);
            let result = f32_to_i32_clamp(value as f32, a, b);
            prop_assert!(result >= min && result <= max);
        }
    }
}
