//! Helpers shared by the detector adapters and the overlay.

pub mod safe_cast;

use crate::face_tracking::FaceBox;
use opencv::core::Rect;
use safe_cast::f32_to_i32_clamp;

/// Square crop around a face box for the landmark model.
///
/// The box is grown by `shift` of its size on every side, made square and
/// moved back inside the frame. The result is empty when the frame is
/// smaller than the crop would need to be.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn landmark_crop(face: &FaceBox, frame_width: i32, frame_height: i32, shift: f32) -> Rect {
    let x_shift = f32_to_i32_clamp(face.width as f32 * shift, 0, frame_width);
    let y_shift = f32_to_i32_clamp(face.height as f32 * shift, 0, frame_height);

    let x = (face.x - x_shift).max(0);
    let y = (face.y - y_shift).max(0);
    let width = (face.width + 2 * x_shift).min(frame_width - x);
    let height = (face.height + 2 * y_shift).min(frame_height - y);

    let side = width.max(height).min(frame_width).min(frame_height).max(0);
    let x = x.min(frame_width - side).max(0);
    let y = y.min(frame_height - side).max(0);
    Rect::new(x, y, side, side)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inside(rect: &Rect, w: i32, h: i32) -> bool {
        rect.x >= 0 && rect.y >= 0 && rect.x + rect.width <= w && rect.y + rect.height <= h
    }

    #[test]
    fn test_crop_grows_and_squares() {
        let crop = landmark_crop(&FaceBox::new(100, 100, 30, 40, 1.0), 200, 200, 0.1);
        assert_eq!(crop.width, crop.height);
        assert!(crop.width > 40);
        assert!(crop.x <= 100 && crop.y <= 100);
        assert!(inside(&crop, 200, 200));
    }

    #[test]
    fn test_crop_at_frame_edges() {
        for face in [FaceBox::new(190, 190, 20, 20, 1.0), FaceBox::new(0, 0, 10, 10, 1.0)] {
            let crop = landmark_crop(&face, 200, 200, 0.5);
            assert!(inside(&crop, 200, 200));
            assert_eq!(crop.width, crop.height);
        }
    }

    #[test]
    fn test_crop_larger_than_frame() {
        let crop = landmark_crop(&FaceBox::new(0, 0, 300, 300, 1.0), 200, 100, 0.2);
        assert_eq!(crop.width, 100);
        assert!(inside(&crop, 200, 100));
    }
}
