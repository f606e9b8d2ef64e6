//! Primary face selection and short-gap face tracking.

use crate::constants::DEFAULT_MAX_FACE_LOST_FRAMES;
use log::debug;

/// Axis-aligned face box in frame pixels, with detector confidence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: f32,
}

impl FaceBox {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Horizontal centre in pixels
    #[must_use]
    pub fn centre_x(&self) -> f64 {
        f64::from(self.x) + f64::from(self.width) / 2.0
    }

    /// True when the whole box lies inside a `frame_width` x `frame_height` frame
    #[must_use]
    pub const fn is_within(&self, frame_width: i32, frame_height: i32) -> bool {
        self.x >= 0 && self.y >= 0 && self.right() <= frame_width && self.bottom() <= frame_height
    }
}

/// Pick the single face to track: confident, fully inside the frame, and
/// the tallest of those.
#[must_use]
pub fn select_primary_face(
    faces: &[FaceBox],
    frame_width: i32,
    frame_height: i32,
    min_confidence: f32,
) -> Option<FaceBox> {
    faces
        .iter()
        .filter(|face| face.confidence >= min_confidence)
        .filter(|face| face.is_within(frame_width, frame_height))
        .fold(None, |best: Option<FaceBox>, face| match best {
            Some(best) if best.height >= face.height => Some(best),
            _ => Some(*face),
        })
}

/// The face used for the current frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedFace {
    pub face: FaceBox,
    /// True when this is the cached box from an earlier frame
    pub cached: bool,
    /// Further consecutive misses the cache can still bridge
    pub frames_left: u32,
}

/// Last known face box, reused across brief detection gaps
#[derive(Debug, Clone)]
pub struct FaceTrack {
    max_lost_frames: u32,
    last_known: Option<FaceBox>,
    lost_frames: u32,
}

impl Default for FaceTrack {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FACE_LOST_FRAMES)
    }
}

impl FaceTrack {
    #[must_use]
    pub const fn new(max_lost_frames: u32) -> Self {
        Self {
            max_lost_frames,
            last_known: None,
            lost_frames: 0,
        }
    }

    /// Feed this frame's primary face, if any.
    ///
    /// A detection refreshes the cache. A miss reuses the cached box while
    /// fewer than `max_lost_frames` consecutive misses have been bridged;
    /// past that the cache is dropped and the frame has no face.
    pub fn update(&mut self, detected: Option<FaceBox>) -> Option<TrackedFace> {
        if let Some(face) = detected {
            self.last_known = Some(face);
            self.lost_frames = 0;
            return Some(TrackedFace {
                face,
                cached: false,
                frames_left: self.max_lost_frames,
            });
        }

        let face = self.last_known?;
        if self.lost_frames >= self.max_lost_frames {
            debug!("Face lost for {} frames, dropping cached box", self.lost_frames);
            self.last_known = None;
            return None;
        }

        self.lost_frames += 1;
        Some(TrackedFace {
            face,
            cached: true,
            frames_left: self.max_lost_frames - self.lost_frames,
        })
    }

    /// Consecutive misses bridged so far
    #[must_use]
    pub const fn lost_frames(&self) -> u32 {
        self.lost_frames
    }

    pub fn reset(&mut self) {
        self.last_known = None;
        self.lost_frames = 0;
    }
}
