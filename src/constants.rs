//! Constants used throughout the application

/// Number of facial landmarks produced by the localizer
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// Landmark index ranges (iBUG 68-point annotation)
pub mod landmarks {
    /// Right eyebrow outer end
    pub const RIGHT_BROW_OUTER: usize = 17;
    /// Right eyebrow middle
    pub const RIGHT_BROW_MID: usize = 19;
    /// Right eyebrow inner end
    pub const RIGHT_BROW_INNER: usize = 21;
    /// Left eyebrow inner end
    pub const LEFT_BROW_INNER: usize = 22;
    /// Left eyebrow middle
    pub const LEFT_BROW_MID: usize = 24;
    /// Left eyebrow outer end
    pub const LEFT_BROW_OUTER: usize = 26;

    /// Right eye corners and lids: 36 (outer), 37, 38 (upper), 39 (inner), 40, 41 (lower)
    pub const RIGHT_EYE: [usize; 6] = [36, 37, 38, 39, 40, 41];
    /// Left eye corners and lids: 42 (inner), 43, 44 (upper), 45 (outer), 46, 47 (lower)
    pub const LEFT_EYE: [usize; 6] = [42, 43, 44, 45, 46, 47];

    /// Mouth corners
    pub const MOUTH_LEFT_CORNER: usize = 48;
    pub const MOUTH_RIGHT_CORNER: usize = 54;
    /// Outer lip centres
    pub const UPPER_LIP_OUTER: usize = 51;
    pub const LOWER_LIP_OUTER: usize = 57;
    /// Inner lip centres
    pub const UPPER_LIP_INNER: usize = 62;
    pub const LOWER_LIP_INNER: usize = 66;

    /// Ranges used by the landmark overlay
    pub const BROWS: std::ops::Range<usize> = 17..27;
    pub const EYES: std::ops::Range<usize> = 36..48;
    pub const MOUTH: std::ops::Range<usize> = 48..68;
}

/// Frames averaged to build the neutral baseline
pub const DEFAULT_CALIBRATION_FRAMES: usize = 30;

/// Eyebrow raise trigger, relative to baseline EBR
pub const DEFAULT_RAISE_MULTIPLIER: f64 = 1.12;
/// Eyebrow re-arm level, relative to baseline EBR
pub const DEFAULT_RESET_MULTIPLIER: f64 = 1.05;
/// Frames during which a fired trigger cannot fire again
pub const DEFAULT_COOLDOWN_FRAMES: u32 = 10;

/// Consecutive missed frames bridged by the cached face box
pub const DEFAULT_MAX_FACE_LOST_FRAMES: u32 = 10;

/// Baselines at or below this are treated as unset for the smile ratio
pub const SMILE_BASELINE_EPSILON: f64 = 0.001;

/// Score awarded for an exact expression match
pub const FULL_MATCH_SCORE: u8 = 100;
/// Match score needed before the hold timer runs
pub const DEFAULT_MATCH_THRESHOLD: u8 = 75;
/// Points awarded once per successful round
pub const ROUND_POINTS: u32 = 100;

/// Default session timing, in seconds
pub const DEFAULT_READY_SECS: f64 = 3.0;
pub const DEFAULT_ROUND_SECS: f64 = 8.0;
pub const DEFAULT_FEEDBACK_SECS: f64 = 2.0;
pub const DEFAULT_HOLD_SECS: f64 = 3.0;
pub const DEFAULT_TOTAL_ROUNDS: u32 = 5;

/// Head zone boundaries as fractions of frame width
pub const DEFAULT_LEFT_ZONE: f64 = 0.35;
pub const DEFAULT_RIGHT_ZONE: f64 = 0.65;
/// Minimum spacing of zone moves and brow rotates, in seconds
pub const DEFAULT_MOVE_COOLDOWN_SECS: f64 = 0.15;
pub const DEFAULT_ROTATE_COOLDOWN_SECS: f64 = 0.4;

/// Face detector confidence threshold
pub const DEFAULT_DETECTION_CONFIDENCE: f32 = 0.7;
