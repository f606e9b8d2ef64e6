//! Configuration management for the facial gesture controller

use crate::{
    classifier::ExpressionThresholds,
    constants::{
        DEFAULT_CALIBRATION_FRAMES, DEFAULT_COOLDOWN_FRAMES, DEFAULT_DETECTION_CONFIDENCE,
        DEFAULT_FEEDBACK_SECS, DEFAULT_HOLD_SECS, DEFAULT_LEFT_ZONE, DEFAULT_MATCH_THRESHOLD,
        DEFAULT_MAX_FACE_LOST_FRAMES, DEFAULT_MOVE_COOLDOWN_SECS, DEFAULT_RAISE_MULTIPLIER,
        DEFAULT_READY_SECS, DEFAULT_RESET_MULTIPLIER, DEFAULT_RIGHT_ZONE,
        DEFAULT_ROTATE_COOLDOWN_SECS, DEFAULT_ROUND_SECS, DEFAULT_TOTAL_ROUNDS, ROUND_POINTS,
    },
    filters::create_filter,
    session::{RoundEndPolicy, SessionConfig},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model file paths
    pub models: ModelConfig,

    /// Face detection configuration
    pub face_detection: FaceDetectionConfig,

    /// Face track cache configuration
    pub tracking: TrackingConfig,

    /// Baseline calibration configuration
    pub calibration: CalibrationConfig,

    /// Expression classifier thresholds
    pub expression: ExpressionThresholds,

    /// Eyebrow raise trigger configuration
    pub brow: BrowConfig,

    /// Expression game timing and scoring
    pub session: SessionSection,

    /// Head movement zones
    pub zones: ZoneConfig,

    /// Feature smoothing
    pub smoothing: SmoothingConfig,

    /// Display configuration
    pub display: DisplayConfig,
}

/// Model file paths configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// SSD face detector network description
    pub face_detector_prototxt: PathBuf,

    /// SSD face detector weights
    pub face_detector_weights: PathBuf,

    /// Path to facial landmarks ONNX model
    pub face_landmarks: PathBuf,
}

/// Face detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceDetectionConfig {
    /// Confidence threshold for face detection (0.0-1.0)
    pub confidence_threshold: f32,

    /// Context added around the face box before landmark localization
    pub crop_shift: f32,
}

/// Face track cache parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Consecutive missed detections bridged with the last known box
    pub max_lost_frames: u32,
}

/// Baseline calibration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Neutral frames averaged into the baseline
    pub frames: usize,
}

/// Eyebrow raise trigger parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowConfig {
    /// Raise threshold as a multiple of baseline EBR
    pub raise_multiplier: f64,

    /// Re-arm threshold as a multiple of baseline EBR
    pub reset_multiplier: f64,

    /// Frames blocked after a flap
    pub cooldown_frames: u32,
}

/// Expression game parameters, durations in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub ready_secs: f64,
    pub round_secs: f64,
    pub feedback_secs: f64,
    pub hold_secs: f64,
    pub total_rounds: u32,
    pub match_threshold: u8,
    pub round_points: u32,
    pub end_policy: RoundEndPolicy,
}

/// Head zone parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Left zone boundary as a fraction of frame width
    pub left: f64,

    /// Right zone boundary as a fraction of frame width
    pub right: f64,

    /// Minimum seconds between moves
    pub move_cooldown_secs: f64,

    /// Minimum seconds between rotates
    pub rotate_cooldown_secs: f64,
}

/// Smoothing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Filter spec: none, `moving_average:N`, `median:N` or `exponential:A`
    pub filter: String,
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show the camera window
    pub gui: bool,

    /// Mirror the camera image horizontally
    pub mirror: bool,

    /// Start with the debug overlay on
    pub debug_overlay: bool,

    /// Draw landmark points
    pub show_landmarks: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_detector_prototxt: PathBuf::from("assets/deploy.prototxt"),
            face_detector_weights: PathBuf::from("assets/res10_300x300_ssd_iter_140000.caffemodel"),
            face_landmarks: PathBuf::from("assets/face_landmarks.onnx"),
        }
    }
}

impl Default for FaceDetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_DETECTION_CONFIDENCE,
            crop_shift: 0.2,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_lost_frames: DEFAULT_MAX_FACE_LOST_FRAMES,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            frames: DEFAULT_CALIBRATION_FRAMES,
        }
    }
}

impl Default for BrowConfig {
    fn default() -> Self {
        Self {
            raise_multiplier: DEFAULT_RAISE_MULTIPLIER,
            reset_multiplier: DEFAULT_RESET_MULTIPLIER,
            cooldown_frames: DEFAULT_COOLDOWN_FRAMES,
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            ready_secs: DEFAULT_READY_SECS,
            round_secs: DEFAULT_ROUND_SECS,
            feedback_secs: DEFAULT_FEEDBACK_SECS,
            hold_secs: DEFAULT_HOLD_SECS,
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            round_points: ROUND_POINTS,
            end_policy: RoundEndPolicy::TimerOnly,
        }
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            left: DEFAULT_LEFT_ZONE,
            right: DEFAULT_RIGHT_ZONE,
            move_cooldown_secs: DEFAULT_MOVE_COOLDOWN_SECS,
            rotate_cooldown_secs: DEFAULT_ROTATE_COOLDOWN_SECS,
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            filter: "none".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            gui: false,
            mirror: true,
            debug_overlay: false,
            show_landmarks: true,
        }
    }
}

fn seconds(name: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        Error::ConfigError(format!(
            "{name} must be a non-negative number of seconds, got {value}"
        ))
    })
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration YAML.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Session parameters in the state machine's terms
    ///
    /// # Errors
    ///
    /// Returns an error for negative or non-finite durations.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let s = &self.session;
        Ok(SessionConfig {
            calibration_frames: self.calibration.frames,
            ready: seconds("session.ready_secs", s.ready_secs)?,
            round: seconds("session.round_secs", s.round_secs)?,
            feedback: seconds("session.feedback_secs", s.feedback_secs)?,
            hold: seconds("session.hold_secs", s.hold_secs)?,
            total_rounds: s.total_rounds,
            match_threshold: s.match_threshold,
            round_points: s.round_points,
            end_policy: s.end_policy,
            thresholds: self.expression,
            face_loss_tolerance: self.tracking.max_lost_frames,
        })
    }

    /// Zone controller cooldowns
    ///
    /// # Errors
    ///
    /// Returns an error for negative or non-finite durations.
    pub fn zone_cooldowns(&self) -> Result<(Duration, Duration)> {
        Ok((
            seconds("zones.move_cooldown_secs", self.zones.move_cooldown_secs)?,
            seconds("zones.rotate_cooldown_secs", self.zones.rotate_cooldown_secs)?,
        ))
    }

    /// Validate value ranges. Model paths are checked when the models load.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.face_detection.confidence_threshold) {
            return Err(Error::ConfigError(
                "Confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.face_detection.crop_shift) {
            return Err(Error::ConfigError("Crop shift must be between 0.0 and 1.0".to_string()));
        }

        if self.calibration.frames == 0 {
            return Err(Error::ConfigError(
                "Calibration frames must be greater than 0".to_string(),
            ));
        }

        if !(self.brow.reset_multiplier < self.brow.raise_multiplier) {
            return Err(Error::ConfigError(format!(
                "Brow reset multiplier {} must be below raise multiplier {}",
                self.brow.reset_multiplier, self.brow.raise_multiplier
            )));
        }

        if self.session.total_rounds == 0 {
            return Err(Error::ConfigError("Total rounds must be greater than 0".to_string()));
        }
        if !(self.session.round_secs > 0.0) {
            return Err(Error::ConfigError("Round duration must be positive".to_string()));
        }
        self.session_config()?.validate()?;

        if !(0.0..=1.0).contains(&self.zones.left)
            || !(0.0..=1.0).contains(&self.zones.right)
            || self.zones.left >= self.zones.right
        {
            return Err(Error::ConfigError(format!(
                "Zones must satisfy 0 <= left < right <= 1 (got {}, {})",
                self.zones.left, self.zones.right
            )));
        }
        self.zone_cooldowns()?;

        create_filter(&self.smoothing.filter)
            .map_err(|e| Error::ConfigError(format!("Invalid smoothing filter: {e}")))?;

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Facial Gesture Control Configuration

# Model paths
models:
  face_detector_prototxt: "assets/deploy.prototxt"
  face_detector_weights: "assets/res10_300x300_ssd_iter_140000.caffemodel"
  face_landmarks: "assets/face_landmarks.onnx"

# Face detection parameters
face_detection:
  confidence_threshold: 0.7
  crop_shift: 0.2

# Missed detections bridged with the last known face box
tracking:
  max_lost_frames: 10

# Neutral-face calibration
calibration:
  frames: 30

# Expression classifier thresholds (ratios to baseline unless noted)
expression:
  wink_asymmetry: 0.08
  wink_closed_fraction: 0.6
  surprised_ear_ratio: 1.1
  surprised_ebr_ratio: 1.1
  surprised_mar_ratio: 1.2
  surprised_min_score: 2
  happy_smile_ratio: 1.15
  happy_mar_ratio: 1.1
  happy_min_smile: 0.05
  neutral_low: 0.85
  neutral_high: 1.15
  neutral_min_score: 2

# Eyebrow raise trigger
brow:
  raise_multiplier: 1.12
  reset_multiplier: 1.05
  cooldown_frames: 10

# Expression matching game
session:
  ready_secs: 3.0
  round_secs: 8.0
  feedback_secs: 2.0
  hold_secs: 3.0
  total_rounds: 5
  match_threshold: 75
  round_points: 100
  end_policy: timer_only

# Head movement zones
zones:
  left: 0.35
  right: 0.65
  move_cooldown_secs: 0.15
  rotate_cooldown_secs: 0.4

# Feature smoothing: none, moving_average:N, median:N, exponential:A
smoothing:
  filter: "none"

# Display settings
display:
  gui: false
  mirror: true
  debug_overlay: false
  show_landmarks: true
"#;
