//! Per-user neutral baseline calibration.
//!
//! The calibrator averages a fixed number of frames while the subject
//! holds a neutral face. Until it is done, every ratio against the
//! baseline reads as neutral (1.0) instead of dividing by zero.

use crate::{
    constants::{DEFAULT_RAISE_MULTIPLIER, DEFAULT_RESET_MULTIPLIER, SMILE_BASELINE_EPSILON},
    geometry::FeatureVector,
    Error, Result,
};
use log::{debug, info};

/// `current / baseline`, or exactly 1.0 when the baseline is unset.
#[must_use]
pub fn ratio(current: f64, baseline: f64) -> f64 {
    ratio_above(current, baseline, 0.0)
}

/// `current / baseline` when `baseline > floor`, else 1.0.
///
/// NaN baselines fail the comparison and also read as neutral.
#[must_use]
pub fn ratio_above(current: f64, baseline: f64, floor: f64) -> f64 {
    if baseline > floor {
        current / baseline
    } else {
        1.0
    }
}

/// Neutral-pose reference value for each feature ratio
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Baseline {
    pub ear: f64,
    pub ebr: f64,
    pub mar: f64,
    pub smile: f64,
}

impl Baseline {
    /// Sentinel for "not calibrated yet"; every ratio against it is 1.0
    pub const UNSET: Self = Self {
        ear: 0.0,
        ebr: 0.0,
        mar: 0.0,
        smile: 0.0,
    };

    #[must_use]
    pub fn ear_ratio(&self, ear: f64) -> f64 {
        ratio(ear, self.ear)
    }

    #[must_use]
    pub fn ebr_ratio(&self, ebr: f64) -> f64 {
        ratio(ebr, self.ebr)
    }

    #[must_use]
    pub fn mar_ratio(&self, mar: f64) -> f64 {
        ratio(mar, self.mar)
    }

    /// Neutral smiles sit near zero, so tiny baselines count as unset.
    #[must_use]
    pub fn smile_ratio(&self, smile: f64) -> f64 {
        ratio_above(smile, self.smile, SMILE_BASELINE_EPSILON)
    }
}

/// Eyebrow thresholds fixed at the moment calibration completes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrowThresholds {
    /// EBR above which the brows count as raised
    pub raise: f64,
    /// EBR below which a raise is re-armed
    pub reset: f64,
}

/// Result of feeding one frame to the calibrator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationProgress {
    /// Still collecting; `frames` of `needed` seen so far
    Accumulating { frames: usize, needed: usize },
    /// This frame completed calibration
    Completed(Baseline),
    /// Calibration had already completed; the frame was ignored
    AlreadyDone,
}

/// Two-state calibrator: accumulating, then done for the rest of the session
#[derive(Debug, Clone)]
pub struct BaselineCalibrator {
    frames_needed: usize,
    frames: usize,
    running: Baseline,
    baseline: Option<Baseline>,
    thresholds: Option<BrowThresholds>,
    raise_multiplier: f64,
    reset_multiplier: f64,
}

impl BaselineCalibrator {
    /// Create a calibrator with the default brow multipliers.
    ///
    /// # Errors
    ///
    /// Returns an error if `frames_needed` is zero.
    pub fn new(frames_needed: usize) -> Result<Self> {
        Self::with_multipliers(frames_needed, DEFAULT_RAISE_MULTIPLIER, DEFAULT_RESET_MULTIPLIER)
    }

    /// Create a calibrator with explicit brow raise/reset multipliers.
    ///
    /// # Errors
    ///
    /// Returns an error if `frames_needed` is zero or the reset multiplier
    /// is not strictly below the raise multiplier.
    pub fn with_multipliers(
        frames_needed: usize,
        raise_multiplier: f64,
        reset_multiplier: f64,
    ) -> Result<Self> {
        if frames_needed == 0 {
            return Err(Error::InvalidInput(
                "Calibration needs at least one frame".to_string(),
            ));
        }
        if !(reset_multiplier < raise_multiplier) {
            return Err(Error::InvalidInput(format!(
                "Reset multiplier {reset_multiplier} must be below raise multiplier \
                 {raise_multiplier}"
            )));
        }

        Ok(Self {
            frames_needed,
            frames: 0,
            running: Baseline::UNSET,
            baseline: None,
            thresholds: None,
            raise_multiplier,
            reset_multiplier,
        })
    }

    /// Feed one neutral-pose frame.
    pub fn add_frame(&mut self, features: &FeatureVector) -> CalibrationProgress {
        if self.baseline.is_some() {
            return CalibrationProgress::AlreadyDone;
        }

        // Running mean keeps constant input exact.
        self.frames += 1;
        let n = self.frames as f64;
        self.running.ear += (features.ear - self.running.ear) / n;
        self.running.ebr += (features.ebr - self.running.ebr) / n;
        self.running.mar += (features.mar - self.running.mar) / n;
        self.running.smile += (features.smile - self.running.smile) / n;

        if self.frames < self.frames_needed {
            debug!("Calibrating {}/{}", self.frames, self.frames_needed);
            return CalibrationProgress::Accumulating {
                frames: self.frames,
                needed: self.frames_needed,
            };
        }

        let baseline = self.running;
        let thresholds = BrowThresholds {
            raise: baseline.ebr * self.raise_multiplier,
            reset: baseline.ebr * self.reset_multiplier,
        };
        info!(
            "Calibration complete: EAR {:.3}, EBR {:.3}, MAR {:.3}, smile {:.3}",
            baseline.ear, baseline.ebr, baseline.mar, baseline.smile
        );
        info!("Brow raise threshold {:.3}, reset {:.3}", thresholds.raise, thresholds.reset);

        self.baseline = Some(baseline);
        self.thresholds = Some(thresholds);
        CalibrationProgress::Completed(baseline)
    }

    #[must_use]
    pub const fn is_calibrated(&self) -> bool {
        self.baseline.is_some()
    }

    /// The baseline, or [`Baseline::UNSET`] while still accumulating
    #[must_use]
    pub fn baseline(&self) -> Baseline {
        self.baseline.unwrap_or(Baseline::UNSET)
    }

    /// Brow thresholds, available once calibrated
    #[must_use]
    pub const fn thresholds(&self) -> Option<BrowThresholds> {
        self.thresholds
    }

    /// Frames seen and frames needed
    #[must_use]
    pub const fn progress(&self) -> (usize, usize) {
        (self.frames, self.frames_needed)
    }

    /// Discard everything and start accumulating again
    pub fn reset(&mut self) {
        self.frames = 0;
        self.running = Baseline::UNSET;
        self.baseline = None;
        self.thresholds = None;
    }
}
