//! Gesture controllers that turn per-frame features into game actions.
//!
//! The core never inspects game state; it only calls the zero-argument
//! hooks of [`GameActions`].

use crate::{
    calibration::{BaselineCalibrator, BrowThresholds, CalibrationProgress},
    constants::{
        DEFAULT_COOLDOWN_FRAMES, DEFAULT_LEFT_ZONE, DEFAULT_MOVE_COOLDOWN_SECS, DEFAULT_RIGHT_ZONE,
        DEFAULT_ROTATE_COOLDOWN_SECS,
    },
    debounce::{Cooldown, HysteresisTrigger, RateLimiter},
    filters::FeatureFilter,
    geometry::FeatureVector,
    Error, Result,
};
use log::{info, warn};
use std::time::{Duration, Instant};

/// Action hooks of a downstream game
pub trait GameActions {
    fn flap(&mut self) {}
    fn rotate(&mut self) {}
    fn move_left(&mut self) {}
    fn move_right(&mut self) {}
}

/// Counts and logs every action; stands in for a game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionLog {
    pub flaps: u32,
    pub rotates: u32,
    pub left_moves: u32,
    pub right_moves: u32,
}

impl GameActions for ActionLog {
    fn flap(&mut self) {
        self.flaps += 1;
        info!("FLAP ({})", self.flaps);
    }

    fn rotate(&mut self) {
        self.rotates += 1;
        info!("ROTATE ({})", self.rotates);
    }

    fn move_left(&mut self) {
        self.left_moves += 1;
        info!("MOVE LEFT ({})", self.left_moves);
    }

    fn move_right(&mut self) {
        self.right_moves += 1;
        info!("MOVE RIGHT ({})", self.right_moves);
    }
}

/// Result of one brow detector update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BrowUpdate {
    /// Baseline still being collected
    Calibrating { frames: usize, needed: usize },
    /// This frame completed calibration
    Calibrated,
    /// Calibrated, no raise this frame
    Idle,
    /// Brows crossed the raise threshold on this frame
    Raised,
}

/// Calibrated eyebrow-raise edge detector shared by both controllers
pub struct BrowRaiseDetector {
    calibrator: BaselineCalibrator,
    cooldown: Cooldown,
    trigger: Option<HysteresisTrigger>,
    smoothing: Option<Box<dyn FeatureFilter>>,
    last_ebr: Option<f64>,
}

impl BrowRaiseDetector {
    #[must_use]
    pub const fn new(calibrator: BaselineCalibrator, cooldown: Cooldown) -> Self {
        Self {
            calibrator,
            cooldown,
            trigger: None,
            smoothing: None,
            last_ebr: None,
        }
    }

    /// Smooth EBR before calibration and triggering
    #[must_use]
    pub fn with_smoothing(mut self, filter: Box<dyn FeatureFilter>) -> Self {
        self.smoothing = Some(filter);
        self
    }

    /// Process one frame; `None` means no face this frame.
    pub fn update(&mut self, features: Option<&FeatureVector>, now: Instant) -> BrowUpdate {
        let ebr = features.map(|features| {
            let ebr = match &mut self.smoothing {
                Some(filter) => filter.apply(features.ebr),
                None => features.ebr,
            };
            (features, ebr)
        });

        if !self.calibrator.is_calibrated() {
            let Some((features, ebr)) = ebr else {
                let (frames, needed) = self.calibrator.progress();
                return BrowUpdate::Calibrating { frames, needed };
            };
            self.last_ebr = Some(ebr);
            let progress = self.calibrator.add_frame(&FeatureVector { ebr, ..*features });
            return match progress {
                CalibrationProgress::Accumulating { frames, needed } => {
                    BrowUpdate::Calibrating { frames, needed }
                }
                CalibrationProgress::Completed(_) | CalibrationProgress::AlreadyDone => {
                    if let Err(e) = self.arm() {
                        warn!("Unusable brow baseline, recalibrating: {e}");
                        self.calibrator.reset();
                        let (frames, needed) = self.calibrator.progress();
                        return BrowUpdate::Calibrating { frames, needed };
                    }
                    BrowUpdate::Calibrated
                }
            };
        }

        let value = ebr.map(|(_, ebr)| ebr);
        if value.is_some() {
            self.last_ebr = value;
        }
        match &mut self.trigger {
            Some(trigger) if trigger.update(value, now) => BrowUpdate::Raised,
            _ => BrowUpdate::Idle,
        }
    }

    fn arm(&mut self) -> Result<()> {
        let thresholds = self
            .calibrator
            .thresholds()
            .ok_or_else(|| Error::Debounce("Calibrator finished without thresholds".to_string()))?;
        let trigger = HysteresisTrigger::new(thresholds.raise, thresholds.reset, self.cooldown)?;
        self.trigger = Some(trigger);
        Ok(())
    }

    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.trigger.is_some()
    }

    #[must_use]
    pub const fn calibrator(&self) -> &BaselineCalibrator {
        &self.calibrator
    }

    #[must_use]
    pub const fn thresholds(&self) -> Option<BrowThresholds> {
        self.calibrator.thresholds()
    }

    /// Most recent (smoothed) EBR
    #[must_use]
    pub const fn last_ebr(&self) -> Option<f64> {
        self.last_ebr
    }

    /// How far the last EBR is from baseline towards the raise threshold,
    /// clamped to 0..=1. Zero before calibration.
    #[must_use]
    pub fn raise_progress(&self) -> f64 {
        let (Some(ebr), Some(thresholds)) = (self.last_ebr, self.thresholds()) else {
            return 0.0;
        };
        let baseline = self.calibrator.baseline().ebr;
        let span = thresholds.raise - baseline;
        if span > 0.0 {
            ((ebr - baseline) / span).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Forget the baseline and start calibrating again
    pub fn recalibrate(&mut self) {
        self.calibrator.reset();
        self.trigger = None;
        self.last_ebr = None;
        if let Some(filter) = &mut self.smoothing {
            filter.reset();
        }
    }
}

/// Flappy control: each brow raise flaps once.
pub struct BrowFlapController {
    brows: BrowRaiseDetector,
}

impl BrowFlapController {
    /// Controller with a frame-count cooldown between flaps.
    #[must_use]
    pub const fn new(calibrator: BaselineCalibrator, cooldown_frames: u32) -> Self {
        Self {
            brows: BrowRaiseDetector::new(calibrator, Cooldown::Frames(cooldown_frames)),
        }
    }

    /// Defaults: 30 calibration frames, x1.12 raise, x1.05 reset, 10-frame cooldown.
    ///
    /// # Errors
    ///
    /// Never fails with the built-in defaults; the signature follows
    /// [`BaselineCalibrator::new`].
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(
            BaselineCalibrator::new(crate::constants::DEFAULT_CALIBRATION_FRAMES)?,
            DEFAULT_COOLDOWN_FRAMES,
        ))
    }

    #[must_use]
    pub fn with_smoothing(self, filter: Box<dyn FeatureFilter>) -> Self {
        Self {
            brows: self.brows.with_smoothing(filter),
        }
    }

    /// Process one frame and call `flap` on a raise.
    pub fn update(
        &mut self,
        features: Option<&FeatureVector>,
        now: Instant,
        actions: &mut dyn GameActions,
    ) -> BrowUpdate {
        let update = self.brows.update(features, now);
        if update == BrowUpdate::Raised {
            actions.flap();
        }
        update
    }

    #[must_use]
    pub const fn brows(&self) -> &BrowRaiseDetector {
        &self.brows
    }

    /// Fill level of the UI power bar
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.brows.raise_progress()
    }

    pub fn recalibrate(&mut self) {
        self.brows.recalibrate();
    }
}

/// Horizontal position of the face relative to the movement zones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Left,
    Centre,
    Right,
}

/// Movement zone boundaries as fractions of the frame width
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneLayout {
    pub left: f64,
    pub right: f64,
}

impl Default for ZoneLayout {
    fn default() -> Self {
        Self {
            left: DEFAULT_LEFT_ZONE,
            right: DEFAULT_RIGHT_ZONE,
        }
    }
}

impl ZoneLayout {
    /// # Errors
    ///
    /// Returns an error unless `0 <= left < right <= 1`.
    pub fn new(left: f64, right: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&left) || !(0.0..=1.0).contains(&right) || left >= right {
            return Err(Error::InvalidInput(format!(
                "Zone boundaries must satisfy 0 <= left < right <= 1 (got {left}, {right})"
            )));
        }
        Ok(Self { left, right })
    }

    /// Which zone a face centre falls in
    #[must_use]
    pub fn classify(&self, centre_x: f64, frame_width: f64) -> Zone {
        if centre_x < self.left * frame_width {
            Zone::Left
        } else if centre_x > self.right * frame_width {
            Zone::Right
        } else {
            Zone::Centre
        }
    }
}

/// Tetris control: lean to move, raise brows to rotate.
pub struct HeadZoneController {
    brows: BrowRaiseDetector,
    layout: ZoneLayout,
    moves: RateLimiter,
    zone: Option<Zone>,
}

impl HeadZoneController {
    #[must_use]
    pub const fn new(
        calibrator: BaselineCalibrator,
        layout: ZoneLayout,
        move_cooldown: Duration,
        rotate_cooldown: Duration,
    ) -> Self {
        Self {
            brows: BrowRaiseDetector::new(calibrator, Cooldown::Duration(rotate_cooldown)),
            layout,
            moves: RateLimiter::new(move_cooldown),
            zone: None,
        }
    }

    /// Defaults: zones at 35% / 65%, moves every 0.15 s, rotates every 0.4 s.
    ///
    /// # Errors
    ///
    /// Never fails with the built-in defaults.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(
            BaselineCalibrator::new(crate::constants::DEFAULT_CALIBRATION_FRAMES)?,
            ZoneLayout::default(),
            Duration::from_secs_f64(DEFAULT_MOVE_COOLDOWN_SECS),
            Duration::from_secs_f64(DEFAULT_ROTATE_COOLDOWN_SECS),
        ))
    }

    #[must_use]
    pub fn with_smoothing(self, filter: Box<dyn FeatureFilter>) -> Self {
        Self {
            brows: self.brows.with_smoothing(filter),
            ..self
        }
    }

    /// Process one frame.
    ///
    /// `face_centre_x` is the tracked face centre in pixels, `None` when
    /// there is no face. Moves only start once the brows are calibrated.
    /// A rotate and a move can both fire on the same frame.
    pub fn update(
        &mut self,
        face_centre_x: Option<f64>,
        frame_width: f64,
        features: Option<&FeatureVector>,
        now: Instant,
        actions: &mut dyn GameActions,
    ) -> BrowUpdate {
        let update = self.brows.update(features, now);
        if matches!(update, BrowUpdate::Calibrating { .. } | BrowUpdate::Calibrated) {
            self.zone = None;
            return update;
        }
        if update == BrowUpdate::Raised {
            actions.rotate();
        }

        self.zone = face_centre_x.map(|x| self.layout.classify(x, frame_width));
        match self.zone {
            Some(Zone::Left) if self.moves.try_fire(now) => actions.move_left(),
            Some(Zone::Right) if self.moves.try_fire(now) => actions.move_right(),
            _ => {}
        }
        update
    }

    /// Zone of the face on the last calibrated frame
    #[must_use]
    pub const fn zone(&self) -> Option<Zone> {
        self.zone
    }

    #[must_use]
    pub const fn layout(&self) -> ZoneLayout {
        self.layout
    }

    #[must_use]
    pub const fn brows(&self) -> &BrowRaiseDetector {
        &self.brows
    }

    pub fn recalibrate(&mut self) {
        self.brows.recalibrate();
        self.moves.reset();
        self.zone = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::create_filter;

    fn brows(ebr: f64) -> FeatureVector {
        FeatureVector {
            ear: 0.3,
            ear_left: 0.3,
            ear_right: 0.3,
            ebr,
            mar: 0.15,
            smile: 0.02,
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn calibrated_flap(cooldown: u32) -> BrowFlapController {
        let mut controller = BrowFlapController::new(BaselineCalibrator::new(3).unwrap(), cooldown);
        let now = Instant::now();
        let mut actions = ActionLog::default();
        for _ in 0..3 {
            controller.update(Some(&brows(0.20)), now, &mut actions);
        }
        assert!(controller.brows().is_calibrated());
        controller
    }

    #[test]
    fn test_no_flap_while_calibrating() {
        let mut controller = BrowFlapController::new(BaselineCalibrator::new(3).unwrap(), 10);
        let mut actions = ActionLog::default();
        let now = Instant::now();

        let update = controller.update(Some(&brows(0.5)), now, &mut actions);
        assert_eq!(update, BrowUpdate::Calibrating { frames: 1, needed: 3 });
        // no face does not count towards calibration
        assert_eq!(
            controller.update(None, now, &mut actions),
            BrowUpdate::Calibrating { frames: 1, needed: 3 }
        );
        assert_eq!(actions.flaps, 0);
    }

    #[test]
    fn test_flap_once_per_raise() {
        let mut controller = calibrated_flap(0);
        let mut actions = ActionLog::default();
        let now = Instant::now();

        // trigger 0.224, reset 0.21
        controller.update(Some(&brows(0.23)), now, &mut actions);
        controller.update(Some(&brows(0.25)), now, &mut actions);
        controller.update(Some(&brows(0.215)), now, &mut actions);
        controller.update(Some(&brows(0.23)), now, &mut actions);
        assert_eq!(actions.flaps, 1);

        controller.update(Some(&brows(0.20)), now, &mut actions);
        controller.update(Some(&brows(0.23)), now, &mut actions);
        assert_eq!(actions.flaps, 2);
    }

    #[test]
    fn test_flap_cooldown() {
        let mut controller = calibrated_flap(10);
        let mut actions = ActionLog::default();
        let now = Instant::now();

        controller.update(Some(&brows(0.25)), now, &mut actions);
        for _ in 0..5 {
            controller.update(Some(&brows(0.20)), now, &mut actions);
            controller.update(Some(&brows(0.25)), now, &mut actions);
        }
        assert_eq!(actions.flaps, 1);
        controller.update(Some(&brows(0.20)), now, &mut actions);
        controller.update(Some(&brows(0.25)), now, &mut actions);
        assert_eq!(actions.flaps, 2);
    }

    #[test]
    fn test_progress() {
        let mut controller = calibrated_flap(0);
        let mut actions = ActionLog::default();
        let now = Instant::now();
        assert_eq!(controller.progress(), 0.0);

        controller.update(Some(&brows(0.212)), now, &mut actions);
        assert!((controller.progress() - 0.5).abs() < 1e-9);
        controller.update(Some(&brows(0.5)), now, &mut actions);
        assert_eq!(controller.progress(), 1.0);
        controller.update(Some(&brows(0.1)), now, &mut actions);
        assert_eq!(controller.progress(), 0.0);
    }

    #[test]
    fn test_zero_baseline_recalibrates() {
        let mut controller = BrowFlapController::new(BaselineCalibrator::new(1).unwrap(), 10);
        let mut actions = ActionLog::default();
        controller.update(Some(&brows(0.0)), Instant::now(), &mut actions);
        assert!(!controller.brows().is_calibrated());
        assert_eq!(controller.brows().calibrator().progress(), (0, 1));
    }

    #[test]
    fn test_smoothed_flap() {
        let mut controller = BrowFlapController::new(BaselineCalibrator::new(1).unwrap(), 0)
            .with_smoothing(create_filter("moving_average:2").unwrap());
        let mut actions = ActionLog::default();
        let now = Instant::now();
        controller.update(Some(&brows(0.20)), now, &mut actions);
        // averaged with 0.20 -> 0.21, below trigger
        controller.update(Some(&brows(0.22)), now, &mut actions);
        assert_eq!(actions.flaps, 0);
        controller.update(Some(&brows(0.24)), now, &mut actions);
        assert_eq!(actions.flaps, 1);
    }

    #[test]
    fn test_zone_layout() {
        let layout = ZoneLayout::default();
        assert_eq!(layout.classify(100.0, 640.0), Zone::Left);
        assert_eq!(layout.classify(320.0, 640.0), Zone::Centre);
        assert_eq!(layout.classify(500.0, 640.0), Zone::Right);
        assert!(ZoneLayout::new(0.7, 0.3).is_err());
        assert!(ZoneLayout::new(0.2, 1.2).is_err());
    }

    #[test]
    fn test_head_zone_moves_rate_limited() {
        let mut controller = HeadZoneController::new(
            BaselineCalibrator::new(1).unwrap(),
            ZoneLayout::default(),
            ms(150),
            ms(400),
        );
        let mut actions = ActionLog::default();
        let t0 = Instant::now();
        let face = brows(0.20);

        // calibration frame: no movement yet
        controller.update(Some(100.0), 640.0, Some(&face), t0, &mut actions);
        assert_eq!(actions.left_moves, 0);

        controller.update(Some(100.0), 640.0, Some(&face), t0 + ms(10), &mut actions);
        controller.update(Some(100.0), 640.0, Some(&face), t0 + ms(100), &mut actions);
        controller.update(Some(100.0), 640.0, Some(&face), t0 + ms(200), &mut actions);
        assert_eq!(actions.left_moves, 2);

        controller.update(Some(600.0), 640.0, Some(&face), t0 + ms(400), &mut actions);
        assert_eq!(actions.right_moves, 1);
        assert_eq!(controller.zone(), Some(Zone::Right));

        controller.update(Some(320.0), 640.0, Some(&face), t0 + ms(800), &mut actions);
        assert_eq!(controller.zone(), Some(Zone::Centre));
        assert_eq!(actions.left_moves + actions.right_moves, 3);
    }

    #[test]
    fn test_rotate_and_move_same_frame() {
        let mut controller = HeadZoneController::with_defaults().unwrap();
        let mut actions = ActionLog::default();
        let t0 = Instant::now();
        for _ in 0..30 {
            controller.update(Some(320.0), 640.0, Some(&brows(0.20)), t0, &mut actions);
        }

        controller.update(Some(50.0), 640.0, Some(&brows(0.30)), t0 + ms(10), &mut actions);
        assert_eq!(actions.rotates, 1);
        assert_eq!(actions.left_moves, 1);

        // rotate is time rate limited even after a release
        controller.update(None, 640.0, Some(&brows(0.20)), t0 + ms(100), &mut actions);
        controller.update(None, 640.0, Some(&brows(0.30)), t0 + ms(200), &mut actions);
        assert_eq!(actions.rotates, 1);
        controller.update(None, 640.0, Some(&brows(0.20)), t0 + ms(300), &mut actions);
        controller.update(None, 640.0, Some(&brows(0.30)), t0 + ms(500), &mut actions);
        assert_eq!(actions.rotates, 2);
    }
}
