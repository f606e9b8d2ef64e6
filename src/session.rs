//! Round/session state machine of the expression matching game.
//!
//! The session is driven by [`ExpressionSession::tick`], called once per
//! frame with the current time and that frame's features (or `None` when
//! no face was observed). Phase changes are decided by wall-clock time, so
//! a run of faceless frames never stalls a round. During play, up to
//! `face_loss_tolerance` faceless frames in a row are judged on the last
//! observed features, so a brief dropout does not break a hold.
//!
//! ```text
//! Calibration -> Ready -> Playing -> Feedback -> Ready ... -> GameOver
//! ```

use crate::{
    calibration::{Baseline, BaselineCalibrator, CalibrationProgress},
    classifier::{classify, match_score, Expression, ExpressionThresholds},
    constants::{
        DEFAULT_CALIBRATION_FRAMES, DEFAULT_FEEDBACK_SECS, DEFAULT_HOLD_SECS,
        DEFAULT_MATCH_THRESHOLD, DEFAULT_MAX_FACE_LOST_FRAMES, DEFAULT_READY_SECS,
        DEFAULT_ROUND_SECS, DEFAULT_TOTAL_ROUNDS, ROUND_POINTS,
    },
    debounce::{HoldStatus, SustainedHold},
    filters::FeatureSmoother,
    geometry::FeatureVector,
    Error, Result,
};
use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    time::{Duration, Instant},
};

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Calibration,
    Ready,
    Playing,
    Feedback,
    GameOver,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Calibration => "CALIBRATION",
            Self::Ready => "READY",
            Self::Playing => "PLAYING",
            Self::Feedback => "FEEDBACK",
            Self::GameOver => "GAME OVER",
        };
        f.write_str(name)
    }
}

/// When a round leaves `Playing`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundEndPolicy {
    /// The round timer always runs out; success only stops further credit
    #[default]
    TimerOnly,
    /// A successful hold ends the round immediately
    EndOnSuccess,
}

/// Chooses the target expression of each round
pub trait TargetPicker: Send {
    fn pick(&mut self) -> Expression;
}

/// Uniformly random targets
pub struct RandomPicker {
    rng: StdRng,
}

impl RandomPicker {
    /// Seeded picker for reproducible games, or entropy-seeded with `None`
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self { rng }
    }
}

impl TargetPicker for RandomPicker {
    fn pick(&mut self) -> Expression {
        Expression::ALL[self.rng.gen_range(0..Expression::ALL.len())]
    }
}

/// Cycles through a fixed list of targets
pub struct SequencePicker {
    targets: Vec<Expression>,
    next: usize,
}

impl SequencePicker {
    /// # Errors
    ///
    /// Returns an error if `targets` is empty.
    pub fn new(targets: Vec<Expression>) -> Result<Self> {
        if targets.is_empty() {
            return Err(Error::InvalidInput("Target sequence must not be empty".to_string()));
        }
        Ok(Self { targets, next: 0 })
    }
}

impl TargetPicker for SequencePicker {
    fn pick(&mut self) -> Expression {
        let target = self.targets[self.next % self.targets.len()];
        self.next += 1;
        target
    }
}

/// Timing and scoring parameters of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub calibration_frames: usize,
    pub ready: Duration,
    pub round: Duration,
    pub feedback: Duration,
    pub hold: Duration,
    pub total_rounds: u32,
    /// Match score (0-100) that counts towards the hold
    pub match_threshold: u8,
    pub round_points: u32,
    pub end_policy: RoundEndPolicy,
    pub thresholds: ExpressionThresholds,
    /// Consecutive faceless frames during play that reuse the last features
    pub face_loss_tolerance: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            calibration_frames: DEFAULT_CALIBRATION_FRAMES,
            ready: Duration::from_secs_f64(DEFAULT_READY_SECS),
            round: Duration::from_secs_f64(DEFAULT_ROUND_SECS),
            feedback: Duration::from_secs_f64(DEFAULT_FEEDBACK_SECS),
            hold: Duration::from_secs_f64(DEFAULT_HOLD_SECS),
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            round_points: ROUND_POINTS,
            end_policy: RoundEndPolicy::default(),
            thresholds: ExpressionThresholds::default(),
            face_loss_tolerance: DEFAULT_MAX_FACE_LOST_FRAMES,
        }
    }
}

impl SessionConfig {
    /// # Errors
    ///
    /// Returns an error for zero rounds, zero calibration frames, a zero
    /// round length, a match threshold above 100 or a maximum score that
    /// does not fit in `u32`.
    pub fn validate(&self) -> Result<()> {
        if self.total_rounds == 0 {
            return Err(Error::ConfigError("total_rounds must be at least 1".to_string()));
        }
        if self.calibration_frames == 0 {
            return Err(Error::ConfigError("calibration_frames must be at least 1".to_string()));
        }
        if self.round.is_zero() {
            return Err(Error::ConfigError("round duration must be positive".to_string()));
        }
        if self.match_threshold > 100 {
            return Err(Error::ConfigError(format!(
                "match_threshold must be 0-100, got {}",
                self.match_threshold
            )));
        }
        if self.total_rounds.checked_mul(self.round_points).is_none() {
            return Err(Error::ConfigError(format!(
                "{} rounds of {} points overflow the score",
                self.total_rounds, self.round_points
            )));
        }
        Ok(())
    }
}

/// How a finished round went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    pub round: u32,
    pub target: Expression,
    pub success: bool,
    /// Match score of the last observed frame
    pub last_match: u8,
}

/// Cumulative result reported at game over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalScore {
    pub score: u32,
    pub max: u32,
    /// Whole percent, rounded down
    pub percent: u32,
}

impl FinalScore {
    #[must_use]
    pub fn new(score: u32, max: u32) -> Self {
        let percent = if max == 0 {
            0
        } else {
            u64::from(score) * 100 / u64::from(max)
        };
        Self {
            score,
            max,
            percent: u32::try_from(percent).unwrap_or(u32::MAX),
        }
    }
}

impl fmt::Display for FinalScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({}%)", self.score, self.max, self.percent)
    }
}

/// Notable things that happened during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    Calibrated(Baseline),
    /// A new round is announced
    RoundReady { round: u32, target: Expression },
    RoundStarted { round: u32, target: Expression },
    HoldStarted,
    HoldLost,
    RoundSucceeded { round: u32, points: u32 },
    RoundEnded(RoundOutcome),
    GameOver(FinalScore),
}

/// Read-only view for presentation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub round: u32,
    pub total_rounds: u32,
    pub target: Option<Expression>,
    pub current: Option<Expression>,
    pub match_score: u8,
    /// Time left in the current timed phase
    pub time_remaining: Option<Duration>,
    /// Time left on a hold in progress
    pub hold_remaining: Option<Duration>,
    pub round_success: bool,
    pub score: u32,
    pub calibration: (usize, usize),
}

/// The expression matching game
pub struct ExpressionSession {
    config: SessionConfig,
    calibrator: BaselineCalibrator,
    picker: Box<dyn TargetPicker>,
    smoothing: Option<FeatureSmoother>,
    hold: SustainedHold,
    /// Last observed features of the round and how many frames reused them
    last_features: Option<FeatureVector>,
    missed_frames: u32,
    phase: Phase,
    phase_started: Option<Instant>,
    round: u32,
    target: Option<Expression>,
    current: Option<Expression>,
    match_score: u8,
    round_success: bool,
    score: u32,
    history: Vec<RoundOutcome>,
}

impl ExpressionSession {
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: SessionConfig, picker: Box<dyn TargetPicker>) -> Result<Self> {
        config.validate()?;
        let calibrator = BaselineCalibrator::new(config.calibration_frames)?;
        let hold = SustainedHold::new(config.hold);

        Ok(Self {
            config,
            calibrator,
            picker,
            smoothing: None,
            hold,
            last_features: None,
            missed_frames: 0,
            phase: Phase::Calibration,
            phase_started: None,
            round: 0,
            target: None,
            current: None,
            match_score: 0,
            round_success: false,
            score: 0,
            history: Vec::new(),
        })
    }

    /// Smooth features before calibration and classification
    #[must_use]
    pub fn with_smoothing(mut self, smoother: FeatureSmoother) -> Self {
        self.smoothing = Some(smoother);
        self
    }

    /// Advance the session by one frame.
    ///
    /// At most one phase transition happens per tick.
    pub fn tick(&mut self, now: Instant, features: Option<&FeatureVector>) -> Vec<SessionEvent> {
        let smoothed = match (&mut self.smoothing, features) {
            (Some(smoother), Some(features)) => Some(smoother.apply(features)),
            (_, features) => features.copied(),
        };

        let mut events = Vec::new();
        match self.phase {
            Phase::Calibration => self.calibrate(now, smoothed.as_ref(), &mut events),
            Phase::Ready => {
                if self.elapsed(now) > self.config.ready {
                    self.start_round(now, &mut events);
                }
            }
            Phase::Playing => self.play(now, smoothed.as_ref(), &mut events),
            Phase::Feedback => {
                if self.elapsed(now) > self.config.feedback {
                    self.next_round(now, &mut events);
                }
            }
            Phase::GameOver => {}
        }
        events
    }

    fn elapsed(&self, now: Instant) -> Duration {
        self.phase_started
            .map_or(Duration::ZERO, |started| now.saturating_duration_since(started))
    }

    fn enter(&mut self, phase: Phase, now: Instant) {
        debug!("{} -> {}", self.phase, phase);
        self.phase = phase;
        self.phase_started = Some(now);
    }

    fn calibrate(
        &mut self,
        now: Instant,
        features: Option<&FeatureVector>,
        events: &mut Vec<SessionEvent>,
    ) {
        let Some(features) = features else {
            return;
        };
        if let CalibrationProgress::Completed(baseline) = self.calibrator.add_frame(features) {
            events.push(SessionEvent::Calibrated(baseline));
            self.round = 1;
            self.score = 0;
            self.history.clear();
            self.announce_round(now, events);
        }
    }

    fn announce_round(&mut self, now: Instant, events: &mut Vec<SessionEvent>) {
        let target = self.picker.pick();
        self.target = Some(target);
        self.match_score = 0;
        self.current = None;
        self.enter(Phase::Ready, now);
        info!("Round {}/{}: get ready for {}", self.round, self.config.total_rounds, target);
        events.push(SessionEvent::RoundReady {
            round: self.round,
            target,
        });
    }

    fn start_round(&mut self, now: Instant, events: &mut Vec<SessionEvent>) {
        self.hold.reset();
        self.last_features = None;
        self.missed_frames = 0;
        self.round_success = false;
        self.enter(Phase::Playing, now);
        if let Some(target) = self.target {
            info!("Round {}: match {} {}", self.round, target.emoji(), target);
            events.push(SessionEvent::RoundStarted {
                round: self.round,
                target,
            });
        }
    }

    fn play(
        &mut self,
        now: Instant,
        features: Option<&FeatureVector>,
        events: &mut Vec<SessionEvent>,
    ) {
        let Some(target) = self.target else {
            return;
        };

        // A short face loss keeps judging the last features. Past the
        // tolerance the hold is broken. The timer always keeps running.
        let features = self.bridge_face_loss(features);
        let matched = features.as_ref().map_or(false, |features| {
            let baseline = self.calibrator.baseline();
            let classification = classify(features, &baseline, &self.config.thresholds);
            self.current = Some(classification.expression);
            self.match_score = match_score(classification.expression, target);
            self.match_score >= self.config.match_threshold
        });
        if features.is_none() {
            self.current = None;
        }

        match self.hold.update(matched, now) {
            HoldStatus::Started => {
                info!("Good match! Hold for {:.1}s", self.config.hold.as_secs_f64());
                events.push(SessionEvent::HoldStarted);
            }
            HoldStatus::Lost => {
                info!("Lost the match, try again");
                events.push(SessionEvent::HoldLost);
            }
            HoldStatus::Succeeded => {
                self.round_success = true;
                self.score = self.score.saturating_add(self.config.round_points);
                info!("SUCCESS! +{} points (total {})", self.config.round_points, self.score);
                events.push(SessionEvent::RoundSucceeded {
                    round: self.round,
                    points: self.config.round_points,
                });
            }
            HoldStatus::Idle | HoldStatus::Holding { .. } | HoldStatus::Complete => {}
        }

        let timed_out = self.elapsed(now) >= self.config.round;
        let ended_early =
            self.round_success && self.config.end_policy == RoundEndPolicy::EndOnSuccess;
        if timed_out || ended_early {
            let outcome = RoundOutcome {
                round: self.round,
                target,
                success: self.round_success,
                last_match: self.match_score,
            };
            if !outcome.success {
                info!("Round {} failed: expression not held long enough", self.round);
            }
            self.history.push(outcome);
            self.enter(Phase::Feedback, now);
            events.push(SessionEvent::RoundEnded(outcome));
        }
    }

    fn bridge_face_loss(&mut self, features: Option<&FeatureVector>) -> Option<FeatureVector> {
        if let Some(features) = features {
            self.last_features = Some(*features);
            self.missed_frames = 0;
            return Some(*features);
        }
        if self.missed_frames < self.config.face_loss_tolerance {
            if let Some(last) = self.last_features {
                self.missed_frames += 1;
                debug!("No face, reusing last features ({} frames)", self.missed_frames);
                return Some(last);
            }
        }
        self.last_features = None;
        None
    }

    fn next_round(&mut self, now: Instant, events: &mut Vec<SessionEvent>) {
        self.round += 1;
        if self.round > self.config.total_rounds {
            let result = self.final_score();
            self.enter(Phase::GameOver, now);
            info!("GAME OVER: final score {result}");
            events.push(SessionEvent::GameOver(result));
        } else {
            self.announce_round(now, events);
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    #[must_use]
    pub const fn target(&self) -> Option<Expression> {
        self.target
    }

    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Baseline, unset until calibration completes
    #[must_use]
    pub fn baseline(&self) -> Baseline {
        self.calibrator.baseline()
    }

    /// Outcomes of finished rounds, oldest first
    #[must_use]
    pub fn history(&self) -> &[RoundOutcome] {
        &self.history
    }

    #[must_use]
    pub fn final_score(&self) -> FinalScore {
        FinalScore::new(
            self.score,
            self.config.total_rounds.saturating_mul(self.config.round_points),
        )
    }

    #[must_use]
    pub const fn is_over(&self) -> bool {
        matches!(self.phase, Phase::GameOver)
    }

    /// Current state for the presentation layer
    #[must_use]
    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        let phase_length = match self.phase {
            Phase::Ready => Some(self.config.ready),
            Phase::Playing => Some(self.config.round),
            Phase::Feedback => Some(self.config.feedback),
            Phase::Calibration | Phase::GameOver => None,
        };

        SessionSnapshot {
            phase: self.phase,
            round: self.round,
            total_rounds: self.config.total_rounds,
            target: self.target,
            current: self.current,
            match_score: self.match_score,
            time_remaining: phase_length.map(|length| length.saturating_sub(self.elapsed(now))),
            hold_remaining: if self.phase == Phase::Playing {
                self.hold.remaining(now)
            } else {
                None
            },
            round_success: self.round_success,
            score: self.score,
            calibration: self.calibrator.progress(),
        }
    }

    /// Start over from calibration
    pub fn restart(&mut self) {
        self.calibrator.reset();
        self.hold.reset();
        self.last_features = None;
        self.missed_frames = 0;
        if let Some(smoother) = &mut self.smoothing {
            smoother.reset();
        }
        self.phase = Phase::Calibration;
        self.phase_started = None;
        self.round = 0;
        self.target = None;
        self.current = None;
        self.match_score = 0;
        self.round_success = false;
        self.score = 0;
        self.history.clear();
    }
}
