//! Main application module: the per-frame driver loop.
//!
//! Each iteration reads one frame, finds the primary face, bridges short
//! detection gaps with the face track cache, extracts features and hands
//! them (or `None`) to the active game mode. The camera and windows are
//! released when the app is dropped, on every exit path.

use crate::{
    calibration::{Baseline, BaselineCalibrator},
    classifier::Ratios,
    config::Config,
    constants::landmarks as lm,
    controls::{ActionLog, BrowFlapController, BrowUpdate, HeadZoneController, ZoneLayout},
    error::{Error, Result},
    face_detection::FaceDetector,
    face_tracking::{select_primary_face, FaceTrack, TrackedFace},
    filters::{create_filter, FeatureSmoother},
    geometry::{FeatureVector, LandmarkSet},
    mark_detection::MarkDetector,
    session::{ExpressionSession, Phase, RandomPicker, SessionEvent},
    utils::safe_cast::f64_to_i32_clamp,
};
use log::{debug, info, warn};
use opencv::{
    core::{Mat, Point, Rect, Scalar},
    highgui::{self, WINDOW_NORMAL},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE},
};
use std::time::{Duration, Instant};

const WINDOW_NAME: &str = "Facial Gesture Control";

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Camera index or video file path
    pub video_source: VideoSource,
    /// Which game the gestures drive
    pub mode: GameMode,
    /// Show the camera window
    pub gui: bool,
    /// Mirror the image horizontally
    pub mirror: bool,
    /// Start with the debug overlay on
    pub debug: bool,
    /// Seed for target selection
    pub seed: Option<u64>,
    /// Thresholds, timings and model paths
    pub settings: Config,
}

/// Video source type
#[derive(Debug, Clone)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(String),
}

/// Game mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    /// Expression matching rounds
    Expression,
    /// Raise eyebrows to flap
    Flap,
    /// Lean to move, raise eyebrows to rotate
    Zones,
}

/// Per-mode gesture state
enum ModeState {
    Expression(ExpressionSession),
    Flap(BrowFlapController),
    Zones(HeadZoneController),
}

impl ModeState {
    fn new(mode: GameMode, settings: &Config, seed: Option<u64>) -> Result<Self> {
        let calibrator = || {
            BaselineCalibrator::with_multipliers(
                settings.calibration.frames,
                settings.brow.raise_multiplier,
                settings.brow.reset_multiplier,
            )
        };
        let smoothing = settings.smoothing.filter.as_str();

        Ok(match mode {
            GameMode::Expression => {
                let picker = Box::new(RandomPicker::new(seed));
                let session = ExpressionSession::new(settings.session_config()?, picker)?;
                Self::Expression(session.with_smoothing(FeatureSmoother::new(smoothing)?))
            }
            GameMode::Flap => Self::Flap(
                BrowFlapController::new(calibrator()?, settings.brow.cooldown_frames)
                    .with_smoothing(create_filter(smoothing)?),
            ),
            GameMode::Zones => {
                let (move_cooldown, rotate_cooldown) = settings.zone_cooldowns()?;
                let layout = ZoneLayout::new(settings.zones.left, settings.zones.right)?;
                Self::Zones(
                    HeadZoneController::new(calibrator()?, layout, move_cooldown, rotate_cooldown)
                        .with_smoothing(create_filter(smoothing)?),
                )
            }
        })
    }

    fn baseline(&self) -> Baseline {
        match self {
            Self::Expression(session) => session.baseline(),
            Self::Flap(controller) => controller.brows().calibrator().baseline(),
            Self::Zones(controller) => controller.brows().calibrator().baseline(),
        }
    }
}

/// What the pipeline saw in one frame
struct FrameObservation {
    face: Option<TrackedFace>,
    landmarks: Option<LandmarkSet>,
    features: Option<FeatureVector>,
}

/// Main application struct
pub struct GestureApp {
    config: AppConfig,
    face_detector: FaceDetector,
    mark_detector: MarkDetector,
    video_capture: VideoCapture,
    track: FaceTrack,
    state: ModeState,
    actions: ActionLog,
    debug_overlay: bool,
    last_event: Option<String>,
}

impl GestureApp {
    /// Open the video source, load both models and create the window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CameraUnavailable`] if the source cannot be opened,
    /// or a model error if either model fails to load.
    pub fn new(config: AppConfig) -> Result<Self> {
        info!("Initializing facial gesture control in {:?} mode", config.mode);
        config.settings.validate()?;

        let video_capture = match &config.video_source {
            VideoSource::Camera(index) => {
                info!("Opening camera {}", index);
                let mut cap = VideoCapture::new(*index, videoio::CAP_ANY)?;
                if !cap.is_opened()? {
                    return Err(Error::CameraUnavailable(format!("Cannot open camera {index}")));
                }
                // Reduce buffer size for lower latency (webcam only)
                cap.set(CAP_PROP_BUFFERSIZE, 1.0)?;
                cap
            }
            VideoSource::File(path) => {
                info!("Opening video file: {}", path);
                let cap = VideoCapture::from_file(path, videoio::CAP_ANY)?;
                if !cap.is_opened()? {
                    return Err(Error::CameraUnavailable(format!("Cannot open video file {path}")));
                }
                cap
            }
        };

        let settings = &config.settings;
        let face_detector = FaceDetector::new(
            &settings.models.face_detector_prototxt,
            &settings.models.face_detector_weights,
            settings.face_detection.confidence_threshold,
        )?;
        let mark_detector = MarkDetector::new(&settings.models.face_landmarks)?
            .with_crop_shift(settings.face_detection.crop_shift);
        let track = FaceTrack::new(settings.tracking.max_lost_frames);
        let state = ModeState::new(config.mode, settings, config.seed)?;

        if config.gui {
            highgui::named_window(WINDOW_NAME, WINDOW_NORMAL)?;
        }

        let debug_overlay = config.debug || settings.display.debug_overlay;
        Ok(Self {
            config,
            face_detector,
            mark_detector,
            video_capture,
            track,
            state,
            actions: ActionLog::default(),
            debug_overlay,
            last_event: None,
        })
    }

    /// Run the main application loop until quit, end of video or game over
    ///
    /// # Errors
    ///
    /// Returns [`Error::CameraUnavailable`] when the camera stops delivering
    /// frames, or an error if capture or drawing fails.
    pub fn run(&mut self) -> Result<()> {
        info!("Look at the camera with a neutral face to calibrate");

        let mut frame_count: u64 = 0;
        loop {
            let mut frame = Mat::default();
            if !self.video_capture.read(&mut frame)? || frame.empty() {
                stream_ended(&self.config.video_source)?;
                break;
            }
            frame_count += 1;

            if self.config.mirror {
                let source = frame.clone();
                opencv::core::flip(&source, &mut frame, 1)?;
            }

            let now = Instant::now();
            let observation = self.observe(&frame);
            let game_over = self.dispatch(&frame, &observation, now);

            if self.config.gui {
                let mut display = frame.clone();
                self.draw_overlay(&mut display, &observation, now)?;
                highgui::imshow(WINDOW_NAME, &display)?;

                let key = highgui::wait_key(if game_over { 3000 } else { 1 })?;
                if key == 27 || key == i32::from(b'q') {
                    info!("Exit requested by user");
                    break;
                }
                if key == i32::from(b'd') {
                    self.debug_overlay = !self.debug_overlay;
                    info!("Debug overlay {}", if self.debug_overlay { "on" } else { "off" });
                }
            }

            if game_over {
                break;
            }
        }

        info!("Processed {} frames, shutting down", frame_count);
        Ok(())
    }

    /// Detect, track and localize the primary face.
    ///
    /// Detector and landmark failures and degenerate geometry become "no
    /// face" or "no features" for this frame.
    fn observe(&mut self, frame: &Mat) -> FrameObservation {
        let faces = or_miss("Face detection", self.face_detector.detect(frame));
        let primary = select_primary_face(
            &faces,
            frame.cols(),
            frame.rows(),
            self.face_detector.conf_threshold(),
        );
        let face = self.track.update(primary);

        let landmarks = face.and_then(|tracked| {
            or_miss("Landmark localization", self.mark_detector.detect(frame, &tracked.face))
        });

        let features = landmarks
            .as_ref()
            .map(FeatureVector::extract)
            .filter(FeatureVector::is_finite);

        if let Some(tracked) = &face {
            if tracked.cached {
                debug!("Using cached face box, {} misses left", tracked.frames_left);
            }
        }

        FrameObservation {
            face,
            landmarks,
            features,
        }
    }

    /// Feed one observation to the active mode; returns true at game over
    fn dispatch(&mut self, frame: &Mat, observation: &FrameObservation, now: Instant) -> bool {
        let features = observation.features.as_ref();
        match &mut self.state {
            ModeState::Expression(session) => {
                for event in session.tick(now, features) {
                    self.last_event = describe(&event);
                    if let SessionEvent::GameOver(result) = event {
                        info!("=== GAME OVER === Final score {result}");
                        return true;
                    }
                }
                false
            }
            ModeState::Flap(controller) => {
                let update = controller.update(features, now, &mut self.actions);
                if update == BrowUpdate::Calibrated {
                    info!("Raise your eyebrows to flap!");
                }
                false
            }
            ModeState::Zones(controller) => {
                let centre = observation.face.map(|tracked| tracked.face.centre_x());
                let width = f64::from(frame.cols());
                let update = controller.update(centre, width, features, now, &mut self.actions);
                if update == BrowUpdate::Calibrated {
                    info!("Move your head left/right, raise eyebrows to rotate!");
                }
                false
            }
        }
    }

    fn draw_overlay(
        &self,
        frame: &mut Mat,
        observation: &FrameObservation,
        now: Instant,
    ) -> Result<()> {
        let width = frame.cols();
        let height = frame.rows();

        if let Some(tracked) = &observation.face {
            let color = if tracked.cached { ORANGE } else { GREEN };
            imgproc::rectangle(frame, Rect::from(tracked.face), color, 2, LINE_8, 0)?;
        }
        if self.config.settings.display.show_landmarks {
            if let Some(landmarks) = &observation.landmarks {
                for (index, point) in landmarks.points().iter().enumerate() {
                    let center = Point::new(
                        f64_to_i32_clamp(point.x, 0, width),
                        f64_to_i32_clamp(point.y, 0, height),
                    );
                    imgproc::circle(frame, center, 1, landmark_color(index), -1, LINE_8, 0)?;
                }
            }
        }

        match &self.state {
            ModeState::Expression(session) => draw_session(frame, session, now)?,
            ModeState::Flap(controller) => {
                draw_calibration_or(frame, controller.brows().calibrator(), |frame| {
                    let full = f64::from(width - 40);
                    let bar = f64_to_i32_clamp(controller.progress() * full, 0, width);
                    let rect = Rect::new(20, height - 40, bar, 20);
                    imgproc::rectangle(frame, rect, YELLOW, -1, LINE_8, 0)?;
                    let text = format!("Flaps: {}", self.actions.flaps);
                    draw_text(frame, &text, Point::new(20, 40), 0.8, GREEN)
                })?;
            }
            ModeState::Zones(controller) => {
                draw_calibration_or(frame, controller.brows().calibrator(), |frame| {
                    let layout = controller.layout();
                    for boundary in [layout.left, layout.right] {
                        let x = f64_to_i32_clamp(boundary * f64::from(width), 0, width);
                        let (top, bottom) = (Point::new(x, 0), Point::new(x, height));
                        imgproc::line(frame, top, bottom, YELLOW, 2, LINE_8, 0)?;
                    }
                    let text = format!(
                        "Left: {}  Right: {}  Rotate: {}",
                        self.actions.left_moves, self.actions.right_moves, self.actions.rotates
                    );
                    draw_text(frame, &text, Point::new(20, 40), 0.7, GREEN)
                })?;
            }
        }

        if let Some(event) = &self.last_event {
            draw_text(frame, event, Point::new(20, height - 60), 0.6, WHITE)?;
        }
        if observation.face.is_none() {
            draw_text(frame, "No face detected", Point::new(20, height - 90), 0.7, RED)?;
        }
        if self.debug_overlay {
            self.draw_debug(frame, observation)?;
        }
        Ok(())
    }

    fn draw_debug(&self, frame: &mut Mat, observation: &FrameObservation) -> Result<()> {
        let Some(features) = &observation.features else {
            return Ok(());
        };
        let ratios = Ratios::new(features, &self.state.baseline());
        let lines = [
            format!(
                "EAR {:.3} (L {:.3} R {:.3}) x{:.2}",
                features.ear, features.ear_left, features.ear_right, ratios.ear
            ),
            format!("EBR {:.3} x{:.2}", features.ebr, ratios.ebr),
            format!("MAR {:.3} x{:.2}", features.mar, ratios.mar),
            format!("Smile {:.3} x{:.2}", features.smile, ratios.smile),
        ];
        let x = frame.cols() - 330;
        for (i, line) in (0i32..).zip(lines.iter()) {
            draw_text(frame, line, Point::new(x, 30 + 22 * i), 0.5, CYAN)?;
        }
        Ok(())
    }
}

impl Drop for GestureApp {
    fn drop(&mut self) {
        if let Err(e) = self.video_capture.release() {
            warn!("Failed to release video capture: {e}");
        }
        if self.config.gui {
            if let Err(e) = highgui::destroy_all_windows() {
                warn!("Failed to close windows: {e}");
            }
        }
    }
}

/// A failed per-frame stage counts as a missed observation
fn or_miss<T: Default>(stage: &str, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        debug!("{stage} failed: {e}");
        T::default()
    })
}

/// A file simply ends; a camera that stops delivering frames is fatal
fn stream_ended(source: &VideoSource) -> Result<()> {
    match source {
        VideoSource::File(_) => {
            info!("End of video file reached");
            Ok(())
        }
        VideoSource::Camera(index) => Err(Error::CameraUnavailable(format!(
            "Camera {index} stopped delivering frames"
        ))),
    }
}

fn describe(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Calibrated(_) => Some("Calibration complete".to_string()),
        SessionEvent::RoundStarted { round, target } => {
            Some(format!("Round {round}: {}", target.description()))
        }
        SessionEvent::RoundSucceeded { points, .. } => Some(format!("SUCCESS! +{points}")),
        SessionEvent::RoundEnded(outcome) if !outcome.success => Some("Time's up!".to_string()),
        SessionEvent::GameOver(result) => Some(format!("Final score {result}")),
        _ => None,
    }
}

const GREEN: Scalar = Scalar::new(0.0, 255.0, 0.0, 0.0);
const ORANGE: Scalar = Scalar::new(0.0, 165.0, 255.0, 0.0);
const YELLOW: Scalar = Scalar::new(0.0, 255.0, 255.0, 0.0);
const CYAN: Scalar = Scalar::new(255.0, 255.0, 0.0, 0.0);
const RED: Scalar = Scalar::new(0.0, 0.0, 255.0, 0.0);
const WHITE: Scalar = Scalar::new(255.0, 255.0, 255.0, 0.0);
const GREY: Scalar = Scalar::new(160.0, 160.0, 160.0, 0.0);

/// Feature regions get their own colour, the jaw line stays grey
fn landmark_color(index: usize) -> Scalar {
    if lm::BROWS.contains(&index) {
        YELLOW
    } else if lm::EYES.contains(&index) {
        CYAN
    } else if lm::MOUTH.contains(&index) {
        GREEN
    } else {
        GREY
    }
}

fn draw_text(frame: &mut Mat, text: &str, origin: Point, scale: f64, color: Scalar) -> Result<()> {
    imgproc::put_text(frame, text, origin, FONT_HERSHEY_SIMPLEX, scale, color, 2, LINE_8, false)?;
    Ok(())
}

fn draw_calibration_or<F>(frame: &mut Mat, calibrator: &BaselineCalibrator, draw: F) -> Result<()>
where
    F: FnOnce(&mut Mat) -> Result<()>,
{
    if calibrator.is_calibrated() {
        draw(frame)
    } else {
        let (frames, needed) = calibrator.progress();
        let text = format!("Calibrating... {frames}/{needed}");
        draw_text(frame, &text, Point::new(20, 40), 0.8, YELLOW)?;
        draw_text(frame, "Keep a neutral face", Point::new(20, 70), 0.6, WHITE)
    }
}

fn secs_left(remaining: Option<Duration>) -> f64 {
    remaining.map_or(0.0, |d| d.as_secs_f64())
}

fn draw_session(frame: &mut Mat, session: &ExpressionSession, now: Instant) -> Result<()> {
    let snapshot = session.snapshot(now);
    let height = frame.rows();
    let target = snapshot.target.map_or("-", |t| t.name());

    match snapshot.phase {
        Phase::Calibration => {
            let (frames, needed) = snapshot.calibration;
            let text = format!("Calibrating... {frames}/{needed}");
            draw_text(frame, &text, Point::new(20, 40), 0.8, YELLOW)?;
            draw_text(frame, "Keep a neutral face", Point::new(20, 70), 0.6, WHITE)?;
        }
        Phase::Ready => {
            let text = format!(
                "Round {}/{}: get ready for {target}",
                snapshot.round, snapshot.total_rounds
            );
            draw_text(frame, &text, Point::new(20, 40), 0.8, YELLOW)?;
            let left = secs_left(snapshot.time_remaining).ceil();
            let countdown = format!("Starting in {left:.0}s");
            draw_text(frame, &countdown, Point::new(20, 75), 0.7, WHITE)?;
        }
        Phase::Playing => {
            draw_text(frame, &format!("Match: {target}"), Point::new(20, 40), 0.9, YELLOW)?;
            let current = snapshot.current.map_or("-", |c| c.name());
            let status = format!("You: {current}  {}%", snapshot.match_score);
            let color = if snapshot.match_score >= session.config().match_threshold {
                GREEN
            } else {
                ORANGE
            };
            draw_text(frame, &status, Point::new(20, 75), 0.7, color)?;
            let info = format!(
                "Time: {:.0}s  Score: {}  Round: {}",
                secs_left(snapshot.time_remaining).ceil(),
                snapshot.score,
                snapshot.round
            );
            draw_text(frame, &info, Point::new(20, 105), 0.6, WHITE)?;
            if let Some(hold) = snapshot.hold_remaining {
                let text = format!("HOLD for {:.1}s!", hold.as_secs_f64());
                draw_text(frame, &text, Point::new(20, height - 120), 0.9, GREEN)?;
            }
        }
        Phase::Feedback => {
            let (text, color) = if snapshot.round_success {
                ("SUCCESS!", GREEN)
            } else {
                ("Time's up!", RED)
            };
            draw_text(frame, text, Point::new(20, 60), 1.2, color)?;
        }
        Phase::GameOver => {
            let result = session.final_score();
            draw_text(frame, "GAME OVER", Point::new(20, 60), 1.2, YELLOW)?;
            draw_text(frame, &format!("Final score {result}"), Point::new(20, 100), 0.8, WHITE)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face_tracking::FaceBox;

    #[test]
    fn test_detector_failure_is_bridged() {
        let mut track = FaceTrack::new(10);
        let face = FaceBox::new(100, 100, 80, 80, 0.9);
        track.update(Some(face));

        let faces: Vec<FaceBox> = or_miss(
            "Face detection",
            Err(Error::ModelOutputError("bad blob".to_string())),
        );
        assert!(faces.is_empty());
        let tracked = track.update(select_primary_face(&faces, 640, 480, 0.5)).unwrap();
        assert!(tracked.cached);
        assert_eq!(tracked.face, face);
    }

    #[test]
    fn test_landmark_failure_is_no_landmarks() {
        let landmarks: Option<LandmarkSet> = or_miss(
            "Landmark localization",
            Err(Error::InvalidInput("empty crop".to_string())),
        );
        assert!(landmarks.is_none());
        assert_eq!(or_miss("Face detection", Ok(vec![1, 2])), vec![1, 2]);
    }

    #[test]
    fn test_camera_read_failure_is_fatal() {
        assert!(matches!(
            stream_ended(&VideoSource::Camera(0)),
            Err(Error::CameraUnavailable(_))
        ));
        assert!(stream_ended(&VideoSource::File("clip.mp4".to_string())).is_ok());
    }
}
