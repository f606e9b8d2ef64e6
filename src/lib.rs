//! Facial gesture control library: turn webcam facial landmarks into
//! calibrated, debounced gesture events for small games.
//!
//! The pipeline consists of:
//! 1. Face detection to locate the primary face (`OpenCV` dnn, SSD)
//! 2. Facial landmark localization of 68 key points (ONNX Runtime)
//! 3. Geometry extraction of eye, eyebrow, mouth and smile ratios
//! 4. Per-user baseline calibration over the first frames
//! 5. Expression classification and gesture debouncing
//! 6. Game logic: expression rounds, brow flaps, head zones
//!
//! Everything after step 2 is pure and deterministic: callers pass in
//! landmarks and timestamps, so the logic can be driven without a camera.
//!
//! # Examples
//!
//! ## Classifying an expression
//!
//! ```no_run
//! use facial_gesture_control::{
//!     calibration::{BaselineCalibrator, CalibrationProgress},
//!     classifier::{classify, ExpressionThresholds},
//!     geometry::{FeatureVector, LandmarkSet},
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let points = vec![(0.0f32, 0.0f32); 68];
//! let landmarks = LandmarkSet::from_points(&points)?;
//! let features = FeatureVector::extract(&landmarks);
//!
//! let mut calibrator = BaselineCalibrator::new(30)?;
//! if let CalibrationProgress::Completed(baseline) = calibrator.add_frame(&features) {
//!     let result = classify(&features, &baseline, &ExpressionThresholds::default());
//!     println!("{} {}", result.expression.emoji(), result.expression);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Driving a flappy-bird style game
//!
//! ```no_run
//! use facial_gesture_control::controls::{ActionLog, BrowFlapController};
//! use std::time::Instant;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut controller = BrowFlapController::with_defaults()?;
//! let mut actions = ActionLog::default();
//!
//! // once per frame, with `None` when no face was seen
//! controller.update(None, Instant::now(), &mut actions);
//! println!("flaps so far: {}", actions.flaps);
//! # Ok(())
//! # }
//! ```

/// Face detection module for finding faces in frames
pub mod face_detection;

/// Facial landmark detection module for finding 68 key points
pub mod mark_detection;

/// Primary face selection and short-gap tracking
pub mod face_tracking;

/// Landmark geometry and feature extraction
pub mod geometry;

/// Per-user neutral baseline calibration
pub mod calibration;

/// Expression classification against the baseline
pub mod classifier;

/// Hysteresis, cooldown and sustained-hold primitives
pub mod debounce;

/// Signal filtering algorithms for smoothing features
pub mod filters;

/// Gesture controllers for the arcade modes
pub mod controls;

/// Expression matching game state machine
pub mod session;

/// Utility functions for coordinate transformations
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
