use crate::{
    constants::NUM_FACIAL_LANDMARKS,
    face_tracking::FaceBox,
    geometry::LandmarkSet,
    utils::{landmark_crop, safe_cast::usize_to_i32},
    Error, Result,
};
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Rect, Size, Vec3f, CV_32F};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Default landmark detector input size
const DEFAULT_LANDMARK_INPUT_SIZE: i32 = 128;

/// Fraction of the face box added on each side before cropping
const DEFAULT_CROP_SHIFT: f32 = 0.2;

/// 68-point facial landmark localizer using `ONNX` Runtime
pub struct MarkDetector {
    session: Session,
    input_size: i32,
    crop_shift: f32,
}

impl MarkDetector {
    /// Create a new landmark detector from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The model file does not exist or cannot be loaded
    /// - The model has no inputs or outputs
    /// - The ONNX runtime environment cannot be created
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(Error::ModelError(format!(
                "Landmark model not found: {}",
                model_path.display()
            )));
        }
        log::info!("Initializing MarkDetector with model: {}", model_path.display());

        let environment = Arc::new(
            Environment::builder()
                .with_name("mark_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelError("Landmark model has no inputs".to_string()));
        }
        if session.outputs.is_empty() {
            return Err(Error::ModelOutputError("Landmark model has no outputs".to_string()));
        }

        Ok(Self {
            session,
            input_size: DEFAULT_LANDMARK_INPUT_SIZE,
            crop_shift: DEFAULT_CROP_SHIFT,
        })
    }

    /// Override how much context around the face box is cropped
    #[must_use]
    pub fn with_crop_shift(mut self, crop_shift: f32) -> Self {
        self.crop_shift = crop_shift;
        self
    }

    /// Localize the 68 landmarks of one face, in frame coordinates.
    ///
    /// Returns `Ok(None)` when the face crop is empty; the caller treats
    /// that the same as a frame without a face.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails, or the model
    /// output does not hold 68 points.
    pub fn detect(&self, frame: &Mat, face: &FaceBox) -> Result<Option<LandmarkSet>> {
        let crop = landmark_crop(face, frame.cols(), frame.rows(), self.crop_shift);
        if crop.width <= 0 || crop.height <= 0 {
            return Ok(None);
        }

        let face_roi = Mat::roi(frame, crop)?;
        let face_image = face_roi.try_clone()?;
        let input = self.preprocess(&face_image)?;
        let marks = self.forward(input)?;
        marks_to_frame(&marks, crop, self.input_size).map(Some)
    }

    /// Resize, convert to RGB in `[0, 1]` and pack as NHWC
    #[allow(clippy::cast_sign_loss)]
    fn preprocess(&self, image: &Mat) -> Result<Array4<f32>> {
        let size = self.input_size as usize;
        let channels = 3;

        let mut resized = Mat::default();
        imgproc::resize(
            image,
            &mut resized,
            Size::new(self.input_size, self.input_size),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut rgb_image = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_image = Mat::default();
        rgb_image.convert_to(&mut float_image, CV_32F, 1.0 / 255.0, 0.0)?;

        let mut data = vec![0.0f32; size * size * channels];
        for row in 0..size {
            for col in 0..size {
                let pixel = float_image.at_2d::<Vec3f>(usize_to_i32(row)?, usize_to_i32(col)?)?;
                for ch in 0..channels {
                    data[(row * size + col) * channels + ch] = pixel[ch];
                }
            }
        }

        Array4::from_shape_vec((1, size, size, channels), data)
            .map_err(|e| Error::ModelError(format!("Failed to create input array: {e}")))
    }

    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;
        let marks_output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| Error::ModelOutputError("No output from model".to_string()))?;

        let marks_tensor = marks_output.try_extract::<f32>()?;
        let marks_view = marks_tensor.view();
        let marks = marks_view
            .as_slice()
            .ok_or_else(|| Error::ModelOutputError("Output tensor is not contiguous".to_string()))?;
        Ok(marks.to_vec())
    }
}

/// Map raw model output (x, y pairs in input-image pixels) to frame
/// coordinates of the crop the model saw.
///
/// # Errors
///
/// Returns [`Error::ModelOutputError`] unless exactly 68 points are present.
#[allow(clippy::cast_precision_loss)]
pub fn marks_to_frame(marks: &[f32], crop: Rect, input_size: i32) -> Result<LandmarkSet> {
    if marks.len() != NUM_FACIAL_LANDMARKS * 2 {
        return Err(Error::ModelOutputError(format!(
            "Expected {} landmark values, got {}",
            NUM_FACIAL_LANDMARKS * 2,
            marks.len()
        )));
    }

    let scale_x = crop.width as f32 / input_size as f32;
    let scale_y = crop.height as f32 / input_size as f32;
    let points: Vec<(f32, f32)> = marks
        .chunks_exact(2)
        .map(|xy| (crop.x as f32 + xy[0] * scale_x, crop.y as f32 + xy[1] * scale_y))
        .collect();
    LandmarkSet::from_points(&points)
}
