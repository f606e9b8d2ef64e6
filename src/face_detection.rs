//! SSD face detector (ResNet-10, 300x300 Caffe model) running on the
//! `OpenCV` dnn module.

use crate::{face_tracking::FaceBox, utils::safe_cast::f32_to_i32_clamp, Error, Result};
use log::info;
use opencv::{
    core::{Mat, Rect, Scalar, Size, CV_32F},
    dnn::{self, Net},
    prelude::*,
};
use std::path::Path;

/// Network input side length
const SSD_INPUT_SIZE: i32 = 300;

/// Per-channel BGR mean subtracted by the network
const SSD_MEAN: (f64, f64, f64) = (104.0, 117.0, 123.0);

/// Values per detection row: image id, class, confidence, x1, y1, x2, y2
const DETECTION_STRIDE: usize = 7;

/// Face detector returning boxes in frame pixels
pub struct FaceDetector {
    net: Net,
    conf_threshold: f32,
}

impl FaceDetector {
    /// Load the Caffe model.
    ///
    /// # Errors
    ///
    /// Returns an error if either file is missing or the network cannot be
    /// built from them.
    pub fn new<P: AsRef<Path>>(prototxt: P, weights: P, conf_threshold: f32) -> Result<Self> {
        let prototxt = path_str(prototxt.as_ref())?;
        let weights = path_str(weights.as_ref())?;
        info!("Loading face detector: {prototxt}, {weights}");

        let net = dnn::read_net_from_caffe(prototxt, weights)?;
        if net.empty()? {
            return Err(Error::ModelError(format!("Face detector network is empty: {weights}")));
        }

        Ok(Self { net, conf_threshold })
    }

    #[must_use]
    pub const fn conf_threshold(&self) -> f32 {
        self.conf_threshold
    }

    /// Detect faces in a BGR frame.
    ///
    /// # Errors
    ///
    /// Returns an error if blob creation or inference fails.
    pub fn detect(&mut self, image: &Mat) -> Result<Vec<FaceBox>> {
        let blob = dnn::blob_from_image(
            image,
            1.0,
            Size::new(SSD_INPUT_SIZE, SSD_INPUT_SIZE),
            Scalar::new(SSD_MEAN.0, SSD_MEAN.1, SSD_MEAN.2, 0.0),
            false,
            false,
            CV_32F,
        )?;
        self.net.set_input(&blob, "", 1.0, Scalar::default())?;
        let output = self.net.forward_single("")?;

        let data = output.data_typed::<f32>()?;
        Ok(parse_detections(data, image.cols(), image.rows(), self.conf_threshold))
    }
}

fn path_str(path: &Path) -> Result<&str> {
    if !path.exists() {
        return Err(Error::ModelError(format!("Model file not found: {}", path.display())));
    }
    path.to_str().ok_or_else(|| {
        Error::InvalidInput(format!("Model path is not valid UTF-8: {}", path.display()))
    })
}

/// Decode the flat `[1, 1, N, 7]` SSD output into pixel boxes.
///
/// Coordinates are normalised to the frame; rows below the threshold are
/// dropped. Boxes are not clipped, so callers can still reject faces that
/// leave the frame.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn parse_detections(
    data: &[f32],
    frame_width: i32,
    frame_height: i32,
    conf_threshold: f32,
) -> Vec<FaceBox> {
    let w = frame_width as f32;
    let h = frame_height as f32;
    let limit = 4 * frame_width.max(frame_height);

    data.chunks_exact(DETECTION_STRIDE)
        .filter(|row| row[2] >= conf_threshold)
        .filter_map(|row| {
            let x1 = f32_to_i32_clamp(row[3] * w, -limit, limit);
            let y1 = f32_to_i32_clamp(row[4] * h, -limit, limit);
            let x2 = f32_to_i32_clamp(row[5] * w, -limit, limit);
            let y2 = f32_to_i32_clamp(row[6] * h, -limit, limit);
            (x2 > x1 && y2 > y1).then(|| FaceBox::new(x1, y1, x2 - x1, y2 - y1, row[2]))
        })
        .collect()
}

impl From<FaceBox> for Rect {
    fn from(face: FaceBox) -> Self {
        Self::new(face.x, face.y, face.width, face.height)
    }
}
