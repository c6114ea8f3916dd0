//! SeetaFace cascade detector (pure Rust, via `rustface`)
//!
//! The model file is read once in [`SeetaFaceDetector::load`]; every frame
//! afterwards reuses the same cascade.

use std::path::Path;

use rustface::{Detector, ImageData};
use tracing::info;

use super::face_roi::{FaceDetection, FaceDetector};
use super::image_ops::Frame;
use crate::config::DetectorConfig;
use crate::error::CaptureError;

/// Face detector backed by a SeetaFace frontal model file
pub struct SeetaFaceDetector {
    detector: Box<dyn Detector>,
}

impl SeetaFaceDetector {
    /// Load model weights and configure the cascade
    pub fn load<P: AsRef<Path>>(model_path: P, config: &DetectorConfig) -> Result<Self, CaptureError> {
        let path = model_path.as_ref();
        let path_str = path.to_str().ok_or_else(|| CaptureError::Open {
            source_name: path.display().to_string(),
            reason: "detector model path is not valid UTF-8".to_string(),
        })?;

        let mut detector = rustface::create_detector(path_str).map_err(|e| CaptureError::Open {
            source_name: path.display().to_string(),
            reason: format!("failed to load face detector: {}", e),
        })?;
        detector.set_min_face_size(config.min_face_size);
        detector.set_score_thresh(config.score_thresh);
        detector.set_pyramid_scale_factor(config.pyramid_scale_factor);
        detector.set_slide_window_step(config.slide_window_step, config.slide_window_step);

        info!(model = %path.display(), "SeetaFace detector loaded");
        Ok(Self { detector })
    }
}

impl FaceDetector for SeetaFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Vec<FaceDetection> {
        let gray = frame.to_grayscale();
        let image = ImageData::new(&gray, frame.width(), frame.height());

        self.detector
            .detect(&image)
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceDetection::from_bbox(
                    [
                        bbox.x() as f32,
                        bbox.y() as f32,
                        bbox.width() as f32,
                        bbox.height() as f32,
                    ],
                    face.score() as f32,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_open_error() {
        let result = SeetaFaceDetector::load("/nonexistent/seeta_fd_frontal_v1.0.bin", &DetectorConfig::default());
        assert!(matches!(result, Err(CaptureError::Open { .. })));
    }
}
