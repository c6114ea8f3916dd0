//! Vision module: frames, frame sources, face detection and ROI localization
//!
//! This module provides:
//! - `Frame` RGB8 frame with a capture timestamp in seconds
//! - `FrameSource` trait with in-memory, image-sequence, bounded-recording
//!   and (with the `opencv` feature) video/camera implementations
//! - `FaceDetector` trait for pluggable face detection backends
//! - `RoiLocalizer` deriving a forehead region from the first detection
//!
//! # Features
//!
//! - `image-processing`: frame sequences decoded with the `image` crate
//! - `seeta`: pure-Rust SeetaFace detector
//! - `opencv`: video files and live cameras
//!
//! # Example
//!
//! ```ignore
//! use bpcam_signals::config::DetectorConfig;
//! use bpcam_signals::vision::{RoiLocalizer, SeetaFaceDetector};
//!
//! let detector = SeetaFaceDetector::load("seeta_fd_frontal_v1.0.bin", &DetectorConfig::default())?;
//! let mut localizer = RoiLocalizer::new(detector);
//!
//! if let Some(roi) = localizer.locate(&frame) {
//!     println!("forehead at {}x{}+{}+{}", roi.width, roi.height, roi.x, roi.y);
//! }
//! ```

mod face_roi;
mod frame_source;
mod image_ops;
mod landmark_roi;

#[cfg(feature = "opencv")]
mod capture;
#[cfg(feature = "seeta")]
mod seeta;

pub use face_roi::{
    forehead_from_bbox, ExternalFaceDetector, FaceDetection, FaceDetector, Roi, RoiLocalizer, RoiStrategy,
};
pub use frame_source::{FrameSource, MemoryFrameSource, RecordingSource, StopSignal};
pub use image_ops::Frame;
pub use landmark_roi::{brow_band, landmark_bounds, BROW_LANDMARKS, DEFAULT_BAND_HEIGHT};

#[cfg(feature = "opencv")]
pub use capture::VideoCaptureSource;
#[cfg(feature = "image-processing")]
pub use frame_source::ImageSequenceSource;
#[cfg(feature = "seeta")]
pub use seeta::SeetaFaceDetector;
