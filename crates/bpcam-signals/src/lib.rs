//! # bpcam-signals
//!
//! Blood-pressure estimation from webcam video via remote
//! photoplethysmography (rPPG).
//!
//! This crate provides:
//! - **vision**: frames, frame sources, face detection and forehead ROI
//! - **rppg**: ROI colour averaging into a raw pulse signal (green, CHROM, POS)
//! - **dsp**: detrending, zero-phase Butterworth band-pass, peaks, Welch PSD
//! - **features**: the eleven-statistic feature vector
//! - **predict**: persisted regression model with a fallback heuristic
//! - **category**: clinical categories and lifestyle suggestions
//! - **pipeline**: everything above wired from a [`BpConfig`]
//!
//! ## Example
//!
//! ```ignore
//! use bpcam_signals::{BpConfig, BpPipeline};
//! use bpcam_signals::vision::{ImageSequenceSource, SeetaFaceDetector};
//!
//! let config = BpConfig::load_layered(None, Some("bpcam.toml".as_ref()))?;
//! let detector = SeetaFaceDetector::load("model/seeta_fd_frontal_v1.0.bin", &config.roi.detector)?;
//! let mut frames = ImageSequenceSource::open("frames/", config.capture.fps)?;
//!
//! let outcome = BpPipeline::new(config).run(&mut frames, detector)?;
//! println!("{}", outcome.reading());
//! ```

pub mod category;
pub mod config;
pub mod dsp;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod predict;
pub mod rppg;
pub mod vision;

pub use category::{categorize, BpCategory, BpReading};
pub use config::{BpConfig, ConfigError};
pub use error::{ArtifactError, CaptureError, FilterDesignError, ModelError, PipelineError, SignalError};
pub use features::{FeatureExtractor, FeatureVector, FEATURE_NAMES};
pub use pipeline::{BpPipeline, Estimate, PipelineOutcome, RunReport};
pub use predict::{BpPredictor, Prediction, PredictionSource};
pub use rppg::{PulseMethod, RawSignal};
