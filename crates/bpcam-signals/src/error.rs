//! Error types for the blood-pressure signal pipeline.
//!
//! Each stage owns its error enum. Per-frame localization misses are not
//! errors at all; model load problems never abort a run and only select the
//! fallback estimator (see [`crate::predict::PredictionSource`]).

use std::path::PathBuf;
use thiserror::Error;

/// Frame source could not be opened, read or decoded.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to open capture source {source_name}: {reason}")]
    Open { source_name: String, reason: String },

    #[error("failed to read frame {index} from {source_name}: {reason}")]
    Read {
        source_name: String,
        index: usize,
        reason: String,
    },

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[cfg(feature = "opencv")]
    #[error("OpenCV error: {0}")]
    OpenCv(String),
}

#[cfg(feature = "opencv")]
impl From<opencv::Error> for CaptureError {
    fn from(err: opencv::Error) -> Self {
        CaptureError::OpenCv(err.message)
    }
}

/// Band-pass design or application failed for the given sampling rate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterDesignError {
    #[error("band edges [{low_hz}, {high_hz}] Hz must lie strictly inside (0, {nyquist_hz}) Hz")]
    InvalidBand {
        low_hz: f64,
        high_hz: f64,
        nyquist_hz: f64,
    },

    #[error("filter order {order} is infeasible for {samples} samples")]
    OrderInfeasible { order: usize, samples: usize },

    #[error("filter coefficients are not finite")]
    NonFiniteCoefficients,

    #[error("could not solve for steady-state filter initial conditions")]
    SingularInitialConditions,
}

/// Conditioning precondition failed. Aborts the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("insufficient signal: {samples} samples, at least {required} required")]
    InsufficientSignal { samples: usize, required: usize },

    #[error("timestamp {current} at sample {index} does not follow {previous}")]
    NonMonotonicTimestamp {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("timestamps do not yield a finite positive sampling rate")]
    DegenerateTimestamps,

    #[error("filter design failed: {0}")]
    FilterDesign(#[from] FilterDesignError),
}

/// Persisted prediction model could not be used.
///
/// Every variant routes prediction to the fallback heuristic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("no model path configured")]
    NotConfigured,

    #[error("no model artifact at {}", path.display())]
    Unavailable { path: PathBuf },

    #[error("model artifact {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// Reading or writing a CSV / model artifact failed.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("model encoding error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("malformed artifact: {0}")]
    Malformed(String),
}

/// Fatal failure of a whole pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error(
        "insufficient signal: {samples} samples from {localized}/{frames} localized frames \
         (longest miss streak {longest_miss_streak}), at least {required} required"
    )]
    InsufficientSignal {
        samples: usize,
        required: usize,
        frames: usize,
        localized: usize,
        longest_miss_streak: usize,
    },

    #[error("signal conditioning failed: {0}")]
    Signal(#[from] SignalError),

    #[error("artifact write failed: {0}")]
    Artifact(#[from] ArtifactError),
}
