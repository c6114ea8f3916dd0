//! Prediction engine with a lazily loaded, memoized model slot

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{info, warn};

use super::model::BpModel;
use crate::error::ModelError;
use crate::features::FeatureVector;

/// Where a prediction came from
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionSource {
    /// The persisted model
    Model { version: String },
    /// The heuristic fallback, with the reason the model was not used
    Fallback { reason: ModelError },
}

impl PredictionSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, PredictionSource::Fallback { .. })
    }
}

/// Systolic / diastolic estimate in mmHg
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub systolic: f64,
    pub diastolic: f64,
    pub source: PredictionSource,
}

/// Loaded model or the reason there is none
#[derive(Debug)]
enum ModelSlot {
    Loaded(BpModel),
    Failed(ModelError),
}

/// Heuristic used whenever no model is available
///
/// `systolic = 120 + 10 * mean_amplitude`,
/// `diastolic = 80 + 5 * dominant_frequency`.
pub fn fallback_estimate(features: &FeatureVector) -> (f64, f64) {
    (
        120.0 + 10.0 * features.mean_amplitude,
        80.0 + 5.0 * features.dominant_frequency,
    )
}

/// Blood-pressure predictor
///
/// The model file is read at most once, on the first `predict` call; every
/// later call (from any thread) reuses the outcome, including a failed load.
#[derive(Debug, Default)]
pub struct BpPredictor {
    model_path: Option<PathBuf>,
    slot: OnceCell<ModelSlot>,
}

impl BpPredictor {
    /// Predictor backed by the model file at `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self::from_optional_path(Some(path.into()))
    }

    /// Predictor that only ever uses the fallback heuristic
    pub fn fallback_only() -> Self {
        Self::from_optional_path(None)
    }

    pub fn from_optional_path(model_path: Option<PathBuf>) -> Self {
        Self {
            model_path,
            slot: OnceCell::new(),
        }
    }

    /// Predictor around an in-memory model (no file access)
    pub fn with_model(model: BpModel) -> Self {
        Self {
            model_path: None,
            slot: OnceCell::with_value(ModelSlot::Loaded(model)),
        }
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    /// Whether the load attempt has already happened
    pub fn is_initialized(&self) -> bool {
        self.slot.get().is_some()
    }

    fn slot(&self) -> &ModelSlot {
        self.slot.get_or_init(|| {
            let Some(path) = self.model_path.as_deref() else {
                return ModelSlot::Failed(ModelError::NotConfigured);
            };
            match BpModel::load(path) {
                Ok(model) => {
                    info!(path = %path.display(), version = %model.version, "prediction model loaded");
                    ModelSlot::Loaded(model)
                }
                Err(err) => {
                    warn!("{}; using fallback estimator", err);
                    ModelSlot::Failed(err)
                }
            }
        })
    }

    /// Loaded model, if any (triggers the one-time load)
    pub fn model(&self) -> Option<&BpModel> {
        match self.slot() {
            ModelSlot::Loaded(model) => Some(model),
            ModelSlot::Failed(_) => None,
        }
    }

    /// Predict systolic / diastolic pressure
    ///
    /// Never fails: an absent or corrupt model selects the fallback, and
    /// the reason is carried in [`Prediction::source`].
    pub fn predict(&self, features: &FeatureVector) -> Prediction {
        match self.slot() {
            ModelSlot::Loaded(model) => {
                let [systolic, diastolic] = model.predict(features);
                Prediction {
                    systolic,
                    diastolic,
                    source: PredictionSource::Model {
                        version: model.version.clone(),
                    },
                }
            }
            ModelSlot::Failed(reason) => {
                let (systolic, diastolic) = fallback_estimate(features);
                Prediction {
                    systolic,
                    diastolic,
                    source: PredictionSource::Fallback { reason: reason.clone() },
                }
            }
        }
    }
}

/// Serializable summary of a prediction source
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub kind: &'static str,
    pub detail: String,
}

impl From<&PredictionSource> for SourceSummary {
    fn from(source: &PredictionSource) -> Self {
        match source {
            PredictionSource::Model { version } => Self {
                kind: "model",
                detail: version.clone(),
            },
            PredictionSource::Fallback { reason } => Self {
                kind: "fallback",
                detail: reason.to_string(),
            },
        }
    }
}
