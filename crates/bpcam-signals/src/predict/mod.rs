//! Prediction engine: persisted model artifact plus fallback heuristic

mod engine;
mod model;

pub use engine::{fallback_estimate, BpPredictor, Prediction, PredictionSource, SourceSummary};
pub use model::{BpModel, Estimator, RegressionTree, StandardScaler, TreeNode, MODEL_FORMAT};
