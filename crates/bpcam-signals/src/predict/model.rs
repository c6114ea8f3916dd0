//! Persisted regression model artifact
//!
//! A model file is a `bincode`-encoded [`BpModel`]: the feature order the
//! model was trained on, an optional standard scaler and a two-output
//! estimator (systolic, diastolic).

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ArtifactError, ModelError};
use crate::features::{FeatureVector, FEATURE_NAMES};

/// Artifact layout version understood by this build
pub const MODEL_FORMAT: u32 = 1;

/// Per-feature standardization `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// A node in a two-output regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Internal split node; `x[feature] <= threshold` goes left.
    Split {
        feature: u16,
        threshold: f64,
        left: u32,
        right: u32,
    },
    /// Leaf holding `[systolic, diastolic]`.
    Leaf { value: [f64; 2] },
}

/// A single regression tree, node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// Leaf value reached by `x`
    ///
    /// Assumes a validated tree (children always after their parent).
    pub fn predict(&self, x: &[f64]) -> [f64; 2] {
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = x.get(*feature as usize).copied().unwrap_or(f64::NAN);
                    // NaN compares false and goes right
                    idx = if value <= *threshold { *left as usize } else { *right as usize };
                }
                Some(TreeNode::Leaf { value }) => return *value,
                None => return [f64::NAN, f64::NAN],
            }
        }
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("empty tree".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature, left, right, ..
            } = node
            {
                if *feature as usize >= n_features {
                    return Err(format!("node {} splits on unknown feature {}", idx, feature));
                }
                for child in [*left as usize, *right as usize] {
                    if child <= idx || child >= self.nodes.len() {
                        return Err(format!("node {} has invalid child {}", idx, child));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Two-output estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Estimator {
    /// Random forest: mean of the tree outputs
    Forest { trees: Vec<RegressionTree> },
    /// Linear model `coef · x + intercept` per output
    Linear {
        systolic: Vec<f64>,
        diastolic: Vec<f64>,
        intercept: [f64; 2],
    },
}

/// Blood-pressure regression model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BpModel {
    /// Artifact layout version, see [`MODEL_FORMAT`]
    pub format: u32,
    /// Free-form model version reported with every prediction
    pub version: String,
    /// Feature names in the column order the estimator expects
    pub feature_order: Vec<String>,
    pub scaler: Option<StandardScaler>,
    pub estimator: Estimator,
}

impl BpModel {
    /// Model over the canonical feature order
    pub fn new(version: impl Into<String>, scaler: Option<StandardScaler>, estimator: Estimator) -> Self {
        Self {
            format: MODEL_FORMAT,
            version: version.into(),
            feature_order: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            scaler,
            estimator,
        }
    }

    /// Load and validate a model file
    ///
    /// # Errors
    /// `Unavailable` when the file cannot be read, `Corrupt` when it does
    /// not decode or fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let corrupt = |reason: String| ModelError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ModelError::Unavailable {
                path: path.to_path_buf(),
            },
            _ => corrupt(e.to_string()),
        })?;
        let mut bytes = Vec::new();
        BufReader::new(file)
            .read_to_end(&mut bytes)
            .map_err(|e| corrupt(e.to_string()))?;

        let model: Self = bincode::deserialize(&bytes).map_err(|e| corrupt(e.to_string()))?;
        model.validate().map_err(corrupt)?;
        Ok(model)
    }

    /// Save the model to a binary file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ArtifactError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let bytes = bincode::serialize(self)?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Check format version, feature order, scaler and estimator shapes
    pub fn validate(&self) -> Result<(), String> {
        if self.format != MODEL_FORMAT {
            return Err(format!("unsupported format {} (expected {})", self.format, MODEL_FORMAT));
        }

        let n = FEATURE_NAMES.len();
        let mut seen = [false; 11];
        if self.feature_order.len() != n {
            return Err(format!("expected {} features, found {}", n, self.feature_order.len()));
        }
        for name in &self.feature_order {
            let idx = FEATURE_NAMES
                .iter()
                .position(|f| f == name)
                .ok_or_else(|| format!("unknown feature {:?}", name))?;
            if seen[idx] {
                return Err(format!("duplicate feature {:?}", name));
            }
            seen[idx] = true;
        }

        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != n || scaler.scale.len() != n {
                return Err("scaler size does not match feature count".to_string());
            }
            if scaler.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                return Err("scaler has zero or non-finite scale".to_string());
            }
        }

        match &self.estimator {
            Estimator::Forest { trees } => {
                if trees.is_empty() {
                    return Err("forest has no trees".to_string());
                }
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate(n).map_err(|e| format!("tree {}: {}", i, e))?;
                }
            }
            Estimator::Linear {
                systolic, diastolic, ..
            } => {
                if systolic.len() != n || diastolic.len() != n {
                    return Err("linear coefficients do not match feature count".to_string());
                }
            }
        }
        Ok(())
    }

    /// Feature values in this model's column order, scaled if configured
    pub fn design_row(&self, features: &FeatureVector) -> Vec<f64> {
        let mut row: Vec<f64> = self
            .feature_order
            .iter()
            .map(|name| features.get(name).unwrap_or(f64::NAN))
            .collect();
        if let Some(scaler) = &self.scaler {
            for ((x, m), s) in row.iter_mut().zip(&scaler.mean).zip(&scaler.scale) {
                *x = (*x - m) / s;
            }
        }
        row
    }

    /// `[systolic, diastolic]` for one feature vector
    pub fn predict(&self, features: &FeatureVector) -> [f64; 2] {
        let x = self.design_row(features);
        match &self.estimator {
            Estimator::Forest { trees } => {
                let mut sum = [0.0, 0.0];
                for tree in trees {
                    let [s, d] = tree.predict(&x);
                    sum[0] += s;
                    sum[1] += d;
                }
                let n = trees.len().max(1) as f64;
                [sum[0] / n, sum[1] / n]
            }
            Estimator::Linear {
                systolic,
                diastolic,
                intercept,
            } => {
                let dot = |coef: &[f64]| coef.iter().zip(&x).map(|(c, v)| c * v).sum::<f64>();
                [dot(systolic) + intercept[0], dot(diastolic) + intercept[1]]
            }
        }
    }
}
