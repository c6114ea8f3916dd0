//! End-to-end run: frames in, labelled reading out
//!
//! ```text
//! FrameSource → RoiLocalizer → SignalExtractor → SignalConditioner
//!             → FeatureExtractor → BpPredictor → categorize
//! ```
//!
//! A run either returns a complete [`PipelineOutcome`] or a typed
//! [`PipelineError`]; nothing partial is handed back.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::category::{BpCategory, BpReading};
use crate::config::BpConfig;
use crate::dsp::{ConditionerConfig, SignalConditioner};
use crate::error::{ArtifactError, PipelineError, SignalError};
use crate::features::{FeatureExtractor, FeatureVector};
use crate::predict::{BpPredictor, Prediction, SourceSummary};
use crate::rppg::{ChannelMode, Extraction, LocalizationStats, RawSignal, SignalExtractor};
use crate::vision::{FaceDetector, FrameSource, RoiLocalizer};

/// Estimate derived from one raw signal
#[derive(Debug, Clone)]
pub struct Estimate {
    pub reading: BpReading,
    pub prediction: Prediction,
    pub features: FeatureVector,
    /// Raw samples that went into conditioning
    pub samples: usize,
    /// Derived sampling rate (Hz)
    pub fs: f64,
}

/// Result of a full run over a frame source
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub estimate: Estimate,
    pub stats: LocalizationStats,
    /// CSV files written during the run
    pub artifacts: Vec<PathBuf>,
}

impl PipelineOutcome {
    pub fn reading(&self) -> &BpReading {
        &self.estimate.reading
    }

    pub fn report(&self) -> RunReport {
        let mut report = self.estimate.report();
        report.frames = Some(self.stats.frames);
        report.localized = Some(self.stats.localized);
        report.artifacts = self.artifacts.clone();
        report
    }
}

impl Estimate {
    pub fn report(&self) -> RunReport {
        RunReport {
            systolic: self.reading.systolic,
            diastolic: self.reading.diastolic,
            category: self.reading.category,
            source: SourceSummary::from(&self.prediction.source),
            suggestions: self.reading.category.suggestions(),
            features: self.features,
            samples: self.samples,
            fs: self.fs,
            frames: None,
            localized: None,
            artifacts: Vec::new(),
        }
    }
}

/// Flat, serializable summary of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub systolic: f64,
    pub diastolic: f64,
    pub category: BpCategory,
    pub source: SourceSummary,
    pub suggestions: Vec<&'static str>,
    pub features: FeatureVector,
    pub samples: usize,
    pub fs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localized: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<PathBuf>,
}

/// Blood-pressure pipeline configured from a [`BpConfig`]
#[derive(Debug, Clone)]
pub struct BpPipeline {
    config: BpConfig,
    extractor: SignalExtractor,
    conditioner: SignalConditioner,
    features: FeatureExtractor,
    predictor: Arc<BpPredictor>,
}

impl BpPipeline {
    /// Pipeline whose predictor loads the configured model on first use
    pub fn new(config: BpConfig) -> Self {
        let predictor = Arc::new(BpPredictor::from_optional_path(config.model.path.clone()));
        Self::with_predictor(config, predictor)
    }

    /// Pipeline sharing an existing predictor
    pub fn with_predictor(config: BpConfig, predictor: Arc<BpPredictor>) -> Self {
        let extractor = SignalExtractor::new(ChannelMode::for_method(config.signal.method))
            .with_max_miss_streak(config.signal.max_miss_streak);
        let conditioner = SignalConditioner::new(ConditionerConfig::from(&config));
        let features = FeatureExtractor::new(config.spectrum);
        Self {
            config,
            extractor,
            conditioner,
            features,
            predictor,
        }
    }

    pub fn config(&self) -> &BpConfig {
        &self.config
    }

    pub fn predictor(&self) -> &Arc<BpPredictor> {
        &self.predictor
    }

    /// ROI localizer around `detector` using the configured strategy
    pub fn localizer<D: FaceDetector>(&self, detector: D) -> RoiLocalizer<D> {
        let localizer = RoiLocalizer::with_strategy(detector, self.config.roi.strategy);
        match self.config.roi.min_confidence {
            Some(threshold) => localizer.with_min_confidence(threshold),
            None => localizer,
        }
    }

    /// Run over a frame source, localizing frame by frame
    ///
    /// # Errors
    /// - `Capture` when the source fails mid-stream
    /// - `InsufficientSignal` when too few frames were localized
    /// - `Signal` when conditioning fails (e.g. band above Nyquist)
    /// - `Artifact` when a configured CSV cannot be written
    pub fn run<S, D>(&self, source: &mut S, detector: D) -> Result<PipelineOutcome, PipelineError>
    where
        S: FrameSource + ?Sized,
        D: FaceDetector,
    {
        info!(source = source.name(), "pipeline run started");
        let mut localizer = self.localizer(detector);
        let extraction = self.extractor.extract(source, &mut localizer)?;
        self.finish(source.name(), extraction)
    }

    /// Like [`run`](Self::run), localizing frames on the rayon pool
    pub fn run_parallel<S, D>(&self, source: &mut S, detector: D) -> Result<PipelineOutcome, PipelineError>
    where
        S: FrameSource + ?Sized,
        D: FaceDetector + Clone + Send + Sync,
    {
        info!(source = source.name(), "pipeline run started (parallel localization)");
        let localizer = self.localizer(detector);
        let extraction = self.extractor.extract_parallel(source, &localizer)?;
        self.finish(source.name(), extraction)
    }

    fn finish(&self, source_name: &str, extraction: Extraction) -> Result<PipelineOutcome, PipelineError> {
        let Extraction { signal, stats } = extraction;
        let required = self.config.signal.min_samples;
        if signal.len() < required {
            warn!(
                samples = signal.len(),
                required,
                frames = stats.frames,
                localized = stats.localized,
                "not enough localized frames"
            );
            return Err(PipelineError::InsufficientSignal {
                samples: signal.len(),
                required,
                frames: stats.frames,
                localized: stats.localized,
                longest_miss_streak: stats.longest_miss_streak,
            });
        }

        let mut artifacts = Vec::new();
        let stem = artifact_stem(source_name);
        if let Some(dir) = self.config.output.dir.as_deref() {
            fs::create_dir_all(dir).map_err(ArtifactError::from)?;
            let path = dir.join(format!("rppg_signal_{}.csv", stem));
            signal.write_csv(&path)?;
            artifacts.push(path);
        }

        let estimate = self.estimate(&signal)?;
        artifacts.extend(self.write_features(&stem, &estimate.features)?);

        info!(
            systolic = estimate.reading.systolic,
            diastolic = estimate.reading.diastolic,
            category = %estimate.reading.category,
            fallback = estimate.prediction.source.is_fallback(),
            "pipeline run finished"
        );
        Ok(PipelineOutcome {
            estimate,
            stats,
            artifacts,
        })
    }

    /// Condition, extract features, predict and categorize one raw signal
    ///
    /// Used directly for offline signal CSVs.
    pub fn estimate(&self, signal: &RawSignal) -> Result<Estimate, SignalError> {
        let conditioned = self.conditioner.condition(signal)?;
        let features = self.features.extract(&conditioned);
        let prediction = self.predictor.predict(&features);
        let reading = BpReading::new(prediction.systolic, prediction.diastolic);
        Ok(Estimate {
            reading,
            prediction,
            features,
            samples: signal.len(),
            fs: conditioned.fs,
        })
    }

    /// Per-run features CSV plus the shared features log, as configured
    pub fn write_features(&self, stem: &str, features: &FeatureVector) -> Result<Vec<PathBuf>, PipelineError> {
        let mut written = Vec::new();
        if let Some(dir) = self.config.output.dir.as_deref() {
            fs::create_dir_all(dir).map_err(ArtifactError::from)?;
            let path = dir.join(format!("features_{}.csv", stem));
            features.write_csv(&path)?;
            written.push(path);
        }
        if let Some(log) = self.config.output.features_log.as_deref() {
            if let Some(parent) = log.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(ArtifactError::from)?;
            }
            features.append_csv(log)?;
            written.push(log.to_path_buf());
        }
        Ok(written)
    }
}

/// File-name-safe stem for per-run artifacts
pub fn artifact_stem(source_name: &str) -> String {
    let base = Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(source_name);
    let stem: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "run".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rppg::RawSample;
    use std::f64::consts::PI;

    fn sinusoid(n: usize, fs: f64, f: f64, amplitude: f64) -> RawSignal {
        RawSignal::from_samples((0..n).map(|i| {
            let t = i as f64 / fs;
            RawSample::green(t, 120.0 + amplitude * (2.0 * PI * f * t).sin())
        }))
        .unwrap()
    }

    fn fallback_pipeline(config: BpConfig) -> BpPipeline {
        BpPipeline::with_predictor(config, Arc::new(BpPredictor::fallback_only()))
    }

    #[test]
    fn test_artifact_stem() {
        assert_eq!(artifact_stem("/videos/session 1.mp4"), "session_1");
        assert_eq!(artifact_stem("camera:0"), "camera_0");
        assert_eq!(artifact_stem(""), "run");
    }

    #[test]
    fn test_estimate_from_signal() {
        let pipeline = fallback_pipeline(BpConfig::default());
        let estimate = pipeline.estimate(&sinusoid(150, 30.0, 1.2, 2.0)).unwrap();

        assert_eq!(estimate.samples, 150);
        assert!((estimate.features.dominant_frequency - 1.2).abs() < 0.2);
        assert!(estimate.prediction.source.is_fallback());
        // Band-passed signal is near zero mean
        assert!((estimate.reading.systolic - 120.0).abs() < 1.0);
        assert_eq!(
            estimate.reading.category,
            crate::category::categorize(estimate.reading.systolic, estimate.reading.diastolic)
        );
    }

    #[test]
    fn test_estimate_rejects_short_signal() {
        let pipeline = fallback_pipeline(BpConfig::default());
        let err = pipeline.estimate(&sinusoid(29, 30.0, 1.2, 2.0)).unwrap_err();
        assert_eq!(
            err,
            SignalError::InsufficientSignal {
                samples: 29,
                required: 30
            }
        );
    }

    #[test]
    fn test_write_features_to_dir_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BpConfig::default();
        config.output.dir = Some(dir.path().join("features"));
        config.output.features_log = Some(dir.path().join("log").join("training.csv"));
        let pipeline = fallback_pipeline(config);

        let fv = FeatureVector {
            num_peaks: 5,
            ..FeatureVector::default()
        };
        pipeline.write_features("a", &fv).unwrap();
        let written = pipeline.write_features("b", &fv).unwrap();

        assert_eq!(written.len(), 2);
        assert!(dir.path().join("features").join("features_a.csv").exists());
        assert!(dir.path().join("features").join("features_b.csv").exists());
        let log = FeatureVector::read_csv(dir.path().join("log").join("training.csv")).unwrap();
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_report_serializes() {
        let pipeline = fallback_pipeline(BpConfig::default());
        let estimate = pipeline.estimate(&sinusoid(90, 30.0, 1.5, 1.0)).unwrap();
        let json = serde_json::to_value(estimate.report()).unwrap();

        assert_eq!(json["source"]["kind"], "fallback");
        assert!(json["features"]["num_peaks"].is_u64());
        assert!(json.get("frames").is_none());
        assert_eq!(json["suggestions"].as_array().map(|a| a.len()), Some(4));
    }
}
