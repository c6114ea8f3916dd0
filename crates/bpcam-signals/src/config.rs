use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::dsp::{DetrendMode, WelchConfig};
use crate::rppg::PulseMethod;
use crate::vision::RoiStrategy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration
///
/// Every section falls back to its defaults when missing from the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BpConfig {
    pub capture: CaptureConfig,
    pub roi: RoiConfig,
    pub signal: SignalConfig,
    pub filter: FilterConfig,
    pub spectrum: WelchConfig,
    pub model: ModelConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Frame rate assigned to still-image sequences (Hz)
    pub fps: f64,
    /// Maximum recording length (seconds)
    pub duration_sec: f64,
    /// Camera device index for live recording
    pub camera_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    /// Detections scoring below this are ignored
    pub min_confidence: Option<f32>,
    /// SeetaFace model file
    pub detector_model: Option<PathBuf>,
    pub strategy: RoiStrategy,
    pub detector: DetectorConfig,
}

/// Face cascade tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub min_face_size: u32,
    pub score_thresh: f64,
    pub pyramid_scale_factor: f32,
    pub slide_window_step: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Channel combination feeding the conditioner
    pub method: PulseMethod,
    /// Minimum raw samples for conditioning
    pub min_samples: usize,
    /// Consecutive misses after which localization is reported exhausted
    pub max_miss_streak: usize,
    /// Localize frames on the rayon pool (detector must be cloneable)
    pub parallel_localization: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Lower pass-band edge (Hz)
    pub low_hz: f64,
    /// Upper pass-band edge (Hz)
    pub high_hz: f64,
    /// Butterworth prototype order
    pub order: usize,
    pub detrend: DetrendMode,
    /// Minimum spacing between heartbeat peaks (seconds)
    pub peak_spacing_sec: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Persisted model artifact; `None` always uses the fallback
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for per-run signal and feature CSVs
    pub dir: Option<PathBuf>,
    /// Features CSV that every run appends one row to
    pub features_log: Option<PathBuf>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            duration_sec: 30.0,
            camera_index: 0,
        }
    }
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            min_confidence: None,
            detector_model: Some(PathBuf::from("model/seeta_fd_frontal_v1.0.bin")),
            strategy: RoiStrategy::default(),
            detector: DetectorConfig::default(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_face_size: 40,
            score_thresh: 2.0,
            pyramid_scale_factor: 0.8,
            slide_window_step: 4,
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            method: PulseMethod::Green,
            min_samples: 30,
            max_miss_streak: 30,
            parallel_localization: false,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            low_hz: 0.7,
            high_hz: 4.0,
            order: 5,
            detrend: DetrendMode::Linear,
            peak_spacing_sec: 0.4,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: Some(PathBuf::from("model/bp_predictor.bin")),
        }
    }
}

impl BpConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: BpConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    /// Environment variables are prefixed with BPCAM_
    /// Example: BPCAM_MODEL_PATH=/srv/models/bp.bin
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. User config file (if exists)
    /// 3. Default config file
    /// 4. Built-in defaults (lowest priority)
    ///
    /// Files are merged key by key: a user file only replaces the keys it
    /// sets, tables are merged recursively.
    pub fn load_layered(default_path: Option<&Path>, user_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut table = toml::Table::new();
        for path in [default_path, user_path].into_iter().flatten() {
            if path.exists() {
                merge_tables(&mut table, read_table(path)?);
            }
        }

        let mut config: BpConfig = toml::Value::Table(table).try_into()?;
        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub(crate) fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(val) = env_value("BPCAM_MODEL_PATH") {
            self.model.path = if val.is_empty() { None } else { Some(PathBuf::from(val)) };
        }
        if let Some(val) = env_value("BPCAM_DETECTOR_MODEL") {
            self.roi.detector_model = Some(PathBuf::from(val));
        }
        if let Some(val) = env_value("BPCAM_OUTPUT_DIR") {
            self.output.dir = Some(PathBuf::from(val));
        }

        // Capture overrides
        if let Some(val) = env_value("BPCAM_CAPTURE_FPS") {
            self.capture.fps = parse_env("BPCAM_CAPTURE_FPS", &val)?;
        }
        if let Some(val) = env_value("BPCAM_CAPTURE_DURATION_SEC") {
            self.capture.duration_sec = parse_env("BPCAM_CAPTURE_DURATION_SEC", &val)?;
        }
        if let Some(val) = env_value("BPCAM_CAPTURE_CAMERA_INDEX") {
            self.capture.camera_index = parse_env("BPCAM_CAPTURE_CAMERA_INDEX", &val)?;
        }

        // Signal overrides
        if let Some(val) = env_value("BPCAM_SIGNAL_METHOD") {
            self.signal.method = match val.to_ascii_lowercase().as_str() {
                "green" => PulseMethod::Green,
                "chrom" => PulseMethod::Chrom,
                "pos" => PulseMethod::Pos,
                _ => return Err(ConfigError::Validation("Invalid BPCAM_SIGNAL_METHOD".to_string())),
            };
        }
        if let Some(val) = env_value("BPCAM_SIGNAL_MIN_SAMPLES") {
            self.signal.min_samples = parse_env("BPCAM_SIGNAL_MIN_SAMPLES", &val)?;
        }

        // Filter overrides
        if let Some(val) = env_value("BPCAM_FILTER_LOW_HZ") {
            self.filter.low_hz = parse_env("BPCAM_FILTER_LOW_HZ", &val)?;
        }
        if let Some(val) = env_value("BPCAM_FILTER_HIGH_HZ") {
            self.filter.high_hz = parse_env("BPCAM_FILTER_HIGH_HZ", &val)?;
        }
        if let Some(val) = env_value("BPCAM_FILTER_ORDER") {
            self.filter.order = parse_env("BPCAM_FILTER_ORDER", &val)?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.capture.fps.is_finite() && self.capture.fps > 0.0) {
            return Err(ConfigError::Validation("capture.fps must be positive".to_string()));
        }
        if !(self.capture.duration_sec.is_finite() && self.capture.duration_sec > 0.0) {
            return Err(ConfigError::Validation(
                "capture.duration_sec must be positive".to_string(),
            ));
        }

        if let RoiStrategy::ForeheadBox { x_start, x_end, height } = self.roi.strategy {
            if !(0.0..1.0).contains(&x_start) || x_end <= x_start || x_end > 1.0 {
                return Err(ConfigError::Validation(
                    "roi.strategy x_start/x_end must satisfy 0 <= x_start < x_end <= 1".to_string(),
                ));
            }
            if height <= 0.0 || height > 1.0 {
                return Err(ConfigError::Validation(
                    "roi.strategy height must be in (0, 1]".to_string(),
                ));
            }
        }
        if self.roi.detector.slide_window_step == 0 {
            return Err(ConfigError::Validation(
                "roi.detector.slide_window_step must be > 0".to_string(),
            ));
        }
        if self.roi.detector.pyramid_scale_factor <= 0.0 || self.roi.detector.pyramid_scale_factor >= 1.0 {
            return Err(ConfigError::Validation(
                "roi.detector.pyramid_scale_factor must be in (0, 1)".to_string(),
            ));
        }

        if self.signal.min_samples < 2 {
            return Err(ConfigError::Validation(
                "signal.min_samples must be >= 2".to_string(),
            ));
        }

        if self.filter.order == 0 {
            return Err(ConfigError::Validation("filter.order must be > 0".to_string()));
        }
        if !(self.filter.low_hz > 0.0 && self.filter.low_hz < self.filter.high_hz) {
            return Err(ConfigError::Validation(
                "filter band must satisfy 0 < low_hz < high_hz".to_string(),
            ));
        }
        if self.filter.peak_spacing_sec < 0.0 {
            return Err(ConfigError::Validation(
                "filter.peak_spacing_sec must be non-negative".to_string(),
            ));
        }

        if self.spectrum.max_segment_len == 0 {
            return Err(ConfigError::Validation(
                "spectrum.max_segment_len must be > 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.spectrum.overlap) {
            return Err(ConfigError::Validation(
                "spectrum.overlap must be in [0, 1)".to_string(),
            ));
        }

        Ok(())
    }

    /// Export configuration to TOML string
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = self
            .to_toml_string()
            .map_err(|e| ConfigError::Validation(format!("TOML serialization error: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }
}

fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay `overlay` onto `base`; nested tables merge, everything else replaces
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(overlay_table) = value {
            if let Some(toml::Value::Table(base_table)) = base.get_mut(&key) {
                merge_tables(base_table, overlay_table);
                continue;
            }
            base.insert(key, toml::Value::Table(overlay_table));
        } else {
            base.insert(key, value);
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_env<T: std::str::FromStr>(key: &str, val: &str) -> Result<T, ConfigError> {
    val.trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("Invalid {}", key)))
}
