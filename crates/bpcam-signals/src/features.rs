//! Feature extraction: eleven time- and frequency-domain statistics
//!
//! The field order of [`FeatureVector`] is part of the model contract and
//! of the features CSV layout; see [`FEATURE_NAMES`].

use std::fs::{File, OpenOptions};
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dsp::{stats, welch, ConditionedSignal, WelchConfig};
use crate::error::ArtifactError;

/// Feature names in model / CSV order
pub const FEATURE_NAMES: [&str; 11] = [
    "mean_amplitude",
    "std_amplitude",
    "rms_amplitude",
    "num_peaks",
    "mean_peak_interval",
    "std_peak_interval",
    "skewness",
    "kurtosis",
    "dominant_frequency",
    "total_power",
    "peak_power",
];

/// Fixed-order feature vector; every field is always present
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub mean_amplitude: f64,
    pub std_amplitude: f64,
    pub rms_amplitude: f64,
    pub num_peaks: usize,
    pub mean_peak_interval: f64,
    pub std_peak_interval: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub dominant_frequency: f64,
    pub total_power: f64,
    pub peak_power: f64,
}

impl FeatureVector {
    /// Values in [`FEATURE_NAMES`] order
    pub fn to_array(&self) -> [f64; 11] {
        [
            self.mean_amplitude,
            self.std_amplitude,
            self.rms_amplitude,
            self.num_peaks as f64,
            self.mean_peak_interval,
            self.std_peak_interval,
            self.skewness,
            self.kurtosis,
            self.dominant_frequency,
            self.total_power,
            self.peak_power,
        ]
    }

    /// Value by feature name
    pub fn get(&self, name: &str) -> Option<f64> {
        let idx = FEATURE_NAMES.iter().position(|n| *n == name)?;
        Some(self.to_array()[idx])
    }

    /// Write a features CSV holding this single row
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), ArtifactError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.serialize(self)?;
        writer.flush()?;
        Ok(())
    }

    /// Append this row to a features CSV, writing the header only when the
    /// file is new or empty
    pub fn append_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(needs_header).from_writer(file);
        writer.serialize(self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read every row of a features CSV
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Self>, ArtifactError> {
        let mut reader = csv::Reader::from_reader(File::open(path)?);
        let rows = reader.deserialize().collect::<Result<Vec<Self>, csv::Error>>()?;
        Ok(rows)
    }
}

/// Computes a [`FeatureVector`] from a conditioned signal
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    welch: WelchConfig,
}

impl FeatureExtractor {
    pub fn new(welch: WelchConfig) -> Self {
        Self { welch }
    }

    /// Extract all features
    ///
    /// Deterministic: the same conditioned signal always yields bit-identical
    /// features.
    pub fn extract(&self, signal: &ConditionedSignal) -> FeatureVector {
        let values = &signal.values;

        let peak_times: Array1<f64> = signal.peaks.iter().map(|p| p.timestamp).collect();
        let (mean_peak_interval, std_peak_interval) = if peak_times.len() < 2 {
            (0.0, 0.0)
        } else {
            let intervals: Array1<f64> = peak_times.windows(2).into_iter().map(|w| w[1] - w[0]).collect();
            (stats::mean(&intervals), stats::std(&intervals))
        };

        let psd = welch(values, signal.fs, &self.welch);

        let features = FeatureVector {
            mean_amplitude: stats::mean(values),
            std_amplitude: stats::std(values),
            rms_amplitude: stats::rms(values),
            num_peaks: signal.peaks.len(),
            mean_peak_interval,
            std_peak_interval,
            skewness: stats::skewness(values),
            kurtosis: stats::kurtosis(values),
            dominant_frequency: psd.dominant_frequency(),
            total_power: psd.total_power(),
            peak_power: psd.peak_power(),
        };
        debug!(?features, "features extracted");
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::Peak;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn conditioned(values: Vec<f64>, fs: f64, peak_idx: &[usize]) -> ConditionedSignal {
        let timestamps: Array1<f64> = (0..values.len()).map(|i| i as f64 / fs).collect();
        let peaks = peak_idx
            .iter()
            .map(|&index| Peak {
                index,
                timestamp: timestamps[index],
            })
            .collect();
        ConditionedSignal {
            values: Array1::from(values),
            timestamps,
            fs,
            peaks,
        }
    }

    #[test]
    fn test_feature_names_match_serialized_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        FeatureVector::default().write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, FEATURE_NAMES.join(","));
    }

    #[test]
    fn test_to_array_order() {
        let fv = FeatureVector {
            mean_amplitude: 1.0,
            std_amplitude: 2.0,
            rms_amplitude: 3.0,
            num_peaks: 4,
            mean_peak_interval: 5.0,
            std_peak_interval: 6.0,
            skewness: 7.0,
            kurtosis: 8.0,
            dominant_frequency: 9.0,
            total_power: 10.0,
            peak_power: 11.0,
        };
        let arr = fv.to_array();
        for (i, v) in arr.iter().enumerate() {
            assert_eq!(*v, (i + 1) as f64);
        }
        assert_eq!(fv.get("kurtosis"), Some(8.0));
        assert_eq!(fv.get("heart_rate"), None);
    }

    #[test]
    fn test_single_peak_has_zero_interval_stats() {
        let values: Vec<f64> = (0..60).map(|i| (i as f64 * 0.3).sin()).collect();
        let fv = FeatureExtractor::default().extract(&conditioned(values.clone(), 30.0, &[10]));
        assert_eq!(fv.num_peaks, 1);
        assert_eq!(fv.mean_peak_interval, 0.0);
        assert_eq!(fv.std_peak_interval, 0.0);

        let fv = FeatureExtractor::default().extract(&conditioned(values, 30.0, &[]));
        assert_eq!(fv.num_peaks, 0);
        assert_eq!(fv.mean_peak_interval, 0.0);
        assert_eq!(fv.std_peak_interval, 0.0);
    }

    #[test]
    fn test_peak_interval_stats() {
        let values = vec![0.0; 100];
        // Peaks at 0.0, 0.5, 1.5 s: intervals 0.5 and 1.0
        let fv = FeatureExtractor::default().extract(&conditioned(values, 10.0, &[0, 5, 15]));
        assert_relative_eq!(fv.mean_peak_interval, 0.75, epsilon = 1e-12);
        assert_relative_eq!(fv.std_peak_interval, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_spectral_features_of_sinusoid() {
        let fs = 30.0;
        let values: Vec<f64> = (0..150).map(|i| (2.0 * PI * 1.2 * i as f64 / fs).sin()).collect();
        let fv = FeatureExtractor::default().extract(&conditioned(values, fs, &[]));

        assert_relative_eq!(fv.dominant_frequency, 1.2, epsilon = 1e-9);
        assert!(fv.peak_power > 0.0);
        assert!(fv.total_power >= fv.peak_power);
        assert_relative_eq!(fv.rms_amplitude, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-3);
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.csv");

        let first = FeatureVector {
            num_peaks: 3,
            ..FeatureVector::default()
        };
        let second = FeatureVector {
            num_peaks: 7,
            dominant_frequency: 1.25,
            ..FeatureVector::default()
        };
        first.append_csv(&path).unwrap();
        second.append_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(text.matches("mean_amplitude").count(), 1);

        let rows = FeatureVector::read_csv(&path).unwrap();
        assert_eq!(rows, vec![first, second]);
    }
}
