//! Raw colour signal: one channel-average sample per localized frame

use std::fs::File;
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::pulse::PulseMethod;
use crate::error::{ArtifactError, SignalError};

/// Column headers of the raw signal CSV
pub const SIGNAL_CSV_HEADER: [&str; 2] = ["Time (s)", "Green Avg (rPPG Proxy)"];

/// Channels averaged per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    /// Green channel only
    #[default]
    Green,
    /// Red, green and blue
    Rgb,
}

impl ChannelMode {
    /// Channels a pulse method needs
    pub fn for_method(method: PulseMethod) -> Self {
        if method.needs_rgb() {
            ChannelMode::Rgb
        } else {
            ChannelMode::Green
        }
    }
}

/// Channel-average intensities of one ROI
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intensity {
    Green(f64),
    Rgb([f64; 3]),
}

impl Intensity {
    pub fn green(&self) -> f64 {
        match *self {
            Intensity::Green(g) => g,
            Intensity::Rgb([_, g, _]) => g,
        }
    }
}

/// One sample of the raw signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Timestamp of the source frame (seconds)
    pub timestamp: f64,
    pub intensity: Intensity,
}

impl RawSample {
    pub fn green(timestamp: f64, value: f64) -> Self {
        Self {
            timestamp,
            intensity: Intensity::Green(value),
        }
    }

    pub fn rgb(timestamp: f64, rgb: [f64; 3]) -> Self {
        Self {
            timestamp,
            intensity: Intensity::Rgb(rgb),
        }
    }
}

/// Ordered raw samples with strictly increasing timestamps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSignal {
    samples: Vec<RawSample>,
}

impl RawSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from samples, checking timestamp order
    pub fn from_samples(samples: impl IntoIterator<Item = RawSample>) -> Result<Self, SignalError> {
        let mut signal = Self::new();
        for sample in samples {
            signal.push(sample)?;
        }
        Ok(signal)
    }

    /// Green-only signal from parallel value / timestamp slices
    pub fn from_green(timestamps: &[f64], values: &[f64]) -> Result<Self, SignalError> {
        Self::from_samples(
            timestamps
                .iter()
                .zip(values.iter())
                .map(|(&t, &v)| RawSample::green(t, v)),
        )
    }

    /// Append a sample
    ///
    /// # Errors
    /// `NonMonotonicTimestamp` unless the timestamp is finite and strictly
    /// after the previous one.
    pub fn push(&mut self, sample: RawSample) -> Result<(), SignalError> {
        let previous = self.samples.last().map(|s| s.timestamp);
        let ordered = sample.timestamp.is_finite() && previous.map_or(true, |p| sample.timestamp > p);
        if !ordered {
            return Err(SignalError::NonMonotonicTimestamp {
                index: self.samples.len(),
                previous: previous.unwrap_or(f64::NEG_INFINITY),
                current: sample.timestamp,
            });
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[RawSample] {
        &self.samples
    }

    pub fn timestamps(&self) -> Array1<f64> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }

    pub fn green(&self) -> Array1<f64> {
        self.samples.iter().map(|s| s.intensity.green()).collect()
    }

    /// Per-channel traces, `None` unless every sample carries RGB
    pub fn rgb(&self) -> Option<(Array1<f64>, Array1<f64>, Array1<f64>)> {
        let mut r = Vec::with_capacity(self.len());
        let mut g = Vec::with_capacity(self.len());
        let mut b = Vec::with_capacity(self.len());
        for sample in &self.samples {
            let Intensity::Rgb([sr, sg, sb]) = sample.intensity else {
                return None;
            };
            r.push(sr);
            g.push(sg);
            b.push(sb);
        }
        Some((Array1::from(r), Array1::from(g), Array1::from(b)))
    }

    /// Pulse trace for a combination method
    ///
    /// Methods needing RGB fall back to the green trace when the samples
    /// only carry green.
    pub fn pulse(&self, method: PulseMethod, fs: f64) -> Array1<f64> {
        if !method.needs_rgb() {
            return self.green();
        }
        match self.rgb() {
            Some((r, g, b)) => method.combine(&r, &g, &b, fs),
            None => {
                tracing::warn!(?method, "signal carries green only, using green trace");
                self.green()
            }
        }
    }

    /// Write the signal CSV (`Time (s)`, `Green Avg (rPPG Proxy)`)
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), ArtifactError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(SIGNAL_CSV_HEADER)?;
        for sample in &self.samples {
            writer.write_record([sample.timestamp.to_string(), sample.intensity.green().to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a signal CSV back as a green-only signal
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let mut reader = csv::Reader::from_reader(File::open(path)?);

        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| ArtifactError::Malformed(format!("missing column {:?}", name)))
        };
        let time_col = column(SIGNAL_CSV_HEADER[0])?;
        let value_col = column(SIGNAL_CSV_HEADER[1])?;

        let mut signal = Self::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let field = |col: usize| -> Result<f64, ArtifactError> {
                record
                    .get(col)
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .ok_or_else(|| ArtifactError::Malformed(format!("row {}: bad number in column {}", row + 1, col)))
            };
            let sample = RawSample::green(field(time_col)?, field(value_col)?);
            signal
                .push(sample)
                .map_err(|e| ArtifactError::Malformed(format!("row {}: {}", row + 1, e)))?;
        }
        Ok(signal)
    }
}
