//! Signal conditioning: sampling rate, detrend, zero-phase band-pass, peaks

use ndarray::Array1;
use tracing::{debug, info};

use super::butterworth::BandPass;
use super::peaks;
use super::stats;
use crate::config::{BpConfig, FilterConfig};
use crate::error::SignalError;
use crate::rppg::{PulseMethod, RawSignal};

/// Detected heartbeat peak
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Index into the conditioned values
    pub index: usize,
    /// Timestamp of the raw sample at that index (seconds)
    pub timestamp: f64,
}

/// Band-limited pulse signal ready for feature extraction
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionedSignal {
    /// Filtered values, one per raw sample
    pub values: Array1<f64>,
    /// Source timestamps (seconds)
    pub timestamps: Array1<f64>,
    /// Sampling rate derived from the timestamps (Hz)
    pub fs: f64,
    /// Peaks in ascending index order
    pub peaks: Vec<Peak>,
}

impl ConditionedSignal {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Conditioning parameters
#[derive(Debug, Clone)]
pub struct ConditionerConfig {
    pub min_samples: usize,
    pub method: PulseMethod,
    pub filter: FilterConfig,
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            min_samples: 30,
            method: PulseMethod::Green,
            filter: FilterConfig::default(),
        }
    }
}

impl From<&BpConfig> for ConditionerConfig {
    fn from(config: &BpConfig) -> Self {
        Self {
            min_samples: config.signal.min_samples,
            method: config.signal.method,
            filter: config.filter.clone(),
        }
    }
}

/// Sampling rate as the reciprocal of the mean timestamp spacing
///
/// # Errors
/// `DegenerateTimestamps` when the spacing does not give a finite positive
/// rate.
pub fn sampling_rate(timestamps: &Array1<f64>) -> Result<f64, SignalError> {
    let n = timestamps.len();
    if n < 2 {
        return Err(SignalError::DegenerateTimestamps);
    }
    // mean(diff(t)) telescopes to (t[n-1] - t[0]) / (n - 1)
    let mean_dt = (timestamps[n - 1] - timestamps[0]) / (n - 1) as f64;
    let fs = 1.0 / mean_dt;
    if fs.is_finite() && fs > 0.0 {
        Ok(fs)
    } else {
        Err(SignalError::DegenerateTimestamps)
    }
}

/// Turns a raw colour signal into a conditioned pulse signal
#[derive(Debug, Clone, Default)]
pub struct SignalConditioner {
    config: ConditionerConfig,
}

impl SignalConditioner {
    pub fn new(config: ConditionerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConditionerConfig {
        &self.config
    }

    /// Condition a raw signal
    ///
    /// # Errors
    /// - `InsufficientSignal` below the configured minimum sample count
    /// - `DegenerateTimestamps` when no sampling rate can be derived
    /// - `FilterDesign` when the band does not fit under Nyquist or the
    ///   order is infeasible for the sample count
    pub fn condition(&self, raw: &RawSignal) -> Result<ConditionedSignal, SignalError> {
        let n = raw.len();
        if n < self.config.min_samples {
            return Err(SignalError::InsufficientSignal {
                samples: n,
                required: self.config.min_samples,
            });
        }

        let timestamps = raw.timestamps();
        let fs = sampling_rate(&timestamps)?;
        debug!(samples = n, fs, "sampling rate derived");

        let filter_cfg = &self.config.filter;
        let band = BandPass::butterworth(filter_cfg.order, filter_cfg.low_hz, filter_cfg.high_hz, fs)?;

        let pulse = raw.pulse(self.config.method, fs);
        let detrended = stats::detrend(&pulse, filter_cfg.detrend);
        let values = band.filtfilt(&detrended)?;

        let distance = peaks::min_distance(fs, filter_cfg.peak_spacing_sec);
        let peaks: Vec<Peak> = peaks::find_peaks(&values.to_vec(), distance)
            .into_iter()
            .map(|index| Peak {
                index,
                timestamp: timestamps[index],
            })
            .collect();

        info!(samples = n, fs, peaks = peaks.len(), "signal conditioned");
        Ok(ConditionedSignal {
            values,
            timestamps,
            fs,
            peaks,
        })
    }
}
