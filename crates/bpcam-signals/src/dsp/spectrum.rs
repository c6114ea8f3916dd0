//! Welch power spectral density
//!
//! Averaged periodogram of half-overlapping, Hann-windowed segments with
//! per-segment mean removal, density scaling and a one-sided spectrum.

use ndarray::Array1;
use num_complex::Complex64;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Welch parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WelchConfig {
    /// Maximum segment length; shorter signals use their own length
    pub max_segment_len: usize,
    /// Overlap as a fraction of the segment length
    pub overlap: f64,
}

impl Default for WelchConfig {
    fn default() -> Self {
        Self {
            max_segment_len: 256,
            overlap: 0.5,
        }
    }
}

/// One-sided power spectral density
#[derive(Debug, Clone, PartialEq)]
pub struct Psd {
    /// Bin frequencies (Hz), `k * fs / nperseg`
    pub freqs: Array1<f64>,
    /// Power density per bin (units²/Hz)
    pub power: Array1<f64>,
}

impl Psd {
    /// Frequency of the first bin holding the maximum power
    pub fn dominant_frequency(&self) -> f64 {
        self.argmax().map(|k| self.freqs[k]).unwrap_or(0.0)
    }

    /// Sum over all bins
    pub fn total_power(&self) -> f64 {
        self.power.sum()
    }

    /// Largest bin value
    pub fn peak_power(&self) -> f64 {
        self.argmax().map(|k| self.power[k]).unwrap_or(0.0)
    }

    fn argmax(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (k, &p) in self.power.iter().enumerate() {
            match best {
                Some((_, b)) if p <= b => {}
                _ => best = Some((k, p)),
            }
        }
        best.map(|(k, _)| k)
    }
}

/// Periodic Hann window of length `n`
pub fn hann_periodic(n: usize) -> Array1<f64> {
    Array1::from_iter((0..n).map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos()))
}

/// Estimate the PSD with Welch's method
///
/// Returns an empty spectrum for an empty signal or a non-positive rate.
pub fn welch(signal: &Array1<f64>, fs: f64, config: &WelchConfig) -> Psd {
    let n = signal.len();
    if n == 0 || !(fs.is_finite() && fs > 0.0) {
        return Psd {
            freqs: Array1::zeros(0),
            power: Array1::zeros(0),
        };
    }

    let nperseg = config.max_segment_len.max(1).min(n);
    let noverlap = ((nperseg as f64 * config.overlap.clamp(0.0, 0.99)).floor() as usize).min(nperseg - 1);
    let step = nperseg - noverlap;
    let nseg = (n - noverlap) / step;

    let window = hann_periodic(nperseg);
    let scale = 1.0 / (fs * window.iter().map(|w| w * w).sum::<f64>());

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(nperseg);

    let nfreq = nperseg / 2 + 1;
    let mut power = Array1::<f64>::zeros(nfreq);
    let mut buffer = vec![Complex64::new(0.0, 0.0); nperseg];

    for s in 0..nseg {
        let segment = signal.slice(ndarray::s![s * step..s * step + nperseg]);
        let mean = segment.mean().unwrap_or(0.0);
        for (slot, (&x, &w)) in buffer.iter_mut().zip(segment.iter().zip(window.iter())) {
            *slot = Complex64::new((x - mean) * w, 0.0);
        }
        fft.process(&mut buffer);

        for (k, c) in buffer.iter().take(nfreq).enumerate() {
            let mut p = c.norm_sqr() * scale;
            // Fold negative frequencies, except DC and an even-length Nyquist bin
            let is_nyquist = nperseg % 2 == 0 && k == nperseg / 2;
            if k != 0 && !is_nyquist {
                p *= 2.0;
            }
            power[k] += p;
        }
    }
    if nseg > 0 {
        power /= nseg as f64;
    }

    let freqs = Array1::from_iter((0..nfreq).map(|k| k as f64 * fs / nperseg as f64));
    Psd { freqs, power }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(n: usize, fs: f64, f: f64, amp: f64) -> Array1<f64> {
        Array1::from_iter((0..n).map(|i| amp * (2.0 * PI * f * i as f64 / fs).sin()))
    }

    #[test]
    fn test_hann_periodic() {
        let w = hann_periodic(4);
        assert_relative_eq!(w[0], 0.0, epsilon = 1e-15);
        assert_relative_eq!(w[1], 0.5, epsilon = 1e-15);
        assert_relative_eq!(w[2], 1.0, epsilon = 1e-15);
        assert_relative_eq!(w[3], 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_dominant_frequency_single_segment() {
        let psd = welch(&sine(150, 30.0, 1.2, 1.0), 30.0, &WelchConfig::default());
        assert_eq!(psd.freqs.len(), 76);
        assert_relative_eq!(psd.freqs[1], 0.2, epsilon = 1e-12);
        assert_relative_eq!(psd.dominant_frequency(), 1.2, epsilon = 1e-9);
    }

    #[test]
    fn test_multi_segment_resolution() {
        let fs = 30.0;
        let psd = welch(&sine(900, fs, 2.0, 1.0), fs, &WelchConfig::default());
        assert_eq!(psd.freqs.len(), 129);
        let bin = fs / 256.0;
        assert!((psd.dominant_frequency() - 2.0).abs() <= bin);
    }

    #[test]
    fn test_power_matches_variance() {
        // Integrated density equals the signal variance (Parseval), up to
        // leakage; amplitude 2 sine has variance 2
        let fs = 30.0;
        let psd = welch(&sine(1024, fs, 3.0, 2.0), fs, &WelchConfig::default());
        let df = fs / 256.0;
        assert_relative_eq!(psd.total_power() * df, 2.0, epsilon = 0.05);
    }

    #[test]
    fn test_constant_signal_has_no_power() {
        let psd = welch(&Array1::from_elem(64, 3.0), 30.0, &WelchConfig::default());
        assert_eq!(psd.peak_power(), 0.0);
        assert_eq!(psd.dominant_frequency(), 0.0);
    }

    #[test]
    fn test_empty_signal() {
        let psd = welch(&Array1::zeros(0), 30.0, &WelchConfig::default());
        assert!(psd.freqs.is_empty());
        assert_eq!(psd.total_power(), 0.0);
    }
}
