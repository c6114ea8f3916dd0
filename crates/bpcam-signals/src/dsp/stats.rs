//! Descriptive statistics and detrending
//!
//! Population moments for amplitude features, bias-corrected sample
//! skewness / excess kurtosis (the estimators used by the training side's
//! data frames), and least-squares detrending.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Trend removed before band-pass filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetrendMode {
    /// Least-squares straight line
    #[default]
    Linear,
    /// Constant offset only
    Mean,
}

/// Remove a trend from the signal
pub fn detrend(signal: &Array1<f64>, mode: DetrendMode) -> Array1<f64> {
    match mode {
        DetrendMode::Mean => {
            let mean = signal.mean().unwrap_or(0.0);
            signal.mapv(|x| x - mean)
        }
        DetrendMode::Linear => detrend_linear(signal),
    }
}

fn detrend_linear(signal: &Array1<f64>) -> Array1<f64> {
    let n = signal.len();
    if n < 2 {
        return signal.mapv(|_| 0.0);
    }

    // Centre the abscissa so the normal equations decouple
    let t_mean = (n - 1) as f64 / 2.0;
    let y_mean = signal.mean().unwrap_or(0.0);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &y) in signal.iter().enumerate() {
        let t = i as f64 - t_mean;
        sxy += t * (y - y_mean);
        sxx += t * t;
    }
    let slope = sxy / sxx;

    Array1::from_iter(
        signal
            .iter()
            .enumerate()
            .map(|(i, &y)| y - y_mean - slope * (i as f64 - t_mean)),
    )
}

/// Arithmetic mean, 0 for an empty slice
pub fn mean(x: &Array1<f64>) -> f64 {
    x.mean().unwrap_or(0.0)
}

/// Population standard deviation (divide by n)
pub fn std(x: &Array1<f64>) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let m = mean(x);
    let variance = x.iter().map(|v| (v - m).powi(2)).sum::<f64>() / x.len() as f64;
    variance.sqrt()
}

/// Root mean square
pub fn rms(x: &Array1<f64>) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
}

/// Central moments m2, m3, m4 (population normalisation)
fn central_moments(x: &Array1<f64>) -> (f64, f64, f64) {
    let n = x.len() as f64;
    let m = mean(x);
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in x.iter() {
        let d = v - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

/// Relative variance floor below which a signal counts as constant
const CONSTANT_EPS: f64 = 1e-14;

fn is_constant(x: &Array1<f64>, m2: f64) -> bool {
    let scale = mean(x).powi(2).max(1.0);
    m2 <= CONSTANT_EPS * scale
}

/// Adjusted Fisher-Pearson sample skewness (G1)
///
/// Returns 0 for fewer than 3 samples or a constant signal.
pub fn skewness(x: &Array1<f64>) -> f64 {
    let n = x.len();
    if n < 3 {
        return 0.0;
    }
    let (m2, m3, _) = central_moments(x);
    if is_constant(x, m2) {
        return 0.0;
    }
    let n = n as f64;
    let g1 = m3 / m2.powf(1.5);
    g1 * (n * (n - 1.0)).sqrt() / (n - 2.0)
}

/// Bias-corrected sample excess kurtosis (G2)
///
/// Returns 0 for fewer than 4 samples or a constant signal.
pub fn kurtosis(x: &Array1<f64>) -> f64 {
    let n = x.len();
    if n < 4 {
        return 0.0;
    }
    let (m2, _, m4) = central_moments(x);
    if is_constant(x, m2) {
        return 0.0;
    }
    let n = n as f64;
    let g2 = m4 / (m2 * m2) - 3.0;
    ((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_detrend_removes_ramp() {
        let signal = Array1::from_iter((0..50).map(|i| 3.0 + 0.5 * i as f64));
        let detrended = detrend(&signal, DetrendMode::Linear);
        for v in detrended.iter() {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_mean_detrend() {
        let signal = Array1::from(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let detrended = detrend(&signal, DetrendMode::Mean);

        assert_relative_eq!(detrended.mean().unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(detrended[0], -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_linear_detrend_keeps_oscillation() {
        let signal = Array1::from_iter((0..60).map(|i| {
            let t = i as f64;
            10.0 + 0.2 * t + (t * 0.7).sin()
        }));
        let detrended = detrend(&signal, DetrendMode::Linear);
        assert_relative_eq!(detrended.mean().unwrap(), 0.0, epsilon = 1e-10);
        assert!(std(&detrended) > 0.5);
    }

    #[test]
    fn test_std() {
        let signal = Array1::from(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        // Known std for [1,2,3,4,5] is sqrt(2)
        assert_relative_eq!(std(&signal), std::f64::consts::SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn test_rms() {
        let signal = Array1::from(vec![3.0, -3.0, 3.0, -3.0]);
        assert_relative_eq!(rms(&signal), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_skewness_known_value() {
        // Sample skewness of [1, 2, 3, 10] is 1.7636...
        let signal = Array1::from(vec![1.0, 2.0, 3.0, 10.0]);
        assert_relative_eq!(skewness(&signal), 1.763_632_615, epsilon = 1e-8);
    }

    #[test]
    fn test_kurtosis_known_value() {
        // Excess kurtosis of [1, 2, 3, 4, 100] is 4.9869...
        let signal = Array1::from(vec![1.0, 2.0, 3.0, 4.0, 100.0]);
        assert_relative_eq!(kurtosis(&signal), 4.986_865_957, epsilon = 1e-8);
    }

    #[test]
    fn test_symmetric_signal_has_zero_skew() {
        let signal = Array1::from(vec![-2.0, -1.0, 0.0, 1.0, 2.0]);
        assert_relative_eq!(skewness(&signal), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_signal_moments_are_zero() {
        let signal = Array1::from_elem(40, 7.25);
        assert_eq!(skewness(&signal), 0.0);
        assert_eq!(kurtosis(&signal), 0.0);
        assert_eq!(std(&signal), 0.0);
    }

    #[test]
    fn test_short_signals() {
        let two = Array1::from(vec![1.0, 2.0]);
        assert_eq!(skewness(&two), 0.0);
        assert_eq!(kurtosis(&two), 0.0);
        assert_eq!(std(&Array1::zeros(0)), 0.0);
        assert_eq!(rms(&Array1::zeros(0)), 0.0);
    }
}
