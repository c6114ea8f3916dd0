//! Digital Butterworth band-pass design
//!
//! Analog prototype poles are transformed low-pass → band-pass, then mapped
//! to the z-plane with the bilinear transform after frequency pre-warping.
//! Coefficients come out as transfer-function polynomials `b`, `a` with
//! `a[0] == 1`, `2 * order + 1` taps each.

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::error::FilterDesignError;

/// Band-pass IIR filter in transfer-function form
#[derive(Debug, Clone, PartialEq)]
pub struct BandPass {
    order: usize,
    b: Vec<f64>,
    a: Vec<f64>,
}

impl BandPass {
    /// Design a Butterworth band-pass filter
    ///
    /// # Arguments
    /// * `order` - Prototype order (the band-pass has twice as many poles)
    /// * `low_hz`, `high_hz` - Pass-band edges (Hz)
    /// * `fs` - Sampling rate (Hz)
    ///
    /// # Errors
    /// `InvalidBand` unless `0 < low_hz < high_hz < fs / 2`;
    /// `NonFiniteCoefficients` when the design degenerates numerically.
    pub fn butterworth(order: usize, low_hz: f64, high_hz: f64, fs: f64) -> Result<Self, FilterDesignError> {
        let nyquist_hz = 0.5 * fs;
        let valid = order > 0
            && nyquist_hz.is_finite()
            && low_hz > 0.0
            && low_hz < high_hz
            && high_hz < nyquist_hz;
        if !valid {
            return Err(FilterDesignError::InvalidBand {
                low_hz,
                high_hz,
                nyquist_hz,
            });
        }

        // Normalized edges in (0, 1), pre-warped for the bilinear map at fs = 2
        let warped_low = 4.0 * (PI * (low_hz / nyquist_hz) / 2.0).tan();
        let warped_high = 4.0 * (PI * (high_hz / nyquist_hz) / 2.0).tan();
        let bw = warped_high - warped_low;
        let wo = (warped_low * warped_high).sqrt();

        // Analog low-pass prototype: poles on the left unit half-circle
        let n = order as f64;
        let prototype: Vec<Complex64> = (0..order)
            .map(|k| {
                let m = 2.0 * k as f64 - n + 1.0;
                -Complex64::from_polar(1.0, PI * m / (2.0 * n))
            })
            .collect();

        // Low-pass → band-pass: each pole splits into a conjugate-ish pair,
        // and `order` zeros appear at the origin
        let mut poles = Vec::with_capacity(2 * order);
        for p in &prototype {
            let p_lp = *p * (bw / 2.0);
            let disc = (p_lp * p_lp - wo * wo).sqrt();
            poles.push(p_lp + disc);
        }
        for p in &prototype {
            let p_lp = *p * (bw / 2.0);
            let disc = (p_lp * p_lp - wo * wo).sqrt();
            poles.push(p_lp - disc);
        }
        let analog_gain = bw.powi(order as i32);

        // Bilinear transform with fs2 = 2 * fs = 4
        let fs2 = 4.0;
        let mut zeros_z = vec![Complex64::new(1.0, 0.0); order];
        zeros_z.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(order));
        let poles_z: Vec<Complex64> = poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();

        let num = Complex64::new(fs2, 0.0).powi(order as i32);
        let den = poles
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));
        let gain = analog_gain * (num / den).re;

        let b: Vec<f64> = poly(&zeros_z).into_iter().map(|c| gain * c).collect();
        let a = poly(&poles_z);

        if b.iter().chain(a.iter()).any(|c| !c.is_finite()) {
            return Err(FilterDesignError::NonFiniteCoefficients);
        }

        Ok(Self { order, b, a })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Numerator coefficients
    pub fn b(&self) -> &[f64] {
        &self.b
    }

    /// Denominator coefficients, `a[0] == 1`
    pub fn a(&self) -> &[f64] {
        &self.a
    }

    /// Number of taps (`max(len(a), len(b))`)
    pub fn ntaps(&self) -> usize {
        self.a.len().max(self.b.len())
    }
}

/// Real parts of the monic polynomial with the given roots, highest power first
fn poly(roots: &[Complex64]) -> Vec<f64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for &r in roots {
        let mut next = vec![Complex64::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * r;
        }
        coeffs = next;
    }
    coeffs.into_iter().map(|c| c.re).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn magnitude_at(filter: &BandPass, freq_hz: f64, fs: f64) -> f64 {
        let w = 2.0 * PI * freq_hz / fs;
        let eval = |coeffs: &[f64]| {
            coeffs
                .iter()
                .enumerate()
                .fold(Complex64::new(0.0, 0.0), |acc, (k, c)| {
                    acc + Complex64::from_polar(*c, -w * k as f64)
                })
        };
        (eval(filter.b()) / eval(filter.a())).norm()
    }

    #[test]
    fn test_coefficients_order5_at_30hz() {
        let filter = BandPass::butterworth(5, 0.7, 4.0, 30.0).unwrap();
        assert_eq!(filter.b().len(), 11);
        assert_eq!(filter.a().len(), 11);
        assert_eq!(filter.ntaps(), 11);

        assert_relative_eq!(filter.a()[0], 1.0);
        assert_relative_eq!(filter.b()[0], 0.001_921_073_607_886_847, epsilon = 1e-12);
        assert_relative_eq!(filter.b()[4], 0.019_210_736_078_868_47, epsilon = 1e-11);
        assert_relative_eq!(filter.a()[1], -7.282_415_610_996_28, epsilon = 1e-9);
        assert_relative_eq!(filter.a()[10], 0.100_874_146_724_540_76, epsilon = 1e-10);

        // Band-pass numerator is (1 - z^-2)^5 scaled: odd taps vanish
        for k in (1..11).step_by(2) {
            assert_relative_eq!(filter.b()[k], 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_frequency_response() {
        let fs = 30.0;
        let filter = BandPass::butterworth(5, 0.7, 4.0, fs).unwrap();

        // Geometric centre of the band passes at unity gain
        assert_relative_eq!(magnitude_at(&filter, (0.7f64 * 4.0).sqrt(), fs), 1.0, epsilon = 1e-6);
        // -3 dB at the edges
        assert_relative_eq!(magnitude_at(&filter, 0.7, fs), std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
        assert_relative_eq!(magnitude_at(&filter, 4.0, fs), std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
        // Stop bands
        assert!(magnitude_at(&filter, 0.1, fs) < 1e-3);
        assert!(magnitude_at(&filter, 12.0, fs) < 1e-3);
    }

    #[test]
    fn test_invalid_band_rejected() {
        // High edge above Nyquist of a 6 Hz stream
        let err = BandPass::butterworth(5, 0.7, 4.0, 6.0).unwrap_err();
        assert!(matches!(err, FilterDesignError::InvalidBand { nyquist_hz, .. } if nyquist_hz == 3.0));

        assert!(BandPass::butterworth(5, 0.0, 4.0, 30.0).is_err());
        assert!(BandPass::butterworth(5, 4.0, 0.7, 30.0).is_err());
        assert!(BandPass::butterworth(5, 0.7, 4.0, f64::INFINITY).is_err());
        assert!(BandPass::butterworth(0, 0.7, 4.0, 30.0).is_err());
    }
}
