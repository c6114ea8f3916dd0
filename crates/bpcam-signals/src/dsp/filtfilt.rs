//! Zero-phase forward-backward IIR filtering
//!
//! The signal is extended at both ends by odd reflection, run through the
//! filter forwards and backwards with steady-state initial conditions scaled
//! to the first sample of each pass, and the padding is cut off again.

use nalgebra::{DMatrix, DVector};
use ndarray::Array1;

use super::butterworth::BandPass;
use crate::error::FilterDesignError;

/// Padding length requested per tap (`3 * ntaps`)
const PAD_PER_TAP: usize = 3;

/// Direct-form II transposed filter with initial state `zi`
///
/// `a[0]` must be 1 and `zi.len() == max(len(a), len(b)) - 1`.
pub fn lfilter(b: &[f64], a: &[f64], x: &[f64], zi: &[f64]) -> Vec<f64> {
    let mut z = zi.to_vec();
    let m = z.len();
    let coeff = |c: &[f64], i: usize| c.get(i).copied().unwrap_or(0.0);

    x.iter()
        .map(|&xn| {
            let yn = coeff(b, 0) * xn + z.first().copied().unwrap_or(0.0);
            for i in 0..m.saturating_sub(1) {
                z[i] = coeff(b, i + 1) * xn - coeff(a, i + 1) * yn + z[i + 1];
            }
            if m > 0 {
                z[m - 1] = coeff(b, m) * xn - coeff(a, m) * yn;
            }
            yn
        })
        .collect()
}

/// Initial state for a step response steady state
///
/// Solves `(I - A^T) zi = b[1:] - a[1:] * b[0]` where `A` is the companion
/// matrix of `a`.
pub fn lfilter_zi(b: &[f64], a: &[f64]) -> Result<Vec<f64>, FilterDesignError> {
    let n = a.len().max(b.len());
    if n < 2 {
        return Ok(Vec::new());
    }
    let m = n - 1;
    let a0 = a.first().copied().unwrap_or(1.0);
    if a0 == 0.0 {
        return Err(FilterDesignError::NonFiniteCoefficients);
    }
    let coeff = |c: &[f64], i: usize| c.get(i).copied().unwrap_or(0.0) / a0;

    // (I - A^T): first column carries a[1:], superdiagonal carries -1
    let system = DMatrix::from_fn(m, m, |row, col| {
        let identity = if row == col { 1.0 } else { 0.0 };
        let companion_t = if col == 0 {
            -coeff(a, row + 1)
        } else if col == row + 1 {
            1.0
        } else {
            0.0
        };
        identity - companion_t
    });
    let rhs = DVector::from_fn(m, |i, _| coeff(b, i + 1) - coeff(a, i + 1) * coeff(b, 0));

    let zi = system
        .lu()
        .solve(&rhs)
        .ok_or(FilterDesignError::SingularInitialConditions)?;
    if zi.iter().any(|v| !v.is_finite()) {
        return Err(FilterDesignError::SingularInitialConditions);
    }
    Ok(zi.iter().copied().collect())
}

/// Padding length used for a signal of `samples` values
///
/// `3 * ntaps`, shortened to `samples - 1` for short recordings so the odd
/// extension never reaches past the far end.
pub fn pad_length(ntaps: usize, samples: usize) -> usize {
    (PAD_PER_TAP * ntaps).min(samples.saturating_sub(1))
}

impl BandPass {
    /// Apply the filter forwards and backwards (zero phase)
    ///
    /// # Errors
    /// `OrderInfeasible` when the signal has no more than `2 * order`
    /// samples, `SingularInitialConditions` when the steady state cannot be
    /// solved.
    pub fn filtfilt(&self, x: &Array1<f64>) -> Result<Array1<f64>, FilterDesignError> {
        let n = x.len();
        if n <= 2 * self.order() {
            return Err(FilterDesignError::OrderInfeasible {
                order: self.order(),
                samples: n,
            });
        }

        let (b, a) = (self.b(), self.a());
        let zi = lfilter_zi(b, a)?;
        let padlen = pad_length(self.ntaps(), n);

        let ext = odd_extend(x, padlen);
        let x0 = ext[0];
        let scaled: Vec<f64> = zi.iter().map(|z| z * x0).collect();
        let mut y = lfilter(b, a, &ext, &scaled);

        y.reverse();
        let y0 = y[0];
        let scaled: Vec<f64> = zi.iter().map(|z| z * y0).collect();
        let mut y = lfilter(b, a, &y, &scaled);
        y.reverse();

        let out = Array1::from(y[padlen..padlen + n].to_vec());
        if out.iter().any(|v| !v.is_finite()) {
            return Err(FilterDesignError::NonFiniteCoefficients);
        }
        Ok(out)
    }
}

/// Odd extension: `2*x[0] - x[padlen..0]`, `x`, `2*x[n-1] - x[n-2..n-2-padlen]`
fn odd_extend(x: &Array1<f64>, padlen: usize) -> Vec<f64> {
    let n = x.len();
    let mut ext = Vec::with_capacity(n + 2 * padlen);
    if n == 0 {
        return ext;
    }
    let (first, last) = (x[0], x[n - 1]);
    ext.extend((1..=padlen).rev().map(|i| 2.0 * first - x[i]));
    ext.extend(x.iter().copied());
    ext.extend((0..padlen).map(|i| 2.0 * last - x[n - 2 - i]));
    ext
}
