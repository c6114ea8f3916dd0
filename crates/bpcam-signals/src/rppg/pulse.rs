//! Pulse channel combination
//!
//! Turns per-frame RGB means into a single pulse proxy.
//!
//! Implements:
//! - **Green**: raw green-channel mean (strongest haemoglobin absorption)
//! - **CHROM**: Chrominance-based method (De Haan & Jeanne, 2013)
//! - **POS**: Plane-Orthogonal-to-Skin (Wang et al., 2017)

use ndarray::{s, Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::dsp::stats;

/// Sliding window length used by POS, in seconds
const POS_WINDOW_SEC: f64 = 1.6;

/// rPPG extraction method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseMethod {
    /// Simple green channel extraction
    #[default]
    Green,
    /// Chrominance-based (De Haan 2013)
    Chrom,
    /// Plane-Orthogonal-to-Skin (Wang 2017) - most motion robust
    Pos,
}

impl PulseMethod {
    /// Whether the method needs all three colour channels
    pub fn needs_rgb(self) -> bool {
        !matches!(self, PulseMethod::Green)
    }

    /// Combine RGB traces into one pulse trace
    ///
    /// # Arguments
    /// * `r`, `g`, `b` - Per-sample channel means, equal lengths
    /// * `fs` - Sampling rate (Hz), used for the POS window
    pub fn combine(self, r: &Array1<f64>, g: &Array1<f64>, b: &Array1<f64>, fs: f64) -> Array1<f64> {
        match self {
            PulseMethod::Green => g.clone(),
            PulseMethod::Chrom => chrom(r, g, b),
            PulseMethod::Pos => pos(r, g, b, fs),
        }
    }
}

/// Divide by the temporal mean; a zero-mean channel maps to zeros
fn mean_normalize(x: ArrayView1<f64>) -> Array1<f64> {
    let mean = x.mean().unwrap_or(0.0);
    if mean.abs() < f64::EPSILON {
        return Array1::zeros(x.len());
    }
    x.mapv(|v| v / mean)
}

/// CHROM method (Chrominance-based)
///
/// De Haan & Jeanne (2013): "Robust Pulse Rate from Chrominance-Based rPPG"
fn chrom(r: &Array1<f64>, g: &Array1<f64>, b: &Array1<f64>) -> Array1<f64> {
    let r = mean_normalize(r.view());
    let g = mean_normalize(g.view());
    let b = mean_normalize(b.view());

    // X = 3R - 2G
    let x = &r * 3.0 - &g * 2.0;
    // Y = 1.5R + G - 1.5B
    let y = &r * 1.5 + &g - &b * 1.5;

    let std_y = stats::std(&y);
    let alpha = if std_y == 0.0 { 0.0 } else { stats::std(&x) / std_y };

    x - y * alpha
}

/// POS method (Plane-Orthogonal-to-Skin)
///
/// Wang et al. (2017): "Algorithmic Principles of Remote PPG"
///
/// Each window of ~1.6 s is temporally normalized, projected onto the plane
/// orthogonal to the skin tone, alpha-tuned and overlap-added.
fn pos(r: &Array1<f64>, g: &Array1<f64>, b: &Array1<f64>, fs: f64) -> Array1<f64> {
    let n = r.len();
    let mut h = Array1::<f64>::zeros(n);
    if n == 0 {
        return h;
    }

    let l = ((POS_WINDOW_SEC * fs).ceil() as usize).clamp(2, n);

    for end in (l - 1)..n {
        let start = end + 1 - l;
        let rn = mean_normalize(r.slice(s![start..=end]));
        let gn = mean_normalize(g.slice(s![start..=end]));
        let bn = mean_normalize(b.slice(s![start..=end]));

        // Projection P = [[0, 1, -1], [-2, 1, 1]]
        let s1 = &gn - &bn;
        let s2 = &gn + &bn - &rn * 2.0;

        let std_s2 = stats::std(&s2);
        let alpha = if std_s2 == 0.0 { 0.0 } else { stats::std(&s1) / std_s2 };
        let window = &s1 + &(s2 * alpha);
        let mean = window.mean().unwrap_or(0.0);

        let mut dst = h.slice_mut(s![start..=end]);
        dst += &window.mapv(|v| v - mean);
    }

    h
}
