//! Local-maximum peak detection with a minimum spacing constraint

/// Indices of local maxima, ascending
///
/// A peak is a sample strictly greater than its left neighbour and greater
/// than the first differing sample to its right; flat tops report their
/// midpoint (rounded down). Endpoints are never peaks.
pub fn local_maxima(x: &[f64]) -> Vec<usize> {
    let n = x.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let last = n - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            // Walk across a plateau
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Peaks at least `distance` samples apart, highest kept first
///
/// Candidates are visited from tallest to shortest; each surviving peak
/// removes every neighbour closer than `distance`. Ties in height resolve
/// towards the later index.
pub fn find_peaks(x: &[f64], distance: usize) -> Vec<usize> {
    let peaks = local_maxima(x);
    if distance <= 1 || peaks.len() < 2 {
        return peaks;
    }

    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| x[peaks[a]].total_cmp(&x[peaks[b]]));

    let mut keep = vec![true; peaks.len()];
    for &idx in order.iter().rev() {
        if !keep[idx] {
            continue;
        }
        let mut j = idx;
        while j > 0 && peaks[idx] - peaks[j - 1] < distance {
            keep[j - 1] = false;
            j -= 1;
        }
        let mut j = idx + 1;
        while j < peaks.len() && peaks[j] - peaks[idx] < distance {
            keep[j] = false;
            j += 1;
        }
    }

    peaks
        .into_iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p))
        .collect()
}

/// Minimum peak spacing in samples for a given rate and spacing in seconds
///
/// `floor(fs * min_spacing_sec)`, never below 1.
pub fn min_distance(fs: f64, min_spacing_sec: f64) -> usize {
    let d = (fs * min_spacing_sec).floor();
    if d.is_finite() && d >= 1.0 {
        d as usize
    } else {
        1
    }
}
