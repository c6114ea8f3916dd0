//! Landmark-based Forehead ROI
//!
//! Alternative to the bounding-box forehead: a band just above the
//! eyebrows, bounded horizontally by the inner brow landmarks of a
//! 68-point face shape.
//!
//! # 68-point Landmark Indices
//!
//! - Right brow: 17-21
//! - Left brow: 22-26
//!
//! The band uses 19-24 (outer-middle of the right brow to outer-middle of
//! the left brow), which stays on skin even with fringes or glasses.

use super::face_roi::clip_rect;

/// Brow landmark indices spanning the forehead (68-point layout)
pub const BROW_LANDMARKS: &[usize] = &[19, 20, 21, 22, 23, 24];

/// Default band height above the brows, in pixels
pub const DEFAULT_BAND_HEIGHT: u32 = 30;

/// Bounding box [x_min, y_min, x_max, y_max] of the selected landmarks
pub fn landmark_bounds(landmarks: &[[f32; 2]], indices: &[usize]) -> Option<[f32; 4]> {
    let mut x_min = f32::MAX;
    let mut y_min = f32::MAX;
    let mut x_max = f32::MIN;
    let mut y_max = f32::MIN;

    for &idx in indices {
        let [x, y] = *landmarks.get(idx)?;
        if !(x.is_finite() && y.is_finite()) {
            return None;
        }
        x_min = x_min.min(x);
        y_min = y_min.min(y);
        x_max = x_max.max(x);
        y_max = y_max.max(y);
    }

    Some([x_min, y_min, x_max, y_max])
}

/// Forehead band above the brows as `[x, y, w, h]`
///
/// Spans the brow landmarks horizontally and `band_height` pixels upward
/// from the highest brow point. `None` when landmarks are missing or the
/// band collapses after clipping.
pub fn brow_band(
    landmarks: &[[f32; 2]],
    band_height: u32,
    frame_width: u32,
    frame_height: u32,
) -> Option<[u32; 4]> {
    let [x_min, y_min, x_max, _] = landmark_bounds(landmarks, BROW_LANDMARKS)?;

    let x0 = x_min.max(0.0) as i64;
    let x1 = x_max as i64;
    let y0 = (y_min - band_height as f32).max(0.0) as i64;
    let y1 = y0 + band_height as i64;

    clip_rect(x0, y0, x1, y1, frame_width, frame_height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape_with_brows(points: &[(usize, [f32; 2])]) -> Vec<[f32; 2]> {
        let mut shape = vec![[0.0, 0.0]; 68];
        for &(idx, p) in points {
            shape[idx] = p;
        }
        shape
    }

    #[test]
    fn test_landmark_bounds() {
        let shape = shape_with_brows(&[
            (19, [40.0, 60.0]),
            (20, [45.0, 58.0]),
            (21, [50.0, 59.0]),
            (22, [60.0, 59.0]),
            (23, [65.0, 57.0]),
            (24, [70.0, 61.0]),
        ]);
        let bounds = landmark_bounds(&shape, BROW_LANDMARKS).unwrap();
        assert_eq!(bounds, [40.0, 57.0, 70.0, 61.0]);
    }

    #[test]
    fn test_brow_band_sits_above_brows() {
        let shape = shape_with_brows(&[
            (19, [40.0, 60.0]),
            (20, [45.0, 58.0]),
            (21, [50.0, 59.0]),
            (22, [60.0, 59.0]),
            (23, [65.0, 57.0]),
            (24, [70.0, 61.0]),
        ]);
        let band = brow_band(&shape, 30, 200, 200).unwrap();
        assert_eq!(band, [40, 27, 30, 30]);
    }

    #[test]
    fn test_brow_band_requires_landmarks() {
        let too_few = vec![[0.0, 0.0]; 20];
        assert!(brow_band(&too_few, 30, 100, 100).is_none());
    }

    #[test]
    fn test_degenerate_brows_not_found() {
        // All brow points coincide: zero width
        let shape = vec![[50.0, 50.0]; 68];
        assert!(brow_band(&shape, 30, 100, 100).is_none());
    }
}
