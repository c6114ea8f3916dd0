//! Face Detection Trait and Forehead ROI Localization
//!
//! Provides the pluggable face detection interface and turns the first
//! detection of a frame into a forehead rectangle for colour sampling.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::image_ops::Frame;
use super::landmark_roi::brow_band;

/// Face detection result
#[derive(Debug, Clone, PartialEq)]
pub struct FaceDetection {
    /// Bounding box [x, y, width, height] in pixels
    pub bbox: [f32; 4],
    /// Optional 68-point landmarks [(x, y), ...]
    pub landmarks: Option<Vec<[f32; 2]>>,
    /// Detector score (scale is detector-defined)
    pub confidence: f32,
}

impl FaceDetection {
    pub fn from_bbox(bbox: [f32; 4], confidence: f32) -> Self {
        Self {
            bbox,
            landmarks: None,
            confidence,
        }
    }
}

/// Pluggable face detection trait
///
/// Implementations keep their model state between calls; weights are
/// loaded once when the detector is built, never per frame.
pub trait FaceDetector {
    /// Detect faces in a frame, in detector order
    fn detect(&mut self, frame: &Frame) -> Vec<FaceDetection>;
}

impl<D: FaceDetector + ?Sized> FaceDetector for Box<D> {
    fn detect(&mut self, frame: &Frame) -> Vec<FaceDetection> {
        (**self).detect(frame)
    }
}

/// Detector fed with detections computed elsewhere
///
/// Use this when face detection runs in the client application (a mobile
/// face tracker, a browser landmark model) and only the ROI and signal
/// stages run here. Every frame gets the currently injected detections.
#[derive(Debug, Clone, Default)]
pub struct ExternalFaceDetector {
    detections: Vec<FaceDetection>,
}

impl ExternalFaceDetector {
    pub fn new(detections: Vec<FaceDetection>) -> Self {
        Self { detections }
    }

    /// Replace the detections reported for subsequent frames
    pub fn inject(&mut self, detections: Vec<FaceDetection>) {
        self.detections = detections;
    }
}

impl FaceDetector for ExternalFaceDetector {
    fn detect(&mut self, _frame: &Frame) -> Vec<FaceDetection> {
        self.detections.clone()
    }
}

/// Rectangular region of interest inside one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Timestamp of the frame the region was found in (seconds)
    pub timestamp: f64,
}

impl Roi {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// How the forehead is derived from a face detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoiStrategy {
    /// Fractions of the face bounding box
    ForeheadBox {
        /// Left edge as a fraction of the box width
        x_start: f32,
        /// Right edge as a fraction of the box width
        x_end: f32,
        /// Height as a fraction of the box height, from the top edge
        height: f32,
    },
    /// Band above the eyebrow landmarks; falls back to the default box
    /// when the detector supplies no landmarks
    BrowLandmarks {
        /// Band height in pixels
        band_height: u32,
    },
}

/// Middle 50% horizontally, top 20% vertically
const DEFAULT_FOREHEAD: (f32, f32, f32) = (0.25, 0.75, 0.2);

impl Default for RoiStrategy {
    fn default() -> Self {
        let (x_start, x_end, height) = DEFAULT_FOREHEAD;
        Self::ForeheadBox {
            x_start,
            x_end,
            height,
        }
    }
}

/// Forehead rectangle from a face bounding box
///
/// Offsets are truncated to whole pixels and the result is clipped to the
/// frame. Returns `None` for a zero-area rectangle.
pub fn forehead_from_bbox(
    bbox: [f32; 4],
    x_start: f32,
    x_end: f32,
    height_frac: f32,
    frame_width: u32,
    frame_height: u32,
) -> Option<[u32; 4]> {
    let [bx, by, bw, bh] = bbox;
    if !(bx.is_finite() && by.is_finite() && bw.is_finite() && bh.is_finite()) || bw <= 0.0 || bh <= 0.0 {
        return None;
    }

    let bx = bx.floor() as i64;
    let by = by.floor() as i64;
    let x0 = bx + (x_start * bw) as i64;
    let x1 = bx + (x_end * bw) as i64;
    let y0 = by;
    let y1 = by + (height_frac * bh) as i64;

    clip_rect(x0, y0, x1, y1, frame_width, frame_height)
}

/// Clip `[x0, x1) x [y0, y1)` to the frame, returning `[x, y, w, h]`
pub(crate) fn clip_rect(
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    frame_width: u32,
    frame_height: u32,
) -> Option<[u32; 4]> {
    let x0 = x0.clamp(0, frame_width as i64);
    let x1 = x1.clamp(0, frame_width as i64);
    let y0 = y0.clamp(0, frame_height as i64);
    let y1 = y1.clamp(0, frame_height as i64);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some([x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32])
}

/// ROI localizer
///
/// Runs the face detector on a frame, takes the first detection (detector
/// order, not re-ranked by size or score) and derives the forehead region.
#[derive(Debug, Clone)]
pub struct RoiLocalizer<D> {
    detector: D,
    strategy: RoiStrategy,
    min_confidence: Option<f32>,
}

impl<D: FaceDetector> RoiLocalizer<D> {
    pub fn new(detector: D) -> Self {
        Self::with_strategy(detector, RoiStrategy::default())
    }

    pub fn with_strategy(detector: D, strategy: RoiStrategy) -> Self {
        Self {
            detector,
            strategy,
            min_confidence: None,
        }
    }

    /// Ignore detections scoring below `threshold`
    pub fn with_min_confidence(mut self, threshold: f32) -> Self {
        self.min_confidence = Some(threshold);
        self
    }

    pub fn strategy(&self) -> RoiStrategy {
        self.strategy
    }

    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Locate the forehead in one frame
    ///
    /// `None` is an expected per-frame outcome (no face, or a degenerate
    /// region at the frame edge), never an error.
    pub fn locate(&mut self, frame: &Frame) -> Option<Roi> {
        let detections = self.detector.detect(frame);
        let min_confidence = self.min_confidence;
        let face = detections
            .into_iter()
            .find(|d| min_confidence.map_or(true, |t| d.confidence >= t))?;

        let rect = match self.strategy {
            RoiStrategy::ForeheadBox {
                x_start,
                x_end,
                height,
            } => forehead_from_bbox(face.bbox, x_start, x_end, height, frame.width(), frame.height()),
            RoiStrategy::BrowLandmarks { band_height } => match face.landmarks.as_deref() {
                Some(landmarks) => brow_band(landmarks, band_height, frame.width(), frame.height()),
                None => {
                    debug!("detection carries no landmarks, using forehead box");
                    let (x_start, x_end, height) = DEFAULT_FOREHEAD;
                    forehead_from_bbox(face.bbox, x_start, x_end, height, frame.width(), frame.height())
                }
            },
        }?;

        let [x, y, width, height] = rect;
        Some(Roi {
            x,
            y,
            width,
            height,
            timestamp: frame.timestamp(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::filled(100, 100, [100, 150, 200], 1.5)
    }

    #[test]
    fn test_no_face_is_not_found() {
        let mut localizer = RoiLocalizer::new(ExternalFaceDetector::default());
        assert!(localizer.locate(&frame()).is_none());
    }

    #[test]
    fn test_forehead_box_geometry() {
        let det = FaceDetection::from_bbox([10.0, 20.0, 40.0, 50.0], 1.0);
        let mut localizer = RoiLocalizer::new(ExternalFaceDetector::new(vec![det]));

        let roi = localizer.locate(&frame()).unwrap();
        assert_eq!((roi.x, roi.y, roi.width, roi.height), (20, 20, 20, 10));
        assert!((roi.timestamp - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_first_detection_wins() {
        let small = FaceDetection::from_bbox([0.0, 0.0, 20.0, 20.0], 0.1);
        let large = FaceDetection::from_bbox([10.0, 10.0, 80.0, 80.0], 0.9);
        let mut localizer = RoiLocalizer::new(ExternalFaceDetector::new(vec![small, large]));

        let roi = localizer.locate(&frame()).unwrap();
        assert_eq!((roi.x, roi.y, roi.width, roi.height), (5, 0, 10, 4));
    }

    #[test]
    fn test_min_confidence_skips_weak_detections() {
        let weak = FaceDetection::from_bbox([0.0, 0.0, 20.0, 20.0], 0.1);
        let strong = FaceDetection::from_bbox([10.0, 10.0, 80.0, 80.0], 0.9);
        let mut localizer =
            RoiLocalizer::new(ExternalFaceDetector::new(vec![weak, strong])).with_min_confidence(0.5);

        let roi = localizer.locate(&frame()).unwrap();
        assert_eq!((roi.x, roi.y), (30, 10));
    }

    #[test]
    fn test_zero_area_is_not_found() {
        // 4 px tall face: 20% truncates to zero rows
        let det = FaceDetection::from_bbox([10.0, 10.0, 40.0, 4.0], 1.0);
        let mut localizer = RoiLocalizer::new(ExternalFaceDetector::new(vec![det]));
        assert!(localizer.locate(&frame()).is_none());
    }

    #[test]
    fn test_face_outside_frame_is_not_found() {
        let det = FaceDetection::from_bbox([150.0, 150.0, 40.0, 40.0], 1.0);
        let mut localizer = RoiLocalizer::new(ExternalFaceDetector::new(vec![det]));
        assert!(localizer.locate(&frame()).is_none());
    }

    #[test]
    fn test_forehead_clipped_at_frame_edge() {
        let rect = forehead_from_bbox([80.0, 90.0, 40.0, 60.0], 0.25, 0.75, 0.2, 100, 100).unwrap();
        assert_eq!(rect, [90, 90, 10, 10]);
    }

    #[test]
    fn test_brow_strategy_without_landmarks_uses_box() {
        let det = FaceDetection::from_bbox([10.0, 20.0, 40.0, 50.0], 1.0);
        let mut localizer = RoiLocalizer::with_strategy(
            ExternalFaceDetector::new(vec![det]),
            RoiStrategy::BrowLandmarks { band_height: 30 },
        );
        let roi = localizer.locate(&frame()).unwrap();
        assert_eq!((roi.x, roi.y, roi.width, roi.height), (20, 20, 20, 10));
    }

    #[test]
    fn test_brow_strategy_uses_landmarks_when_present() {
        let mut shape = vec![[0.0f32, 0.0]; 68];
        let brows = [[30.0, 50.0], [35.0, 48.0], [40.0, 50.0], [55.0, 50.0], [60.0, 48.0], [65.0, 50.0]];
        for (idx, point) in (19..=24).zip(brows) {
            shape[idx] = point;
        }
        let det = FaceDetection {
            bbox: [10.0, 20.0, 40.0, 50.0],
            landmarks: Some(shape),
            confidence: 1.0,
        };
        let mut localizer = RoiLocalizer::with_strategy(
            ExternalFaceDetector::new(vec![det]),
            RoiStrategy::BrowLandmarks { band_height: 20 },
        );

        // x spans the brows, y reaches 20 px above the highest brow point
        let roi = localizer.locate(&frame()).unwrap();
        assert_eq!((roi.x, roi.y, roi.width, roi.height), (30, 28, 35, 20));
    }
}
