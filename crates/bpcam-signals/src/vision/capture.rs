//! Video file and live camera capture through OpenCV
//!
//! Only built with the `opencv` feature. File frames are stamped
//! `frame_index / container_fps`; camera frames with the elapsed time since
//! the device was opened.

use std::path::Path;
use std::time::Instant;

use opencv::{
    core::Mat,
    prelude::*,
    videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS},
};
use tracing::{info, warn};

use super::frame_source::FrameSource;
use super::image_ops::Frame;
use crate::error::CaptureError;

enum Clock {
    /// Container frame rate
    Container(f64),
    /// Wall clock since open
    Live(Instant),
}

/// OpenCV-backed frame source
pub struct VideoCaptureSource {
    name: String,
    capture: VideoCapture,
    clock: Clock,
    index: usize,
    released: bool,
}

impl VideoCaptureSource {
    /// Open a video file
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let name = path.as_ref().display().to_string();
        let capture = VideoCapture::from_file(&name, CAP_ANY)?;
        Self::check_opened(&capture, &name)?;

        let fps = capture.get(CAP_PROP_FPS)?;
        if !(fps.is_finite() && fps > 0.0) {
            return Err(CaptureError::Open {
                source_name: name,
                reason: format!("container reports invalid frame rate {}", fps),
            });
        }

        info!(source = %name, fps, "video file opened");
        Ok(Self {
            name,
            capture,
            clock: Clock::Container(fps),
            index: 0,
            released: false,
        })
    }

    /// Open a live camera by device index
    pub fn open_camera(index: i32) -> Result<Self, CaptureError> {
        let name = format!("camera:{}", index);
        let capture = VideoCapture::new(index, CAP_ANY)?;
        Self::check_opened(&capture, &name)?;

        info!(source = %name, "camera opened");
        Ok(Self {
            name,
            capture,
            clock: Clock::Live(Instant::now()),
            index: 0,
            released: false,
        })
    }

    fn check_opened(capture: &VideoCapture, name: &str) -> Result<(), CaptureError> {
        if !capture.is_opened()? {
            return Err(CaptureError::Open {
                source_name: name.to_string(),
                reason: "device or file could not be opened".to_string(),
            });
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.capture.release() {
            warn!(source = %self.name, "failed to release capture: {}", e);
        } else {
            info!(source = %self.name, frames = self.index, "capture released");
        }
    }
}

impl FrameSource for VideoCaptureSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.released {
            return Ok(None);
        }

        let mut mat = Mat::default();
        // A failed read is end-of-stream, not an error
        let grabbed = match self.capture.read(&mut mat) {
            Ok(grabbed) => grabbed,
            Err(e) => {
                warn!(source = %self.name, "capture read failed, ending stream: {}", e.message);
                false
            }
        };
        if !grabbed || mat.rows() <= 0 || mat.cols() <= 0 {
            self.release();
            return Ok(None);
        }

        let timestamp = match &self.clock {
            Clock::Container(fps) => self.index as f64 / fps,
            Clock::Live(start) => start.elapsed().as_secs_f64(),
        };

        let width = mat.cols() as u32;
        let height = mat.rows() as u32;
        let frame = Frame::from_bgr(mat.data_bytes()?, width, height, timestamp)?;
        self.index += 1;
        Ok(Some(frame))
    }
}

impl Drop for VideoCaptureSource {
    fn drop(&mut self) {
        self.release();
    }
}
