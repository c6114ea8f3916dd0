//! Frame sources
//!
//! A frame source yields frames in capture order until end-of-stream and
//! owns whatever device or file handle backs it. Handles are released when
//! the source is dropped, so every exit path (including errors and early
//! stops) gives them back.

use std::collections::VecDeque;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use super::image_ops::Frame;
use crate::error::CaptureError;

/// Sequential, single-pass supplier of frames
pub trait FrameSource {
    /// Human-readable name for logs and errors
    fn name(&self) -> &str;

    /// Next frame, or `Ok(None)` at end-of-stream
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        (**self).next_frame()
    }
}

/// Shared flag asking a recording to stop early
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Block on one line from `reader` and stop once it arrives
    ///
    /// End of input or a read error leaves the signal untouched, so a
    /// closed stdin does not cut a recording short. Returns whether the
    /// signal was raised.
    pub fn stop_on_line<R: BufRead>(&self, mut reader: R) -> bool {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(n) if n > 0 => {
                self.stop();
                true
            }
            _ => false,
        }
    }
}

/// Frames already held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryFrameSource {
    frames: VecDeque<Frame>,
}

impl MemoryFrameSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemoryFrameSource {
    fn name(&self) -> &str {
        "memory"
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        Ok(self.frames.pop_front())
    }
}

/// Bounded recording over another source
///
/// Ends the stream once `max_duration` seconds have elapsed since the
/// first frame, or as soon as the [`StopSignal`] is raised. The inner
/// source is dropped (and its device released) together with this one.
pub struct RecordingSource<S> {
    inner: S,
    max_duration: Option<f64>,
    stop: StopSignal,
    start: Option<f64>,
    finished: bool,
}

impl<S: FrameSource> RecordingSource<S> {
    pub fn new(inner: S, max_duration: Option<f64>, stop: StopSignal) -> Self {
        Self {
            inner,
            max_duration,
            stop,
            start: None,
            finished: false,
        }
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }
}

impl<S: FrameSource> FrameSource for RecordingSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.finished {
            return Ok(None);
        }
        if self.stop.is_stopped() {
            info!(source = self.inner.name(), "recording stopped early");
            self.finished = true;
            return Ok(None);
        }

        let Some(frame) = self.inner.next_frame()? else {
            self.finished = true;
            return Ok(None);
        };

        let start = *self.start.get_or_insert(frame.timestamp());
        if let Some(limit) = self.max_duration {
            if frame.timestamp() - start >= limit {
                debug!(elapsed = frame.timestamp() - start, "recording duration reached");
                self.finished = true;
                return Ok(None);
            }
        }
        Ok(Some(frame))
    }
}

#[cfg(feature = "image-processing")]
pub use image_sequence::ImageSequenceSource;

#[cfg(feature = "image-processing")]
mod image_sequence {
    use std::path::{Path, PathBuf};

    use tracing::info;

    use super::FrameSource;
    use crate::error::CaptureError;
    use crate::vision::image_ops::Frame;

    const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

    /// Directory of still frames, ordered by file name
    ///
    /// Frame `i` is stamped `i / fps` seconds.
    #[derive(Debug)]
    pub struct ImageSequenceSource {
        name: String,
        paths: Vec<PathBuf>,
        fps: f64,
        index: usize,
    }

    impl ImageSequenceSource {
        pub fn open<P: AsRef<Path>>(dir: P, fps: f64) -> Result<Self, CaptureError> {
            let dir = dir.as_ref();
            let name = dir.display().to_string();
            if !(fps.is_finite() && fps > 0.0) {
                return Err(CaptureError::Open {
                    source_name: name,
                    reason: format!("frame rate must be positive, got {}", fps),
                });
            }

            let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
                .map_err(|e| CaptureError::Open {
                    source_name: name.clone(),
                    reason: e.to_string(),
                })?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| {
                    p.extension()
                        .and_then(|ext| ext.to_str())
                        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                        .unwrap_or(false)
                })
                .collect();
            paths.sort();

            if paths.is_empty() {
                return Err(CaptureError::Open {
                    source_name: name,
                    reason: "no image frames found".to_string(),
                });
            }

            info!(source = %name, frames = paths.len(), fps, "image sequence opened");
            Ok(Self {
                name,
                paths,
                fps,
                index: 0,
            })
        }

        pub fn len(&self) -> usize {
            self.paths.len()
        }

        pub fn is_empty(&self) -> bool {
            self.paths.is_empty()
        }
    }

    impl FrameSource for ImageSequenceSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
            let Some(path) = self.paths.get(self.index) else {
                return Ok(None);
            };
            let img = image::open(path).map_err(|e| CaptureError::Read {
                source_name: self.name.clone(),
                index: self.index,
                reason: e.to_string(),
            })?;
            let timestamp = self.index as f64 / self.fps;
            self.index += 1;
            Ok(Some(Frame::from_dynamic_image(&img, timestamp)))
        }
    }
}
