//! Signal extraction: ROI colour averages over a frame stream

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::raw_signal::{ChannelMode, RawSample, RawSignal};
use crate::error::PipelineError;
use crate::vision::{FaceDetector, Frame, FrameSource, Roi, RoiLocalizer};

/// Frame / localization counters of one extraction run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalizationStats {
    /// Frames read from the source
    pub frames: usize,
    /// Frames with a usable ROI
    pub localized: usize,
    /// Longest run of consecutive frames without a ROI
    pub longest_miss_streak: usize,
    current_streak: usize,
}

impl LocalizationStats {
    fn record(&mut self, hit: bool) {
        self.frames += 1;
        if hit {
            self.localized += 1;
            self.current_streak = 0;
        } else {
            self.current_streak += 1;
            self.longest_miss_streak = self.longest_miss_streak.max(self.current_streak);
        }
    }

    /// Frames without a ROI
    pub fn missed(&self) -> usize {
        self.frames - self.localized
    }
}

/// Raw signal plus the localization counters that produced it
#[derive(Debug, Clone)]
pub struct Extraction {
    pub signal: RawSignal,
    pub stats: LocalizationStats,
}

/// Averages ROI pixels of each localized frame into raw samples
#[derive(Debug, Clone, Copy)]
pub struct SignalExtractor {
    mode: ChannelMode,
    max_miss_streak: usize,
}

impl Default for SignalExtractor {
    fn default() -> Self {
        Self::new(ChannelMode::Green)
    }
}

impl SignalExtractor {
    pub fn new(mode: ChannelMode) -> Self {
        Self {
            mode,
            max_miss_streak: 30,
        }
    }

    /// Consecutive misses after which localization is logged as exhausted
    pub fn with_max_miss_streak(mut self, frames: usize) -> Self {
        self.max_miss_streak = frames;
        self
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    /// Channel averages over every ROI pixel
    ///
    /// `None` when the ROI holds no pixels of this frame.
    pub fn sample(&self, frame: &Frame, roi: &Roi) -> Option<RawSample> {
        let rgb = frame.region_mean_rgb(roi.x, roi.y, roi.width, roi.height)?;
        Some(match self.mode {
            ChannelMode::Green => RawSample::green(roi.timestamp, rgb[1]),
            ChannelMode::Rgb => RawSample::rgb(roi.timestamp, rgb),
        })
    }

    /// Drain a frame source, localizing and sampling frame by frame
    ///
    /// Frames are dropped as soon as they are sampled. Frames without a ROI
    /// contribute nothing.
    ///
    /// # Errors
    /// Capture failures, and `NonMonotonicTimestamp` when the source
    /// stamps frames out of order.
    pub fn extract<S, D>(&self, source: &mut S, localizer: &mut RoiLocalizer<D>) -> Result<Extraction, PipelineError>
    where
        S: FrameSource + ?Sized,
        D: FaceDetector,
    {
        let mut signal = RawSignal::new();
        let mut stats = LocalizationStats::default();
        let mut exhausted_logged = false;

        while let Some(frame) = source.next_frame()? {
            let sample = localizer.locate(&frame).and_then(|roi| self.sample(&frame, &roi));
            stats.record(sample.is_some());
            self.check_streak(&stats, &mut exhausted_logged);
            if let Some(sample) = sample {
                signal.push(sample)?;
            }
        }

        self.finish(source.name(), signal, stats)
    }

    /// Like [`extract`](Self::extract), localizing frames on the rayon pool
    ///
    /// Every worker owns a clone of the localizer (and so of the detector).
    /// The whole stream is buffered before localization; samples are
    /// returned in timestamp order.
    pub fn extract_parallel<S, D>(&self, source: &mut S, localizer: &RoiLocalizer<D>) -> Result<Extraction, PipelineError>
    where
        S: FrameSource + ?Sized,
        D: FaceDetector + Clone + Send + Sync,
    {
        let mut frames: Vec<Frame> = Vec::new();
        while let Some(frame) = source.next_frame()? {
            frames.push(frame);
        }
        debug!(frames = frames.len(), "buffered frames for parallel localization");

        let mut located: Vec<(f64, Option<RawSample>)> = frames
            .par_iter()
            .map_init(
                || localizer.clone(),
                |worker, frame| {
                    let sample = worker.locate(frame).and_then(|roi| self.sample(frame, &roi));
                    (frame.timestamp(), sample)
                },
            )
            .collect();
        drop(frames);
        located.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut signal = RawSignal::new();
        let mut stats = LocalizationStats::default();
        let mut exhausted_logged = false;
        for (_, sample) in located {
            stats.record(sample.is_some());
            self.check_streak(&stats, &mut exhausted_logged);
            if let Some(sample) = sample {
                signal.push(sample)?;
            }
        }

        self.finish(source.name(), signal, stats)
    }

    fn check_streak(&self, stats: &LocalizationStats, logged: &mut bool) {
        if stats.current_streak == 0 {
            *logged = false;
        } else if stats.current_streak > self.max_miss_streak && !*logged {
            warn!(
                streak = stats.current_streak,
                frame = stats.frames,
                "localization exhausted: no face in consecutive frames"
            );
            *logged = true;
        }
    }

    fn finish(&self, source: &str, signal: RawSignal, stats: LocalizationStats) -> Result<Extraction, PipelineError> {
        info!(
            source,
            frames = stats.frames,
            localized = stats.localized,
            longest_miss_streak = stats.longest_miss_streak,
            "signal extracted"
        );
        Ok(Extraction { signal, stats })
    }
}
