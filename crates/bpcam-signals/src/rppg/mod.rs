//! Remote Photoplethysmography (rPPG) module
//!
//! Turns a stream of frames into a raw colour signal.
//!
//! - `SignalExtractor` - per-frame ROI averaging (green or RGB)
//! - `RawSignal` - timestamp-ordered samples with CSV persistence
//! - `PulseMethod` - Green, CHROM and POS channel combinations

mod extractor;
mod pulse;
mod raw_signal;

pub use extractor::{Extraction, LocalizationStats, SignalExtractor};
pub use pulse::PulseMethod;
pub use raw_signal::{ChannelMode, Intensity, RawSample, RawSignal, SIGNAL_CSV_HEADER};
