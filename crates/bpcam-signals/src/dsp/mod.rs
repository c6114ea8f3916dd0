//! DSP (Digital Signal Processing) module
//!
//! Turns a raw colour signal into a band-limited pulse signal and provides
//! the spectral and statistical primitives used by feature extraction.
//!
//! - `SignalConditioner` - detrend, zero-phase band-pass, peak detection
//! - `BandPass` - Butterworth design and forward-backward filtering
//! - `welch` - averaged-periodogram power spectral density
//! - `stats` - moments and detrending

mod butterworth;
mod conditioner;
mod filtfilt;
pub mod peaks;
mod spectrum;
pub mod stats;

pub use butterworth::BandPass;
pub use conditioner::{sampling_rate, ConditionedSignal, ConditionerConfig, Peak, SignalConditioner};
pub use filtfilt::{lfilter, lfilter_zi, pad_length};
pub use spectrum::{hann_periodic, welch, Psd, WelchConfig};
pub use stats::DetrendMode;
