//! Captured audio.

use crate::common::F32ArrayExt;
use crate::error::ConfigError;

/// A mono buffer of audio samples captured at a fixed rate over a fixed duration.
///
/// Immutable once constructed. Samples move through a pipeline by value, so
/// exactly one stage holds a given sample at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    sample_rate: f32,
    duration: f32,
    data: Box<[f32]>,
}

impl Sample {
    /// Creates a sample. `sample_rate` (Hz) and `duration` (s) must be positive
    /// and finite. The data length is expected to be about `sample_rate * duration`
    /// but is not enforced.
    pub fn new(
        sample_rate: f32,
        duration: f32,
        data: impl Into<Box<[f32]>>,
    ) -> Result<Self, ConfigError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ConfigError::InvalidSample(format!(
                "sample rate {} Hz",
                sample_rate
            )));
        }
        if !(duration.is_finite() && duration > 0.0) {
            return Err(ConfigError::InvalidSample(format!(
                "duration {} s",
                duration
            )));
        }
        Ok(Sample {
            sample_rate,
            duration,
            data: data.into(),
        })
    }

    /// Creates a sample from raw data, deriving the duration from its length.
    pub fn from_data(sample_rate: f32, data: impl Into<Box<[f32]>>) -> Result<Self, ConfigError> {
        let data = data.into();
        let duration = data.len() as f32 / sample_rate;
        Sample::new(sample_rate, duration, data)
    }

    /// The sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// The capture duration in seconds.
    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The maximum absolute amplitude.
    pub fn peak_level(&self) -> f32 {
        self.data.peak_level()
    }
}
