//! Fundamental frequency estimation from the amplitude spectrum of a sample.
//!
//! The first `frame_size` values of a sample are rescaled so that the peak
//! magnitude spans half of the signed 32 bit range, windowed and transformed.
//! The first bin whose amplitude is a given number of standard deviations above
//! the mean amplitude is taken as the fundamental, and its position refined by
//! Gaussian interpolation. Taking the first rather than the strongest bin above
//! the threshold favors the fundamental over louder harmonics.

mod interpolation;
mod peaks;

pub use interpolation::gaussian_interpolation;
pub use peaks::{amplitude_threshold, select_peaks};

use tracing::trace;

use crate::common::{amplitude_spectrum, is_supported_fft_size, F32ArrayExt, WindowFunction};
use crate::error::{ConfigError, TransformError};
use crate::pipeline::Transform;
use crate::sample::Sample;

/// Default number of values analyzed per sample.
pub const DEFAULT_FRAME_SIZE: usize = 2048;

/// Default number of standard deviations a bin must exceed the mean amplitude by.
pub const DEFAULT_TARGET_Z_SCORE: f32 = 3.0;

/// Half of the range of a 32 bit integer, `(2^32 - 1) / 2`.
pub const HALF_RANGE_32: f32 = 2_147_483_647.5;

/// Scales `buffer` so that its peak magnitude equals `target_peak`.
///
/// Returns false, leaving the buffer untouched, if it is silent or holds
/// non-finite values.
pub fn rescale_to_range(buffer: &mut [f32], target_peak: f32) -> bool {
    let peak = buffer.peak_level();
    if !(peak.is_finite() && peak > 0.0) {
        return false;
    }
    let scale = target_peak / peak;
    for value in buffer.iter_mut() {
        *value *= scale;
    }
    true
}

/// Estimates the fundamental frequency of samples.
///
/// All buffers are allocated up front, so extracting does not allocate apart
/// from collecting candidate peaks.
pub struct SpectralExtractor {
    frame_size: usize,
    target_z_score: f32,
    window_function: WindowFunction,
    silence_threshold_db: Option<f32>,
    window: Box<[f32]>,
    frame: Box<[f32]>,
    amplitudes: Box<[f32]>,
}

impl SpectralExtractor {
    /// Creates an extractor analyzing 2048 values with a Hann window and
    /// a z-score of 3.
    pub fn new() -> Self {
        Self::with_valid_options(
            DEFAULT_FRAME_SIZE,
            DEFAULT_TARGET_Z_SCORE,
            WindowFunction::Hann,
        )
    }

    /// Creates an extractor with custom options.
    ///
    /// `frame_size` must be a power of two between 8 and 4096 and
    /// `target_z_score` finite and non-negative.
    pub fn from_options(
        frame_size: usize,
        target_z_score: f32,
        window_function: WindowFunction,
    ) -> Result<Self, ConfigError> {
        if !is_supported_fft_size(frame_size) {
            return Err(ConfigError::UnsupportedFrameSize(frame_size));
        }
        if !(target_z_score.is_finite() && target_z_score >= 0.0) {
            return Err(ConfigError::InvalidZScore(target_z_score));
        }
        Ok(Self::with_valid_options(
            frame_size,
            target_z_score,
            window_function,
        ))
    }

    fn with_valid_options(
        frame_size: usize,
        target_z_score: f32,
        window_function: WindowFunction,
    ) -> Self {
        SpectralExtractor {
            frame_size,
            target_z_score,
            window_function,
            silence_threshold_db: None,
            window: window_function.coefficients(frame_size),
            frame: vec![0.0; frame_size].into_boxed_slice(),
            amplitudes: vec![0.0; frame_size / 2 + 1].into_boxed_slice(),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn target_z_score(&self) -> f32 {
        self.target_z_score
    }

    pub fn window_function(&self) -> WindowFunction {
        self.window_function
    }

    /// Skips frames whose RMS level in dB (relative to 1) is below `threshold`.
    /// `None`, the default, analyzes every frame that is not all zeros.
    pub fn with_silence_threshold_db(
        mut self,
        threshold: Option<f32>,
    ) -> Result<Self, ConfigError> {
        if let Some(db) = threshold {
            if !db.is_finite() {
                return Err(ConfigError::InvalidSilenceThreshold(db));
            }
        }
        self.silence_threshold_db = threshold;
        Ok(self)
    }

    pub fn silence_threshold_db(&self) -> Option<f32> {
        self.silence_threshold_db
    }

    /// The width of a frequency bin in Hz for a given sample rate.
    pub fn bin_resolution(&self, sample_rate: f32) -> f32 {
        sample_rate / self.frame_size as f32
    }

    /// The amplitude spectrum computed by the most recent call to
    /// [`extract`](Self::extract), `frame_size / 2 + 1` bins.
    pub fn amplitudes(&self) -> &[f32] {
        &self.amplitudes
    }

    /// Estimates the fundamental frequency of `sample` in Hz.
    ///
    /// Returns `Ok(None)` if the frame is silent or no bin stands out from the
    /// rest of the spectrum, and an error if the sample is shorter than a frame.
    pub fn extract(&mut self, sample: &Sample) -> Result<Option<f32>, TransformError> {
        let data = sample.data();
        if data.len() < self.frame_size {
            return Err(TransformError::SampleTooShort {
                len: data.len(),
                frame_size: self.frame_size,
            });
        }

        let frame = &mut self.frame[..];
        frame.copy_from_slice(&data[..self.frame_size]);
        if let Some(threshold) = self.silence_threshold_db {
            let level = frame.rms_level_db();
            if level.is_nan() || level < threshold {
                trace!(level, threshold, "frame below silence threshold");
                return Ok(None);
            }
        }
        if !rescale_to_range(frame, HALF_RANGE_32) {
            trace!("silent frame");
            return Ok(None);
        }
        for (value, weight) in frame.iter_mut().zip(self.window.iter()) {
            *value *= weight;
        }

        let amplitudes = amplitude_spectrum(frame, &mut self.amplitudes)
            .ok_or_else(|| TransformError::custom("amplitude spectrum size mismatch"))?;

        let peak = match select_peaks(amplitudes, self.target_z_score).first() {
            Some(peak) => *peak,
            None => {
                trace!("no bin above threshold");
                return Ok(None);
            }
        };
        let bin = gaussian_interpolation(amplitudes, peak).unwrap_or(peak as f32);
        let frequency = bin * sample.sample_rate() / self.frame_size as f32;
        trace!(peak, bin, frequency, "fundamental");
        Ok(Some(frequency))
    }
}

impl Default for SpectralExtractor {
    fn default() -> Self {
        SpectralExtractor::new()
    }
}

impl Transform for SpectralExtractor {
    type Input = Sample;
    type Output = f32;

    fn apply(&mut self, sample: Sample) -> Result<Option<f32>, TransformError> {
        self.extract(&sample)
    }
}
