//! Capture parameters and a synthetic capture source.

use std::thread;
use std::time::Duration;

use crate::error::{ConfigError, TransformError};
use crate::pipeline::Transform;
use crate::sample::Sample;

/// Default highest frequency of interest in Hz.
pub const DEFAULT_TARGET_FREQUENCY_MAX: f32 = 2500.0;

/// Default capture duration in seconds.
pub const DEFAULT_SAMPLE_DURATION: f32 = 0.5;

/// How audio is captured.
///
/// The sample rate is twice the highest frequency of interest, the lowest rate
/// that represents that frequency without aliasing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialization", serde(default))]
pub struct CaptureSettings {
    /// Highest frequency of interest in Hz.
    pub target_frequency_max: f32,
    /// Duration of each capture in seconds.
    pub sample_duration: f32,
}

impl CaptureSettings {
    pub fn new(target_frequency_max: f32, sample_duration: f32) -> Result<Self, ConfigError> {
        let settings = CaptureSettings {
            target_frequency_max,
            sample_duration,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.target_frequency_max.is_finite() && self.target_frequency_max > 0.0) {
            return Err(ConfigError::InvalidSample(format!(
                "target frequency {} Hz",
                self.target_frequency_max
            )));
        }
        if !(self.sample_duration.is_finite() && self.sample_duration > 0.0) {
            return Err(ConfigError::InvalidSample(format!(
                "duration {} s",
                self.sample_duration
            )));
        }
        Ok(())
    }

    /// The capture sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        2.0 * self.target_frequency_max
    }

    /// The number of values in each capture.
    pub fn sample_count(&self) -> usize {
        (self.sample_rate() * self.sample_duration).round() as usize
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        CaptureSettings {
            target_frequency_max: DEFAULT_TARGET_FREQUENCY_MAX,
            sample_duration: DEFAULT_SAMPLE_DURATION,
        }
    }
}

/// Captures a sine tone instead of a microphone.
///
/// Consecutive captures continue the phase of the previous one, as if cut from
/// a single continuous recording. With pacing enabled, each capture takes as
/// long as its duration, like a real recording would.
pub struct ToneGenerator {
    settings: CaptureSettings,
    frequency: f64,
    amplitude: f32,
    phase: f64,
    paced: bool,
    remaining: Option<usize>,
}

impl ToneGenerator {
    /// Creates a generator for a tone of `frequency` Hz at amplitude 0.5.
    pub fn new(settings: CaptureSettings, frequency: f32) -> Self {
        ToneGenerator {
            settings,
            frequency: f64::from(frequency),
            amplitude: 0.5,
            phase: 0.0,
            paced: false,
            remaining: None,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Sleeps for the sample duration on every capture.
    pub fn with_pacing(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    /// Reports [`TransformError::Exhausted`] after `captures` samples.
    pub fn with_capture_limit(mut self, captures: usize) -> Self {
        self.remaining = Some(captures);
        self
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn frequency(&self) -> f32 {
        self.frequency as f32
    }

    /// Changes the tone, keeping the phase continuous.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = f64::from(frequency);
    }

    pub fn capture(&mut self) -> Result<Sample, TransformError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(TransformError::Exhausted);
            }
            *remaining -= 1;
        }

        let sample_rate = self.settings.sample_rate();
        let increment = core::f64::consts::TAU * self.frequency / f64::from(sample_rate);
        let data: Vec<f32> = (0..self.settings.sample_count())
            .map(|_| {
                let value = self.amplitude * self.phase.sin() as f32;
                self.phase = (self.phase + increment) % core::f64::consts::TAU;
                value
            })
            .collect();

        if self.paced {
            thread::sleep(Duration::from_secs_f32(self.settings.sample_duration));
        }

        Sample::new(sample_rate, self.settings.sample_duration, data)
            .map_err(|err| TransformError::custom(err.to_string()))
    }
}

impl Transform for ToneGenerator {
    type Input = ();
    type Output = Sample;

    fn apply(&mut self, _: ()) -> Result<Option<Sample>, TransformError> {
        self.capture().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_default_settings() {
        let settings = CaptureSettings::default();
        assert_eq!(settings.sample_rate(), 5000.0);
        assert_eq!(settings.sample_count(), 2500);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(CaptureSettings::new(0.0, 1.0).is_err());
        assert!(CaptureSettings::new(3000.0, -1.0).is_err());
        assert!(CaptureSettings::new(f32::INFINITY, 1.0).is_err());
        assert_eq!(
            CaptureSettings::new(3000.0, 1.0).unwrap().sample_count(),
            6000
        );
    }

    #[test]
    fn test_tone_samples() {
        let settings = CaptureSettings::new(2000.0, 0.01).unwrap();
        let mut generator = ToneGenerator::new(settings, 1000.0).with_amplitude(1.0);
        let sample = generator.capture().unwrap();
        assert_eq!(sample.sample_rate(), 4000.0);
        assert_eq!(sample.len(), 40);
        // A quarter period per value.
        assert_abs_diff_eq!(sample.data()[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(sample.data()[1], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(sample.data()[3], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_phase_continues_across_captures() {
        let settings = CaptureSettings::new(2000.0, 0.01).unwrap();
        let mut generator = ToneGenerator::new(settings, 110.0);
        let first = generator.capture().unwrap();
        let second = generator.capture().unwrap();

        let mut continuous = ToneGenerator::new(CaptureSettings::new(2000.0, 0.02).unwrap(), 110.0);
        let whole = continuous.capture().unwrap();
        for (i, value) in first.data().iter().chain(second.data()).enumerate() {
            assert_abs_diff_eq!(*value, whole.data()[i], epsilon = 1e-5);
        }
    }

    #[test]
    fn test_capture_limit() {
        let mut generator =
            ToneGenerator::new(CaptureSettings::default(), 440.0).with_capture_limit(2);
        assert!(generator.apply(()).unwrap().is_some());
        assert!(generator.apply(()).unwrap().is_some());
        assert!(matches!(generator.apply(()), Err(TransformError::Exhausted)));
    }
}
