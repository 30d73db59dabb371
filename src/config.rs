//! Tuner configuration and wiring.

use crate::capture::CaptureSettings;
use crate::common::{is_supported_fft_size, WindowFunction};
use crate::error::ConfigError;
use crate::note::Note;
use crate::note_mapper::{NoteMapper, DEFAULT_A4_FREQUENCY};
use crate::pipeline::{Pipeline, Source, Stage, Transform};
use crate::sample::Sample;
use crate::spectral::{SpectralExtractor, DEFAULT_FRAME_SIZE, DEFAULT_TARGET_Z_SCORE};

/// Default number of items buffered by each stage.
pub const DEFAULT_BUFFER_CAPACITY: usize = 10;

/// Settings of a complete tuner pipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialization", serde(default))]
pub struct TunerConfig {
    /// Number of values analyzed per sample, a power of two in `8..=4096`.
    pub frame_size: usize,
    /// Standard deviations above the mean a spectral peak must reach.
    pub target_z_score: f32,
    pub window_function: WindowFunction,
    /// Frames with a lower RMS level in dB are skipped. `None` disables the gate.
    pub silence_threshold_db: Option<f32>,
    /// Frequency of A4 in Hz.
    pub a4_frequency: f64,
    /// Items buffered by each stage.
    pub buffer_capacity: usize,
    pub capture: CaptureSettings,
}

impl Default for TunerConfig {
    fn default() -> Self {
        TunerConfig {
            frame_size: DEFAULT_FRAME_SIZE,
            target_z_score: DEFAULT_TARGET_Z_SCORE,
            window_function: WindowFunction::default(),
            silence_threshold_db: None,
            a4_frequency: DEFAULT_A4_FREQUENCY,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            capture: CaptureSettings::default(),
        }
    }
}

impl TunerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_supported_fft_size(self.frame_size) {
            return Err(ConfigError::UnsupportedFrameSize(self.frame_size));
        }
        if !(self.target_z_score.is_finite() && self.target_z_score >= 0.0) {
            return Err(ConfigError::InvalidZScore(self.target_z_score));
        }
        if let Some(db) = self.silence_threshold_db {
            if !db.is_finite() {
                return Err(ConfigError::InvalidSilenceThreshold(db));
            }
        }
        if !(self.a4_frequency.is_finite() && self.a4_frequency > 0.0) {
            return Err(ConfigError::InvalidReferenceFrequency(self.a4_frequency));
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        self.capture.validate()?;
        if self.capture.sample_count() < self.frame_size {
            return Err(ConfigError::InvalidSample(format!(
                "{} values per capture, frame size is {}",
                self.capture.sample_count(),
                self.frame_size
            )));
        }
        Ok(())
    }

    pub fn extractor(&self) -> Result<SpectralExtractor, ConfigError> {
        SpectralExtractor::from_options(
            self.frame_size,
            self.target_z_score,
            self.window_function,
        )?
        .with_silence_threshold_db(self.silence_threshold_db)
    }

    pub fn mapper(&self) -> Result<NoteMapper, ConfigError> {
        NoteMapper::with_reference(self.a4_frequency)
    }
}

/// Wires `capture` → spectral extractor → note mapper → `sink` into a stopped
/// pipeline.
pub fn build_tuner<C, S>(
    config: &TunerConfig,
    capture: C,
    sink: S,
) -> Result<Pipeline, ConfigError>
where
    C: Transform<Input = (), Output = Sample>,
    S: Transform<Input = Note>,
{
    config.validate()?;
    let capacity = config.buffer_capacity;

    let sink = Stage::new("sink", capacity, sink, None)?;
    let mapper = Stage::new(
        "note-mapper",
        capacity,
        config.mapper()?,
        Some(sink.into_consumer()),
    )?;
    let extractor = Stage::new(
        "spectral-extractor",
        capacity,
        config.extractor()?,
        Some(mapper.into_consumer()),
    )?;
    let source = Source::new("capture", capture, Some(extractor.into_consumer()));

    Ok(Pipeline::new(source))
}
