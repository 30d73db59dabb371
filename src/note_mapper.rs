//! Frequency to note mapping.
//!
//! The distance in semitones between a frequency `f` and a reference `r` is
//! `12 * log2(f / r)` in 12-tone equal temperament. That distance is split into
//! whole octaves relative to A4, a semitone count above A and a fractional delta,
//! and finally shifted to scientific pitch octave numbering where octaves change at C.

use crate::error::{ConfigError, TransformError};
use crate::note::{Note, SEMITONES_PER_OCTAVE};
use crate::pipeline::Transform;

/// The default frequency of A4 in Hz.
pub const DEFAULT_A4_FREQUENCY: f64 = 440.0;

const INITIAL_OCTAVE: i32 = 4;

/// Returns the signed number of semitones from `reference_freq` to `freq`.
pub fn get_semitone_diff(freq: f64, reference_freq: f64) -> f64 {
    f64::from(SEMITONES_PER_OCTAVE) * (freq / reference_freq).log2()
}

/// Maps a frequency to the nearest note, given the frequency of A4.
///
/// Returns `None` if `freq` is not a positive, finite number.
pub fn map_frequency(freq: f64, a4_frequency: f64) -> Option<Note> {
    if !(freq.is_finite() && freq > 0.0) {
        return None;
    }

    let semitones_per_octave = f64::from(SEMITONES_PER_OCTAVE);
    let semitone_offset = get_semitone_diff(freq, a4_frequency);

    // Whole octaves from A4, truncated towards zero.
    let octave_shift = (semitone_offset / semitones_per_octave).trunc();
    let mut octave = INITIAL_OCTAVE + octave_shift as i32;
    let mut remainder = semitone_offset - semitones_per_octave * octave_shift;
    if remainder < 0.0 {
        octave -= 1;
        remainder += semitones_per_octave;
    }

    // Round to the nearest semitone. delta ends up in (-0.5, 0.5].
    let mut delta = remainder - remainder.trunc();
    let mut semitone = remainder.trunc() as u8;
    if delta > 0.5 {
        delta -= 1.0;
        semitone += 1;
    }

    // The octave number changes at C, three semitones above A.
    if semitone >= 3 {
        octave += 1;
    }

    // Rounding up from G# lands on A. Wrap without touching the octave.
    if semitone == 12 {
        semitone = 0;
    }

    Some(Note::new(semitone, octave, delta))
}

/// A transform mapping detected frequencies to notes.
pub struct NoteMapper {
    a4_frequency: f64,
}

impl NoteMapper {
    /// Creates a mapper with A4 at 440 Hz.
    pub fn new() -> Self {
        NoteMapper {
            a4_frequency: DEFAULT_A4_FREQUENCY,
        }
    }

    /// Creates a mapper with a custom A4 frequency in Hz.
    pub fn with_reference(a4_frequency: f64) -> Result<Self, ConfigError> {
        validate_reference(a4_frequency)?;
        Ok(NoteMapper { a4_frequency })
    }

    /// The frequency of A4 in Hz.
    pub fn reference(&self) -> f64 {
        self.a4_frequency
    }

    /// Sets the frequency of A4 in Hz.
    pub fn set_reference(&mut self, a4_frequency: f64) -> Result<(), ConfigError> {
        validate_reference(a4_frequency)?;
        self.a4_frequency = a4_frequency;
        Ok(())
    }

    pub fn map(&self, freq: f64) -> Option<Note> {
        map_frequency(freq, self.a4_frequency)
    }
}

impl Default for NoteMapper {
    fn default() -> Self {
        NoteMapper::new()
    }
}

impl Transform for NoteMapper {
    type Input = f32;
    type Output = Note;

    fn apply(&mut self, freq: f32) -> Result<Option<Note>, TransformError> {
        Ok(self.map(f64::from(freq)))
    }
}

fn validate_reference(a4_frequency: f64) -> Result<(), ConfigError> {
    if a4_frequency.is_finite() && a4_frequency > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidReferenceFrequency(a4_frequency))
    }
}
