//! Musical notes in 12-tone equal temperament.

use core::fmt;

/// Tolerance used when comparing the `delta` of two notes.
pub const DELTA_EQ_TOLERANCE: f64 = 0.001;

/// Number of semitones in an octave.
pub const SEMITONES_PER_OCTAVE: i32 = 12;

const NOTE_NAMES: [&str; 12] = [
    "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
];

/// A note given as a semitone count above A, a scientific pitch octave
/// number and the fractional deviation from the nearest semitone.
///
/// The octave number changes at C, so
/// * A4 is `Note { semitone: 0, octave: 4 }`
/// * C5 is `Note { semitone: 3, octave: 5 }`
/// * G#4 is `Note { semitone: 11, octave: 4 }`
///
/// Two notes are equal if their semitones and octaves match and their deltas
/// differ by at most [`DELTA_EQ_TOLERANCE`].
#[derive(Debug, Clone, Copy)]
pub struct Note {
    semitone: u8,
    octave: i32,
    delta: f64,
}

impl Note {
    /// Creates a note. `semitone` is wrapped into `0..12`.
    pub fn new(semitone: u8, octave: i32, delta: f64) -> Self {
        Note {
            semitone: semitone % SEMITONES_PER_OCTAVE as u8,
            octave,
            delta,
        }
    }

    /// Semitones above A, in `0..12`.
    pub fn semitone(&self) -> u8 {
        self.semitone
    }

    /// Scientific pitch octave number.
    pub fn octave(&self) -> i32 {
        self.octave
    }

    /// Deviation from the nearest semitone, in `(-0.5, 0.5]` for mapped notes.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Deviation from the nearest semitone in cents.
    pub fn cents(&self) -> f64 {
        100.0 * self.delta
    }

    /// The note name, e.g `"C#"`.
    pub fn name(&self) -> &'static str {
        NOTE_NAMES[usize::from(self.semitone)]
    }

    /// Signed number of semitones from A4, including `delta`.
    pub fn semitones_from_a4(&self) -> f64 {
        // Octave numbers change at C, three semitones above A.
        let a_octave = if self.semitone >= 3 {
            self.octave - 1
        } else {
            self.octave
        };
        let semitones = SEMITONES_PER_OCTAVE * (a_octave - 4) + i32::from(self.semitone);
        f64::from(semitones) + self.delta
    }

    /// The frequency of this note in Hz, given the frequency of A4.
    pub fn frequency(&self, a4_frequency: f64) -> f64 {
        a4_frequency * (self.semitones_from_a4() / f64::from(SEMITONES_PER_OCTAVE)).exp2()
    }

    /// The [MIDI note number](https://newt.phys.unsw.edu.au/jw/notes.html),
    /// with a fractional part. A4 is 69.
    pub fn midi_note_number(&self) -> f64 {
        69.0 + self.semitones_from_a4()
    }
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.semitone == other.semitone
            && self.octave == other.octave
            && (self.delta - other.delta).abs() <= DELTA_EQ_TOLERANCE
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cents = self.cents().round() as i32;
        let sign = if cents < 0 { "-" } else { "+" };
        write!(
            f,
            "{}{} {}{:02} cents",
            self.name(),
            self.octave,
            sign,
            cents.abs()
        )
    }
}
