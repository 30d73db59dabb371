//! The end of a tuner pipeline.

use tracing::info;

use crate::error::TransformError;
use crate::note::Note;
use crate::pipeline::Transform;

/// Logs every detected note at info level.
#[derive(Debug, Default)]
pub struct NoteLogger {
    count: u64,
    last: Option<Note>,
}

impl NoteLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of notes logged so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn last(&self) -> Option<Note> {
        self.last
    }

    pub fn log(&mut self, note: Note) {
        self.count += 1;
        self.last = Some(note);
        info!(
            note = %note,
            midi = note.midi_note_number(),
            count = self.count,
            "note detected"
        );
    }
}

impl Transform for NoteLogger {
    type Input = Note;
    type Output = ();

    fn apply(&mut self, note: Note) -> Result<Option<()>, TransformError> {
        self.log(note);
        Ok(Some(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_counts_notes() {
        let mut logger = NoteLogger::new();
        assert_eq!(logger.last(), None);
        logger.apply(Note::new(0, 4, 0.0)).unwrap();
        logger.apply(Note::new(3, 5, -0.1)).unwrap();
        assert_eq!(logger.count(), 2);
        assert_eq!(logger.last(), Some(Note::new(3, 5, -0.1)));
    }
}
