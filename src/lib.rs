//! A real-time tuner built from threaded processing stages.
//!
//! Audio is captured in fixed duration [`Sample`]s and pushed through a chain of
//! stages. Each stage runs on its own thread behind a bounded buffer:
//!
//! * a capture [`Source`](pipeline::Source), e.g a [`ToneGenerator`]
//! * a [`SpectralExtractor`] estimating the fundamental frequency from the
//!   amplitude spectrum of the sample
//! * a [`NoteMapper`] mapping the frequency to the nearest [`Note`] of the
//!   12-tone equal tempered scale, with its deviation
//! * a sink, e.g a [`NoteLogger`]
//!
//! Full buffers block producers, so the capture rate adapts to the slowest stage.
//!
//! # Examples
//!
//! ```
//! use micro_tuner::{build_tuner, pipeline::transform_fn, Note, ToneGenerator, TunerConfig};
//!
//! let config = TunerConfig::default();
//! // Three captures of a C5 tone.
//! let capture = ToneGenerator::new(config.capture, 523.25).with_capture_limit(3);
//! let (tx, rx) = std::sync::mpsc::channel();
//! let sink = transform_fn(move |note: Note| {
//!     tx.send(note).ok();
//!     Ok(Some(()))
//! });
//!
//! let tuner = build_tuner(&config, capture, sink).unwrap();
//! tuner.start().unwrap();
//! let note = rx.recv().unwrap();
//! tuner.stop().unwrap();
//!
//! assert_eq!(note.name(), "C");
//! assert_eq!(note.octave(), 5);
//! ```

mod capture;
pub mod common;
mod config;
pub mod error;
mod note;
pub mod note_mapper;
pub mod pipeline;
mod sample;
mod sink;
pub mod spectral;

pub use capture::{CaptureSettings, ToneGenerator};
pub use common::WindowFunction;
pub use config::{build_tuner, TunerConfig, DEFAULT_BUFFER_CAPACITY};
pub use error::{ConfigError, StageError, SubmitError, TransformError};
pub use note::{Note, DELTA_EQ_TOLERANCE, SEMITONES_PER_OCTAVE};
pub use note_mapper::{get_semitone_diff, map_frequency, NoteMapper, DEFAULT_A4_FREQUENCY};
pub use pipeline::{Lifecycle, Pipeline};
pub use sample::Sample;
pub use sink::NoteLogger;
pub use spectral::SpectralExtractor;
