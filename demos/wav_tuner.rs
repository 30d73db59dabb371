//! Runs the tuner over a wav file, printing the note detected in every chunk.
//!
//! ```text
//! cargo run --example wav_tuner -- recording.wav
//! ```

use std::error::Error;
use std::time::Duration;

use micro_tuner::error::TransformError;
use micro_tuner::pipeline::{transform_fn, Transform};
use micro_tuner::{build_tuner, CaptureSettings, Note, Sample, TunerConfig};
use tracing_subscriber::EnvFilter;

/// Replays a recording in chunks of the capture duration.
struct WavCapture {
    sample_rate: f32,
    chunk_len: usize,
    samples: Vec<f32>,
    position: usize,
}

impl Transform for WavCapture {
    type Input = ();
    type Output = Sample;

    fn apply(&mut self, _: ()) -> Result<Option<Sample>, TransformError> {
        let end = self.position + self.chunk_len;
        if end > self.samples.len() {
            return Err(TransformError::Exhausted);
        }
        let chunk = self.samples[self.position..end].to_vec();
        self.position = end;
        Sample::from_data(self.sample_rate, chunk)
            .map(Some)
            .map_err(|err| TransformError::custom(err.to_string()))
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let path = std::env::args().nth(1).ok_or("usage: wav_tuner <file.wav>")?;
    let wav = dev_helpers::read_wav(&path)?;
    let sample_rate = wav.sample_rate as f32;

    let defaults = TunerConfig::default();
    // At least one analysis frame per chunk.
    let chunk_duration = (defaults.frame_size as f32 / sample_rate).max(0.1);
    let config = TunerConfig {
        capture: CaptureSettings::new(sample_rate / 2.0, chunk_duration)?,
        // Skip room noise between notes.
        silence_threshold_db: Some(-50.0),
        ..defaults
    };
    let capture = WavCapture {
        sample_rate,
        chunk_len: config.capture.sample_count(),
        samples: wav.to_mono(),
        position: 0,
    };

    let (tx, rx) = crossbeam_channel::unbounded();
    let sink = transform_fn(move |note: Note| {
        tx.send(note).map_err(|_| TransformError::custom("receiver dropped"))?;
        Ok(Some(()))
    });

    let tuner = build_tuner(&config, capture, sink)?;
    tuner.start()?;
    // Chunks without a detectable pitch produce nothing, so wait for a quiet period.
    while let Ok(note) = rx.recv_timeout(Duration::from_secs(1)) {
        println!("{} ({:.2} Hz)", note, note.frequency(config.a4_frequency));
    }
    tuner.stop()?;

    Ok(())
}
