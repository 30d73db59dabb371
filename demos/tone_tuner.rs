//! Runs the tuner on a synthetic tone for a few seconds, logging detected notes.
//!
//! ```text
//! cargo run --example tone_tuner -- 523.25
//! ```

use std::error::Error;
use std::thread;
use std::time::Duration;

use micro_tuner::{build_tuner, NoteLogger, ToneGenerator, TunerConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let frequency: f32 = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 440.0,
    };

    let config = TunerConfig::default();
    // Paced, so captures arrive in real time like from a microphone.
    let capture = ToneGenerator::new(config.capture, frequency).with_pacing(true);
    let tuner = build_tuner(&config, capture, NoteLogger::new())?;

    tuner.start()?;
    thread::sleep(Duration::from_secs(3));
    tuner.stop()?;

    Ok(())
}
