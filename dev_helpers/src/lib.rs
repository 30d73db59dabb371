//! Helpers for demos and benchmarks.

mod wav;

pub use wav::{read_wav, write_wav, WavData};
