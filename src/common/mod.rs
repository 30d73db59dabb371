//! Common algorithms and utilities.

mod f32_array_ext;
mod fft;
mod window_function;

pub use f32_array_ext::F32ArrayExt;
pub use fft::{amplitude_spectrum, is_supported_fft_size, real_fft};
pub use window_function::WindowFunction;
