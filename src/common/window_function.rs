//! [Window functions](https://en.wikipedia.org/wiki/Window_function).
//!
//! All windows are evaluated in their periodic (DFT-even) form, i.e a window
//! of length `N` is the first `N` points of a symmetric window of length `N + 1`.
//! This is the form to use when the windowed frame is fed to an FFT.

use core::f64::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialization", serde(rename_all = "snake_case"))]
pub enum WindowFunction {
    /// <https://en.wikipedia.org/wiki/Window_function#Hann_and_Hamming_windows>
    #[default]
    Hann,
    /// <https://en.wikipedia.org/wiki/Window_function#Welch_window>
    Welch,
    /// No windowing.
    Rectangular,
}

impl WindowFunction {
    /// The value of the window at index `n` of a window of length `len`.
    pub fn value_at(self, n: usize, len: usize) -> f32 {
        let len = len as f64;
        let n = n as f64;
        let value = match self {
            WindowFunction::Hann => 0.5 * (1.0 - (2.0 * PI * n / len).cos()),
            WindowFunction::Welch => {
                let half = 0.5 * len;
                let x = (n - half) / half;
                1.0 - x * x
            }
            WindowFunction::Rectangular => 1.0,
        };
        value as f32
    }

    /// Returns the window coefficients for a window of length `len`.
    pub fn coefficients(self, len: usize) -> Box<[f32]> {
        (0..len).map(|n| self.value_at(n, len)).collect()
    }
}
