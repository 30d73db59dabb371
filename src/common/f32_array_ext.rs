//! `[f32]` extensions.

use micromath::F32Ext;

/// `[f32]` extensions.
pub trait F32ArrayExt {
    /// Returns the maximum absolute value.
    fn peak_level(&self) -> f32;
    /// Returns the [root mean square](https://en.wikipedia.org/wiki/Root_mean_square)
    /// level.
    fn rms_level(&self) -> f32;
    /// Returns the [root mean square](https://en.wikipedia.org/wiki/Root_mean_square)
    /// level in dB relative to 1, i.e 0 dB corresponds to a level of 1.
    fn rms_level_db(&self) -> f32;
    /// Returns the arithmetic mean, or 0 for an empty array.
    fn mean(&self) -> f32;
    /// Returns the population standard deviation, or 0 for an empty array.
    fn std_dev(&self) -> f32;
}

impl F32ArrayExt for [f32] {
    fn peak_level(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        };

        let mut max: f32 = 0.0;
        for sample in self.iter() {
            let value = sample.abs();
            if value > max {
                max = value
            }
        }
        max
    }

    fn rms_level(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        };
        let mut rms: f32 = 0.;
        for sample in self.iter() {
            rms += sample * sample
        }
        F32Ext::sqrt(rms / (self.len() as f32))
    }

    fn rms_level_db(&self) -> f32 {
        20. * F32Ext::log10(self.rms_level())
    }

    fn mean(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        // Accumulate in f64, amplitude spectra of rescaled frames reach ~1e12.
        let sum: f64 = self.iter().map(|value| f64::from(*value)).sum();
        (sum / self.len() as f64) as f32
    }

    fn std_dev(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let mean = f64::from(self.mean());
        let sum_sq: f64 = self
            .iter()
            .map(|value| {
                let d = f64::from(*value) - mean;
                d * d
            })
            .sum();
        (sum_sq / self.len() as f64).sqrt() as f32
    }
}
