use crate::common::F32ArrayExt;

/// Returns the amplitude `target_z_score` population standard deviations above
/// the mean of `amplitudes`.
pub fn amplitude_threshold(amplitudes: &[f32], target_z_score: f32) -> f32 {
    amplitudes.mean() + target_z_score * amplitudes.std_dev()
}

/// Returns the indices of all bins whose amplitude strictly exceeds
/// [`amplitude_threshold`], in ascending order.
pub fn select_peaks(amplitudes: &[f32], target_z_score: f32) -> Vec<usize> {
    let threshold = amplitude_threshold(amplitudes, target_z_score);
    amplitudes
        .iter()
        .enumerate()
        .filter(|(_, amplitude)| **amplitude > threshold)
        .map(|(index, _)| index)
        .collect()
}
