/// Refines the location of the peak at bin `peak` by fitting a Gaussian through
/// the amplitudes of the peak bin and its two neighbours.
///
/// Returns the fractional bin index of the fitted maximum, or `None` if `peak`
/// has no neighbour on either side or the fit is degenerate, for instance when
/// a neighbour is zero or the three amplitudes lie on a line.
pub fn gaussian_interpolation(amplitudes: &[f32], peak: usize) -> Option<f32> {
    if peak == 0 || peak + 1 >= amplitudes.len() {
        return None;
    }
    let left = f64::from(amplitudes[peak - 1]);
    let center = f64::from(amplitudes[peak]);
    let right = f64::from(amplitudes[peak + 1]);
    if !(left > 0.0 && center > 0.0 && right > 0.0) {
        return None;
    }

    let numerator = (right / left).ln();
    let denominator = 2.0 * ((center * center) / (right * left)).ln();
    let delta = numerator / denominator;
    if !delta.is_finite() {
        return None;
    }
    Some(peak as f32 + delta as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn gaussian(center: f32, width: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|k| {
                let d = k as f32 - center;
                (-d * d / (2.0 * width * width)).exp()
            })
            .collect()
    }

    #[test]
    fn test_exact_for_gaussian_peaks() {
        let amplitudes = gaussian(10.3, 1.5, 20);
        assert_abs_diff_eq!(gaussian_interpolation(&amplitudes, 10).unwrap(), 10.3, epsilon = 1e-3);

        let amplitudes = gaussian(4.8, 0.8, 20);
        assert_abs_diff_eq!(gaussian_interpolation(&amplitudes, 5).unwrap(), 4.8, epsilon = 1e-3);
    }

    #[test]
    fn test_symmetric_peak() {
        assert_abs_diff_eq!(gaussian_interpolation(&[1.0, 4.0, 1.0], 1).unwrap(), 1.0);
    }

    #[test]
    fn test_boundary_bins() {
        let amplitudes = [9.0, 3.0, 1.0, 5.0];
        assert_eq!(gaussian_interpolation(&amplitudes, 0), None);
        assert_eq!(gaussian_interpolation(&amplitudes, 3), None);
        assert_eq!(gaussian_interpolation(&amplitudes, 4), None);
    }

    #[test]
    fn test_degenerate_fits() {
        assert_eq!(gaussian_interpolation(&[0.0, 4.0, 1.0], 1), None);
        // ln(c^2 / (l * r)) is 0
        assert_eq!(gaussian_interpolation(&[1.0, 2.0, 4.0], 1), None);
    }
}
