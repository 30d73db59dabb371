use microfft::Complex32;

/// Returns true if `fft_size` is a real FFT size handled by [`real_fft`].
pub fn is_supported_fft_size(fft_size: usize) -> bool {
    fft_size.is_power_of_two() && (8..=4096).contains(&fft_size)
}

/// Performs an in-place real FFT of `buffer`, returning the first half of the
/// complex spectrum. The real valued coefficient of the Nyquist frequency is
/// packed into the imaginary part of the DC bin.
///
/// Returns `None` if the buffer length is not a supported FFT size.
pub fn real_fft(buffer: &mut [f32]) -> Option<&mut [Complex32]> {
    let spectrum: &mut [Complex32] = match buffer.len() {
        8 => microfft::real::rfft_8(buffer.try_into().ok()?),
        16 => microfft::real::rfft_16(buffer.try_into().ok()?),
        32 => microfft::real::rfft_32(buffer.try_into().ok()?),
        64 => microfft::real::rfft_64(buffer.try_into().ok()?),
        128 => microfft::real::rfft_128(buffer.try_into().ok()?),
        256 => microfft::real::rfft_256(buffer.try_into().ok()?),
        512 => microfft::real::rfft_512(buffer.try_into().ok()?),
        1024 => microfft::real::rfft_1024(buffer.try_into().ok()?),
        2048 => microfft::real::rfft_2048(buffer.try_into().ok()?),
        4096 => microfft::real::rfft_4096(buffer.try_into().ok()?),
        _ => return None,
    };
    Some(spectrum)
}

/// Computes the one-sided amplitude spectrum of `buffer`.
///
/// `result` must hold `buffer.len() / 2 + 1` bins. Every bin except DC is doubled
/// to account for the energy of the discarded negative frequencies.
/// The contents of `buffer` are overwritten by the FFT.
pub fn amplitude_spectrum<'a>(buffer: &mut [f32], result: &'a mut [f32]) -> Option<&'a [f32]> {
    let bin_count = buffer.len() / 2 + 1;
    if result.len() != bin_count {
        return None;
    }
    let spectrum = real_fft(buffer)?;

    result[0] = spectrum[0].re.abs();
    for (amplitude, value) in result[1..].iter_mut().zip(spectrum.iter().skip(1)) {
        *amplitude = 2.0 * value.norm_sqr().sqrt();
    }
    result[bin_count - 1] = 2.0 * spectrum[0].im.abs();

    Some(&result[..])
}
