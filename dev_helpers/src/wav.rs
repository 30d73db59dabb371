use std::path::Path;

/// Decoded contents of a wav file.
pub struct WavData {
    pub sample_rate: u32,
    pub channel_count: u16,
    /// Interleaved samples in `[-1, 1]`.
    pub samples: Vec<f32>,
}

impl WavData {
    /// Averages all channels into one.
    pub fn to_mono(&self) -> Vec<f32> {
        let channel_count = usize::from(self.channel_count.max(1));
        self.samples
            .chunks(channel_count)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    }
}

/// Reads a 16 or 24 bit integer or 32 bit float wav file.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<WavData, hound::Error> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(WavData {
        sample_rate: spec.sample_rate,
        channel_count: spec.channels,
        samples,
    })
}

/// Writes interleaved samples as a 16 bit wav file, clamping to `[-1, 1]`.
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channel_count: u16,
    buffer: &[f32],
) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: channel_count,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let amplitude = i16::MAX as f32;
    for sample in buffer.iter() {
        writer.write_sample((sample.clamp(-1.0, 1.0) * amplitude) as i16)?;
    }
    writer.finalize()
}
