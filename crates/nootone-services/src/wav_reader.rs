//! WAV decoding to mono f32 at the engine sample rate

use std::io::Cursor;

use rubato::{FftFixedInOut, Resampler};

use crate::error::AssetError;

const RESAMPLE_CHUNK: usize = 1024;

/// Decoded interleaved audio
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Decode a WAV file held in memory. Integer formats are scaled to [-1, 1).
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedAudio, AssetError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(DecodedAudio {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

/// Convert interleaved samples to mono by averaging channels.
pub fn to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|ch| ch.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Band-limited resampling of a mono signal.
///
/// The resampler's own delay is trimmed, so the output lines up with the
/// input and holds `ceil(len × to / from)` samples.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AssetError> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler = FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, RESAMPLE_CHUNK, 1)?;
    let delay = resampler.output_delay();
    let expected = (samples.len() as u64 * to_rate as u64).div_ceil(from_rate as u64) as usize;

    let mut output: Vec<f32> = Vec::with_capacity(expected + delay);
    let mut pos = 0;
    let mut chunk = vec![0.0f32; resampler.input_frames_next()];
    while output.len() < expected + delay {
        let chunk_size = resampler.input_frames_next();
        chunk.resize(chunk_size, 0.0);
        chunk.fill(0.0);
        if pos < samples.len() {
            let end = (pos + chunk_size).min(samples.len());
            chunk[..end - pos].copy_from_slice(&samples[pos..end]);
        }
        pos += chunk_size;

        let input = [chunk.as_slice()];
        let resampled = resampler.process(&input[..], None)?;
        if let Some(channel) = resampled.into_iter().next() {
            output.extend(channel);
        }
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);
    Ok(output)
}

/// Decode, mix down to mono and resample to `sample_rate`.
pub fn read_mono(bytes: &[u8], sample_rate: u32) -> Result<Vec<f32>, AssetError> {
    let decoded = decode_wav(bytes)?;
    let mono = to_mono(&decoded.samples, decoded.channels as usize);
    resample(&mono, decoded.sample_rate, sample_rate)
}
