//! Fades, normalization and WAV encoding of rendered buffers

use std::io::Cursor;

use fundsp::hacker::db_amp;
use serde::Serialize;

use crate::config::WavOptions;
use crate::error::EncodeError;

/// Encoded render result
#[derive(Debug, Clone, Serialize)]
pub struct RenderedAudio {
    /// Complete RIFF/WAVE file
    #[serde(skip)]
    pub wav: Vec<u8>,
    /// Length in seconds
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Linear fade in and out, each over `fraction` of the buffer length.
pub fn apply_fade(channels: &mut [Vec<f32>], fraction: f64) -> Result<(), EncodeError> {
    if !(0.0..=0.5).contains(&fraction) {
        return Err(EncodeError::InvalidFade(fraction));
    }
    for channel in channels.iter_mut() {
        let len = channel.len();
        let fade_len = (len as f64 * fraction).round() as usize;
        if fade_len == 0 {
            continue;
        }
        for i in 0..fade_len {
            let gain = i as f32 / fade_len as f32;
            channel[i] *= gain;
            channel[len - 1 - i] *= gain;
        }
    }
    Ok(())
}

/// Scale so the loudest sample across all channels sits at `peak_db`.
///
/// Silent buffers are left untouched.
pub fn normalize(channels: &mut [Vec<f32>], peak_db: f32) {
    let peak = channels
        .iter()
        .flat_map(|c| c.iter())
        .fold(0.0f32, |m, s| m.max(s.abs()));
    if peak <= f32::EPSILON {
        return;
    }
    let gain = db_amp(peak_db) / peak;
    for sample in channels.iter_mut().flat_map(|c| c.iter_mut()) {
        *sample *= gain;
    }
}

/// Apply the configured fade and normalization, then write a WAV file.
pub fn encode_wav(mut channels: Vec<Vec<f32>>, sample_rate: u32, options: &WavOptions) -> Result<RenderedAudio, EncodeError> {
    if !(1..=2).contains(&channels.len()) {
        return Err(EncodeError::UnsupportedChannels(channels.len()));
    }
    let frames = channels[0].len();
    if channels.iter().any(|c| c.len() != frames) {
        return Err(EncodeError::UnevenChannels);
    }

    if let Some(fraction) = options.fade {
        apply_fade(&mut channels, fraction)?;
    }
    if let Some(peak_db) = options.normalize_db {
        normalize(&mut channels, peak_db);
    }

    let spec = if options.float {
        hound::WavSpec {
            channels: channels.len() as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        }
    } else {
        hound::WavSpec {
            channels: channels.len() as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for frame in 0..frames {
        for channel in &channels {
            let sample = channel[frame];
            if options.float {
                writer.write_sample(sample)?;
            } else {
                writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
            }
        }
    }
    writer.finalize()?;

    Ok(RenderedAudio {
        wav: cursor.into_inner(),
        duration: frames as f64 / sample_rate as f64,
        sample_rate,
        channels: spec.channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_edges() {
        let mut channels = vec![vec![1.0f32; 1000]];
        apply_fade(&mut channels, 0.01).unwrap();
        assert_eq!(channels[0][0], 0.0);
        assert_eq!(channels[0][999], 0.0);
        assert!((channels[0][5] - 0.5).abs() < 1e-6);
        assert_eq!(channels[0][10], 1.0);
        assert_eq!(channels[0][500], 1.0);
        assert!(apply_fade(&mut channels, 0.6).is_err());
    }

    #[test]
    fn test_normalize_to_headroom() {
        let mut channels = vec![vec![0.1, -0.2], vec![0.05, 0.0]];
        normalize(&mut channels, -6.0);
        let peak = channels.iter().flatten().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - db_amp(-6.0f32)).abs() < 1e-6);
        assert!(channels[1][0] > 0.0);

        let mut silent = vec![vec![0.0; 4]];
        normalize(&mut silent, -6.0);
        assert_eq!(silent[0], vec![0.0; 4]);
    }

    #[test]
    fn test_encode_pcm16_header() {
        let options = WavOptions { float: false, fade: None, normalize_db: None };
        let rendered = encode_wav(vec![vec![0.5; 100], vec![-0.5; 100]], 8_000, &options).unwrap();
        assert_eq!(&rendered.wav[0..4], b"RIFF");
        assert_eq!(&rendered.wav[8..12], b"WAVE");
        // PCM format tag, two channels
        assert_eq!(u16::from_le_bytes([rendered.wav[20], rendered.wav[21]]), 1);
        assert_eq!(u16::from_le_bytes([rendered.wav[22], rendered.wav[23]]), 2);
        assert_eq!(rendered.wav.len(), 44 + 100 * 2 * 2);
        assert_eq!(rendered.duration, 100.0 / 8_000.0);
    }

    #[test]
    fn test_encode_float_round_trip() {
        let rendered = encode_wav(vec![vec![0.25; 10]], 44_100, &WavOptions::default()).unwrap();
        let reader = hound::WavReader::new(Cursor::new(rendered.wav)).unwrap();
        assert_eq!(reader.spec().sample_format, hound::SampleFormat::Float);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<f32> = reader.into_samples::<f32>().map(Result::unwrap).collect();
        assert_eq!(samples.len(), 10);
        // normalized to -6 dB
        assert!((samples[5] - db_amp(-6.0f32)).abs() < 1e-6);
    }

    #[test]
    fn test_encode_rejects_bad_layout() {
        let options = WavOptions::default();
        assert!(matches!(
            encode_wav(vec![vec![0.0; 4], vec![0.0; 3]], 44_100, &options),
            Err(EncodeError::UnevenChannels)
        ));
        assert!(matches!(
            encode_wav(vec![vec![0.0; 4]; 3], 44_100, &options),
            Err(EncodeError::UnsupportedChannels(3))
        ));
    }
}
