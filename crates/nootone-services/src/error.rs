//! Error types for asset loading, rendering and encoding

use thiserror::Error;

/// Failure to fetch or decode an audio asset
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("io error reading {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode WAV: {0}")]
    Decode(#[from] hound::Error),
    #[error("WAV file is empty: {0}")]
    Empty(String),
    #[error("resampler setup failed: {0}")]
    ResamplerConstruction(#[from] rubato::ResamplerConstructionError),
    #[error("resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),
    #[error("no samples found for instrument '{0}'")]
    NoSamples(String),
    #[error("sample name '{0}' is not <pitch>-<dynamic>.wav")]
    InvalidSampleName(String),
}

/// Failure while rendering a timeline
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unsupported channel count {0}, expected 1 or 2")]
    UnsupportedChannels(u16),
    #[error("invalid sample rate {0}")]
    InvalidSampleRate(u32),
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Failure while writing the WAV container
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),
    #[error("unsupported channel count {0}, expected 1 or 2")]
    UnsupportedChannels(usize),
    #[error("channel buffers differ in length")]
    UnevenChannels,
    #[error("fade fraction {0} outside [0, 0.5]")]
    InvalidFade(f64),
}
