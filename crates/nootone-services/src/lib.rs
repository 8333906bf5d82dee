//! nootone-services: offline audio rendering, sample assets and WAV encoding

pub mod assets;
pub mod audio_effects;
pub mod config;
mod error;
pub mod render_engine;
pub mod wav_reader;
pub mod wav_writer;

pub use assets::{load_instrument, AssetSource, DirectoryAssets, MemoryAssets};
pub use audio_effects::{
    AudioEffect, CompressorEffect, ConvolutionReverb, EffectChain, InstrumentSampler, LimiterEffect, PlaybackEvent,
    SampleZone,
};
pub use config::{CompressorSettings, InstrumentLibrary, RenderConfig, WavOptions};
pub use error::{AssetError, EncodeError, RenderError};
pub use render_engine::{OfflineRenderer, RenderedBuffer};
pub use wav_writer::{encode_wav, RenderedAudio};
