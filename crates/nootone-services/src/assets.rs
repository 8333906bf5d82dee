//! Instrument samples, impulse responses and recorded clips

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crossbeam_channel::unbounded;
use nootone_core::{AudioSource, InstrumentName};
use tracing::{debug, info};

use crate::audio_effects::{InstrumentSampler, SampleZone};
use crate::error::AssetError;
use crate::wav_reader::read_mono;

/// Dynamic markings used in sample file names, softest first
pub const DYNAMICS: [(&str, f32); 6] = [
    ("pp", 0.2),
    ("p", 0.35),
    ("mp", 0.5),
    ("mf", 0.65),
    ("f", 0.8),
    ("ff", 0.95),
];

pub fn dynamic_velocity(dynamic: &str) -> Option<f32> {
    DYNAMICS.iter().find(|(d, _)| *d == dynamic).map(|(_, v)| *v)
}

/// Parse `<pitch>-<dynamic>.wav` into a MIDI pitch and velocity.
pub fn parse_sample_name(file_name: &str) -> Result<(u8, f32), AssetError> {
    let invalid = || AssetError::InvalidSampleName(file_name.to_string());
    let stem = file_name.strip_suffix(".wav").ok_or_else(invalid)?;
    let (pitch, dynamic) = stem.split_once('-').ok_or_else(invalid)?;
    let pitch: u8 = pitch.parse().map_err(|_| invalid())?;
    if pitch > 127 {
        return Err(invalid());
    }
    let velocity = dynamic_velocity(dynamic).ok_or_else(invalid)?;
    Ok((pitch, velocity))
}

/// Read-only store of encoded audio files, addressed by `/`-separated paths.
pub trait AssetSource: Send + Sync {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, AssetError>;
    /// File names directly inside `dir`, sorted
    fn list(&self, dir: &str) -> Result<Vec<String>, AssetError>;
}

/// Assets on the local filesystem under a root directory
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirectoryAssets {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, AssetError> {
        std::fs::read(self.root.join(location)).map_err(|source| AssetError::Io {
            location: location.to_string(),
            source,
        })
    }

    fn list(&self, dir: &str) -> Result<Vec<String>, AssetError> {
        let io_error = |source| AssetError::Io { location: dir.to_string(), source };
        let mut names = Vec::new();
        for entry in std::fs::read_dir(self.root.join(dir)).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            if entry.path().is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Assets held in memory, mostly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(location.into(), bytes);
    }
}

impl AssetSource for MemoryAssets {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, AssetError> {
        self.files.get(location).cloned().ok_or_else(|| AssetError::Io {
            location: location.to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }

    fn list(&self, dir: &str) -> Result<Vec<String>, AssetError> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        Ok(self
            .files
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect())
    }
}

/// Fetch and decode every sample of an instrument, one thread per file.
///
/// Any file failing to load fails the whole instrument.
pub fn load_instrument(
    assets: &dyn AssetSource,
    instrument: InstrumentName,
    sample_rate: u32,
) -> Result<InstrumentSampler, AssetError> {
    let dir = instrument.id();
    let files: Vec<String> = assets.list(dir)?.into_iter().filter(|f| f.ends_with(".wav")).collect();
    if files.is_empty() {
        return Err(AssetError::NoSamples(dir.to_string()));
    }

    let (tx, rx) = unbounded();
    std::thread::scope(|scope| {
        for file in &files {
            let tx = tx.clone();
            scope.spawn(move || {
                let zone = parse_sample_name(file).and_then(|(pitch, velocity)| {
                    let bytes = assets.fetch(&format!("{dir}/{file}"))?;
                    Ok(SampleZone::new(pitch, velocity, read_mono(&bytes, sample_rate)?))
                });
                let _ = tx.send(zone);
            });
        }
    });
    drop(tx);

    let zones: Vec<SampleZone> = rx.iter().collect::<Result<_, _>>()?;
    debug!(instrument = dir, zones = zones.len(), "Loaded instrument samples");
    InstrumentSampler::new(dir, zones)
}

/// Load a mono impulse response at the engine sample rate.
pub fn load_impulse_response(assets: &dyn AssetSource, location: &str, sample_rate: u32) -> Result<Vec<f32>, AssetError> {
    let response = read_mono(&assets.fetch(location)?, sample_rate)?;
    if response.is_empty() {
        return Err(AssetError::Empty(location.to_string()));
    }
    info!(location, samples = response.len(), "Loaded impulse response");
    Ok(response)
}

/// Decode a recorded clip to mono at the engine sample rate.
pub fn load_clip(assets: &dyn AssetSource, source: &AudioSource, sample_rate: u32) -> Result<Vec<f32>, AssetError> {
    match source {
        AudioSource::Bytes(bytes) => read_mono(bytes, sample_rate),
        AudioSource::Location(location) => read_mono(&assets.fetch(location)?, sample_rate),
    }
}
