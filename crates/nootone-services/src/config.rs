//! Render engine and instrument library configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// Impulse responses shipped with the default library
pub const DEFAULT_IMPULSE_RESPONSES: [&str; 9] = [
    "Five_columns_long",
    "Scala_milan_opera_hall",
    "Right_glass_triangle",
    "Musikvereinsaal",
    "Large_bottle_hall",
    "In_the_silo",
    "Going_home",
    "Conic_long_echo_hall",
    "Cement_blocks_2",
];

/// Bus compressor settings, times in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorSettings {
    pub threshold_db: f32,
    pub knee_db: f32,
    pub ratio: f32,
    pub attack: f32,
    pub release: f32,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            threshold_db: -12.0,
            knee_db: 8.0,
            ratio: 12.0,
            attack: 0.08,
            release: 0.2,
        }
    }
}

/// How the rendered buffer is written out
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WavOptions {
    /// 32-bit float when true, 16-bit PCM otherwise
    pub float: bool,
    /// Linear fade at both ends, as a fraction of the total length
    pub fade: Option<f64>,
    /// Peak level after normalization, in dB
    pub normalize_db: Option<f32>,
}

impl Default for WavOptions {
    fn default() -> Self {
        Self {
            float: true,
            fade: Some(0.001),
            normalize_db: Some(-6.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Level of the reverb return mixed back onto the bus
    pub reverb_send: f32,
    /// Silence appended after the last track ends, in seconds
    pub tail: f64,
    /// Extra ring time given to every symbolic note, in seconds
    pub note_tail: f64,
    pub compressor: CompressorSettings,
    pub wav: WavOptions,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            reverb_send: 0.15,
            tail: 1.5,
            note_tail: 0.1,
            compressor: CompressorSettings::default(),
            wav: WavOptions::default(),
        }
    }
}

impl RenderConfig {
    pub fn from_toml(source: &str) -> Result<Self, RenderError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if !(1..=2).contains(&self.channels) {
            return Err(RenderError::UnsupportedChannels(self.channels));
        }
        if self.sample_rate == 0 {
            return Err(RenderError::InvalidSampleRate(self.sample_rate));
        }
        Ok(())
    }
}

/// Where instrument samples and impulse responses live.
///
/// Samples are read from `<root>/<instrument>/<pitch>-<dynamic>.wav`, impulse
/// responses from `<root>/<impulse_dir>/<name>.wav`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentLibrary {
    pub root: PathBuf,
    pub impulse_dir: String,
    pub impulse_responses: Vec<String>,
}

impl Default for InstrumentLibrary {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            impulse_dir: "impulse-responses".to_string(),
            impulse_responses: DEFAULT_IMPULSE_RESPONSES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl InstrumentLibrary {
    pub fn from_toml(source: &str) -> Result<Self, RenderError> {
        Ok(toml::from_str(source)?)
    }

    pub fn impulse_location(&self, name: &str) -> String {
        format!("{}/{name}.wav", self.impulse_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.channels, 2);
        assert_eq!(config.reverb_send, 0.15);
        assert_eq!(config.compressor.ratio, 12.0);
        assert_eq!(config.wav.fade, Some(0.001));
        assert_eq!(InstrumentLibrary::default().impulse_responses.len(), 9);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = RenderConfig::from_toml(
            r#"
            channels = 1
            [wav]
            float = false
            "#,
        )
        .unwrap();
        assert_eq!(config.channels, 1);
        assert!(!config.wav.float);
        assert_eq!(config.wav.normalize_db, Some(-6.0));
        assert_eq!(config.sample_rate, 44_100);
    }

    #[test]
    fn test_rejects_channel_count() {
        let err = RenderConfig::from_toml("channels = 6").unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedChannels(6)));
    }

    #[test]
    fn test_library_from_toml() {
        let library = InstrumentLibrary::from_toml(
            r#"
            root = "/srv/samples"
            impulse_responses = ["In_the_silo"]
            "#,
        )
        .unwrap();
        assert_eq!(library.root, PathBuf::from("/srv/samples"));
        assert_eq!(library.impulse_location("In_the_silo"), "impulse-responses/In_the_silo.wav");
    }
}
