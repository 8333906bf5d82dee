//! Render tracks: recorded audio clips and sample-synthesized parts

use serde::{Deserialize, Serialize};

use crate::music::{sequence_end, ChordEvent, InstrumentName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u64);

/// Where a clip's encoded audio comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioSource {
    /// An encoded WAV file held in memory
    Bytes(Vec<u8>),
    /// Path relative to the asset root
    Location(String),
}

/// A recorded clip placed on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    pub source: AudioSource,
    /// Start time in seconds
    #[serde(default)]
    pub onset: f64,
    /// Known length in seconds; taken from the decoded audio when absent
    #[serde(default)]
    pub duration: Option<f64>,
}

impl AudioClip {
    pub fn new(source: AudioSource, onset: f64) -> Self {
        Self { source, onset, duration: None }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TrackKind {
    Audio(AudioClip),
    #[serde(rename_all = "camelCase")]
    Symbolic {
        instrument: InstrumentName,
        chord_events: Vec<ChordEvent>,
    },
}

fn default_gain() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub kind: TrackKind,
    /// Linear gain applied before the shared effects bus
    #[serde(default = "default_gain")]
    pub gain: f32,
}

impl Track {
    pub fn new(id: TrackId, kind: TrackKind, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), kind, gain: default_gain() }
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self.kind, TrackKind::Symbolic { .. })
    }

    /// End time in seconds, if it is known without decoding audio.
    pub fn end(&self) -> Option<f64> {
        match &self.kind {
            TrackKind::Audio(clip) => clip.duration.map(|d| clip.onset + d),
            TrackKind::Symbolic { chord_events, .. } => Some(sequence_end(chord_events)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_end() {
        let clip = AudioClip::new(AudioSource::Location("take.wav".into()), 1.0);
        let audio = Track::new(TrackId(1), TrackKind::Audio(clip.clone()), "take");
        assert_eq!(audio.end(), None);

        let audio = Track::new(TrackId(1), TrackKind::Audio(clip.with_duration(2.5)), "take").with_gain(0.5);
        assert_eq!(audio.end(), Some(3.5));
        assert_eq!(audio.gain, 0.5);

        let part = TrackKind::Symbolic {
            instrument: InstrumentName::GrandPiano,
            chord_events: vec![ChordEvent::from_pitches(2.0, &[60, 64], 1.5, 0.7)],
        };
        let symbolic = Track::new(TrackId(2), part, "piano");
        assert!(symbolic.is_symbolic());
        assert_eq!(symbolic.end(), Some(3.5));
    }

    #[test]
    fn test_track_json() {
        let json = r#"{"id": 3, "name": "bass", "kind": {"type": "symbolic", "instrument": "uprightBass", "chordEvents": []}}"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.gain, 1.0);
        assert_eq!(
            track.kind,
            TrackKind::Symbolic { instrument: InstrumentName::UprightBass, chord_events: vec![] }
        );
    }
}
