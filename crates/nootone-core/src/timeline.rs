//! Timeline containing render tracks

use serde::{Deserialize, Serialize};

use crate::track::{Track, TrackId, TrackKind};

/// Ordered tracks handed to the audio renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub tracks: Vec<Track>,
    next_track_id: u64,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            next_track_id: 1,
        }
    }

    pub fn add_track(&mut self, kind: TrackKind, name: impl Into<String>) -> TrackId {
        let id = TrackId(self.next_track_id);
        self.next_track_id += 1;
        self.tracks.push(Track::new(id, kind, name));
        id
    }

    pub fn get_track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Latest known track end in seconds; clips of unknown length are ignored
    pub fn known_duration(&self) -> f64 {
        self.tracks.iter().filter_map(Track::end).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::{ChordEvent, InstrumentName};
    use crate::track::{AudioClip, AudioSource};

    #[test]
    fn test_add_tracks() {
        let mut timeline = Timeline::new();
        let a = timeline.add_track(
            TrackKind::Audio(AudioClip::new(AudioSource::Bytes(vec![]), 0.0).with_duration(4.0)),
            "recording",
        );
        let b = timeline.add_track(
            TrackKind::Symbolic {
                instrument: InstrumentName::BuzzPad,
                chord_events: vec![ChordEvent::from_pitches(4.0, &[60], 2.0, 0.3)],
            },
            "pads",
        );
        assert_ne!(a, b);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.known_duration(), 6.0);

        timeline.get_track_mut(a).unwrap().gain = 0.5;
        assert_eq!(timeline.tracks[0].gain, 0.5);
        assert!(timeline.get_track_mut(TrackId(99)).is_none());
    }
}
