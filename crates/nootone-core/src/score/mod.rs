//! Text notation output for a [`SymbolicMusicSequence`](crate::music::SymbolicMusicSequence)
//!
//! Chord events are quantized onto a fractional grid, split into beats and
//! measures, padded with rests and written out as an ABC document.

mod renderer;
mod speller;

use serde::{Deserialize, Serialize};

use crate::fraction::Fraction;

pub use renderer::{ScoreOptions, ScoreRenderer};
pub use speller::{Accidental, Letter, SpelledKey, SpelledPitch};

/// A chord or rest on the fractional grid. Times are in whole notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolicEvent {
    pub onset: Fraction,
    pub duration: Fraction,
    pub accent: bool,
    /// Empty for a rest
    pub pitches: Vec<u8>,
}

impl SymbolicEvent {
    pub fn rest(onset: Fraction, duration: Fraction) -> Self {
        Self { onset, duration, accent: false, pitches: Vec::new() }
    }

    pub fn is_rest(&self) -> bool {
        self.pitches.is_empty()
    }

    pub fn end(&self) -> Fraction {
        self.onset + self.duration
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolicBeat {
    pub onset: Fraction,
    pub duration: Fraction,
    pub events: Vec<SymbolicEvent>,
}

impl SymbolicBeat {
    pub fn filled_duration(&self) -> Fraction {
        self.events.iter().map(|e| e.duration).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolicMeasure {
    pub onset: Fraction,
    pub duration: Fraction,
    pub beats: Vec<SymbolicBeat>,
}

impl SymbolicMeasure {
    pub fn filled_duration(&self) -> Fraction {
        self.beats.iter().map(SymbolicBeat::filled_duration).sum()
    }
}

/// A beat or measure whose events do not add up to its declared length.
///
/// Rendering still completes; these are reported so callers can surface them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreDiagnostic {
    BeatDuration { part: usize, beat: usize, expected: Fraction, actual: Fraction },
    MeasureDuration { part: usize, measure: usize, expected: Fraction, actual: Fraction },
}
