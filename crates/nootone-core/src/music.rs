//! Musical value types: note events, chord events, instrumental parts

use std::fmt;
use std::str::FromStr;

use fastrand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NootoneError, Result};
use crate::fraction::Fraction;

fn default_velocity() -> f64 {
    1.0
}

/// A single pitched sound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI pitch (0-127)
    pub pitch: u8,
    /// Start time in seconds
    pub onset: f64,
    /// Length in seconds
    pub duration: f64,
    /// Loudness (0.0 to 1.0)
    #[serde(default = "default_velocity")]
    pub velocity: f64,
}

impl NoteEvent {
    pub fn new(pitch: u8, onset: f64, duration: f64, velocity: f64) -> Self {
        Self { pitch, onset, duration, velocity }
    }

    pub fn end(&self) -> f64 {
        self.onset + self.duration
    }
}

/// A note inside a [`ChordEvent`]; the onset is shared with the chord.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChordNote {
    pub pitch: u8,
    pub duration: f64,
    #[serde(default = "default_velocity")]
    pub velocity: f64,
}

impl ChordNote {
    pub fn new(pitch: u8, duration: f64, velocity: f64) -> Self {
        Self { pitch, duration, velocity }
    }
}

/// Notes sharing one onset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChordEvent {
    pub onset: f64,
    pub notes: Vec<ChordNote>,
}

impl ChordEvent {
    pub fn new(onset: f64, notes: Vec<ChordNote>) -> Self {
        Self { onset, notes }
    }

    /// Chord with every pitch sharing the same duration and velocity.
    pub fn from_pitches(onset: f64, pitches: &[u8], duration: f64, velocity: f64) -> Self {
        let notes = pitches
            .iter()
            .map(|&pitch| ChordNote::new(pitch, duration, velocity))
            .collect();
        Self { onset, notes }
    }

    pub fn pitches(&self) -> Vec<u8> {
        self.notes.iter().map(|n| n.pitch).collect()
    }

    /// Longest note duration, 0 for an empty chord.
    pub fn duration(&self) -> f64 {
        self.notes.iter().map(|n| n.duration).fold(0.0, f64::max)
    }

    pub fn end(&self) -> f64 {
        self.onset + self.duration()
    }
}

/// Latest note end across a chord sequence.
pub fn sequence_end(chords: &[ChordEvent]) -> f64 {
    chords.iter().map(ChordEvent::end).fold(0.0, f64::max)
}

/// Group notes with identical onsets into chord events, ordered by onset.
pub fn note_events_to_chord_events(notes: &[NoteEvent]) -> Vec<ChordEvent> {
    let mut sorted = notes.to_vec();
    sorted.sort_by(|a, b| a.onset.total_cmp(&b.onset));

    let mut chords: Vec<ChordEvent> = Vec::new();
    for note in sorted {
        let chord_note = ChordNote::new(note.pitch, note.duration, note.velocity);
        match chords.last_mut() {
            Some(chord) if chord.onset == note.onset => chord.notes.push(chord_note),
            _ => chords.push(ChordEvent::new(note.onset, vec![chord_note])),
        }
    }
    chords
}

pub fn chord_events_to_note_events(chords: &[ChordEvent]) -> Vec<NoteEvent> {
    chords
        .iter()
        .flat_map(|chord| {
            chord
                .notes
                .iter()
                .map(|n| NoteEvent::new(n.pitch, chord.onset, n.duration, n.velocity))
        })
        .collect()
}

/// Parse a JSON array of note events as produced by pitch detection.
pub fn notes_from_json(json: &str) -> Result<Vec<NoteEvent>> {
    Ok(serde_json::from_str(json)?)
}

/// Placeholder melody for recordings where pitch detection found nothing.
pub fn generate_random_notes(rng: &mut Rng, duration: f64, tempo: f64) -> Result<Vec<NoteEvent>> {
    if tempo <= 0.0 {
        return Err(NootoneError::InvalidTempo(tempo));
    }
    let beat = 60.0 / tempo;
    let min_step = beat / 16.0;

    let mut notes = Vec::new();
    let mut time = 0.0;
    while time < duration {
        let pitch = rng.u8(21..109);
        let length = rng.f64() * beat * 0.75 + beat * 0.25;
        notes.push(NoteEvent::new(pitch, time, length, rng.f64()));
        time += (rng.f64() * beat).max(min_step);
    }
    Ok(notes)
}

/// Sampled instruments available to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InstrumentName {
    GrandPiano,
    NylonGuitar,
    ElectricPiano,
    Mandolin,
    BuzzPad,
    ElectricBass,
    AcousticBass,
    UprightBass,
}

impl InstrumentName {
    pub const ALL: [InstrumentName; 8] = [
        Self::GrandPiano,
        Self::NylonGuitar,
        Self::ElectricPiano,
        Self::Mandolin,
        Self::BuzzPad,
        Self::ElectricBass,
        Self::AcousticBass,
        Self::UprightBass,
    ];

    /// camelCase identifier, also the sample directory name
    pub fn id(self) -> &'static str {
        match self {
            Self::GrandPiano => "grandPiano",
            Self::NylonGuitar => "nylonGuitar",
            Self::ElectricPiano => "electricPiano",
            Self::Mandolin => "mandolin",
            Self::BuzzPad => "buzzPad",
            Self::ElectricBass => "electricBass",
            Self::AcousticBass => "acousticBass",
            Self::UprightBass => "uprightBass",
        }
    }

    /// Lowercase words, e.g. "grand piano"
    pub fn display_name(self) -> String {
        camel_to_spaces(self.id())
    }
}

impl fmt::Display for InstrumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for InstrumentName {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|i| i.id() == s)
            .ok_or_else(|| format!("unknown instrument: {s}"))
    }
}

pub fn camel_to_spaces(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if c.is_uppercase() {
            out.push(' ');
        }
        out.push(c);
    }
    out.to_lowercase()
}

/// Meter as written, never reduced (6/8 stays 6/8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    pub const COMMON: TimeSignature = TimeSignature { numerator: 4, denominator: 4 };

    pub fn new(numerator: u32, denominator: u32) -> Result<Self> {
        if numerator == 0 || denominator == 0 {
            return Err(NootoneError::InvalidTimeSignature(format!("{numerator}/{denominator}")));
        }
        Ok(Self { numerator, denominator })
    }

    /// Measure length in whole notes.
    pub fn measure(&self) -> Fraction {
        Fraction::new(self.numerator as i64, self.denominator as i64)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::COMMON
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for TimeSignature {
    type Err = NootoneError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || NootoneError::InvalidTimeSignature(s.to_string());
        let (n, d) = s.split_once('/').ok_or_else(invalid)?;
        let n = n.trim().parse().map_err(|_| invalid())?;
        let d = d.trim().parse().map_err(|_| invalid())?;
        Self::new(n, d)
    }
}

/// One instrument's chord stream inside a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentalPart {
    pub name: InstrumentName,
    pub chord_events: Vec<ChordEvent>,
}

/// Root artifact consumed by the score and audio renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolicMusicSequence {
    pub title: String,
    /// Beats per minute
    pub tempo: f64,
    pub time_signature: TimeSignature,
    pub instrumental_parts: Vec<InstrumentalPart>,
}

impl SymbolicMusicSequence {
    /// Latest note end across all parts, in seconds.
    pub fn duration(&self) -> f64 {
        self.instrumental_parts
            .iter()
            .map(|p| sequence_end(&p.chord_events))
            .fold(0.0, f64::max)
    }
}
