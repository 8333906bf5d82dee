//! ABC score writer

use serde::{Deserialize, Serialize};

use super::speller::SpelledKey;
use super::{ScoreDiagnostic, SymbolicBeat, SymbolicEvent, SymbolicMeasure};
use crate::error::{NootoneError, Result};
use crate::fraction::{decimal_to_fraction, Fraction};
use crate::harmony::{KeySignature, Mode};
use crate::music::{ChordEvent, InstrumentalPart, SymbolicMusicSequence, TimeSignature};

/// Tolerance for placing an onset into its beat
const BEAT_EPSILON: f64 = 1e-8;
/// Tolerance for placing a beat into its measure
const MEASURE_EPSILON: f64 = 1e-6;
/// Tolerance for counting measures from the sequence length
const LENGTH_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreOptions {
    /// Written to the `C:` field
    pub author: String,
    /// Written to the `S:` field
    pub source: String,
    /// Largest denominator a duration is quantized to, in fractions of a whole note
    pub max_subdivision: u32,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            author: "nootone".into(),
            source: "https://nootone.io".into(),
            max_subdivision: 16,
        }
    }
}

/// Beat unit and tempo as written in the `Q:` field.
///
/// Quarter-note meters count in `1/d`. Compound meters (numerator divisible
/// by three, denominator other than 4) count in dotted `3/d` beats, played
/// one and a half times as fast.
fn tempo_marking(time_signature: TimeSignature, tempo: f64) -> (Fraction, f64) {
    let d = time_signature.denominator as i64;
    if d != 4 && time_signature.numerator % 3 == 0 {
        (Fraction::new(3, d), tempo * 1.5)
    } else {
        (Fraction::new(1, d), tempo)
    }
}

/// Duration-weighted pitch-class histogram; the heaviest class is the tonic
/// and the heavier of its major or minor third picks the mode.
fn detect_key(sequence: &SymbolicMusicSequence) -> KeySignature {
    let mut weights = [0.0_f64; 12];
    for part in &sequence.instrumental_parts {
        for note in part.chord_events.iter().flat_map(|c| &c.notes) {
            weights[note.pitch as usize % 12] += note.duration;
        }
    }
    let root = crate::harmony::chroma::argmax(&weights);
    let mode = if weights[(root + 4) % 12] >= weights[(root + 3) % 12] {
        Mode::Major
    } else {
        Mode::Minor
    };
    KeySignature::new(root as u8, mode)
}

fn clef(chords: &[ChordEvent]) -> &'static str {
    let (sum, count) = chords
        .iter()
        .flat_map(|c| &c.notes)
        .fold((0.0, 0usize), |(sum, count), n| (sum + n.pitch as f64, count + 1));
    if count > 0 && (sum / count as f64 / 12.0).round() <= 4.0 {
        "bass"
    } else {
        "treble"
    }
}

pub struct ScoreRenderer<'a> {
    sequence: &'a SymbolicMusicSequence,
    options: ScoreOptions,
    key: KeySignature,
    spelled_key: SpelledKey,
    beat_unit: Fraction,
    measure: Fraction,
    whole_note_duration: f64,
    beats_per_measure: usize,
    num_measures: usize,
}

impl<'a> ScoreRenderer<'a> {
    pub fn new(sequence: &'a SymbolicMusicSequence) -> Result<Self> {
        Self::with_options(sequence, ScoreOptions::default())
    }

    pub fn with_options(sequence: &'a SymbolicMusicSequence, options: ScoreOptions) -> Result<Self> {
        if !(sequence.tempo > 0.0 && sequence.tempo.is_finite()) {
            return Err(NootoneError::InvalidTempo(sequence.tempo));
        }
        if options.max_subdivision == 0 {
            return Err(NootoneError::InvalidParameter { name: "max_subdivision", value: 0.0 });
        }

        let (beat_unit, tempo) = tempo_marking(sequence.time_signature, sequence.tempo);
        let measure = sequence.time_signature.measure();
        let whole_note_duration = 4.0 * 60.0 / tempo;
        let bar_duration = whole_note_duration * measure.to_f64();

        let ratio = measure / beat_unit;
        let beats_per_measure = (ratio.n / ratio.d).max(1) as usize;
        let num_measures = (sequence.duration() / bar_duration - LENGTH_EPSILON).ceil().max(1.0) as usize;

        let key = detect_key(sequence);
        tracing::debug!(%key, beat_unit = %beat_unit, num_measures, "score layout");

        Ok(Self {
            sequence,
            options,
            key,
            spelled_key: SpelledKey::new(key),
            beat_unit,
            measure,
            whole_note_duration,
            beats_per_measure,
            num_measures,
        })
    }

    pub fn key_signature(&self) -> KeySignature {
        self.key
    }

    pub fn beat_unit(&self) -> Fraction {
        self.beat_unit
    }

    pub fn num_measures(&self) -> usize {
        self.num_measures
    }

    fn quantize(&self, seconds: f64) -> Fraction {
        decimal_to_fraction(seconds / self.whole_note_duration, &[self.options.max_subdivision])
    }

    fn symbolic_event(&self, chord: &ChordEvent) -> SymbolicEvent {
        let shortest = Fraction::new(1, self.options.max_subdivision as i64);
        SymbolicEvent {
            onset: self.quantize(chord.onset),
            duration: self.quantize(chord.duration()).max(shortest),
            accent: chord.notes.iter().any(|n| n.velocity > 0.5),
            pitches: chord.pitches(),
        }
    }

    fn beats(&self, part: usize, chords: &[ChordEvent], diagnostics: &mut Vec<ScoreDiagnostic>) -> Vec<SymbolicBeat> {
        let mut events: Vec<SymbolicEvent> = chords
            .iter()
            .filter(|c| !c.notes.is_empty())
            .map(|c| self.symbolic_event(c))
            .collect();
        events.sort_by(|a, b| a.onset.cmp(&b.onset));

        let mut beats: Vec<SymbolicBeat> = (0..self.num_measures * self.beats_per_measure)
            .map(|i| SymbolicBeat {
                onset: self.beat_unit * Fraction::from_integer(i as i64),
                duration: self.beat_unit,
                events: Vec::new(),
            })
            .collect();

        let beat_length = self.beat_unit.to_f64();
        for (i, event) in events.iter().enumerate() {
            let index = (event.onset.to_f64() / beat_length + BEAT_EPSILON).floor();
            if index < 0.0 || index as usize >= beats.len() {
                tracing::debug!(part, onset = %event.onset, "event outside the score");
                continue;
            }
            let beat = &mut beats[index as usize];

            // no ties: an event stops at its beat end or at the next onset
            let mut limit = (beat.onset + beat.duration).min(event.end());
            if let Some(next) = events.get(i + 1) {
                limit = limit.min(next.onset);
            }
            let duration = limit - event.onset;
            if duration <= Fraction::ZERO {
                continue;
            }
            beat.events.push(SymbolicEvent { duration, ..event.clone() });
        }

        for (index, beat) in beats.iter_mut().enumerate() {
            let mut cursor = beat.onset;
            let mut filled = Vec::with_capacity(beat.events.len() * 2 + 1);
            for event in beat.events.drain(..) {
                if event.onset > cursor {
                    filled.push(SymbolicEvent::rest(cursor, event.onset - cursor));
                }
                cursor = cursor.max(event.end());
                filled.push(event);
            }
            let end = beat.onset + beat.duration;
            if end > cursor {
                filled.push(SymbolicEvent::rest(cursor, end - cursor));
            }
            beat.events = filled;

            let actual = beat.filled_duration();
            if actual != beat.duration {
                tracing::warn!(part, beat = index, expected = %beat.duration, actual = %actual, "beat duration mismatch");
                diagnostics.push(ScoreDiagnostic::BeatDuration { part, beat: index, expected: beat.duration, actual });
            }
        }
        beats
    }

    /// Quantize one part into measures, reporting any duration mismatches.
    pub fn part_measures(&self, part: usize, chords: &[ChordEvent]) -> (Vec<SymbolicMeasure>, Vec<ScoreDiagnostic>) {
        let mut diagnostics = Vec::new();
        let beats = self.beats(part, chords, &mut diagnostics);

        let mut measures: Vec<SymbolicMeasure> = (0..self.num_measures)
            .map(|i| SymbolicMeasure {
                onset: self.measure * Fraction::from_integer(i as i64),
                duration: self.measure,
                beats: Vec::new(),
            })
            .collect();

        let measure_length = self.measure.to_f64();
        for beat in beats {
            let index = (beat.onset.to_f64() / measure_length + MEASURE_EPSILON).floor() as usize;
            if let Some(measure) = measures.get_mut(index) {
                measure.beats.push(beat);
            }
        }

        // the final measure may legitimately be short
        let last = measures.len().saturating_sub(1);
        for (index, measure) in measures.iter().enumerate().take(last) {
            let actual = measure.filled_duration();
            if actual != measure.duration {
                tracing::warn!(part, measure = index, expected = %measure.duration, actual = %actual, "measure duration mismatch");
                diagnostics.push(ScoreDiagnostic::MeasureDuration {
                    part,
                    measure: index,
                    expected: measure.duration,
                    actual,
                });
            }
        }

        (measures, diagnostics)
    }

    fn pitch_text(&self, pitch: u8) -> String {
        let mut text = self.spelled_key.spell(pitch % 12).to_string();
        let octave = (pitch as i32 - 60).div_euclid(12);
        let marker = if octave > 0 { "'" } else { "," };
        text.push_str(&marker.repeat(octave.unsigned_abs() as usize));
        text
    }

    fn event_text(&self, event: &SymbolicEvent) -> String {
        let mut text = String::new();
        if event.is_rest() {
            text.push('z');
        } else {
            text.push('[');
            if event.accent {
                text.push('L');
            }
            for &pitch in &event.pitches {
                text.push_str(&self.pitch_text(pitch));
            }
            text.push(']');
        }
        text.push_str(&event.duration.to_string());
        text
    }

    fn voice_text(&self, index: usize, part: &InstrumentalPart, diagnostics: &mut Vec<ScoreDiagnostic>) -> String {
        let (measures, found) = self.part_measures(index, &part.chord_events);
        diagnostics.extend(found);

        let name = part.name.display_name();
        let short = name.chars().next().unwrap_or('?');
        let mut voice = format!(
            "V: {} clef={} name=\"{}\" snm=\"{}.\"\n",
            index + 1,
            clef(&part.chord_events),
            name,
            short
        );
        for (i, measure) in measures.iter().enumerate() {
            voice.push_str(" |");
            for beat in &measure.beats {
                for event in &beat.events {
                    voice.push_str(&self.event_text(event));
                }
                voice.push(' ');
            }
            if i + 1 == measures.len() {
                voice.push('|');
            }
        }
        voice.push_str("|\n");
        voice
    }

    fn header(&self) -> String {
        let mut header = String::new();
        header.push_str("X: 1\n");
        header.push_str(&format!("T: {}\n", self.sequence.title));
        header.push_str(&format!("M: {}\n", self.sequence.time_signature));
        header.push_str("L: 1/1\n");
        header.push_str(&format!("C: {}\n", self.options.author));
        header.push_str("%%stretchlast \n");
        header.push_str("%%stretchstaff \n");
        header.push_str(&format!("Q: {}={}\n", self.beat_unit, self.sequence.tempo.round()));
        header.push_str(&format!("K: {}\n", self.spelled_key));
        header.push_str(&format!("S: {}\n", self.options.source));
        header
    }

    pub fn render(&self) -> String {
        self.render_with_diagnostics().0
    }

    /// The document plus every beat or measure whose length did not add up.
    pub fn render_with_diagnostics(&self) -> (String, Vec<ScoreDiagnostic>) {
        let mut diagnostics = Vec::new();
        let mut score = self.header();
        for (index, part) in self.sequence.instrumental_parts.iter().enumerate() {
            score.push_str(&self.voice_text(index, part, &mut diagnostics));
        }
        tracing::info!(
            parts = self.sequence.instrumental_parts.len(),
            measures = self.num_measures,
            diagnostics = diagnostics.len(),
            "score rendered"
        );
        (score, diagnostics)
    }
}
