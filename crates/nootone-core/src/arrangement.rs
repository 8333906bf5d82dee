//! End-to-end arrangement: melody in, chords, arpeggio, bass, pads and a score-ready sequence out

use fastrand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NootoneError, Result};
use crate::harmony::voice_leading::{VOICE_LEADING_LOWER_PITCH, VOICE_LEADING_UPPER_PITCH};
use crate::harmony::{apply_voice_leading, ChordVocabulary, NoteHarmonizer};
use crate::music::{
    generate_random_notes, note_events_to_chord_events, ChordEvent, InstrumentName, InstrumentalPart, NoteEvent,
    SymbolicMusicSequence,
};
use crate::rhythm::{arpeggiate, block_bass_line, generate_bass_line, generate_pads, transfer_velocity};
use crate::settings::{ArrangementParams, HarmonizerSettings};
use crate::timeline::Timeline;
use crate::track::{AudioClip, TrackKind};

const PAD_INSTRUMENT: InstrumentName = InstrumentName::BuzzPad;
/// Instrument the pads are notated for
const PAD_SCORE_INSTRUMENT: InstrumentName = InstrumentName::GrandPiano;
const BASS_INSTRUMENT: InstrumentName = InstrumentName::UprightBass;
const RECORDING_GAIN: f32 = 0.707;

/// Everything generated for one variation of a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrangement {
    pub title: String,
    pub tags: Vec<String>,
    pub params: ArrangementParams,
    /// Input melody grouped by onset
    pub melody: Vec<ChordEvent>,
    /// Voice-led block chords, one per harmonic segment
    pub chords: Vec<ChordEvent>,
    pub arpeggios: Vec<ChordEvent>,
    pub bass_line: Vec<ChordEvent>,
    pub pads: Vec<ChordEvent>,
    pub sequence: SymbolicMusicSequence,
}

fn style_name(vocabulary: &ChordVocabulary) -> &str {
    match vocabulary {
        ChordVocabulary::Named(name) => name,
        ChordVocabulary::Custom(_) => "custom",
    }
}

/// Harmonize `notes` and build the accompaniment parts.
pub fn arrange(
    notes: &[NoteEvent],
    tempo: f64,
    title: &str,
    settings: &HarmonizerSettings,
    rng: &mut Rng,
) -> Result<Arrangement> {
    let params = settings.parse(tempo, rng)?;
    let segment_size = params.harmonize.segment_size;

    let melody = note_events_to_chord_events(notes);
    let mut harmonizer = NoteHarmonizer::new()?;
    let predictions = harmonizer.harmonize(notes, &params.vocabulary, &params.harmonize)?;

    let progression: Vec<Vec<i32>> = predictions
        .iter()
        .map(|c| c.notes.iter().map(|n| n.pitch as i32).collect())
        .collect();
    let voiced = apply_voice_leading(&progression, VOICE_LEADING_LOWER_PITCH, VOICE_LEADING_UPPER_PITCH, rng);
    let chords: Vec<ChordEvent> = predictions
        .iter()
        .zip(&voiced)
        .map(|(prediction, pitches)| {
            let mut pitches: Vec<u8> = pitches.iter().map(|&p| p.clamp(0, 127) as u8).collect();
            pitches.sort_unstable();
            ChordEvent::from_pitches(prediction.onset, &pitches, segment_size, 1.0)
        })
        .collect();

    let mut arpeggios = if params.arpeggiate {
        arpeggiate(&chords, &params.arpeggio, rng)?
    } else {
        chords.clone()
    };
    transfer_velocity(&melody, &mut arpeggios);

    let bass_line = if params.arpeggiate {
        generate_bass_line(&chords, &params.arpeggio, rng)?
    } else {
        block_bass_line(&chords)
    };
    let pads = generate_pads(&chords, params.grooviness, rng);

    let style = style_name(&params.vocabulary);
    let title = format!("{title} ({style})");
    let sequence = SymbolicMusicSequence {
        title: title.clone(),
        tempo,
        time_signature: params.time_signature,
        instrumental_parts: vec![
            InstrumentalPart { name: params.instrument, chord_events: arpeggios.clone() },
            InstrumentalPart { name: BASS_INSTRUMENT, chord_events: bass_line.clone() },
            InstrumentalPart { name: PAD_SCORE_INSTRUMENT, chord_events: pads.clone() },
        ],
    };

    let mut tags = vec![style.to_string(), params.time_signature.to_string()];
    tags.extend(sequence.instrumental_parts.iter().map(|p| p.name.display_name()));

    tracing::info!(
        %title,
        chords = chords.len(),
        arpeggio_events = arpeggios.len(),
        bass_events = bass_line.len(),
        "arrangement generated"
    );

    Ok(Arrangement { title, tags, params, melody, chords, arpeggios, bass_line, pads, sequence })
}

impl Arrangement {
    /// Render tracks: the recording underneath, then lead, bass and pads.
    pub fn timeline(&self, recording: Option<AudioClip>) -> Timeline {
        let mut timeline = Timeline::new();
        if let Some(clip) = recording {
            let id = timeline.add_track(TrackKind::Audio(clip), "recording");
            if let Some(track) = timeline.get_track_mut(id) {
                track.gain = RECORDING_GAIN;
            }
        }
        let parts = [
            (self.params.instrument, &self.arpeggios),
            (BASS_INSTRUMENT, &self.bass_line),
            (PAD_INSTRUMENT, &self.pads),
        ];
        for (instrument, chord_events) in parts {
            timeline.add_track(
                TrackKind::Symbolic { instrument, chord_events: chord_events.clone() },
                instrument.display_name(),
            );
        }
        timeline
    }
}

/// A take to be arranged: detected notes plus the optional source audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub name: String,
    /// Beats per minute
    pub tempo: f64,
    /// Length in seconds
    pub duration: f64,
    #[serde(default)]
    pub notes: Vec<NoteEvent>,
    #[serde(default)]
    pub clip: Option<AudioClip>,
}

impl Recording {
    /// Arrange this take and lay out its render tracks.
    ///
    /// A take with no detected notes is arranged over a random placeholder melody.
    pub fn arrange(&self, settings: &HarmonizerSettings, rng: &mut Rng) -> Result<(Arrangement, Timeline)> {
        if !(self.tempo > 0.0 && self.tempo.is_finite()) {
            return Err(NootoneError::InvalidTempo(self.tempo));
        }
        let placeholder;
        let notes = if self.notes.is_empty() {
            tracing::warn!(name = %self.name, "no notes detected, using a placeholder melody");
            placeholder = generate_random_notes(rng, self.duration, self.tempo)?;
            &placeholder
        } else {
            &self.notes
        };

        let arrangement = arrange(notes, self.tempo, &self.name, settings, rng)?;
        let clip = self.clip.clone().map(|clip| match clip.duration {
            Some(_) => clip,
            None => clip.with_duration(self.duration),
        });
        let timeline = arrangement.timeline(clip);
        Ok((arrangement, timeline))
    }
}
