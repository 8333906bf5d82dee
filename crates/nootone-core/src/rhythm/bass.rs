//! Accompaniment lines derived from a chord progression: bass, pads, dynamics

use fastrand::Rng;

use super::arpeggiator::{arpeggiate, ArpeggiateParams};
use crate::error::Result;
use crate::harmony::voice_leading::apply_voice_leading;
use crate::music::{ChordEvent, ChordNote};
use crate::numeric::{fill_pitch_range, find_nearest_index};

const BASS_LOWER_PITCH: i32 = 21;
const BASS_UPPER_PITCH: i32 = 55;
/// Range of the random register the first bass note is placed in
const BASS_REGISTER: std::ops::Range<i32> = 21..41;

/// Move the lowest note into `[register, register + 13)` and stack the other
/// chord tones as a scale within the octave above it.
fn reorder_chord_notes(pitches: &[i32], register: i32) -> Result<Vec<i32>> {
    let Some((&bass, upper)) = pitches.split_first() else {
        return Ok(Vec::new());
    };
    let bass = fill_pitch_range(&[bass], register, register + 13)?
        .first()
        .copied()
        .unwrap_or(bass);
    let mut reordered = vec![bass];
    if !upper.is_empty() {
        reordered.extend(fill_pitch_range(upper, bass + 1, bass + 13)?);
    }
    Ok(reordered)
}

fn sorted_pitches(chord: &ChordEvent) -> Vec<i32> {
    let mut pitches: Vec<i32> = chord.notes.iter().map(|n| n.pitch as i32).collect();
    pitches.sort_unstable();
    pitches
}

fn to_pitch(p: i32) -> u8 {
    p.clamp(0, 127) as u8
}

/// A monophonic bass line following the progression.
///
/// The first chord is dropped into a random low register, the progression is
/// voice-led below the harmony, then arpeggiated with a sparser pattern than
/// the lead. Only the lowest note of each attack is kept, and notes are cut so
/// they never overlap the next one.
pub fn generate_bass_line(chords: &[ChordEvent], params: &ArpeggiateParams, rng: &mut Rng) -> Result<Vec<ChordEvent>> {
    if chords.is_empty() {
        return Ok(Vec::new());
    }

    let register = rng.i32(BASS_REGISTER);
    let mut progression: Vec<Vec<i32>> = chords.iter().map(sorted_pitches).collect();
    if let Some(first) = progression.first_mut() {
        *first = reorder_chord_notes(first, register)?;
    }
    let led = apply_voice_leading(&progression, BASS_LOWER_PITCH, BASS_UPPER_PITCH, rng);

    let scales: Vec<ChordEvent> = chords
        .iter()
        .zip(&led)
        .map(|(chord, pitches)| {
            let pitches: Vec<u8> = pitches.iter().map(|&p| to_pitch(p)).collect();
            ChordEvent::from_pitches(chord.onset, &pitches, chord.duration(), 1.0)
        })
        .collect();

    let sparse = ArpeggiateParams {
        num_attacks: ((params.num_attacks as f64 * rng.f64()).floor() as usize).max(1),
        contour_size: ((params.contour_size as f64 * rng.f64()).floor() as usize).max(1),
        ..*params
    };
    let mut line = arpeggiate(&scales, &sparse, rng)?;
    for event in &mut line {
        if let Some(lowest) = event.notes.iter().copied().min_by_key(|n| n.pitch) {
            event.notes = vec![lowest];
        }
    }

    apply_legato(&mut line);
    Ok(line)
}

/// Bass line without rhythm: each chord's lowest note an octave down.
pub fn block_bass_line(chords: &[ChordEvent]) -> Vec<ChordEvent> {
    let mut line: Vec<ChordEvent> = chords
        .iter()
        .filter_map(|chord| {
            let lowest = chord.notes.iter().copied().min_by_key(|n| n.pitch)?;
            let note = ChordNote { pitch: lowest.pitch.saturating_sub(12), ..lowest };
            Some(ChordEvent::new(chord.onset, vec![note]))
        })
        .collect();
    apply_legato(&mut line);
    line
}

/// Sort by onset and cap every note so it ends by the next event's onset.
///
/// Mutates the line in place; run it before anything else reads the events.
pub fn apply_legato(events: &mut [ChordEvent]) {
    events.sort_by(|a, b| a.onset.total_cmp(&b.onset));
    for i in 1..events.len() {
        let gap = events[i].onset - events[i - 1].onset;
        for note in &mut events[i - 1].notes {
            note.duration = note.duration.min(gap);
        }
    }
}

/// Sustained pads: durations scaled by a power of two that shrinks with
/// grooviness, soft random velocities.
pub fn generate_pads(chords: &[ChordEvent], grooviness: f64, rng: &mut Rng) -> Vec<ChordEvent> {
    let scale = 2f64.powf((1.0 - grooviness.clamp(0.0, 0.99)).log2().round());
    chords
        .iter()
        .map(|chord| {
            let notes = chord
                .notes
                .iter()
                .map(|n| ChordNote::new(n.pitch, n.duration * scale, rng.f64() * 0.4 + 0.1))
                .collect();
            ChordEvent::new(chord.onset, notes)
        })
        .collect()
}

/// Scale each target chord's velocities by the mean velocity of the source
/// chord nearest to it in time. `source` must be sorted by onset.
pub fn transfer_velocity(source: &[ChordEvent], target: &mut [ChordEvent]) {
    let onsets: Vec<f64> = source.iter().map(|c| c.onset).collect();
    for chord in target.iter_mut() {
        let Some(index) = find_nearest_index(&onsets, chord.onset) else {
            return;
        };
        let notes = &source[index].notes;
        if notes.is_empty() {
            continue;
        }
        let mean = notes.iter().map(|n| n.velocity).sum::<f64>() / notes.len() as f64;
        for note in &mut chord.notes {
            note.velocity *= mean;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progression() -> Vec<ChordEvent> {
        vec![
            ChordEvent::from_pitches(0.0, &[48, 60, 64, 67], 2.0, 1.0),
            ChordEvent::from_pitches(2.0, &[53, 60, 65, 69], 2.0, 1.0),
            ChordEvent::from_pitches(4.0, &[55, 62, 67, 71], 2.0, 1.0),
        ]
    }

    fn params() -> ArpeggiateParams {
        ArpeggiateParams {
            num_attacks: 6,
            max_subdiv: 4,
            pattern_size: 2,
            contour_size: 8,
            tempo: 120.0,
            groove: false,
        }
    }

    #[test]
    fn test_reorder_chord_notes() {
        let reordered = reorder_chord_notes(&[48, 60, 64, 67], 28).unwrap();
        // C moves to 36, E and G stack above it
        assert_eq!(reordered, vec![36, 40, 43, 48]);
    }

    #[test]
    fn test_bass_line_is_monophonic_and_low() {
        for seed in 0..10 {
            let mut rng = Rng::with_seed(seed);
            let line = generate_bass_line(&progression(), &params(), &mut rng).unwrap();
            assert!(!line.is_empty());
            for event in &line {
                assert_eq!(event.notes.len(), 1);
                // only the first chord may sit above the voice-leading range
                assert!(event.notes[0].pitch < 65);
            }
            for pair in line.windows(2) {
                assert!(pair[0].end() <= pair[1].onset + 1e-9);
            }
        }
    }

    #[test]
    fn test_block_bass_line() {
        let line = block_bass_line(&progression());
        let pitches: Vec<u8> = line.iter().map(|c| c.notes[0].pitch).collect();
        assert_eq!(pitches, vec![36, 41, 43]);
    }

    #[test]
    fn test_apply_legato() {
        let mut events = vec![
            ChordEvent::from_pitches(1.0, &[40], 3.0, 1.0),
            ChordEvent::from_pitches(0.0, &[36], 3.0, 1.0),
        ];
        apply_legato(&mut events);
        assert_eq!(events[0].onset, 0.0);
        assert_eq!(events[0].notes[0].duration, 1.0);
        assert_eq!(events[1].notes[0].duration, 3.0);
    }

    #[test]
    fn test_generate_pads() {
        let mut rng = Rng::with_seed(3);
        let pads = generate_pads(&progression(), 0.6, &mut rng);
        // log2(0.4) rounds to -1
        assert!(pads.iter().flat_map(|c| &c.notes).all(|n| n.duration == 1.0));
        assert!(pads.iter().flat_map(|c| &c.notes).all(|n| (0.1..0.5).contains(&n.velocity)));

        let steady = generate_pads(&progression(), 0.0, &mut rng);
        assert!(steady.iter().flat_map(|c| &c.notes).all(|n| n.duration == 2.0));
    }

    #[test]
    fn test_transfer_velocity() {
        let source = vec![
            ChordEvent::from_pitches(0.0, &[60, 64], 1.0, 0.5),
            ChordEvent::from_pitches(2.0, &[62], 1.0, 0.25),
        ];
        let mut target = vec![
            ChordEvent::from_pitches(0.4, &[48], 1.0, 1.0),
            ChordEvent::from_pitches(1.8, &[50], 1.0, 0.8),
        ];
        transfer_velocity(&source, &mut target);
        assert_eq!(target[0].notes[0].velocity, 0.5);
        assert_eq!(target[1].notes[0].velocity, 0.2);
    }
}
