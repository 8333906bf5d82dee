//! Pattern-based arpeggiator
//!
//! A pattern is a set of grid slots, each carrying a contour position that
//! picks a chord member. One base pattern is generated and tiled across the
//! progression; every tile after the first is a lightly mutated copy.

use fastrand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NootoneError, Result};
use crate::music::{ChordEvent, ChordNote};
use crate::numeric::find_nearest_index;

/// Tolerance when comparing grid onsets against chord onsets
const ONSET_EPSILON: f64 = 1e-9;

/// One attack inside an [`ArpeggioPattern`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArpeggioEvent {
    /// Grid slot of the onset
    pub slot: usize,
    /// Normalized contour position (0.0 = lowest chord member, 1.0 = highest)
    pub voice: f64,
    /// Length in grid slots, at least 1
    pub length: usize,
}

/// A reusable rhythm covering exactly one pattern cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArpeggioPattern {
    /// Grid resolution in seconds
    pub quantum_unit: f64,
    /// Number of grid slots in one cycle
    pub slots: usize,
    /// Ordered by slot
    pub events: Vec<ArpeggioEvent>,
}

impl ArpeggioPattern {
    pub fn duration(&self) -> f64 {
        self.slots as f64 * self.quantum_unit
    }

    pub fn relative_onset(&self, event: &ArpeggioEvent) -> f64 {
        event.slot as f64 * self.quantum_unit
    }

    pub fn event_duration(&self, event: &ArpeggioEvent) -> f64 {
        event.length as f64 * self.quantum_unit
    }

    fn empty_slots(&self) -> Vec<usize> {
        (0..self.slots)
            .filter(|slot| !self.events.iter().any(|e| e.slot == *slot))
            .collect()
    }

    fn sort(&mut self) {
        self.events
            .sort_by(|a, b| a.slot.cmp(&b.slot).then(a.voice.total_cmp(&b.voice)));
    }

    /// A variant with one or two random edits: prune, add or relocate an event.
    ///
    /// The first event is never pruned or moved, so every tile keeps its downbeat.
    pub fn mutate(&self, rng: &mut Rng) -> ArpeggioPattern {
        let mut pattern = self.clone();
        let edits = 1 + rng.usize(..2);
        for _ in 0..edits {
            match rng.usize(..3) {
                0 => {
                    if pattern.events.len() > 1 {
                        let index = rng.usize(1..pattern.events.len());
                        pattern.events.remove(index);
                    }
                }
                1 => {
                    let empty = pattern.empty_slots();
                    if !empty.is_empty() {
                        let slot = empty[rng.usize(..empty.len())];
                        let length = rng.usize(1..=pattern.slots - slot);
                        pattern.events.push(ArpeggioEvent { slot, voice: rng.f64(), length });
                    }
                }
                _ => {
                    let empty = pattern.empty_slots();
                    if pattern.events.len() > 1 && !empty.is_empty() {
                        let index = rng.usize(1..pattern.events.len());
                        let slot = empty[rng.usize(..empty.len())];
                        let event = &mut pattern.events[index];
                        event.slot = slot;
                        event.length = event.length.min(pattern.slots - slot).max(1);
                    }
                }
            }
            pattern.sort();
        }
        pattern
    }
}

/// `size` contour positions in `[0, 1]`: either uniform noise stretched to
/// the full range, or an evenly spaced ramp in random order.
pub fn create_random_contour(rng: &mut Rng, size: usize) -> Vec<f64> {
    if size == 0 {
        return Vec::new();
    }
    if rng.bool() {
        let values: Vec<f64> = (0..size).map(|_| rng.f64()).collect();
        if size == 1 {
            return values;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = max - min;
        values
            .into_iter()
            .map(|v| if span > 0.0 { (v - min) / span } else { 0.0 })
            .collect()
    } else {
        let mut values: Vec<f64> = if size == 1 {
            vec![0.0]
        } else {
            (0..size).map(|i| i as f64 / (size - 1) as f64).collect()
        };
        rng.shuffle(&mut values);
        values
    }
}

/// `count` distinct slots out of `0..range`, ascending.
pub fn choose_unique_slots(rng: &mut Rng, count: usize, range: usize) -> Result<Vec<usize>> {
    if count > range {
        return Err(NootoneError::NotEnoughSlots { requested: count, available: range });
    }
    let mut slots: Vec<usize> = (0..range).collect();
    rng.shuffle(&mut slots);
    slots.truncate(count);
    slots.sort_unstable();
    Ok(slots)
}

/// Build one pattern cycle.
///
/// Attacks land on `min(num_attacks, slots)` distinct grid slots, shifted so
/// the first one falls on the downbeat. Contour positions spread evenly over
/// the cycle are assigned to their nearest attack. Note-offs are drawn from
/// later slots and never move backwards from one attack to the next.
pub fn generate_arpeggio_pattern(
    rng: &mut Rng,
    num_attacks: usize,
    quantum_unit: f64,
    pattern_duration: f64,
    contour_size: usize,
) -> Result<ArpeggioPattern> {
    if !(quantum_unit > 0.0) {
        return Err(NootoneError::InvalidParameter { name: "quantum_unit", value: quantum_unit });
    }
    let slots = (pattern_duration / quantum_unit + ONSET_EPSILON).floor();
    if !(slots >= 1.0) {
        return Err(NootoneError::InvalidParameter { name: "pattern_duration", value: pattern_duration });
    }
    let slots = slots as usize;
    if num_attacks == 0 {
        return Err(NootoneError::InvalidParameter { name: "num_attacks", value: 0.0 });
    }
    if contour_size == 0 {
        return Err(NootoneError::InvalidParameter { name: "contour_size", value: 0.0 });
    }

    let contour = create_random_contour(rng, contour_size);

    let mut grid = choose_unique_slots(rng, num_attacks.min(slots), slots)?;
    let offset = grid[0];
    for slot in &mut grid {
        *slot -= offset;
    }
    let grid_onsets: Vec<f64> = grid.iter().map(|&s| s as f64).collect();

    let mut voices_per_slot: Vec<Vec<f64>> = vec![Vec::new(); grid.len()];
    for (i, &voice) in contour.iter().enumerate() {
        let position = i as f64 / contour_size as f64 * slots as f64;
        if let Some(nearest) = find_nearest_index(&grid_onsets, position) {
            voices_per_slot[nearest].push(voice);
        }
    }

    let mut events = Vec::with_capacity(contour_size);
    let mut previous_end = 0;
    for (&slot, voices) in grid.iter().zip(&voices_per_slot) {
        if voices.is_empty() {
            continue;
        }
        let earliest_end = (slot + 1).max(previous_end);
        let end = rng.usize(earliest_end..=slots);
        previous_end = end;
        for &voice in voices {
            events.push(ArpeggioEvent { slot, voice, length: end - slot });
        }
    }

    Ok(ArpeggioPattern { quantum_unit, slots, events })
}

/// Inputs for [`arpeggiate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArpeggiateParams {
    pub num_attacks: usize,
    /// Grid subdivisions per beat
    pub max_subdiv: usize,
    /// Pattern length in beats
    pub pattern_size: usize,
    pub contour_size: usize,
    /// Beats per minute
    pub tempo: f64,
    /// Cut each note at its pattern length instead of letting it ring to the next chord
    pub groove: bool,
}

impl ArpeggiateParams {
    pub fn beat_duration(&self) -> f64 {
        60.0 / self.tempo
    }

    pub fn pattern_duration(&self) -> f64 {
        self.beat_duration() * self.pattern_size as f64
    }

    pub fn quantum_unit(&self) -> f64 {
        self.beat_duration() / self.max_subdiv as f64
    }

    fn validate(&self) -> Result<()> {
        if !(self.tempo > 0.0 && self.tempo.is_finite()) {
            return Err(NootoneError::InvalidTempo(self.tempo));
        }
        if self.max_subdiv == 0 {
            return Err(NootoneError::InvalidParameter { name: "max_subdiv", value: 0.0 });
        }
        if self.pattern_size == 0 {
            return Err(NootoneError::InvalidParameter { name: "pattern_size", value: 0.0 });
        }
        Ok(())
    }
}

pub(crate) fn random_velocity(rng: &mut Rng) -> f64 {
    0.5 + rng.f64() * 0.5
}

/// Tile an arpeggio pattern across a chord progression.
///
/// The output covers `[first onset, first onset + pattern duration × cycles]`
/// where `cycles` is the number of whole patterns needed to cover the input,
/// and ends with the last chord struck again at the upper bound.
pub fn arpeggiate(chords: &[ChordEvent], params: &ArpeggiateParams, rng: &mut Rng) -> Result<Vec<ChordEvent>> {
    params.validate()?;

    let mut sorted: Vec<&ChordEvent> = chords.iter().filter(|c| !c.notes.is_empty()).collect();
    sorted.sort_by(|a, b| a.onset.total_cmp(&b.onset));
    let (Some(&first), Some(&last)) = (sorted.first(), sorted.last()) else {
        return Ok(Vec::new());
    };

    let quantum = params.quantum_unit();
    let pattern_duration = params.pattern_duration();
    let base = generate_arpeggio_pattern(rng, params.num_attacks, quantum, pattern_duration, params.contour_size)?;
    let slots = base.slots;

    let start = first.onset;
    let total = last.onset - start + last.duration();
    let cycles = ((total / pattern_duration) - ONSET_EPSILON).ceil().max(1.0) as usize;
    let span_end = start + (cycles * slots) as f64 * quantum;

    let mut output: Vec<ChordEvent> = Vec::new();
    let mut cursor = 0;
    for cycle in 0..cycles {
        let pattern = if cycle == 0 { base.clone() } else { base.mutate(rng) };
        for event in &pattern.events {
            let onset = start + (cycle * slots + event.slot) as f64 * quantum;
            while cursor + 1 < sorted.len() && sorted[cursor + 1].onset <= onset + ONSET_EPSILON {
                cursor += 1;
            }
            let chord = sorted[cursor];
            let boundary = sorted.get(cursor + 1).map_or(span_end, |next| next.onset);

            let mut duration = boundary - onset;
            if params.groove {
                duration = duration.min(pattern.event_duration(event));
            }
            if duration <= ONSET_EPSILON {
                continue;
            }

            let mut pitches = chord.pitches();
            pitches.sort_unstable();
            let member = ((event.voice * (pitches.len() - 1) as f64).floor() as usize).min(pitches.len() - 1);
            let note = ChordNote::new(pitches[member], duration, random_velocity(rng));

            match output.last_mut() {
                Some(group) if (group.onset - onset).abs() < ONSET_EPSILON => {
                    match group.notes.iter_mut().find(|n| n.pitch == note.pitch) {
                        Some(existing) => existing.duration = existing.duration.max(note.duration),
                        None => group.notes.push(note),
                    }
                }
                _ => output.push(ChordEvent::new(onset, vec![note])),
            }
        }
    }

    let closing = last
        .notes
        .iter()
        .map(|n| ChordNote::new(n.pitch, n.duration, random_velocity(rng)))
        .collect();
    output.push(ChordEvent::new(span_end, closing));

    tracing::debug!(cycles, events = output.len(), "arpeggiated");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ArpeggiateParams {
        ArpeggiateParams {
            num_attacks: 5,
            max_subdiv: 4,
            pattern_size: 2,
            contour_size: 6,
            tempo: 120.0,
            groove: false,
        }
    }

    fn progression() -> Vec<ChordEvent> {
        vec![
            ChordEvent::from_pitches(0.0, &[48, 60, 64, 67], 2.0, 1.0),
            ChordEvent::from_pitches(2.0, &[53, 60, 65, 69], 2.0, 1.0),
            ChordEvent::from_pitches(4.0, &[55, 62, 67, 71], 1.5, 1.0),
        ]
    }

    #[test]
    fn test_contour_is_normalized() {
        let mut rng = Rng::with_seed(11);
        for size in [1, 2, 6, 12] {
            let contour = create_random_contour(&mut rng, size);
            assert_eq!(contour.len(), size);
            assert!(contour.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_choose_unique_slots() {
        let mut rng = Rng::with_seed(2);
        let slots = choose_unique_slots(&mut rng, 4, 8).unwrap();
        assert_eq!(slots.len(), 4);
        assert!(slots.windows(2).all(|w| w[0] < w[1]));
        assert!(choose_unique_slots(&mut rng, 9, 8).is_err());
    }

    #[test]
    fn test_pattern_shape() {
        for seed in 0..30 {
            let mut rng = Rng::with_seed(seed);
            let pattern = generate_arpeggio_pattern(&mut rng, 5, 0.125, 1.0, 6).unwrap();
            assert_eq!(pattern.slots, 8);
            assert_eq!(pattern.events[0].slot, 0); // starts on the downbeat
            assert!(pattern.events.windows(2).all(|w| w[0].slot <= w[1].slot));

            let mut previous_end = 0;
            for event in &pattern.events {
                assert!(event.length >= 1);
                let end = event.slot + event.length;
                assert!(end <= pattern.slots);
                assert!(end >= previous_end);
                previous_end = end;
            }
        }
    }

    #[test]
    fn test_more_attacks_than_slots_is_capped() {
        let mut rng = Rng::with_seed(5);
        let pattern = generate_arpeggio_pattern(&mut rng, 64, 0.25, 1.0, 16).unwrap();
        let mut slots: Vec<usize> = pattern.events.iter().map(|e| e.slot).collect();
        slots.dedup();
        assert!(slots.len() <= 4);
    }

    #[test]
    fn test_mutation_keeps_downbeat() {
        let mut rng = Rng::with_seed(8);
        let pattern = generate_arpeggio_pattern(&mut rng, 6, 0.125, 1.0, 8).unwrap();
        for _ in 0..50 {
            let variant = pattern.mutate(&mut rng);
            assert_eq!(variant.events[0].slot, 0);
            assert!(variant.events.iter().all(|e| e.slot < variant.slots && e.length >= 1));
            assert!(variant.events.iter().all(|e| e.slot + e.length <= variant.slots));
        }
    }

    #[test]
    fn test_arpeggiate_span() {
        for seed in 0..20 {
            let mut rng = Rng::with_seed(seed);
            let out = arpeggiate(&progression(), &params(), &mut rng).unwrap();
            // 5.5 s of chords in 1 s patterns -> 6 cycles
            let last = out.last().unwrap();
            assert_eq!(last.onset, 6.0);
            assert_eq!(last.pitches(), vec![55, 62, 67, 71]);
            assert!(out.iter().all(|c| c.onset >= 0.0 && c.onset <= 6.0));
            assert!(out[..out.len() - 1].iter().all(|c| c.end() <= 6.0 + 1e-9));
        }
    }

    #[test]
    fn test_arpeggiate_onsets_on_grid() {
        let mut rng = Rng::with_seed(4);
        let out = arpeggiate(&progression(), &params(), &mut rng).unwrap();
        for chord in &out {
            let steps = chord.onset / 0.125;
            assert!((steps - steps.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_arpeggiate_uses_active_chord() {
        let mut rng = Rng::with_seed(6);
        let chords = progression();
        let out = arpeggiate(&chords, &params(), &mut rng).unwrap();
        for event in &out[..out.len() - 1] {
            let active = chords.iter().rev().find(|c| c.onset <= event.onset + 1e-9).unwrap();
            for note in &event.notes {
                assert!(active.pitches().contains(&note.pitch));
                assert!((0.5..1.0).contains(&note.velocity));
            }
        }
    }

    #[test]
    fn test_groove_caps_durations() {
        let mut rng = Rng::with_seed(10);
        let groove = ArpeggiateParams { groove: true, ..params() };
        let out = arpeggiate(&progression(), &groove, &mut rng).unwrap();
        for event in &out[..out.len() - 1] {
            for note in &event.notes {
                assert!(note.duration <= 1.0 + 1e-9);
            }
        }
    }

    #[test]
    fn test_arpeggiate_empty_and_invalid() {
        let mut rng = Rng::with_seed(1);
        assert!(arpeggiate(&[], &params(), &mut rng).unwrap().is_empty());
        let bad = ArpeggiateParams { tempo: 0.0, ..params() };
        assert!(arpeggiate(&progression(), &bad, &mut rng).is_err());
    }
}
