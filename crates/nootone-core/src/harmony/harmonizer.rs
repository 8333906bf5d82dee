//! Chroma-matching harmonizer
//!
//! Notes are cut into fixed-length segments. Each segment's chroma is smoothed
//! against the previous one, pulled toward an estimated key, then matched
//! against a k-d tree of chord templates.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::chroma::{self, Chroma};
use super::key::{key_templates, KeySignature};
use super::vocabulary::ChordVocabulary;
use crate::error::{NootoneError, Result};
use crate::kdtree::KdTree;
use crate::music::{ChordEvent, NoteEvent};

/// Tolerance when assigning a note onset to its segment
const SEGMENT_EPSILON: f64 = 1e-5;
/// Decay applied to successive chord members when building templates
const MEMBER_DECAY: f64 = 1.125;
/// Pitch the sounding chord tones are placed above
const CHORD_BASE_PITCH: u8 = 60;
const HARMONY_VELOCITY: f64 = 0.4;

/// Knobs for [`NoteHarmonizer::harmonize`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonizeParams {
    /// Segment length in seconds
    pub segment_size: f64,
    /// Weight of the previous segment's chroma (0..1)
    pub harmonic_memory: f64,
    /// Pull toward the estimated key (0 disables key estimation)
    pub key_signature_weight: f64,
    /// Number of segments used to estimate the key
    pub look_ahead: usize,
    /// Template bins above this value are sounding
    pub activation_threshold: f64,
    /// Key blend baked into every chord template
    pub key_signature_embedding: f64,
}

impl Default for HarmonizeParams {
    fn default() -> Self {
        Self {
            segment_size: 2.0,
            harmonic_memory: 0.125,
            key_signature_weight: 0.25,
            look_ahead: 2,
            activation_threshold: 0.5,
            key_signature_embedding: 0.25,
        }
    }
}

impl HarmonizeParams {
    fn validate(&self) -> Result<()> {
        let unit = |name, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(NootoneError::InvalidParameter { name, value })
            }
        };
        if !(self.segment_size > 0.0 && self.segment_size.is_finite()) {
            return Err(NootoneError::InvalidParameter { name: "segment_size", value: self.segment_size });
        }
        unit("harmonic_memory", self.harmonic_memory)?;
        unit("key_signature_weight", self.key_signature_weight)?;
        unit("activation_threshold", self.activation_threshold)?;
        unit("key_signature_embedding", self.key_signature_embedding)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordCandidate {
    /// Pitch class of the chord root
    pub root: u8,
    /// Index into the vocabulary's interval sets
    pub template: usize,
    /// Key whose profile was blended into this candidate
    pub key: KeySignature,
}

/// Every root × template × key candidate of one vocabulary, indexed for lookup.
#[derive(Debug, Clone)]
pub struct ChordTemplateIndex {
    tree: KdTree,
    candidates: Vec<ChordCandidate>,
}

impl ChordTemplateIndex {
    pub fn build(vocabulary: &ChordVocabulary, key_signature_embedding: f64) -> Result<Self> {
        let sets = vocabulary.interval_sets()?;
        let keys = key_templates();

        let mut vectors: Vec<Chroma> = Vec::with_capacity(12 * sets.len() * keys.len());
        let mut candidates = Vec::with_capacity(vectors.capacity());
        for root in 0..12u8 {
            for (template, intervals) in sets.iter().enumerate() {
                let base = chord_chroma(root, intervals);
                for (k, key_chroma) in keys.iter().enumerate() {
                    vectors.push(chroma::blend(&base, key_chroma, key_signature_embedding));
                    candidates.push(ChordCandidate { root, template, key: KeySignature::from_index(k) });
                }
            }
        }

        tracing::debug!(candidates = candidates.len(), "built chord template index");
        Ok(Self { tree: KdTree::build(&vectors)?, candidates })
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Closest candidate to `chroma` and its template vector.
    pub fn nearest(&self, chroma: &Chroma) -> Result<(ChordCandidate, &[f64])> {
        let neighbor = self.tree.nearest(chroma)?;
        Ok((self.candidates[neighbor.id], self.tree.point(neighbor.id)))
    }
}

/// Chroma of a chord whose later members are progressively quieter.
fn chord_chroma(root: u8, intervals: &[u8]) -> Chroma {
    let mut c = [0.0; 12];
    for (i, &interval) in intervals.iter().enumerate() {
        c[((root + interval) % 12) as usize] += 1.0 / MEMBER_DECAY.powi(i as i32);
    }
    chroma::normalize(c)
}

/// Sounding pitches for a matched template: active bins above middle C plus the root an octave below.
fn template_pitches(root: u8, template: &[f64], threshold: f64) -> Vec<u8> {
    let mut pitches: Vec<u8> = template
        .iter()
        .enumerate()
        .filter(|(_, v)| **v > threshold)
        .map(|(pc, _)| CHORD_BASE_PITCH + pc as u8)
        .collect();
    pitches.push(CHORD_BASE_PITCH + root - 12);
    pitches.sort_unstable();
    pitches.dedup();
    pitches
}

/// Memoized chord indices keyed by vocabulary and key embedding weight.
#[derive(Debug, Default)]
pub struct ChordIndexCache {
    entries: HashMap<(ChordVocabulary, u64), Arc<ChordTemplateIndex>>,
}

impl ChordIndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(&mut self, vocabulary: &ChordVocabulary, embedding: f64) -> Result<Arc<ChordTemplateIndex>> {
        let key = (vocabulary.clone(), embedding.to_bits());
        if let Some(index) = self.entries.get(&key) {
            return Ok(Arc::clone(index));
        }
        let index = Arc::new(ChordTemplateIndex::build(vocabulary, embedding)?);
        self.entries.insert(key, Arc::clone(&index));
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Turns a melody into a block-chord progression.
#[derive(Debug)]
pub struct NoteHarmonizer {
    key_templates: Vec<Chroma>,
    key_tree: KdTree,
    cache: ChordIndexCache,
}

impl NoteHarmonizer {
    pub fn new() -> Result<Self> {
        let key_templates = key_templates();
        let key_tree = KdTree::build(&key_templates)?;
        Ok(Self { key_templates, key_tree, cache: ChordIndexCache::new() })
    }

    /// Nearest key for a chroma vector.
    pub fn estimate_key(&self, chroma: &Chroma) -> Result<KeySignature> {
        Ok(KeySignature::from_index(self.key_tree.nearest(chroma)?.id))
    }

    /// Harmonize using the internal index cache.
    pub fn harmonize(
        &mut self,
        notes: &[NoteEvent],
        vocabulary: &ChordVocabulary,
        params: &HarmonizeParams,
    ) -> Result<Vec<ChordEvent>> {
        let index = self.cache.get_or_build(vocabulary, params.key_signature_embedding)?;
        self.harmonize_with_index(notes, &index, params)
    }

    /// Harmonize against a prebuilt index. Deterministic for a given input.
    pub fn harmonize_with_index(
        &self,
        notes: &[NoteEvent],
        index: &ChordTemplateIndex,
        params: &HarmonizeParams,
    ) -> Result<Vec<ChordEvent>> {
        params.validate()?;
        let segment_size = params.segment_size;
        let segments = segment_notes(notes, segment_size);
        let Some(first_index) = segments.first_index else {
            return Ok(Vec::new());
        };
        let look_ahead = params.look_ahead.max(1);

        let mut chords = Vec::with_capacity(segments.groups.len());
        let mut previous: Option<Chroma> = None;
        for (i, group) in segments.groups.iter().enumerate() {
            let onset = (first_index + i) as f64 * segment_size;

            let current = if group.is_empty() {
                previous.unwrap_or([0.0; 12])
            } else {
                chroma::chroma_from_notes(group, segment_size, onset)
            };
            let mut blended = match &previous {
                Some(prev) => chroma::blend(&current, prev, params.harmonic_memory),
                None => current,
            };
            previous = Some(blended);

            if params.key_signature_weight > 0.0 {
                let end = (i + look_ahead).min(segments.groups.len());
                let window = segments.groups[i..end].iter().flatten();
                let window_chroma = chroma::chroma_from_notes(window, segment_size, onset);
                if window_chroma.iter().any(|&v| v > 0.0) {
                    let key = self.estimate_key(&window_chroma)?;
                    blended = chroma::blend(&blended, &self.key_templates[key.index()], params.key_signature_weight);
                }
            }

            let (candidate, template) = index.nearest(&blended)?;
            let pitches = template_pitches(candidate.root, template, params.activation_threshold);
            chords.push(ChordEvent::from_pitches(onset, &pitches, segment_size, HARMONY_VELOCITY));
        }

        tracing::debug!(segments = chords.len(), "harmonized");
        Ok(chords)
    }
}

struct Segments {
    first_index: Option<usize>,
    /// Contiguous from `first_index`; gaps are empty groups
    groups: Vec<Vec<NoteEvent>>,
}

fn segment_notes(notes: &[NoteEvent], segment_size: f64) -> Segments {
    let index_of = |n: &NoteEvent| (n.onset.max(0.0) / segment_size + SEGMENT_EPSILON).floor() as usize;

    let Some(first) = notes.iter().map(index_of).min() else {
        return Segments { first_index: None, groups: Vec::new() };
    };
    let last = notes.iter().map(index_of).max().unwrap_or(first);

    let mut groups = vec![Vec::new(); last - first + 1];
    let mut sorted = notes.to_vec();
    sorted.sort_by(|a, b| a.onset.total_cmp(&b.onset));
    for note in sorted {
        groups[index_of(&note) - first].push(note);
    }
    Segments { first_index: Some(first), groups }
}
