//! Harmonic analysis: chroma matching, key estimation, voice leading

pub mod chroma;
mod harmonizer;
mod key;
pub mod vocabulary;
pub mod voice_leading;

pub use chroma::Chroma;
pub use harmonizer::{ChordCandidate, ChordIndexCache, ChordTemplateIndex, HarmonizeParams, NoteHarmonizer};
pub use key::{key_templates, KeySignature, Mode};
pub use vocabulary::ChordVocabulary;
pub use voice_leading::{apply_voice_leading, connect_chords};
