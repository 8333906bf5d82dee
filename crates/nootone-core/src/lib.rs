//! nootone-core: harmonization, arpeggiation and score rendering for hummed melodies

pub mod arrangement;
mod error;
pub mod fraction;
pub mod harmony;
pub mod kdtree;
pub mod music;
pub mod numeric;
pub mod rhythm;
pub mod score;
pub mod settings;
mod timeline;
mod track;

pub use arrangement::{arrange, Arrangement, Recording};
pub use error::{NootoneError, Result};
pub use fraction::{decimal_to_fraction, Fraction};
pub use harmony::{ChordVocabulary, HarmonizeParams, KeySignature, Mode, NoteHarmonizer};
pub use kdtree::{KdTree, Neighbor};
pub use music::{
    ChordEvent, ChordNote, InstrumentName, InstrumentalPart, NoteEvent, SymbolicMusicSequence, TimeSignature,
};
pub use rhythm::{arpeggiate, ArpeggiateParams, ArpeggioPattern};
pub use score::{ScoreDiagnostic, ScoreOptions, ScoreRenderer};
pub use settings::{ArrangementParams, HarmonizerSettings, ValueRange};
pub use timeline::Timeline;
pub use track::{AudioClip, AudioSource, Track, TrackId, TrackKind};
