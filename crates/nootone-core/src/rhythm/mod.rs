//! Rhythmic realisation of a chord progression

mod arpeggiator;
mod bass;

pub use arpeggiator::{
    arpeggiate, choose_unique_slots, create_random_contour, generate_arpeggio_pattern, ArpeggiateParams,
    ArpeggioEvent, ArpeggioPattern,
};
pub use bass::{apply_legato, block_bass_line, generate_bass_line, generate_pads, transfer_velocity};
