//! Native sample-based instruments

pub mod sampler;

pub use sampler::{pan_for_pitch, InstrumentSampler, PlaybackEvent, SampleZone};
