//! Offline renderer: mixes a timeline through the master bus in one pass

use std::collections::HashMap;
use std::sync::Arc;

use fastrand::Rng;
use nootone_core::numeric::random_choice;
use nootone_core::{InstrumentName, Timeline, Track, TrackKind};
use tracing::{debug, info, warn};

use crate::assets::{load_clip, load_impulse_response, load_instrument, AssetSource, DirectoryAssets};
use crate::audio_effects::{
    CompressorEffect, ConvolutionReverb, EffectChain, InstrumentSampler, LimiterEffect, PlaybackEvent,
};
use crate::config::{InstrumentLibrary, RenderConfig};
use crate::error::RenderError;
use crate::wav_writer::{encode_wav, RenderedAudio};

/// Planar render output before encoding
#[derive(Debug, Clone)]
pub struct RenderedBuffer {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl RenderedBuffer {
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Sources of one track, decoded and scheduled
enum TrackVoices {
    Clip { samples: Vec<f32>, onset: f64, gain: f32 },
    Notes(Vec<PlaybackEvent>),
}

impl TrackVoices {
    fn end(&self, sample_rate: u32) -> f64 {
        match self {
            Self::Clip { samples, onset, .. } => onset + samples.len() as f64 / sample_rate as f64,
            Self::Notes(events) => events.iter().map(|e| e.onset + e.duration).fold(0.0, f64::max),
        }
    }
}

pub struct OfflineRenderer {
    config: RenderConfig,
    library: InstrumentLibrary,
    assets: Box<dyn AssetSource>,
}

impl std::fmt::Debug for OfflineRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineRenderer")
            .field("config", &self.config)
            .field("library", &self.library)
            .finish()
    }
}

impl OfflineRenderer {
    /// Renderer reading assets from `library.root` on disk.
    pub fn new(config: RenderConfig, library: InstrumentLibrary) -> Result<Self, RenderError> {
        let assets = DirectoryAssets::new(library.root.clone());
        Self::with_assets(config, library, assets)
    }

    pub fn with_assets(
        config: RenderConfig,
        library: InstrumentLibrary,
        assets: impl AssetSource + 'static,
    ) -> Result<Self, RenderError> {
        config.validate()?;
        Ok(Self { config, library, assets: Box::new(assets) })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render the timeline and encode it as WAV.
    pub fn render(&self, timeline: &Timeline, rng: &mut Rng) -> Result<RenderedAudio, RenderError> {
        let buffer = self.render_buffer(timeline, rng)?;
        Ok(encode_wav(buffer.channels, buffer.sample_rate, &self.config.wav)?)
    }

    /// Render the timeline to planar float buffers.
    ///
    /// Tracks whose assets fail to load are logged and left out; the rest of
    /// the timeline still renders.
    pub fn render_buffer(&self, timeline: &Timeline, rng: &mut Rng) -> Result<RenderedBuffer, RenderError> {
        let sample_rate = self.config.sample_rate;
        let mut samplers: HashMap<InstrumentName, Option<Arc<InstrumentSampler>>> = HashMap::new();

        let voices: Vec<TrackVoices> = timeline
            .tracks
            .iter()
            .filter_map(|track| self.prepare_track(track, &mut samplers))
            .collect();

        let end = voices.iter().map(|v| v.end(sample_rate)).fold(0.0, f64::max);
        let duration = end + self.config.tail;
        let frames = (duration * sample_rate as f64).ceil() as usize;
        let channel_count = self.config.channels as usize;
        info!(
            tracks = timeline.len(),
            rendered = voices.len(),
            duration,
            channels = channel_count,
            "Rendering timeline"
        );

        let mut channels = vec![vec![0.0f32; frames]; channel_count];
        for voice in &voices {
            mix_voice(voice, &mut channels, sample_rate);
        }

        let impulse = self.choose_impulse_response(rng);
        for channel in channels.iter_mut() {
            let mut bus = self.master_bus(impulse.as_deref());
            bus.process(channel);
        }

        Ok(RenderedBuffer { channels, sample_rate })
    }

    fn prepare_track(
        &self,
        track: &Track,
        samplers: &mut HashMap<InstrumentName, Option<Arc<InstrumentSampler>>>,
    ) -> Option<TrackVoices> {
        let sample_rate = self.config.sample_rate;
        match &track.kind {
            TrackKind::Audio(clip) => match load_clip(self.assets.as_ref(), &clip.source, sample_rate) {
                Ok(mut samples) => {
                    if let Some(duration) = clip.duration {
                        samples.truncate((duration * sample_rate as f64).ceil() as usize);
                    }
                    Some(TrackVoices::Clip { samples, onset: clip.onset, gain: track.gain })
                }
                Err(e) => {
                    warn!(track = %track.name, error = %e, "Skipping audio track");
                    None
                }
            },
            TrackKind::Symbolic { instrument, chord_events } => {
                let sampler = samplers
                    .entry(*instrument)
                    .or_insert_with(|| match load_instrument(self.assets.as_ref(), *instrument, sample_rate) {
                        Ok(sampler) => Some(Arc::new(sampler)),
                        Err(e) => {
                            warn!(instrument = %instrument, error = %e, "Failed to load instrument");
                            None
                        }
                    })
                    .clone();
                let Some(sampler) = sampler else {
                    warn!(track = %track.name, "Skipping symbolic track");
                    return None;
                };

                let mut events = Vec::new();
                let mut skipped = 0usize;
                for chord in chord_events {
                    for note in &chord.notes {
                        let duration = note.duration + self.config.note_tail;
                        match sampler.schedule_note(chord.onset, note.pitch, note.velocity as f32, duration) {
                            Some(mut event) => {
                                event.gain *= track.gain;
                                events.push(event);
                            }
                            None => skipped += 1,
                        }
                    }
                }
                debug!(track = %track.name, notes = events.len(), skipped, "Scheduled notes");
                Some(TrackVoices::Notes(events))
            }
        }
    }

    fn choose_impulse_response(&self, rng: &mut Rng) -> Option<Vec<f32>> {
        let name = random_choice(rng, &self.library.impulse_responses)?;
        let location = self.library.impulse_location(name);
        match load_impulse_response(self.assets.as_ref(), &location, self.config.sample_rate) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(impulse = %name, error = %e, "Rendering without reverb");
                None
            }
        }
    }

    /// Compressor, reverb send, then the output limiter
    fn master_bus(&self, impulse: Option<&[f32]>) -> EffectChain {
        let sample_rate = self.config.sample_rate as f32;
        let mut chain = EffectChain::new();
        chain.add(Box::new(CompressorEffect::new(self.config.compressor, sample_rate)));
        if let Some(reverb) = impulse.and_then(|ir| ConvolutionReverb::new(ir, self.config.reverb_send)) {
            chain.add(Box::new(reverb));
        }
        chain.add(Box::new(LimiterEffect::new(0.0, sample_rate)));
        chain
    }
}

fn mix_voice(voice: &TrackVoices, channels: &mut [Vec<f32>], sample_rate: u32) {
    match voice {
        TrackVoices::Clip { samples, onset, gain } => {
            let start = (onset * sample_rate as f64).round().max(0.0) as usize;
            for channel in channels.iter_mut() {
                for (out, s) in channel.iter_mut().skip(start).zip(samples) {
                    *out += s * gain;
                }
            }
        }
        TrackVoices::Notes(events) => {
            for event in events {
                event.render(channels, sample_rate as f32);
            }
        }
    }
}
