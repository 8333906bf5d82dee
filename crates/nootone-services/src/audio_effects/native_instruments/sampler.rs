//! Multi-sample instrument: picks the nearest recorded note and repitches it

use std::fmt;
use std::sync::Arc;

use nootone_core::numeric::find_nearest_index;
use tracing::trace;

use crate::error::AssetError;

/// Playback rates outside this range are refused rather than stretched
pub const MIN_PLAYBACK_RATE: f64 = 0.5;
pub const MAX_PLAYBACK_RATE: f64 = 2.0;
/// How far the highest and lowest notes are panned, 1.0 being hard left/right
const PAN_WIDTH: f32 = 0.5;
const RELEASE_SECONDS: f32 = 0.005;

/// One recorded note at the engine sample rate
#[derive(Clone)]
pub struct SampleZone {
    pub pitch: u8,
    pub velocity: f32,
    pub data: Arc<Vec<f32>>,
}

impl SampleZone {
    pub fn new(pitch: u8, velocity: f32, data: Vec<f32>) -> Self {
        Self { pitch, velocity, data: Arc::new(data) }
    }
}

impl fmt::Debug for SampleZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleZone")
            .field("pitch", &self.pitch)
            .field("velocity", &self.velocity)
            .field("sample_len", &self.data.len())
            .finish()
    }
}

/// Per-note playback state
struct SamplerVoice {
    active: bool,
    position: f64,
    speed: f64,
    releasing: bool,
    release_gain: f32,
    release_step: f32,
}

impl SamplerVoice {
    fn trigger(speed: f64) -> Self {
        Self {
            active: true,
            position: 0.0,
            speed,
            releasing: false,
            release_gain: 1.0,
            release_step: 0.0,
        }
    }

    fn start_release(&mut self, sample_rate: f32) {
        if !self.releasing {
            self.releasing = true;
            let fade_samples = (sample_rate * RELEASE_SECONDS).max(1.0);
            self.release_step = 1.0 / fade_samples;
        }
    }

    fn tick(&mut self, sample_data: &[f32]) -> f32 {
        if !self.active {
            return 0.0;
        }

        let pos = self.position;
        let idx = pos as usize;

        // End of sample
        if idx >= sample_data.len().saturating_sub(1) {
            self.active = false;
            return 0.0;
        }

        // Linear interpolation
        let frac = (pos - idx as f64) as f32;
        let s0 = sample_data[idx];
        let s1 = sample_data[idx + 1];
        let sample = s0 + frac * (s1 - s0);

        self.position += self.speed;

        if self.releasing {
            self.release_gain -= self.release_step;
            if self.release_gain <= 0.0 {
                self.active = false;
                return 0.0;
            }
        }

        sample * self.release_gain
    }
}

/// A note ready to be mixed into the output buffer
#[derive(Debug, Clone)]
pub struct PlaybackEvent {
    pub zone: SampleZone,
    /// Start in seconds
    pub onset: f64,
    /// Time before the release fade starts, in seconds
    pub duration: f64,
    pub rate: f64,
    pub gain: f32,
    /// -1.0 (left) to 1.0 (right)
    pub pan: f32,
}

impl PlaybackEvent {
    /// Equal-power gains per output channel. Mono output is not panned.
    pub fn channel_gains(&self, channels: usize) -> [f32; 2] {
        if channels < 2 {
            return [self.gain, 0.0];
        }
        let angle = (self.pan + 1.0) * std::f32::consts::FRAC_PI_4;
        [self.gain * angle.cos(), self.gain * angle.sin()]
    }

    /// Mix the note into planar `channels`, starting at its onset.
    pub fn render(&self, channels: &mut [Vec<f32>], sample_rate: f32) {
        let Some(len) = channels.first().map(Vec::len) else {
            return;
        };
        let start = (self.onset * sample_rate as f64).round().max(0.0) as usize;
        let hold = (self.duration * sample_rate as f64).round().max(0.0) as usize;
        let gains = self.channel_gains(channels.len());

        let mut voice = SamplerVoice::trigger(self.rate);
        for (elapsed, frame) in (start..len).enumerate() {
            if elapsed == hold {
                voice.start_release(sample_rate);
            }
            let sample = voice.tick(&self.zone.data);
            if !voice.active {
                break;
            }
            for (channel, gain) in channels.iter_mut().zip(gains) {
                channel[frame] += sample * gain;
            }
        }
    }
}

/// Pan position for a pitch: low notes left, high notes right
pub fn pan_for_pitch(pitch: u8) -> f32 {
    ((pitch as f32 - 60.0) / 48.0).clamp(-1.0, 1.0) * PAN_WIDTH
}

/// Sampled instrument indexed by pitch, then by velocity
pub struct InstrumentSampler {
    name: String,
    /// Sorted pitches that have at least one recording
    pitches: Vec<f64>,
    /// Zones per entry of `pitches`, sorted by velocity
    layers: Vec<Vec<SampleZone>>,
}

impl fmt::Debug for InstrumentSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentSampler")
            .field("name", &self.name)
            .field("pitches", &self.pitches)
            .finish()
    }
}

impl InstrumentSampler {
    pub fn new(name: impl Into<String>, mut zones: Vec<SampleZone>) -> Result<Self, AssetError> {
        let name = name.into();
        if zones.is_empty() {
            return Err(AssetError::NoSamples(name));
        }
        zones.sort_by(|a, b| a.pitch.cmp(&b.pitch).then(a.velocity.total_cmp(&b.velocity)));

        let mut pitches: Vec<f64> = Vec::new();
        let mut layers: Vec<Vec<SampleZone>> = Vec::new();
        for zone in zones {
            match layers.last_mut() {
                Some(layer) if layer[0].pitch == zone.pitch => layer.push(zone),
                _ => {
                    pitches.push(zone.pitch as f64);
                    layers.push(vec![zone]);
                }
            }
        }

        Ok(Self { name, pitches, layers })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn zone_count(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    /// Closest recording by pitch first, then by velocity within that pitch.
    pub fn nearest_zone(&self, pitch: u8, velocity: f32) -> Option<&SampleZone> {
        let layer = &self.layers[find_nearest_index(&self.pitches, pitch as f64)?];
        let velocities: Vec<f64> = layer.iter().map(|z| z.velocity as f64).collect();
        layer.get(find_nearest_index(&velocities, velocity as f64)?)
    }

    /// Prepare one note, or `None` when the closest sample would need
    /// repitching by more than an octave.
    pub fn schedule_note(&self, onset: f64, pitch: u8, velocity: f32, duration: f64) -> Option<PlaybackEvent> {
        let zone = self.nearest_zone(pitch, velocity)?;
        let rate = 2f64.powf((pitch as f64 - zone.pitch as f64) / 12.0);
        if !(MIN_PLAYBACK_RATE..=MAX_PLAYBACK_RATE).contains(&rate) {
            trace!(
                instrument = %self.name,
                pitch,
                sample_pitch = zone.pitch,
                rate,
                "Skipping note outside playback range"
            );
            return None;
        }

        Some(PlaybackEvent {
            zone: zone.clone(),
            onset,
            duration,
            rate,
            gain: velocity,
            pan: pan_for_pitch(pitch),
        })
    }
}
