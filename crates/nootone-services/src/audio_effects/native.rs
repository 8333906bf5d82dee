//! Native dynamics effects using fundsp

use std::fmt;

use fundsp::hacker::*;

use super::AudioEffect;
use crate::config::CompressorSettings;

/// Limiter look-ahead and release, in seconds
const LIMITER_ATTACK: f32 = 0.001;
const LIMITER_RELEASE: f32 = 0.1;

/// One-pole smoothing coefficient for a time constant in seconds
fn time_to_coeff(seconds: f32, sample_rate: f32) -> f32 {
    if seconds <= 0.0 {
        return 0.0;
    }
    (-1.0 / (sample_rate * seconds)).exp()
}

/// Feed-forward peak compressor with a quadratic soft knee
#[derive(Debug)]
pub struct CompressorEffect {
    settings: CompressorSettings,
    attack_coeff: f32,
    release_coeff: f32,
    /// Smoothed linear gain
    envelope: f32,
}

impl CompressorEffect {
    pub fn new(settings: CompressorSettings, sample_rate: f32) -> Self {
        Self {
            settings,
            attack_coeff: time_to_coeff(settings.attack, sample_rate),
            release_coeff: time_to_coeff(settings.release, sample_rate),
            envelope: 1.0,
        }
    }

    /// Static curve: gain change in dB for an input level in dB
    fn gain_reduction_db(&self, input_db: f32) -> f32 {
        let CompressorSettings { threshold_db, knee_db, ratio, .. } = self.settings;
        let slope = 1.0 / ratio.max(1.0) - 1.0;
        let knee_start = threshold_db - knee_db / 2.0;
        if input_db <= knee_start {
            0.0
        } else if knee_db > 0.0 && input_db < threshold_db + knee_db / 2.0 {
            let x = input_db - knee_start;
            slope * x * x / (2.0 * knee_db)
        } else {
            slope * (input_db - threshold_db)
        }
    }
}

impl AudioEffect for CompressorEffect {
    fn name(&self) -> &str { "Compressor" }

    fn process(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            let level = sample.abs();
            let target = if level > 1e-10 {
                db_amp(self.gain_reduction_db(amp_db(level)))
            } else {
                1.0
            };
            let coeff = if target < self.envelope { self.attack_coeff } else { self.release_coeff };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * target;
            *sample *= self.envelope;
        }
    }
}

/// Look-ahead brickwall limiter at a fixed ceiling.
///
/// The signal comes out delayed by the attack time.
pub struct LimiterEffect {
    ceiling_db: f32,
    limiter: An<Limiter<U1>>,
}

impl LimiterEffect {
    pub fn new(ceiling_db: f32, sample_rate: f32) -> Self {
        let mut node = limiter(LIMITER_ATTACK, LIMITER_RELEASE);
        node.set_sample_rate(sample_rate as f64);
        Self { ceiling_db, limiter: node }
    }
}

impl fmt::Debug for LimiterEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LimiterEffect")
            .field("ceiling_db", &self.ceiling_db)
            .finish()
    }
}

impl AudioEffect for LimiterEffect {
    fn name(&self) -> &str { "Limiter" }

    fn process(&mut self, samples: &mut [f32]) {
        let ceiling = db_amp(self.ceiling_db);
        for sample in samples.iter_mut() {
            let input = Frame::from([*sample / ceiling]);
            let output = self.limiter.tick(&input);
            *sample = output[0] * ceiling;
        }
    }
}
