//! Master bus effects and sampled instruments

mod convolution;
mod native;
pub mod native_instruments;

pub use convolution::ConvolutionReverb;
pub use native::{CompressorEffect, LimiterEffect};
pub use native_instruments::{InstrumentSampler, PlaybackEvent, SampleZone};

use std::fmt::Debug;

/// Audio effect that processes one channel in place
pub trait AudioEffect: Send + Debug {
    fn name(&self) -> &str;
    fn process(&mut self, samples: &mut [f32]);
}

/// Effects run in insertion order over the same buffer
#[derive(Debug, Default)]
pub struct EffectChain {
    effects: Vec<Box<dyn AudioEffect>>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, effect: Box<dyn AudioEffect>) {
        self.effects.push(effect);
    }

    pub fn process(&mut self, samples: &mut [f32]) {
        for effect in &mut self.effects {
            effect.process(samples);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Offset(f32);

    impl AudioEffect for Offset {
        fn name(&self) -> &str { "Offset" }

        fn process(&mut self, samples: &mut [f32]) {
            for s in samples.iter_mut() {
                *s = *s * 2.0 + self.0;
            }
        }
    }

    #[test]
    fn test_chain_runs_in_order() {
        let mut chain = EffectChain::new();
        chain.add(Box::new(Offset(1.0)));
        chain.add(Box::new(Offset(0.0)));
        let mut samples = vec![0.5; 4];
        chain.process(&mut samples);
        // (0.5 * 2 + 1) * 2, not (0.5 * 2) * 2 + 1
        assert_eq!(samples, vec![4.0; 4]);
    }

    #[test]
    fn test_empty_chain_is_transparent() {
        let mut chain = EffectChain::new();
        let mut samples = vec![0.25, -0.5];
        chain.process(&mut samples);
        assert_eq!(samples, vec![0.25, -0.5]);
    }
}
