//! Convolution reverb using FFT overlap-add

use std::fmt;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::AudioEffect;

const MIN_BLOCK_SIZE: usize = 1024;

/// Reverb send: adds `send × (input ∗ impulse response)` to the input.
///
/// The response is applied block by block, carrying the convolution tail
/// across calls, so a buffer can be processed in one call or in pieces.
pub struct ConvolutionReverb {
    send: f32,
    ir_len: usize,
    block_size: usize,
    fft_size: usize,
    ir_spectrum: Vec<Complex<f32>>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    /// Pending wet output past the current block, `ir_len - 1` long
    tail: Vec<f32>,
}

impl ConvolutionReverb {
    /// Returns `None` for an empty impulse response.
    pub fn new(impulse_response: &[f32], send: f32) -> Option<Self> {
        if impulse_response.is_empty() {
            return None;
        }
        let ir_len = impulse_response.len();
        let block_size = ir_len.next_power_of_two().max(MIN_BLOCK_SIZE);
        let fft_size = (block_size + ir_len - 1).next_power_of_two();

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);

        let mut ir_spectrum = vec![Complex::new(0.0, 0.0); fft_size];
        for (bin, &s) in ir_spectrum.iter_mut().zip(impulse_response) {
            *bin = Complex::new(s, 0.0);
        }
        forward.process(&mut ir_spectrum);

        Some(Self {
            send,
            ir_len,
            block_size,
            fft_size,
            ir_spectrum,
            forward,
            inverse,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            tail: vec![0.0; ir_len - 1],
        })
    }

    pub fn impulse_len(&self) -> usize {
        self.ir_len
    }

    /// Wet signal for one block, at most `block_size` long
    fn convolve_block(&mut self, block: &[f32]) -> Vec<f32> {
        let n = block.len();
        let tail_len = self.ir_len - 1;

        self.buffer.fill(Complex::new(0.0, 0.0));
        for (bin, &s) in self.buffer.iter_mut().zip(block) {
            *bin = Complex::new(s, 0.0);
        }
        self.forward.process(&mut self.buffer);
        for (bin, ir) in self.buffer.iter_mut().zip(&self.ir_spectrum) {
            *bin = *bin * *ir;
        }
        self.inverse.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f32;
        let mut acc: Vec<f32> = self.buffer[..n + tail_len].iter().map(|c| c.re * scale).collect();
        for (a, t) in acc.iter_mut().zip(&self.tail) {
            *a += t;
        }
        self.tail = acc.split_off(n);
        acc
    }
}

impl fmt::Debug for ConvolutionReverb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvolutionReverb")
            .field("send", &self.send)
            .field("ir_len", &self.ir_len)
            .field("fft_size", &self.fft_size)
            .finish()
    }
}

impl AudioEffect for ConvolutionReverb {
    fn name(&self) -> &str { "Convolution Reverb" }

    fn process(&mut self, samples: &mut [f32]) {
        for chunk in samples.chunks_mut(self.block_size) {
            let wet = self.convolve_block(chunk);
            for (sample, w) in chunk.iter_mut().zip(wet) {
                *sample += self.send * w;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct_convolution(x: &[f32], h: &[f32]) -> Vec<f32> {
        (0..x.len())
            .map(|i| (0..h.len()).filter(|&k| k <= i).map(|k| x[i - k] * h[k]).sum())
            .collect()
    }

    #[test]
    fn test_empty_impulse() {
        assert!(ConvolutionReverb::new(&[], 0.15).is_none());
    }

    #[test]
    fn test_matches_direct_convolution() {
        let h: Vec<f32> = (0..300).map(|i| 0.9f32.powi(i) * if i % 2 == 0 { 1.0 } else { -0.5 }).collect();
        let x: Vec<f32> = (0..5000).map(|i| ((i * 7919) % 101) as f32 / 101.0 - 0.5).collect();
        let expected = direct_convolution(&x, &h);

        let mut reverb = ConvolutionReverb::new(&h, 1.0).unwrap();
        let mut out = x.clone();
        reverb.process(&mut out);
        for i in 0..x.len() {
            assert!((out[i] - (x[i] + expected[i])).abs() < 1e-3, "sample {i}");
        }
    }

    #[test]
    fn test_tail_carries_between_calls() {
        let h = vec![0.0, 0.0, 1.0];
        let mut reverb = ConvolutionReverb::new(&h, 0.5).unwrap();
        let mut first = vec![0.0; 1023];
        first.push(1.0);
        reverb.process(&mut first);
        assert!((first[1023] - 1.0).abs() < 1e-5);

        let mut second = vec![0.0; 4];
        reverb.process(&mut second);
        // impulse delayed by two samples lands in the next call
        assert!(second[0].abs() < 1e-5);
        assert!((second[1] - 0.5).abs() < 1e-5);
    }
}
