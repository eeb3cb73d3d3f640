//! FFT front-end turning PCM blocks into frequency frames

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::frame::FrequencyFrame;

/// FFT length used by `SpectrumFrameBuilder::with_default_size`
pub const DEFAULT_FFT_SIZE: usize = 2048;

/// Windowed FFT producing linear magnitude spectra for the engine
pub struct SpectrumFrameBuilder {
    sample_rate: u32,
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// Pre-allocated FFT buffer, reused for every block
    fft_buffer: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl SpectrumFrameBuilder {
    /// Create a builder for `fft_size`-point transforms (at least 2 points)
    pub fn new(sample_rate: u32, fft_size: usize) -> Result<Self> {
        if sample_rate == 0 {
            return Err(EngineError::InvalidConfig(
                "sample_rate must be positive".to_string(),
            ));
        }
        if fft_size < 2 {
            return Err(EngineError::InvalidConfig(
                "fft_size must be at least 2".to_string(),
            ));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Pre-compute Hann window
        let window: Vec<f32> = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / fft_size as f32).cos()))
            .collect();

        Ok(Self {
            sample_rate,
            fft_size,
            fft,
            window,
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            magnitudes: vec![0.0; fft_size / 2],
        })
    }

    pub fn with_default_size(sample_rate: u32) -> Result<Self> {
        Self::new(sample_rate, DEFAULT_FFT_SIZE)
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Window one block of mono samples and return `fft_size / 2` magnitudes
    ///
    /// Shorter blocks are zero padded, longer ones truncated.
    pub fn magnitudes(&mut self, samples: &[f32]) -> &[f32] {
        let sample_count = samples.len().min(self.fft_size);
        for ((slot, &sample), &weight) in self
            .fft_buffer
            .iter_mut()
            .zip(samples.iter().take(sample_count))
            .zip(&self.window)
        {
            *slot = Complex::new(sample * weight, 0.0);
        }
        for slot in self.fft_buffer.iter_mut().skip(sample_count) {
            *slot = Complex::new(0.0, 0.0);
        }

        self.fft.process(&mut self.fft_buffer);

        for (magnitude, bin) in self.magnitudes.iter_mut().zip(&self.fft_buffer) {
            *magnitude = bin.norm();
        }
        &self.magnitudes
    }

    /// Same as [`magnitudes`](Self::magnitudes), wrapped as a frame
    pub fn frame(&mut self, samples: &[f32]) -> FrequencyFrame<'_> {
        let sample_rate = self.sample_rate;
        FrequencyFrame::new(self.magnitudes(samples), sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_rejects_bad_sizes() {
        assert!(SpectrumFrameBuilder::new(44_100, 1).is_err());
        assert!(SpectrumFrameBuilder::new(0, 2048).is_err());
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let mut builder = SpectrumFrameBuilder::with_default_size(44_100).unwrap();
        let samples = sine(1000.0, 44_100, 2048);
        let frame = builder.frame(&samples);

        assert_eq!(frame.len(), 1024);
        let peak = frame
            .magnitudes()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, frame.bin_for_frequency(1000.0));
    }

    #[test]
    fn test_silence_and_short_blocks() {
        let mut builder = SpectrumFrameBuilder::new(44_100, 512).unwrap();
        assert!(builder.magnitudes(&[0.0; 512]).iter().all(|&m| m == 0.0));

        // Short input is zero padded rather than rejected
        let short = sine(440.0, 44_100, 100);
        let frame = builder.frame(&short);
        assert_eq!(frame.len(), 256);
        assert!(frame.validate().is_ok());
    }
}
