//! Borrowed frequency-domain frame handed to the engine once per tick

use crate::error::{EngineError, Result};

/// Largest accepted bin magnitude. Energies square and sum the bins in f32,
/// so anything above this could overflow to infinity.
pub const MAX_MAGNITUDE: f32 = 1.0e12;

/// Linear magnitude spectrum from 0 Hz to Nyquist plus the sample rate it was
/// computed at. The engine only borrows it for the duration of one update.
#[derive(Debug, Clone, Copy)]
pub struct FrequencyFrame<'a> {
    magnitudes: &'a [f32],
    sample_rate: u32,
}

impl<'a> FrequencyFrame<'a> {
    pub fn new(magnitudes: &'a [f32], sample_rate: u32) -> Self {
        Self {
            magnitudes,
            sample_rate,
        }
    }

    pub fn magnitudes(&self) -> &'a [f32] {
        self.magnitudes
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    /// Bin index for a frequency: `round(freq * N / nyquist)`
    pub fn bin_for_frequency(&self, frequency: f32) -> usize {
        let nyquist = self.nyquist();
        if nyquist <= 0.0 {
            return 0;
        }
        (frequency * self.len() as f32 / nyquist).round().max(0.0) as usize
    }

    /// Center frequency of a bin in Hz
    pub fn frequency_of_bin(&self, bin: usize) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        bin as f32 * self.nyquist() / self.len() as f32
    }

    /// Rejects frames the analysis cannot use: empty, non-finite, negative or
    /// oversized bins
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(EngineError::EmptyFrame);
        }
        for (index, &magnitude) in self.magnitudes.iter().enumerate() {
            if !magnitude.is_finite() {
                return Err(EngineError::NonFiniteMagnitude { index });
            }
            if magnitude < 0.0 {
                return Err(EngineError::NegativeMagnitude { index });
            }
            if magnitude > MAX_MAGNITUDE {
                return Err(EngineError::MagnitudeOutOfRange {
                    index,
                    value: magnitude,
                });
            }
        }
        Ok(())
    }
}
