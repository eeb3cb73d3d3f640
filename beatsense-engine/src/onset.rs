//! Perceptually weighted band energies, spectral flux and onset strength
//!
//! Everything here works on a single [`FrequencyFrame`]. The only state kept
//! across frames is the previous magnitude spectrum needed for flux.

use crate::frame::FrequencyFrame;

/// Sub-band edges in Hz (lower inclusive, upper exclusive)
const SUB_BASS: (f32, f32) = (20.0, 60.0);
const BASS: (f32, f32) = (60.0, 250.0);
const LOW_MID: (f32, f32) = (250.0, 500.0);
const MID: (f32, f32) = (500.0, 2000.0);
const HIGH_MID: (f32, f32) = (2000.0, 4000.0);

/// Upper edge of the spectral flux range
const FLUX_CEILING_HZ: f32 = 2000.0;

/// Share of the spectrum used by the onset-strength curve
const ONSET_STRENGTH_SPAN: f32 = 0.3;

/// Representative frequencies for the four combined bands
const BAND_CENTERS_HZ: [f32; 4] = [100.0, 500.0, 1400.0, 4000.0];
const FALLBACK_CENTROID_HZ: f32 = 100.0;

/// Energy of the four combined bands for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandEnergies {
    pub low: f32,
    pub mid_low: f32,
    pub mid: f32,
    pub high: f32,
}

impl BandEnergies {
    pub fn total(&self) -> f32 {
        self.low + self.mid_low + self.mid + self.high
    }

    /// Energy-weighted centroid across the band centers, 100 Hz when silent
    pub fn centroid(&self) -> f32 {
        let total = self.total();
        if !total.is_finite() || total <= 0.0 {
            return FALLBACK_CENTROID_HZ;
        }
        let weighted = self.low * BAND_CENTERS_HZ[0]
            + self.mid_low * BAND_CENTERS_HZ[1]
            + self.mid * BAND_CENTERS_HZ[2]
            + self.high * BAND_CENTERS_HZ[3];
        let centroid = weighted / total;
        if centroid.is_finite() {
            centroid
        } else {
            FALLBACK_CENTROID_HZ
        }
    }

    /// Each band's share of the total, all zero for a silent frame
    pub fn ratios(&self) -> [f32; 4] {
        let total = self.total();
        if total <= 0.0 {
            return [0.0; 4];
        }
        [
            self.low / total,
            self.mid_low / total,
            self.mid / total,
            self.high / total,
        ]
    }
}

/// Piecewise loudness weighting applied to every bin before summing
pub fn perceptual_weight(frequency: f32) -> f32 {
    if frequency < 20.0 {
        0.1
    } else if frequency < 100.0 {
        0.5
    } else if frequency < 1000.0 {
        1.0
    } else if frequency < 6000.0 {
        0.8
    } else {
        0.5
    }
}

/// Turns frequency frames into band energies, spectral flux and onset strength
#[derive(Debug, Default)]
pub struct OnsetEnergyAnalyzer {
    previous_spectrum: Option<Vec<f32>>,
}

impl OnsetEnergyAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Perceptually weighted RMS of the four combined bands
    pub fn compute_band_energies(&self, frame: &FrequencyFrame<'_>) -> BandEnergies {
        let sub_bass = weighted_rms(frame, SUB_BASS);
        let bass = weighted_rms(frame, BASS);
        let low_mid = weighted_rms(frame, LOW_MID);
        let mid = weighted_rms(frame, MID);
        let high_mid = weighted_rms(frame, HIGH_MID);

        BandEnergies {
            low: 0.3 * sub_bass + 0.7 * bass,
            mid_low: 0.6 * low_mid + 0.4 * mid,
            mid,
            high: high_mid,
        }
    }

    /// Half-wave rectified flux over 0-2000 Hz against the previous frame
    ///
    /// The first frame, and any frame whose length differs from the previous
    /// one, yields zero and becomes the new reference.
    pub fn spectral_flux(&mut self, frame: &FrequencyFrame<'_>) -> f32 {
        let current = frame.magnitudes();
        let flux = match &self.previous_spectrum {
            Some(previous) if previous.len() == current.len() => {
                let ceiling = frame.bin_for_frequency(FLUX_CEILING_HZ).min(current.len());
                current[..ceiling]
                    .iter()
                    .zip(&previous[..ceiling])
                    .map(|(now, before)| (now - before).max(0.0))
                    .sum()
            }
            _ => 0.0,
        };

        match self.previous_spectrum.as_mut() {
            Some(previous) if previous.len() == current.len() => previous.copy_from_slice(current),
            _ => self.previous_spectrum = Some(current.to_vec()),
        }
        flux
    }

    /// Weighted RMS over the lowest 30% of bins with a linear 1.0 to 0.5 taper
    pub fn compute_onset_strength(&self, frame: &FrequencyFrame<'_>) -> f32 {
        let magnitudes = frame.magnitudes();
        let span = (magnitudes.len() as f32 * ONSET_STRENGTH_SPAN).floor() as usize;
        if span == 0 {
            return 0.0;
        }
        let weighted: f32 = magnitudes[..span]
            .iter()
            .enumerate()
            .map(|(i, m)| m * m * (1.0 - (i as f32 / span as f32) * 0.5))
            .sum();
        (weighted / span as f32).sqrt()
    }

    pub fn reset(&mut self) {
        self.previous_spectrum = None;
    }
}

/// RMS over `[low, high)` Hz normalized by the sum of perceptual weights
fn weighted_rms(frame: &FrequencyFrame<'_>, (low, high): (f32, f32)) -> f32 {
    let len = frame.len();
    let start = frame.bin_for_frequency(low).min(len);
    let end = frame.bin_for_frequency(high).min(len);
    if start >= end {
        return 0.0;
    }

    let mut energy = 0.0f32;
    let mut weight_sum = 0.0f32;
    for (offset, magnitude) in frame.magnitudes()[start..end].iter().enumerate() {
        let weight = perceptual_weight(frame.frequency_of_bin(start + offset));
        energy += magnitude * magnitude * weight;
        weight_sum += weight;
    }

    if weight_sum > 0.0 {
        (energy / weight_sum).sqrt()
    } else {
        0.0
    }
}
