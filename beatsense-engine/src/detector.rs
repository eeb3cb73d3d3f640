//! Adaptive onset detection with a genre-aware band weighting

use std::collections::VecDeque;

use tracing::trace;

use crate::config::EngineConfig;
use crate::frame::FrequencyFrame;
use crate::onset::{BandEnergies, OnsetEnergyAnalyzer};

/// Rate at which the live profile pursues its target each frame
const PROFILE_PURSUIT_RATE: f32 = 0.08;
/// Smoothing of the running average energy (old, new)
const AVERAGE_ENERGY_DECAY: f32 = 0.9;
/// Energy at which the threshold stops being relaxed for quiet material
const ENERGY_REFERENCE: f32 = 80.0;
/// Seconds without a hit before the threshold starts relaxing
const MISSED_BEAT_GRACE: f64 = 0.8;
const MIN_THRESHOLD_MODIFIER: f64 = 0.6;
const FLUX_PEAK_RATIO: f32 = 1.5;
/// Samples needed in both histories before a hit can fire
const MIN_HISTORY: usize = 3;
/// Lower bound for the refractory period while sensitivity is boosted
const MIN_BOOSTED_REFRACTORY: f64 = 0.05;

/// Band energies of one processed frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OnsetSample {
    pub timestamp: f64,
    pub low: f32,
    pub mid_low: f32,
    pub mid: f32,
    pub high: f32,
    /// Profile-weighted sum of the four bands
    pub combined: f32,
}

/// A detected beat onset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub timestamp: f64,
    pub energy: f32,
    pub estimated_frequency_hz: f32,
}

/// Relative band weights used to combine band energies into one value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenreProfile {
    pub low_ratio: f32,
    pub mid_low_ratio: f32,
    pub mid_ratio: f32,
    pub high_ratio: f32,
}

impl Default for GenreProfile {
    fn default() -> Self {
        Self::new(0.5, 0.35, 0.15, 0.0)
    }
}

impl GenreProfile {
    pub const fn new(low_ratio: f32, mid_low_ratio: f32, mid_ratio: f32, high_ratio: f32) -> Self {
        Self {
            low_ratio,
            mid_low_ratio,
            mid_ratio,
            high_ratio,
        }
    }

    /// Weighted sum of band energies
    pub fn combine(&self, bands: &BandEnergies) -> f32 {
        bands.low * self.low_ratio
            + bands.mid_low * self.mid_low_ratio
            + bands.mid * self.mid_ratio
            + bands.high * self.high_ratio
    }

    /// Move every weight a fraction `rate` toward `target`
    pub fn pursue(&mut self, target: &GenreProfile, rate: f32) {
        self.low_ratio += (target.low_ratio - self.low_ratio) * rate;
        self.mid_low_ratio += (target.mid_low_ratio - self.mid_low_ratio) * rate;
        self.mid_ratio += (target.mid_ratio - self.mid_ratio) * rate;
        self.high_ratio += (target.high_ratio - self.high_ratio) * rate;
    }
}

/// Coarse spectral shape of the current material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenreArchetype {
    BassHeavy,
    BassAndMid,
    MidHeavy,
    TrebleRich,
    Balanced,
}

impl GenreArchetype {
    /// Classify a frame by each band's share of the total energy
    pub fn classify(bands: &BandEnergies) -> Option<Self> {
        if bands.total() <= 0.0 {
            return None;
        }
        let [low, mid_low, mid, high] = bands.ratios();
        let archetype = if low > 0.55 && mid_low < 0.25 {
            Self::BassHeavy
        } else if low > 0.4 && mid_low > 0.3 {
            Self::BassAndMid
        } else if mid_low > 0.4 && low < 0.35 {
            Self::MidHeavy
        } else if mid > 0.25 || high > 0.15 {
            Self::TrebleRich
        } else {
            Self::Balanced
        };
        Some(archetype)
    }

    pub fn target(&self) -> GenreProfile {
        match self {
            Self::BassHeavy => GenreProfile::new(0.65, 0.25, 0.1, 0.0),
            Self::BassAndMid => GenreProfile::new(0.55, 0.35, 0.1, 0.0),
            Self::MidHeavy => GenreProfile::new(0.35, 0.45, 0.15, 0.05),
            Self::TrebleRich => GenreProfile::new(0.3, 0.4, 0.25, 0.05),
            Self::Balanced => GenreProfile::new(0.45, 0.35, 0.15, 0.05),
        }
    }
}

/// Bounded FIFO of detected hits
#[derive(Debug, Clone)]
pub struct HitCache {
    hits: VecDeque<Hit>,
    capacity: usize,
}

impl HitCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            hits: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, hit: Hit) {
        self.hits.push_back(hit);
        while self.hits.len() > self.capacity {
            self.hits.pop_front();
        }
    }

    /// Newest `count` hits, oldest first
    pub fn recent(&self, count: usize) -> Vec<Hit> {
        let skip = self.hits.len().saturating_sub(count);
        self.hits.iter().skip(skip).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn first(&self) -> Option<&Hit> {
        self.hits.front()
    }

    pub fn last(&self) -> Option<&Hit> {
        self.hits.back()
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }
}

/// Read-only snapshot of the detector internals
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorDiagnostics {
    /// Band energies of the most recent frame
    pub current: Option<OnsetSample>,
    /// Band energies of the frame that produced the last hit
    pub last_hit: Option<OnsetSample>,
    /// Current combined energy over the average of the preceding history
    pub peak_ratio: f32,
    pub adaptive_threshold: f32,
    pub average_energy: f32,
    pub genre_profile: GenreProfile,
}

/// Emits hits from a stream of frames using an adaptive energy/flux test
pub struct AdaptiveOnsetDetector {
    analyzer: OnsetEnergyAnalyzer,
    base_threshold: f32,
    min_time_between_hits: f64,
    sensitivity: f32,
    onset_history: VecDeque<OnsetSample>,
    onset_history_size: usize,
    flux_history: VecDeque<f32>,
    flux_history_size: usize,
    genre_profile: GenreProfile,
    average_energy: f32,
    adaptive_threshold: f32,
    peak_ratio: f32,
    last_hit_time: f64,
    last_hit_sample: Option<OnsetSample>,
}

impl AdaptiveOnsetDetector {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            analyzer: OnsetEnergyAnalyzer::new(),
            base_threshold: config.threshold,
            min_time_between_hits: config.min_time_between_hits,
            sensitivity: 1.0,
            onset_history: VecDeque::with_capacity(config.onset_history_size),
            onset_history_size: config.onset_history_size,
            flux_history: VecDeque::with_capacity(config.flux_history_size),
            flux_history_size: config.flux_history_size,
            genre_profile: GenreProfile::default(),
            average_energy: 0.0,
            adaptive_threshold: config.threshold,
            peak_ratio: 0.0,
            last_hit_time: 0.0,
            last_hit_sample: None,
        }
    }

    /// Process one frame and return a hit if an onset fired
    pub fn process(&mut self, frame: &FrequencyFrame<'_>, timestamp: f64) -> Option<Hit> {
        let flux = self.analyzer.spectral_flux(frame);
        push_bounded(&mut self.flux_history, flux, self.flux_history_size);

        let bands = self.analyzer.compute_band_energies(frame);
        if let Some(archetype) = GenreArchetype::classify(&bands) {
            self.genre_profile
                .pursue(&archetype.target(), PROFILE_PURSUIT_RATE);
        }
        let combined = self.genre_profile.combine(&bands);

        self.average_energy =
            self.average_energy * AVERAGE_ENERGY_DECAY + combined * (1.0 - AVERAGE_ENERGY_DECAY);
        self.adaptive_threshold = self.compute_adaptive_threshold(timestamp);

        let sample = OnsetSample {
            timestamp,
            low: bands.low,
            mid_low: bands.mid_low,
            mid: bands.mid,
            high: bands.high,
            combined,
        };
        push_bounded(&mut self.onset_history, sample, self.onset_history_size);

        let previous_average = self.previous_average_energy();
        self.peak_ratio = if previous_average > 0.0 {
            combined / previous_average
        } else {
            combined
        };

        if self.onset_history.len() < MIN_HISTORY || self.flux_history.len() < MIN_HISTORY {
            return None;
        }

        let energy_peak = combined > previous_average * (1.0 + self.adaptive_threshold);
        let flux_peak = self.is_flux_peak(flux);
        let rising = self
            .onset_history
            .iter()
            .rev()
            .nth(1)
            .is_some_and(|previous| combined > previous.combined);
        let refractory_elapsed = timestamp - self.last_hit_time > self.effective_min_time();

        if (energy_peak || flux_peak) && rising && refractory_elapsed {
            self.last_hit_time = timestamp;
            self.last_hit_sample = Some(sample);
            let hit = Hit {
                timestamp,
                energy: combined,
                estimated_frequency_hz: bands.centroid(),
            };
            trace!(
                timestamp,
                energy = combined,
                frequency = hit.estimated_frequency_hz,
                energy_peak,
                flux_peak,
                "onset hit"
            );
            return Some(hit);
        }
        None
    }

    fn compute_adaptive_threshold(&self, timestamp: f64) -> f32 {
        let since_hit = timestamp - self.last_hit_time;
        let modifier = if since_hit > MISSED_BEAT_GRACE {
            (1.0 - (since_hit - MISSED_BEAT_GRACE) * 0.15).max(MIN_THRESHOLD_MODIFIER)
        } else {
            1.0
        };
        let energy_factor = (self.average_energy / ENERGY_REFERENCE).clamp(0.2, 1.0);
        self.effective_threshold() * modifier as f32 * (0.6 + 0.4 * energy_factor)
    }

    /// Average combined energy of the history, excluding the newest sample
    fn previous_average_energy(&self) -> f32 {
        let count = self.onset_history.len().saturating_sub(1);
        if count == 0 {
            return 0.0;
        }
        let sum: f32 = self
            .onset_history
            .iter()
            .take(count)
            .map(|s| s.combined)
            .sum();
        sum / count as f32
    }

    fn is_flux_peak(&self, flux: f32) -> bool {
        let count = self.flux_history.len().saturating_sub(1);
        if count == 0 {
            return false;
        }
        let average = self.flux_history.iter().take(count).sum::<f32>() / count as f32;
        let previous = self.flux_history[count - 1];
        flux > average * FLUX_PEAK_RATIO && flux > previous
    }

    /// Scale threshold and refractory period, 1.0 restores the base values
    pub fn set_sensitivity(&mut self, factor: f32) {
        self.sensitivity = factor;
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    pub fn effective_threshold(&self) -> f32 {
        self.base_threshold * self.sensitivity
    }

    pub fn effective_min_time(&self) -> f64 {
        if self.sensitivity < 1.0 {
            (self.min_time_between_hits * self.sensitivity as f64).max(MIN_BOOSTED_REFRACTORY)
        } else {
            self.min_time_between_hits
        }
    }

    pub fn average_energy(&self) -> f32 {
        self.average_energy
    }

    pub fn adaptive_threshold(&self) -> f32 {
        self.adaptive_threshold
    }

    pub fn genre_profile(&self) -> GenreProfile {
        self.genre_profile
    }

    pub fn analyzer(&self) -> &OnsetEnergyAnalyzer {
        &self.analyzer
    }

    pub fn onset_history_len(&self) -> usize {
        self.onset_history.len()
    }

    pub fn flux_history_len(&self) -> usize {
        self.flux_history.len()
    }

    pub fn diagnostics(&self) -> DetectorDiagnostics {
        DetectorDiagnostics {
            current: self.onset_history.back().copied(),
            last_hit: self.last_hit_sample,
            peak_ratio: self.peak_ratio,
            adaptive_threshold: self.adaptive_threshold,
            average_energy: self.average_energy,
            genre_profile: self.genre_profile,
        }
    }

    pub fn reset(&mut self) {
        self.analyzer.reset();
        self.sensitivity = 1.0;
        self.onset_history.clear();
        self.flux_history.clear();
        self.genre_profile = GenreProfile::default();
        self.average_energy = 0.0;
        self.adaptive_threshold = self.base_threshold;
        self.peak_ratio = 0.0;
        self.last_hit_time = 0.0;
        self.last_hit_sample = None;
    }
}

fn push_bounded<T>(history: &mut VecDeque<T>, value: T, capacity: usize) {
    history.push_back(value);
    while history.len() > capacity {
        history.pop_front();
    }
}
