//! Construction-time configuration for the beat analysis engine

use crate::error::{EngineError, Result};

/// Sample rate used by `EngineConfig::default()`
const DEFAULT_SAMPLE_RATE: u32 = 44_100;
/// Base onset threshold (relative rise over the recent average)
const DEFAULT_THRESHOLD: f32 = 0.32;
/// Hard refractory period between two hits in seconds
const DEFAULT_MIN_TIME_BETWEEN_HITS: f64 = 0.08;
const DEFAULT_MIN_BPM: f32 = 60.0;
const DEFAULT_MAX_BPM: f32 = 200.0;
const ONSET_HISTORY_SIZE: usize = 12;
const FLUX_HISTORY_SIZE: usize = 20;
const HIT_CACHE_CAPACITY: usize = 100;
const INTERVAL_QUEUE_CAPACITY: usize = 20;
/// Onset-strength samples kept for the periodicity estimators
const ONSET_CURVE_CAPACITY: usize = 512;
/// Relative average-energy change that counts as a track switch
const TRACK_CHANGE_RATIO: f32 = 0.4;
const SENSITIVITY_BOOST_FACTOR: f32 = 0.8;
const SENSITIVITY_BOOST_DURATION: f64 = 2.0;
/// Silence after the last hit before the emergency seeding kicks in
const EMERGENCY_AFTER: f64 = 1.5;

/// Configuration for [`BeatAnalysisEngine`](crate::BeatAnalysisEngine)
///
/// # Example
///
/// ```
/// use beatsense_engine::EngineConfig;
///
/// let config = EngineConfig::new(48_000)
///     .with_threshold(0.28)
///     .with_bpm_range(70.0, 180.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Sample rate of the audio the frames were computed from (Hz)
    pub sample_rate: u32,
    /// Base onset threshold before adaptive scaling
    pub threshold: f32,
    /// Minimum spacing between two hits in seconds
    pub min_time_between_hits: f64,
    /// Lowest tempo accepted into the interval queue
    pub min_bpm: f32,
    /// Highest tempo accepted into the interval queue
    pub max_bpm: f32,
    pub onset_history_size: usize,
    pub flux_history_size: usize,
    pub hit_cache_capacity: usize,
    pub interval_queue_capacity: usize,
    pub onset_curve_capacity: usize,
    /// Relative change of the smoothed energy that triggers a track-change reset
    pub track_change_ratio: f32,
    /// Multiplier applied to threshold and refractory period after a track change
    pub sensitivity_boost_factor: f32,
    /// How long the sensitivity boost lasts, in seconds of caller timestamps
    pub sensitivity_boost_duration: f64,
    /// Seconds without a hit before the tracker is force-seeded
    pub emergency_after: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl EngineConfig {
    /// Create a configuration with default tuning for the given sample rate
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            threshold: DEFAULT_THRESHOLD,
            min_time_between_hits: DEFAULT_MIN_TIME_BETWEEN_HITS,
            min_bpm: DEFAULT_MIN_BPM,
            max_bpm: DEFAULT_MAX_BPM,
            onset_history_size: ONSET_HISTORY_SIZE,
            flux_history_size: FLUX_HISTORY_SIZE,
            hit_cache_capacity: HIT_CACHE_CAPACITY,
            interval_queue_capacity: INTERVAL_QUEUE_CAPACITY,
            onset_curve_capacity: ONSET_CURVE_CAPACITY,
            track_change_ratio: TRACK_CHANGE_RATIO,
            sensitivity_boost_factor: SENSITIVITY_BOOST_FACTOR,
            sensitivity_boost_duration: SENSITIVITY_BOOST_DURATION,
            emergency_after: EMERGENCY_AFTER,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_min_time_between_hits(mut self, seconds: f64) -> Self {
        self.min_time_between_hits = seconds;
        self
    }

    pub fn with_bpm_range(mut self, min_bpm: f32, max_bpm: f32) -> Self {
        self.min_bpm = min_bpm;
        self.max_bpm = max_bpm;
        self
    }

    pub fn with_hit_cache_capacity(mut self, capacity: usize) -> Self {
        self.hit_cache_capacity = capacity;
        self
    }

    pub fn with_interval_queue_capacity(mut self, capacity: usize) -> Self {
        self.interval_queue_capacity = capacity;
        self
    }

    pub fn with_onset_curve_capacity(mut self, capacity: usize) -> Self {
        self.onset_curve_capacity = capacity;
        self
    }

    pub fn with_sensitivity_boost(mut self, factor: f32, duration: f64) -> Self {
        self.sensitivity_boost_factor = factor;
        self.sensitivity_boost_duration = duration;
        self
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(EngineError::InvalidConfig(
                "sample_rate must be positive".to_string(),
            ));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "threshold must be a positive number".to_string(),
            ));
        }
        if !self.min_time_between_hits.is_finite() || self.min_time_between_hits <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "min_time_between_hits must be positive".to_string(),
            ));
        }
        validate_bpm_range(self.min_bpm, self.max_bpm)?;
        let capacities = [
            ("onset_history_size", self.onset_history_size),
            ("flux_history_size", self.flux_history_size),
            ("hit_cache_capacity", self.hit_cache_capacity),
            ("interval_queue_capacity", self.interval_queue_capacity),
            ("onset_curve_capacity", self.onset_curve_capacity),
        ];
        if let Some((name, _)) = capacities.iter().find(|(_, size)| *size == 0) {
            return Err(EngineError::InvalidConfig(format!(
                "{name} must be positive"
            )));
        }
        if !(self.track_change_ratio > 0.0) {
            return Err(EngineError::InvalidConfig(
                "track_change_ratio must be positive".to_string(),
            ));
        }
        if !(self.sensitivity_boost_factor > 0.0 && self.sensitivity_boost_factor <= 1.0) {
            return Err(EngineError::InvalidConfig(
                "sensitivity_boost_factor must be in (0, 1]".to_string(),
            ));
        }
        if !(self.sensitivity_boost_duration >= 0.0) || !(self.emergency_after >= 0.0) {
            return Err(EngineError::InvalidConfig(
                "durations must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Checks a tempo range, shared by the config and runtime range updates
pub(crate) fn validate_bpm_range(min_bpm: f32, max_bpm: f32) -> Result<()> {
    if !min_bpm.is_finite() || min_bpm <= 0.0 {
        return Err(EngineError::InvalidConfig(
            "min_bpm must be positive".to_string(),
        ));
    }
    if !max_bpm.is_finite() || max_bpm <= min_bpm {
        return Err(EngineError::InvalidConfig(
            "max_bpm must be greater than min_bpm".to_string(),
        ));
    }
    Ok(())
}
