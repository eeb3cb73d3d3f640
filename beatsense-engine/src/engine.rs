//! Per-frame orchestration of the beat analysis pipeline
//!
//! The engine owns one instance of every stage and runs them in order for
//! each frame: onset detection, track-change detection, then either hit
//! registration (interval path) or the periodicity estimators when no hit
//! fired. All timing is driven by the caller's timestamps.

use std::collections::VecDeque;

use tracing::{debug, info, trace};

use crate::beatgrid::{track_beats, BeatGrid};
use crate::clusterer::{double_if_slow, IntervalClusterer, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::config::{validate_bpm_range, EngineConfig};
use crate::detector::{AdaptiveOnsetDetector, DetectorDiagnostics, Hit, HitCache};
use crate::error::{EngineError, Result};
use crate::frame::FrequencyFrame;
use crate::octave::{fold_onto_octave, CandidateSource, OctaveCorrector, TempoCandidate};
use crate::periodicity::{AutocorrelationEstimator, OnsetCurve, TempogramEstimator};
use crate::tracker::{TempoTracker, TrackedBpm};

/// Tempo reported right after the very first hit
pub const FIRST_HIT_BPM: f32 = 120.0;

/// Average-energy values kept for track-change detection
const ENERGY_WINDOW: usize = 20;
/// Size of each of the two compared blocks of the energy window
const ENERGY_BLOCK: usize = 5;
const ENERGY_CHANGE_FLOOR: f32 = 0.1;

const AUTOCORRELATION_MIN_SAMPLES: usize = 100;
const TEMPOGRAM_MIN_SAMPLES: usize = 50;
const AUTOCORRELATION_MIN_STRENGTH: f32 = 0.3;

const EMERGENCY_INTERVAL_STRENGTH: f32 = 0.7;
const EMERGENCY_SPACING_STRENGTH: f32 = 0.5;
const EMERGENCY_CONFIDENCE: f32 = 0.5;

const DIAGNOSTIC_INTERVALS: usize = 5;
const DIAGNOSTIC_CLUSTER_VALUES: usize = 5;

/// Result of feeding one frame to the engine
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameOutcome {
    /// Beat onset detected on this frame
    pub hit: Option<Hit>,
    /// Whether this frame triggered a track-change reset
    pub track_change: bool,
}

/// One harmonic cluster of the queued intervals
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSnapshot {
    pub average: f32,
    pub count: usize,
    /// Newest values of the cluster
    pub recent_values: Vec<f32>,
}

/// Structured snapshot of the whole pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct EngineDiagnostics {
    pub detector: DetectorDiagnostics,
    pub tracked: TrackedBpm,
    pub stable_bpm: Option<f32>,
    pub hit_count: usize,
    pub recent_intervals: Vec<f64>,
    pub clusters: Vec<ClusterSnapshot>,
    pub bpm_history: Vec<f32>,
    pub effective_threshold: f32,
    pub effective_min_time_between_hits: f64,
    pub sensitivity_boost_active: bool,
    pub track_changes: u32,
}

/// Real-time beat and tempo detector driven by frequency frames
///
/// # Example
///
/// ```
/// use beatsense_engine::{BeatAnalysisEngine, EngineConfig, FrequencyFrame};
///
/// let mut engine = BeatAnalysisEngine::new(EngineConfig::new(44_100))?;
/// let silence = vec![0.0f32; 1024];
/// for i in 0..60 {
///     let frame = FrequencyFrame::new(&silence, 44_100);
///     let outcome = engine.update(&frame, i as f64 / 60.0)?;
///     assert!(outcome.hit.is_none());
/// }
/// assert_eq!(engine.bpm(), None);
/// # Ok::<(), beatsense_engine::EngineError>(())
/// ```
pub struct BeatAnalysisEngine {
    config: EngineConfig,
    detector: AdaptiveOnsetDetector,
    hits: HitCache,
    clusterer: IntervalClusterer,
    corrector: OctaveCorrector,
    tracker: TempoTracker,
    autocorrelation: AutocorrelationEstimator,
    tempogram: TempogramEstimator,
    onset_curve: OnsetCurve,
    energy_window: VecDeque<f32>,
    last_hit_time: Option<f64>,
    /// Tempo octave implied by real hit spacing
    octave_reference: Option<f32>,
    last_timestamp: Option<f64>,
    boost_until: Option<f64>,
    track_changes: u32,
}

impl BeatAnalysisEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        info!(
            sample_rate = config.sample_rate,
            min_bpm = config.min_bpm,
            max_bpm = config.max_bpm,
            "beat analysis engine created"
        );
        Ok(Self {
            detector: AdaptiveOnsetDetector::new(&config),
            hits: HitCache::new(config.hit_cache_capacity),
            clusterer: IntervalClusterer::new(
                config.min_bpm,
                config.max_bpm,
                config.interval_queue_capacity,
            ),
            corrector: OctaveCorrector::new(),
            tracker: TempoTracker::new(),
            autocorrelation: AutocorrelationEstimator::default(),
            tempogram: TempogramEstimator::default(),
            onset_curve: OnsetCurve::new(config.onset_curve_capacity),
            energy_window: VecDeque::with_capacity(ENERGY_WINDOW),
            last_hit_time: None,
            octave_reference: None,
            last_timestamp: None,
            boost_until: None,
            track_changes: 0,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyse one frame observed at `timestamp` seconds
    ///
    /// Invalid frames and timestamps are rejected before any state changes.
    pub fn update(&mut self, frame: &FrequencyFrame<'_>, timestamp: f64) -> Result<FrameOutcome> {
        self.check_input(frame, timestamp)?;
        self.last_timestamp = Some(timestamp);
        self.expire_boost(timestamp);

        let hit = self.detector.process(frame, timestamp);
        let strength = self.detector.analyzer().compute_onset_strength(frame);
        self.onset_curve.push(timestamp, strength);

        let track_change = self.detect_track_change(timestamp);

        match hit {
            Some(hit) => self.register_hit(hit),
            None => {
                self.run_periodicity_estimators(timestamp);
                self.run_emergency_path(timestamp);
            }
        }

        Ok(FrameOutcome { hit, track_change })
    }

    fn check_input(&self, frame: &FrequencyFrame<'_>, timestamp: f64) -> Result<()> {
        if !timestamp.is_finite() {
            return Err(EngineError::InvalidTimestamp(timestamp));
        }
        if let Some(previous) = self.last_timestamp {
            if timestamp < previous {
                return Err(EngineError::TimestampRegression {
                    previous,
                    current: timestamp,
                });
            }
        }
        if frame.sample_rate() != self.config.sample_rate {
            return Err(EngineError::SampleRateMismatch {
                expected: self.config.sample_rate,
                actual: frame.sample_rate(),
            });
        }
        frame.validate()
    }

    fn expire_boost(&mut self, timestamp: f64) {
        if let Some(until) = self.boost_until {
            if timestamp >= until {
                self.detector.set_sensitivity(1.0);
                self.boost_until = None;
                info!(timestamp, "sensitivity boost expired");
            }
        }
    }

    /// Compare the newest block of average energies against the one before it
    fn detect_track_change(&mut self, timestamp: f64) -> bool {
        self.energy_window.push_back(self.detector.average_energy());
        while self.energy_window.len() > ENERGY_WINDOW {
            self.energy_window.pop_front();
        }
        let len = self.energy_window.len();
        if len <= 2 * ENERGY_BLOCK {
            return false;
        }

        let block_mean = |range: std::ops::Range<usize>| -> f32 {
            self.energy_window.range(range).sum::<f32>() / ENERGY_BLOCK as f32
        };
        let recent = block_mean(len - ENERGY_BLOCK..len);
        let older = block_mean(len - 2 * ENERGY_BLOCK..len - ENERGY_BLOCK);
        let change = (recent - older).abs() / recent.max(older).max(ENERGY_CHANGE_FLOOR);

        if change > self.config.track_change_ratio {
            self.handle_track_change(timestamp, change);
            return true;
        }
        false
    }

    fn handle_track_change(&mut self, timestamp: f64, change: f32) {
        self.clusterer.reset();
        self.tracker.reset();
        self.onset_curve.clear();
        self.energy_window.clear();
        self.octave_reference = None;
        self.detector
            .set_sensitivity(self.config.sensitivity_boost_factor);
        self.boost_until = Some(timestamp + self.config.sensitivity_boost_duration);
        self.track_changes += 1;
        info!(
            timestamp,
            change,
            boost_until = timestamp + self.config.sensitivity_boost_duration,
            "track change detected, tempo state cleared"
        );
    }

    fn register_hit(&mut self, hit: Hit) {
        self.hits.append(hit);
        match self.last_hit_time {
            Some(previous) => {
                let interval = hit.timestamp - previous;
                if self.clusterer.push(interval) {
                    let bpm = double_if_slow((60.0 / interval) as f32);
                    self.octave_reference = Some(self.fold_to_reference(bpm));
                }
                if let Some(bpm) = self.clusterer.tempo_bpm(DEFAULT_CONFIDENCE_THRESHOLD) {
                    let candidate = TempoCandidate::new(bpm, 1.0, CandidateSource::Interval);
                    if let Some(corrected) = self.corrector.correct_octave_errors(&[candidate], 1.0) {
                        let folded = self.fold_to_reference(corrected);
                        self.feed_tracker(hit.timestamp, folded);
                    }
                }
            }
            None if self.hits.len() == 1 => {
                self.tracker.update(hit.timestamp, FIRST_HIT_BPM);
                debug!(timestamp = hit.timestamp, bpm = FIRST_HIT_BPM, "first hit, tracker seeded");
            }
            None => {}
        }
        self.last_hit_time = Some(hit.timestamp);
    }

    fn run_periodicity_estimators(&mut self, timestamp: f64) {
        let Some(frames_per_second) = self.onset_curve.frames_per_second() else {
            return;
        };
        let len = self.onset_curve.len();
        if len < TEMPOGRAM_MIN_SAMPLES {
            return;
        }
        let curve = self.onset_curve.strengths();

        if len >= AUTOCORRELATION_MIN_SAMPLES {
            if let Some(candidate) = self.autocorrelation.estimate(&curve, frames_per_second) {
                if candidate.strength > AUTOCORRELATION_MIN_STRENGTH {
                    self.adopt_candidate(timestamp, candidate);
                }
            }
        }
        if let Some(candidate) = self.tempogram.estimate(&curve, frames_per_second) {
            self.adopt_candidate(timestamp, candidate);
        }
    }

    /// Route an estimator candidate through correction and the interval queue
    ///
    /// Candidates and the resulting tempo are kept on the octave of the real
    /// hit spacing, so a harmonic peak cannot pull the queue to the other octave.
    fn adopt_candidate(&mut self, timestamp: f64, mut candidate: TempoCandidate) {
        if candidate.bpm < self.config.min_bpm || candidate.bpm > self.config.max_bpm {
            return;
        }
        candidate.bpm = self.fold_to_reference(candidate.bpm);
        let Some(corrected) = self
            .corrector
            .correct_octave_errors(&[candidate], candidate.strength)
        else {
            return;
        };
        self.clusterer.push(60.0 / corrected as f64);
        if let Some(bpm) = self.clusterer.tempo_bpm(DEFAULT_CONFIDENCE_THRESHOLD) {
            let bpm = self.fold_to_reference(bpm);
            trace!(
                source = %candidate.source,
                candidate = candidate.bpm,
                bpm,
                "estimator candidate adopted"
            );
            self.feed_tracker(timestamp, bpm);
        }
    }

    fn fold_to_reference(&self, bpm: f32) -> f32 {
        self.octave_reference
            .map_or(bpm, |reference| fold_onto_octave(bpm, reference))
    }

    /// Force-seed the tracker when hits stopped before any tempo was tracked
    fn run_emergency_path(&mut self, timestamp: f64) {
        let Some(last_hit) = self.last_hit_time else {
            return;
        };
        if timestamp - last_hit <= self.config.emergency_after
            || self.hits.is_empty()
            || self.tracker.bpm().is_some()
        {
            return;
        }

        let mut candidates = Vec::with_capacity(2);
        if let Some(mean) = self.clusterer.mean_interval() {
            candidates.push(TempoCandidate::new(
                (60.0 / mean) as f32,
                EMERGENCY_INTERVAL_STRENGTH,
                CandidateSource::Emergency,
            ));
        }
        if let (Some(first), Some(last)) = (self.hits.first(), self.hits.last()) {
            let span = last.timestamp - first.timestamp;
            if self.hits.len() > 1 && span > 0.0 {
                let spacing = span / (self.hits.len() - 1) as f64;
                candidates.push(TempoCandidate::new(
                    (60.0 / spacing) as f32,
                    EMERGENCY_SPACING_STRENGTH,
                    CandidateSource::Emergency,
                ));
            }
        }

        if let Some(bpm) = self
            .corrector
            .correct_octave_errors(&candidates, EMERGENCY_CONFIDENCE)
        {
            debug!(timestamp, bpm, "no tracked tempo, seeding from hit history");
            self.feed_tracker(timestamp, bpm);
        }
    }

    fn feed_tracker(&mut self, timestamp: f64, bpm: f32) {
        let clamped = bpm.clamp(self.config.min_bpm, self.config.max_bpm);
        self.tracker.update(timestamp, clamped);
    }

    pub fn bpm(&self) -> Option<f32> {
        self.tracker.bpm()
    }

    pub fn confidence(&self) -> f32 {
        self.tracker.confidence()
    }

    pub fn tracked(&self) -> TrackedBpm {
        self.tracker.state()
    }

    pub fn hit_count(&self) -> usize {
        self.hits.len()
    }

    /// Newest interval in the tempo queue, in seconds
    ///
    /// Hit spacings outside the BPM range never reach the queue, and the
    /// periodicity estimators queue virtual intervals too.
    pub fn last_interval(&self) -> Option<f64> {
        self.last_hit_time.and(self.clusterer.last())
    }

    /// Newest `count` hits, oldest first
    pub fn recent_hits(&self, count: usize) -> Vec<Hit> {
        self.hits.recent(count)
    }

    pub fn sensitivity_boost_active(&self) -> bool {
        self.boost_until.is_some()
    }

    pub fn track_changes(&self) -> u32 {
        self.track_changes
    }

    pub fn diagnostics(&self) -> EngineDiagnostics {
        let intervals: Vec<f64> = self.clusterer.intervals().collect();
        let recent_intervals = intervals[intervals.len().saturating_sub(DIAGNOSTIC_INTERVALS)..].to_vec();
        let clusters = self
            .clusterer
            .clusters(true)
            .into_iter()
            .map(|cluster| ClusterSnapshot {
                average: cluster.average,
                count: cluster.count(),
                recent_values: cluster.values
                    [cluster.values.len().saturating_sub(DIAGNOSTIC_CLUSTER_VALUES)..]
                    .to_vec(),
            })
            .collect();

        EngineDiagnostics {
            detector: self.detector.diagnostics(),
            tracked: self.tracker.state(),
            stable_bpm: self.clusterer.stable_bpm(),
            hit_count: self.hits.len(),
            recent_intervals,
            clusters,
            bpm_history: self.tracker.history(),
            effective_threshold: self.detector.effective_threshold(),
            effective_min_time_between_hits: self.detector.effective_min_time(),
            sensitivity_boost_active: self.sensitivity_boost_active(),
            track_changes: self.track_changes,
        }
    }

    /// Plain interval clusters as `"120bpm (7), 60bpm (2)"`, largest first
    pub fn cluster_summary(&self) -> Option<String> {
        let mut clusters = self.clusterer.clusters(false);
        if clusters.is_empty() {
            return None;
        }
        clusters.sort_by(|a, b| b.count().cmp(&a.count()));
        let summary = clusters
            .iter()
            .map(|cluster| format!("{:.0}bpm ({})", cluster.average, cluster.count()))
            .collect::<Vec<_>>()
            .join(", ");
        Some(summary)
    }

    /// Beat grid aligned to the last beat placed on the onset curve
    pub fn beat_grid(&self) -> Option<BeatGrid> {
        let bpm = self.tracker.bpm()?;
        let frames_per_second = self.onset_curve.frames_per_second()?;
        let beats = track_beats(&self.onset_curve.strengths(), frames_per_second, bpm);
        if beats.len() < 2 {
            return None;
        }
        let anchor = self.onset_curve.timestamp_at(*beats.last()?)?;
        Some(BeatGrid::new(bpm, anchor, self.tracker.confidence()))
    }

    /// Change the accepted tempo range, dropping queued intervals outside it
    pub fn set_bpm_range(&mut self, min_bpm: f32, max_bpm: f32) -> Result<()> {
        validate_bpm_range(min_bpm, max_bpm)?;
        self.config.min_bpm = min_bpm;
        self.config.max_bpm = max_bpm;
        self.clusterer.set_bpm_range(min_bpm, max_bpm);
        debug!(min_bpm, max_bpm, "tempo range updated");
        Ok(())
    }

    /// Return every stage to its construction-time state
    pub fn reset(&mut self) {
        self.detector.reset();
        self.hits.clear();
        self.clusterer.reset();
        self.tracker.reset();
        self.onset_curve.clear();
        self.energy_window.clear();
        self.last_hit_time = None;
        self.octave_reference = None;
        self.last_timestamp = None;
        self.boost_until = None;
        self.track_changes = 0;
        info!("beat analysis engine reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44_100;
    const FPS: f64 = 60.0;

    fn bass_frame(level: f32) -> Vec<f32> {
        let mut magnitudes = vec![0.0f32; 1024];
        for bin in 1..=11 {
            magnitudes[bin] = level;
        }
        magnitudes
    }

    /// Level 20 with a spike of 60 every 30 frames from frame 30 on
    fn click_level(index: usize) -> f32 {
        if index >= 30 && index % 30 == 0 {
            60.0
        } else {
            20.0
        }
    }

    fn engine() -> BeatAnalysisEngine {
        BeatAnalysisEngine::new(EngineConfig::new(SAMPLE_RATE)).unwrap()
    }

    fn feed(engine: &mut BeatAnalysisEngine, magnitudes: &[f32], timestamp: f64) -> FrameOutcome {
        engine
            .update(&FrequencyFrame::new(magnitudes, SAMPLE_RATE), timestamp)
            .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig::new(SAMPLE_RATE).with_bpm_range(200.0, 100.0);
        assert!(matches!(
            BeatAnalysisEngine::new(config),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejected_input_leaves_state_untouched() {
        let mut engine = engine();
        feed(&mut engine, &bass_frame(20.0), 1.0);
        let before = engine.diagnostics();

        let bad = vec![1.0, f32::NAN, 2.0];
        assert_eq!(
            engine.update(&FrequencyFrame::new(&bad, SAMPLE_RATE), 1.1),
            Err(EngineError::NonFiniteMagnitude { index: 1 })
        );
        let good = bass_frame(20.0);
        assert_eq!(
            engine.update(&FrequencyFrame::new(&good, 48_000), 1.1),
            Err(EngineError::SampleRateMismatch {
                expected: SAMPLE_RATE,
                actual: 48_000
            })
        );
        assert!(matches!(
            engine.update(&FrequencyFrame::new(&good, SAMPLE_RATE), f64::NAN),
            Err(EngineError::InvalidTimestamp(_))
        ));
        assert_eq!(
            engine.update(&FrequencyFrame::new(&good, SAMPLE_RATE), 0.5),
            Err(EngineError::TimestampRegression {
                previous: 1.0,
                current: 0.5
            })
        );
        let empty: Vec<f32> = Vec::new();
        assert_eq!(
            engine.update(&FrequencyFrame::new(&empty, SAMPLE_RATE), 1.1),
            Err(EngineError::EmptyFrame)
        );

        assert_eq!(engine.diagnostics(), before);
        // Equal timestamps are allowed and the engine resumes normally
        assert!(engine
            .update(&FrequencyFrame::new(&good, SAMPLE_RATE), 1.0)
            .is_ok());
    }

    #[test]
    fn test_first_hit_seeds_default_tempo() {
        let mut engine = engine();
        let mut first_hit = None;
        for i in 0..=30 {
            let outcome = feed(&mut engine, &bass_frame(click_level(i)), i as f64 / FPS);
            if outcome.hit.is_some() {
                first_hit = outcome.hit;
            }
        }

        let hit = first_hit.unwrap();
        assert!((hit.timestamp - 0.5).abs() < 1e-9);
        assert_eq!(engine.hit_count(), 1);
        assert_eq!(engine.bpm(), Some(FIRST_HIT_BPM));
        assert!((engine.confidence() - 0.3).abs() < 1e-6);
        assert_eq!(engine.last_interval(), None);
    }

    #[test]
    fn test_intervals_and_summary_after_clicks() {
        let mut engine = engine();
        assert_eq!(engine.cluster_summary(), None);
        for i in 0..=150 {
            feed(&mut engine, &bass_frame(click_level(i)), i as f64 / FPS);
        }

        assert_eq!(engine.hit_count(), 5);
        assert!((engine.last_interval().unwrap() - 0.5).abs() < 1e-9);
        let hits = engine.recent_hits(2);
        assert_eq!(hits.len(), 2);
        assert!((hits[1].timestamp - 2.5).abs() < 1e-9);

        let summary = engine.cluster_summary().unwrap();
        assert!(summary.contains("120bpm"), "summary was {summary}");
    }

    #[test]
    fn test_out_of_range_spacing_is_not_reported() {
        // 300 BPM clicks fall outside the default range
        let mut engine = engine();
        for i in 0..40 {
            let level = if i >= 12 && i % 12 == 0 { 60.0 } else { 20.0 };
            feed(&mut engine, &bass_frame(level), i as f64 / FPS);
        }
        assert!(engine.hit_count() >= 2);
        assert!(engine.clusterer.is_empty());
        assert_eq!(engine.last_interval(), None);
    }

    #[test]
    fn test_oversized_magnitudes_rejected() {
        let mut engine = engine();
        for i in 0..300 {
            feed(&mut engine, &bass_frame(click_level(i)), i as f64 / FPS);
        }
        let before = engine.diagnostics();

        let huge = bass_frame(1.0e20);
        assert_eq!(
            engine.update(&FrequencyFrame::new(&huge, SAMPLE_RATE), 5.0),
            Err(EngineError::MagnitudeOutOfRange {
                index: 1,
                value: 1.0e20
            })
        );
        assert_eq!(engine.diagnostics(), before);

        for i in 300..600 {
            feed(&mut engine, &bass_frame(click_level(i)), i as f64 / FPS);
        }
        let diagnostics = engine.diagnostics();
        assert!(diagnostics.detector.average_energy.is_finite());
        assert!(engine.bpm().is_some_and(f32::is_finite));
        assert!(engine
            .recent_hits(100)
            .iter()
            .all(|hit| hit.energy.is_finite() && hit.estimated_frequency_hz.is_finite()));
    }

    #[test]
    fn test_reads_are_idempotent() {
        let mut engine = engine();
        for i in 0..200 {
            feed(&mut engine, &bass_frame(click_level(i)), i as f64 / FPS);
        }
        assert_eq!(engine.bpm(), engine.bpm());
        assert_eq!(engine.confidence(), engine.confidence());
        assert_eq!(engine.diagnostics(), engine.diagnostics());
        assert_eq!(engine.cluster_summary(), engine.cluster_summary());
    }

    #[test]
    fn test_set_bpm_range() {
        let mut engine = engine();
        assert!(engine.set_bpm_range(150.0, 100.0).is_err());
        assert!(engine.set_bpm_range(-1.0, 100.0).is_err());
        assert!(engine.set_bpm_range(90.0, 180.0).is_ok());
        assert_eq!(engine.config().min_bpm, 90.0);
        assert_eq!(engine.config().max_bpm, 180.0);
        assert_eq!(engine.clusterer.bpm_range(), (90.0, 180.0));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut engine = engine();
        for i in 0..200 {
            feed(&mut engine, &bass_frame(click_level(i)), i as f64 / FPS);
        }
        assert!(engine.hit_count() > 0);

        engine.reset();
        assert_eq!(engine.bpm(), None);
        assert_eq!(engine.confidence(), 0.0);
        assert_eq!(engine.hit_count(), 0);
        assert_eq!(engine.last_interval(), None);
        assert_eq!(engine.cluster_summary(), None);
        assert!(!engine.sensitivity_boost_active());

        // Timestamps may restart after a reset
        assert!(engine
            .update(&FrequencyFrame::new(&bass_frame(20.0), SAMPLE_RATE), 0.0)
            .is_ok());
    }
}
