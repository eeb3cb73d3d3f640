//! Smoothing tempo tracker with outlier damping

use std::collections::VecDeque;

use tracing::debug;

const HISTORY_SIZE: usize = 3;
const INITIAL_CONFIDENCE: f32 = 0.3;
const MAX_CONFIDENCE: f32 = 0.99;
/// Upper bound of the time-scaled forgetting factor
const MAX_FORGET_FACTOR: f64 = 0.15;
const FORGET_TIME_SCALE: f64 = 8.0;
const SMALL_DEVIATION: f32 = 0.05;
const MEDIUM_DEVIATION: f32 = 0.15;
/// Spread within which the recent candidates count as one new tempo
const CONSISTENCY_SPREAD: f32 = 0.1;
const FAST_ADAPT_CONFIDENCE: f32 = 0.4;
const PREFERRED_BAND: std::ops::RangeInclusive<f32> = 115.0..=135.0;
const PREFERENCE_BONUS: f32 = 0.05;

/// Reported tempo and how much the tracker trusts it
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackedBpm {
    pub bpm: Option<f32>,
    pub confidence: f32,
}

/// Blends a stream of tempo candidates into one stable BPM
#[derive(Debug, Clone, Default)]
pub struct TempoTracker {
    current: Option<f32>,
    confidence: f32,
    last_update: f64,
    history: VecDeque<f32>,
}

impl TempoTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a candidate observed at `timestamp`
    ///
    /// Non-finite or non-positive candidates are ignored.
    pub fn update(&mut self, timestamp: f64, candidate: f32) {
        if !candidate.is_finite() || candidate <= 0.0 {
            return;
        }

        let Some(current) = self.current else {
            self.current = Some(candidate);
            self.confidence = INITIAL_CONFIDENCE;
            self.last_update = timestamp;
            self.history.push_back(candidate);
            debug!(bpm = candidate, "tracker seeded");
            return;
        };

        let elapsed = (timestamp - self.last_update).max(0.0);
        self.last_update = timestamp;
        self.history.push_back(candidate);
        while self.history.len() > HISTORY_SIZE {
            self.history.pop_front();
        }

        let forget = (elapsed / FORGET_TIME_SCALE).min(MAX_FORGET_FACTOR) as f32;
        let median = self.median().unwrap_or(current);
        let deviation = if median > 0.0 {
            (median - candidate).abs() / median
        } else {
            0.0
        };
        let bonus = if PREFERRED_BAND.contains(&candidate) {
            PREFERENCE_BONUS
        } else {
            0.0
        };

        let (confidence, blended) = if deviation < SMALL_DEVIATION {
            (
                self.confidence + 0.2 + bonus,
                current * (1.0 - forget * 2.0) + candidate * forget * 2.0,
            )
        } else if deviation < MEDIUM_DEVIATION {
            (
                (self.confidence - (0.02 - bonus)).max(0.15),
                current * 0.75 + candidate * 0.25,
            )
        } else if self.recent_candidates_agree() {
            debug!(
                from = current,
                to = candidate,
                "consistent tempo shift, adapting quickly"
            );
            (FAST_ADAPT_CONFIDENCE, candidate * 0.6 + current * 0.4)
        } else {
            (
                (self.confidence - (0.05 - bonus / 2.0)).max(0.1),
                current * 0.85 + candidate * 0.15,
            )
        };

        self.confidence = confidence.min(MAX_CONFIDENCE);
        self.current = Some(blended);
    }

    fn recent_candidates_agree(&self) -> bool {
        if self.history.len() < HISTORY_SIZE {
            return false;
        }
        let mean = self.history.iter().sum::<f32>() / self.history.len() as f32;
        mean > 0.0
            && self
                .history
                .iter()
                .all(|bpm| (bpm - mean).abs() / mean < CONSISTENCY_SPREAD)
    }

    /// Median of the recent candidates
    pub fn median(&self) -> Option<f32> {
        if self.history.is_empty() {
            return self.current;
        }
        let mut sorted: Vec<f32> = self.history.iter().copied().collect();
        sorted.sort_by(f32::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    pub fn state(&self) -> TrackedBpm {
        TrackedBpm {
            bpm: self.current,
            confidence: self.confidence,
        }
    }

    pub fn bpm(&self) -> Option<f32> {
        self.current
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn history(&self) -> Vec<f32> {
        self.history.iter().copied().collect()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let tracker = TempoTracker::new();
        assert_eq!(tracker.state(), TrackedBpm::default());
        assert_eq!(tracker.bpm(), None);
    }

    #[test]
    fn test_first_candidate_adopted() {
        let mut tracker = TempoTracker::new();
        tracker.update(1.0, 120.0);
        assert_eq!(tracker.bpm(), Some(120.0));
        assert!((tracker.confidence() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_agreement_raises_confidence() {
        let mut tracker = TempoTracker::new();
        tracker.update(0.0, 120.0);
        tracker.update(0.5, 121.0);
        // 0.3 + 0.2 + 0.05 preferred-band bonus
        assert!((tracker.confidence() - 0.55).abs() < 1e-6);
        // forget factor 0.5 / 8, doubled
        let expected = 120.0 * (1.0 - 0.125) + 121.0 * 0.125;
        assert!((tracker.bpm().unwrap() - expected).abs() < 1e-4);

        for i in 2..10 {
            tracker.update(i as f64 * 0.5, 120.0);
        }
        assert!((tracker.confidence() - 0.99).abs() < 1e-6);
    }

    #[test]
    fn test_outlier_is_damped() {
        let mut tracker = TempoTracker::new();
        for i in 0..5 {
            tracker.update(i as f64 * 0.5, 120.0);
        }
        let before = tracker.confidence();
        tracker.update(2.5, 180.0);

        let bpm = tracker.bpm().unwrap();
        assert!(bpm < 130.0, "outlier pulled tempo to {bpm}");
        assert!(tracker.confidence() < before);
    }

    #[test]
    fn test_medium_deviation_blend() {
        let mut tracker = TempoTracker::new();
        tracker.update(0.0, 100.0);
        tracker.update(0.5, 100.0);
        tracker.update(1.0, 110.0);
        // median of [100, 100, 110] is 100, deviation 10%
        let bpm = tracker.bpm().unwrap();
        assert!((bpm - (100.0 * 0.75 + 110.0 * 0.25)).abs() < 1e-4);
    }

    #[test]
    fn test_confidence_stays_bounded() {
        let mut tracker = TempoTracker::new();
        let candidates = [120.0, 60.0, 240.0, 130.0, 90.0, 125.0, 200.0, 61.0];
        for (i, &bpm) in candidates.iter().cycle().take(200).enumerate() {
            tracker.update(i as f64 * 0.1, bpm);
            let confidence = tracker.confidence();
            assert!((0.0..=1.0).contains(&confidence));
            assert!(tracker.bpm().unwrap().is_finite());
        }
    }

    #[test]
    fn test_invalid_candidates_ignored() {
        let mut tracker = TempoTracker::new();
        tracker.update(0.0, f32::NAN);
        tracker.update(0.0, -5.0);
        assert_eq!(tracker.bpm(), None);
    }

    #[test]
    fn test_history_bounded_and_reset() {
        let mut tracker = TempoTracker::new();
        for i in 0..10 {
            tracker.update(i as f64, 120.0 + i as f32);
        }
        assert_eq!(tracker.history().len(), 3);
        tracker.reset();
        assert_eq!(tracker.state(), TrackedBpm::default());
        assert!(tracker.history().is_empty());
    }
}
