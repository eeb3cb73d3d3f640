//! Interval clustering with harmonic folding and tempo-range preference
//!
//! Onset-to-onset intervals are turned into BPM values, grouped into
//! clusters (optionally folding half and double tempo onto one cluster) and
//! scored against a preference curve that peaks in the 115-140 BPM range.
//! Accepted tempi feed a small stabilizer that latches a rounded BPM once
//! the recent estimates agree.

use std::collections::VecDeque;

use tracing::debug;

/// Default share of all values the winning cluster must hold
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.08;

/// Maximum BPM distance for a value to join a cluster
const CLUSTER_TOLERANCE: f32 = 6.0;
/// Tempi below this are assumed to be half of the true tempo
const HALF_TEMPO_CEILING: f32 = 90.0;
const HARMONIC_RATIOS: [f32; 3] = [0.5, 1.0, 2.0];
const CLUSTER_SCORE_SCALE: f32 = 1.3;

const STABILITY_HISTORY: usize = 10;
const STABILITY_WINDOW: usize = 5;
const STABILITY_SPREAD: f32 = 0.05;
const STABILITY_MIN_CONFIDENCE: f32 = 0.7;
const STABILITY_LATCH_COUNT: u32 = 3;

/// Preference curve points as (bpm, weight)
const BPM_WEIGHTS: [(f32, f32); 7] = [
    (60.0, 0.6),
    (80.0, 0.8),
    (105.0, 1.0),
    (115.0, 1.4),
    (140.0, 1.4),
    (170.0, 0.8),
    (200.0, 0.5),
];

/// A group of BPM values that agree within the clustering tolerance
#[derive(Debug, Clone, PartialEq)]
pub struct BpmCluster {
    pub values: Vec<f32>,
    pub average: f32,
}

impl BpmCluster {
    fn new(value: f32) -> Self {
        Self {
            values: vec![value],
            average: value,
        }
    }

    fn add(&mut self, value: f32) {
        self.values.push(value);
        self.average = self.values.iter().sum::<f32>() / self.values.len() as f32;
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }
}

/// Linear interpolation over the tempo preference curve
pub fn bpm_range_weight(bpm: f32) -> f32 {
    let (first_bpm, first_weight) = BPM_WEIGHTS[0];
    let (last_bpm, last_weight) = BPM_WEIGHTS[BPM_WEIGHTS.len() - 1];
    if bpm <= first_bpm {
        return first_weight;
    }
    if bpm >= last_bpm {
        return last_weight;
    }
    BPM_WEIGHTS
        .windows(2)
        .find(|pair| bpm >= pair[0].0 && bpm <= pair[1].0)
        .map(|pair| {
            let ((low_bpm, low_weight), (high_bpm, high_weight)) = (pair[0], pair[1]);
            low_weight + (bpm - low_bpm) / (high_bpm - low_bpm) * (high_weight - low_weight)
        })
        .unwrap_or(1.0)
}

/// Group BPM values within `tolerance` of a cluster average
///
/// With `harmonic_folding`, values below 90 BPM are doubled first, and a value
/// also joins a cluster sitting at half or double its tempo, normalized onto
/// that cluster's octave.
pub fn cluster_bpm_values(values: &[f32], tolerance: f32, harmonic_folding: bool) -> Vec<BpmCluster> {
    let ratios: &[f32] = if harmonic_folding {
        &HARMONIC_RATIOS
    } else {
        &HARMONIC_RATIOS[1..2]
    };

    let mut clusters: Vec<BpmCluster> = Vec::new();
    for &raw in values {
        let bpm = if harmonic_folding { double_if_slow(raw) } else { raw };
        let joined = clusters.iter().enumerate().find_map(|(index, cluster)| {
            ratios
                .iter()
                .find(|&&ratio| (cluster.average - bpm * ratio).abs() <= tolerance)
                .map(|&ratio| (index, ratio))
        });

        match joined {
            Some((index, ratio)) => clusters[index].add(bpm * ratio),
            None => clusters.push(BpmCluster::new(bpm)),
        }
    }
    clusters
}

pub(crate) fn double_if_slow(bpm: f32) -> f32 {
    if bpm < HALF_TEMPO_CEILING {
        bpm * 2.0
    } else {
        bpm
    }
}

/// Rolling queue of beat intervals that yields a tempo candidate
#[derive(Debug, Clone)]
pub struct IntervalClusterer {
    intervals: VecDeque<f64>,
    capacity: usize,
    min_bpm: f32,
    max_bpm: f32,
    recent: VecDeque<(f32, f32)>,
    stability_count: u32,
    stable_bpm: Option<f32>,
}

impl IntervalClusterer {
    pub fn new(min_bpm: f32, max_bpm: f32, capacity: usize) -> Self {
        Self {
            intervals: VecDeque::with_capacity(capacity),
            capacity,
            min_bpm,
            max_bpm,
            recent: VecDeque::with_capacity(STABILITY_HISTORY),
            stability_count: 0,
            stable_bpm: None,
        }
    }

    fn accepts(&self, interval: f64) -> bool {
        if !interval.is_finite() || interval <= 0.0 {
            return false;
        }
        let bpm = (60.0 / interval) as f32;
        bpm >= self.min_bpm && bpm <= self.max_bpm
    }

    /// Queue an interval in seconds, silently dropping out-of-range values
    pub fn push(&mut self, interval: f64) -> bool {
        if !self.accepts(interval) {
            return false;
        }
        self.intervals.push_back(interval);
        while self.intervals.len() > self.capacity {
            self.intervals.pop_front();
        }
        true
    }

    /// Change the accepted tempo range and drop queued intervals outside it
    pub fn set_bpm_range(&mut self, min_bpm: f32, max_bpm: f32) {
        self.min_bpm = min_bpm;
        self.max_bpm = max_bpm;
        let kept: VecDeque<f64> = self
            .intervals
            .iter()
            .copied()
            .filter(|&interval| self.accepts(interval))
            .collect();
        self.intervals = kept;
    }

    pub fn bpm_range(&self) -> (f32, f32) {
        (self.min_bpm, self.max_bpm)
    }

    pub fn intervals(&self) -> impl Iterator<Item = f64> + '_ {
        self.intervals.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.intervals.back().copied()
    }

    pub fn mean_interval(&self) -> Option<f64> {
        if self.intervals.is_empty() {
            return None;
        }
        Some(self.intervals.iter().sum::<f64>() / self.intervals.len() as f64)
    }

    fn bpm_values(&self) -> Vec<f32> {
        self.intervals
            .iter()
            .map(|&interval| (60.0 / interval) as f32)
            .collect()
    }

    /// Current tempo candidate, or the latched stable tempo when no cluster wins
    pub fn tempo_bpm(&mut self, confidence_threshold: f32) -> Option<f32> {
        let values = self.bpm_values();
        if values.is_empty() {
            return self.stable_bpm;
        }
        if values.len() <= 2 {
            let average = values.iter().sum::<f32>() / values.len() as f32;
            return Some(double_if_slow(average));
        }

        let clusters = cluster_bpm_values(&values, CLUSTER_TOLERANCE, true);
        let total = values.len() as f32;
        let mut best: Option<&BpmCluster> = None;
        let mut best_score = 0.0f32;
        for cluster in &clusters {
            let share = cluster.count() as f32 / total;
            let score =
                bpm_range_weight(double_if_slow(cluster.average)) * share.powf(1.5) * CLUSTER_SCORE_SCALE;
            if score > best_score {
                best_score = score;
                best = Some(cluster);
            }
        }

        match best {
            Some(cluster) if cluster.count() as f32 / total >= confidence_threshold => {
                let tempo = double_if_slow(cluster.average);
                let share = cluster.count() as f32 / total;
                self.stabilize(tempo, share);
                Some(tempo)
            }
            _ => self.stable_bpm,
        }
    }

    fn stabilize(&mut self, bpm: f32, confidence: f32) {
        self.recent.push_back((bpm, confidence));
        while self.recent.len() > STABILITY_HISTORY {
            self.recent.pop_front();
        }
        if self.recent.len() < STABILITY_WINDOW {
            return;
        }

        let window = self.recent.iter().skip(self.recent.len() - STABILITY_WINDOW);
        let (sum, confidence_sum) = window
            .clone()
            .fold((0.0f32, 0.0f32), |(b, c), &(value, conf)| (b + value, c + conf));
        let mean = sum / STABILITY_WINDOW as f32;
        let mean_confidence = confidence_sum / STABILITY_WINDOW as f32;
        let consistent = mean > 0.0
            && window
                .clone()
                .all(|&(value, _)| (value - mean).abs() / mean < STABILITY_SPREAD);

        if consistent && mean_confidence > STABILITY_MIN_CONFIDENCE {
            self.stability_count += 1;
            if self.stability_count > STABILITY_LATCH_COUNT {
                let latched = mean.round();
                if self.stable_bpm != Some(latched) {
                    debug!(bpm = latched, "interval tempo stabilized");
                }
                self.stable_bpm = Some(latched);
            }
        } else {
            self.stability_count = self.stability_count.saturating_sub(1);
            if self.stability_count == 0 && self.stable_bpm.take().is_some() {
                debug!("interval tempo lost stability");
            }
        }
    }

    pub fn stable_bpm(&self) -> Option<f32> {
        self.stable_bpm
    }

    /// Clusters of the queued intervals, for diagnostics
    pub fn clusters(&self, harmonic_folding: bool) -> Vec<BpmCluster> {
        cluster_bpm_values(&self.bpm_values(), CLUSTER_TOLERANCE, harmonic_folding)
    }

    pub fn reset(&mut self) {
        self.intervals.clear();
        self.recent.clear();
        self.stability_count = 0;
        self.stable_bpm = None;
    }
}
