//! Beat grid and dynamic-programming beat placement
//!
//! Given a tempo and the onset-strength curve, the tracker places beats so
//! that they land on strong onsets while keeping their spacing close to the
//! ideal beat period. The resulting grid lets a host ask where the next beat
//! falls and how far into the current beat a given moment is.

/// Allowed deviation of a beat interval from the ideal period
const INTERVAL_TOLERANCE: f32 = 0.2;
/// Weight of tempo regularity against onset strength
const REGULARITY_WEIGHT: f32 = 100.0;
const MIN_CURVE_LEN: usize = 10;

/// Phase-aligned beat grid in caller timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct BeatGrid {
    /// Tempo of the grid
    pub bpm: f32,
    /// Timestamp of a beat the grid is aligned to (seconds)
    pub anchor: f64,
    /// Confidence score (0.0 - 1.0) carried over from the tempo tracker
    pub confidence: f32,
    /// Seconds per beat (cached)
    seconds_per_beat: f64,
}

impl BeatGrid {
    pub fn new(bpm: f32, anchor: f64, confidence: f32) -> Self {
        Self {
            bpm,
            anchor,
            confidence,
            seconds_per_beat: 60.0 / bpm as f64,
        }
    }

    /// Beat number at a timestamp, fractional and negative before the anchor
    pub fn beat_at(&self, time: f64) -> f64 {
        (time - self.anchor) / self.seconds_per_beat
    }

    /// Position within the current beat (0.0 - 1.0)
    pub fn phase_at(&self, time: f64) -> f32 {
        self.beat_at(time).rem_euclid(1.0) as f32
    }

    pub fn time_for_beat(&self, beat: f64) -> f64 {
        self.anchor + beat * self.seconds_per_beat
    }

    /// First beat strictly after `time`
    pub fn next_beat_after(&self, time: f64) -> f64 {
        self.time_for_beat(self.beat_at(time).floor() + 1.0)
    }

    pub fn seconds_per_beat(&self) -> f64 {
        self.seconds_per_beat
    }
}

/// Place beats on an onset-strength curve for a known tempo
///
/// Returns curve indices in ascending order. Each beat's predecessor lies
/// within 20% of the ideal period; the transition cost is
/// `100 * ln(interval / ideal)^2`. Backtracking starts from the best score
/// inside the final ideal period.
pub fn track_beats(curve: &[f32], frames_per_second: f32, bpm: f32) -> Vec<usize> {
    let len = curve.len();
    if len < MIN_CURVE_LEN || !(bpm > 0.0) || !(frames_per_second > 0.0) {
        return Vec::new();
    }
    let ideal = 60.0 / bpm * frames_per_second;
    if !ideal.is_finite() || ideal < 1.0 {
        return Vec::new();
    }

    let longest = (ideal * (1.0 + INTERVAL_TOLERANCE)).floor() as usize;
    let shortest = (ideal * (1.0 - INTERVAL_TOLERANCE)).floor() as usize;

    let mut score = curve.to_vec();
    let mut predecessor: Vec<Option<usize>> = vec![None; len];

    for i in 1..len {
        let Some(end) = i.checked_sub(shortest) else {
            continue;
        };
        for j in i.saturating_sub(longest)..end {
            let penalty = ((i - j) as f32 / ideal).ln().powi(2);
            let candidate = score[j] + curve[i] - REGULARITY_WEIGHT * penalty;
            if candidate > score[i] {
                score[i] = candidate;
                predecessor[i] = Some(j);
            }
        }
    }

    let start = len.saturating_sub(ideal.floor() as usize);
    let mut best = start;
    for i in start + 1..len {
        if score[i] > score[best] {
            best = i;
        }
    }

    let mut beats = vec![best];
    let mut current = best;
    while let Some(previous) = predecessor[current] {
        beats.push(previous);
        current = previous;
    }
    beats.reverse();
    beats
}
