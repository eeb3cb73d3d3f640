//! Octave error correction across tempo candidates

use std::fmt;

/// Ratios under which two candidates are considered the same tempo family
const OCTAVE_RATIOS: [f32; 5] = [0.5, 1.0, 2.0, 1.0 / 3.0, 3.0];
const RATIO_TOLERANCE: f32 = 0.05;
const GROUP_SIZE_WEIGHT: f32 = 10.0;
/// Relative distance within which a doubled or halved tempo counts as the reference
const FOLD_TOLERANCE: f32 = 0.06;

/// Estimator that produced a tempo candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    Interval,
    Autocorrelation,
    Tempogram,
    Emergency,
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Interval => "interval",
            Self::Autocorrelation => "autocorrelation",
            Self::Tempogram => "tempogram",
            Self::Emergency => "emergency",
        };
        f.write_str(name)
    }
}

/// One tempo estimate from a single estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoCandidate {
    pub bpm: f32,
    pub strength: f32,
    pub source: CandidateSource,
}

impl TempoCandidate {
    pub fn new(bpm: f32, strength: f32, source: CandidateSource) -> Self {
        Self {
            bpm,
            strength,
            source,
        }
    }
}

/// Step function favouring tempi common in popular music
pub fn musical_plausibility(bpm: f32) -> f32 {
    if (100.0..=140.0).contains(&bpm) {
        2.0
    } else if (80.0..=100.0).contains(&bpm) {
        1.5
    } else if (140.0..=180.0).contains(&bpm) {
        1.3
    } else if (60.0..=80.0).contains(&bpm) {
        1.0
    } else {
        0.5
    }
}

/// Move `bpm` by one octave when that puts it next to `reference`
///
/// Tempi that are not a half or double of the reference come back unchanged.
pub fn fold_onto_octave(bpm: f32, reference: f32) -> f32 {
    if !reference.is_finite() || reference <= 0.0 {
        return bpm;
    }
    [2.0f32, 0.5]
        .iter()
        .map(|&factor| bpm * factor)
        .find(|&folded| (folded / reference - 1.0).abs() < FOLD_TOLERANCE)
        .unwrap_or(bpm)
}

/// Picks the most plausible member among octave-related candidates
#[derive(Debug, Clone, Copy, Default)]
pub struct OctaveCorrector;

impl OctaveCorrector {
    pub fn new() -> Self {
        Self
    }

    /// Group candidates into octave families and return the middle member of
    /// the best-scoring family. A non-positive `confidence` counts as 1.
    pub fn correct_octave_errors(
        &self,
        candidates: &[TempoCandidate],
        confidence: f32,
    ) -> Option<f32> {
        let usable: Vec<&TempoCandidate> = candidates
            .iter()
            .filter(|c| c.bpm.is_finite() && c.bpm > 0.0)
            .collect();
        if usable.is_empty() {
            return None;
        }

        let mut used = vec![false; usable.len()];
        let mut groups: Vec<Vec<&TempoCandidate>> = Vec::new();
        for i in 0..usable.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            let mut group = vec![usable[i]];
            for j in 0..usable.len() {
                if used[j] {
                    continue;
                }
                let ratio = usable[i].bpm / usable[j].bpm;
                if OCTAVE_RATIOS
                    .iter()
                    .any(|target| (ratio - target).abs() < RATIO_TOLERANCE)
                {
                    used[j] = true;
                    group.push(usable[j]);
                }
            }
            groups.push(group);
        }

        let scale = if confidence > 0.0 { confidence } else { 1.0 };
        let mut best: Option<(f32, Vec<&TempoCandidate>)> = None;
        for group in groups {
            let plausibility: f32 = group
                .iter()
                .map(|c| musical_plausibility(c.bpm) * c.strength)
                .sum();
            let score = (GROUP_SIZE_WEIGHT * group.len() as f32 + plausibility) * scale;
            if best.as_ref().map_or(true, |(top, _)| score > *top) {
                best = Some((score, group));
            }
        }

        let (_, mut group) = best?;
        group.sort_by(|a, b| a.bpm.total_cmp(&b.bpm));
        Some(group[group.len() / 2].bpm)
    }
}
