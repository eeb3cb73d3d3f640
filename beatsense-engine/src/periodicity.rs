//! Periodicity estimators over the onset-strength curve
//!
//! These run alongside the discrete hit path and produce tempo candidates
//! from the shape of the onset curve itself: a lagged autocorrelation and a
//! short-window Fourier tempogram.

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::octave::{CandidateSource, TempoCandidate};

/// Tempo range searched by both estimators
pub const DEFAULT_MIN_BPM: f32 = 40.0;
pub const DEFAULT_MAX_BPM: f32 = 250.0;

/// Onset samples analysed by one tempogram slice
const TEMPOGRAM_WINDOW: usize = 384;
/// Zero-padded FFT length, gives roughly 0.9 BPM resolution at 60 fps
const TEMPOGRAM_FFT_SIZE: usize = 4096;
const MIN_TEMPOGRAM_SLICE: usize = 32;
/// Fixed weight of tempogram candidates
pub const TEMPOGRAM_STRENGTH: f32 = 0.5;
const SILENCE_EPSILON: f32 = 1e-9;

/// Bounded, timestamped history of onset strengths
#[derive(Debug, Clone)]
pub struct OnsetCurve {
    samples: VecDeque<(f64, f32)>,
    capacity: usize,
}

impl OnsetCurve {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, timestamp: f64, strength: f32) {
        self.samples.push_back((timestamp, strength));
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Average frame rate over the stored span, `None` until it is measurable
    pub fn frames_per_second(&self) -> Option<f32> {
        let (first, _) = self.samples.front()?;
        let (last, _) = self.samples.back()?;
        let span = last - first;
        if self.samples.len() < 2 || span <= 0.0 {
            return None;
        }
        Some(((self.samples.len() - 1) as f64 / span) as f32)
    }

    pub fn strengths(&self) -> Vec<f32> {
        self.samples.iter().map(|&(_, strength)| strength).collect()
    }

    pub fn timestamp_at(&self, index: usize) -> Option<f64> {
        self.samples.get(index).map(|&(timestamp, _)| timestamp)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Lagged autocorrelation of the mean-removed onset curve
#[derive(Debug, Clone, Copy)]
pub struct AutocorrelationEstimator {
    min_bpm: f32,
    max_bpm: f32,
}

impl Default for AutocorrelationEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_BPM, DEFAULT_MAX_BPM)
    }
}

impl AutocorrelationEstimator {
    pub fn new(min_bpm: f32, max_bpm: f32) -> Self {
        Self { min_bpm, max_bpm }
    }

    /// Strongest local autocorrelation peak as a tempo
    ///
    /// Strength is the peak value relative to the largest value in the lag
    /// range, so it reaches 1.0 when the peak is also the global maximum.
    pub fn estimate(&self, curve: &[f32], frames_per_second: f32) -> Option<TempoCandidate> {
        let len = curve.len();
        if len < 4 || !(frames_per_second > 0.0) {
            return None;
        }
        let min_lag = ((frames_per_second * 60.0 / self.max_bpm).floor() as usize).max(1);
        let max_lag = ((frames_per_second * 60.0 / self.min_bpm).floor() as usize).min(len - 1);
        if max_lag <= min_lag + 1 {
            return None;
        }

        let mean = curve.iter().sum::<f32>() / len as f32;
        let centered: Vec<f32> = curve.iter().map(|v| v - mean).collect();
        if centered.iter().all(|v| v.abs() < SILENCE_EPSILON) {
            return None;
        }

        let correlation: Vec<f32> = (min_lag..=max_lag)
            .map(|lag| {
                let sum: f32 = centered[..len - lag]
                    .iter()
                    .zip(&centered[lag..])
                    .map(|(a, b)| a * b)
                    .sum();
                sum / (len - lag) as f32
            })
            .collect();

        let global_max = correlation.iter().copied().fold(f32::MIN, f32::max);
        if global_max <= 0.0 {
            return None;
        }

        let (peak_index, peak_value) = correlation
            .windows(3)
            .enumerate()
            .filter(|(_, w)| w[1] > w[0] && w[1] > w[2])
            .map(|(i, w)| (i + 1, w[1]))
            .fold(None, |best: Option<(usize, f32)>, (i, value)| match best {
                Some((_, top)) if top >= value => best,
                _ => Some((i, value)),
            })?;

        let lag = min_lag + peak_index;
        Some(TempoCandidate::new(
            60.0 * frames_per_second / lag as f32,
            peak_value / global_max,
            CandidateSource::Autocorrelation,
        ))
    }
}

/// Hann-tapered short-window DFT of the onset curve
pub struct TempogramEstimator {
    min_bpm: f32,
    max_bpm: f32,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
}

impl Default for TempogramEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_BPM, DEFAULT_MAX_BPM)
    }
}

impl TempogramEstimator {
    pub fn new(min_bpm: f32, max_bpm: f32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(TEMPOGRAM_FFT_SIZE);
        Self {
            min_bpm,
            max_bpm,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); TEMPOGRAM_FFT_SIZE],
        }
    }

    /// Dominant tempo of the slice centred half a window before the newest sample
    pub fn estimate(&mut self, curve: &[f32], frames_per_second: f32) -> Option<TempoCandidate> {
        if curve.is_empty() || !(frames_per_second > 0.0) {
            return None;
        }
        let position = curve.len() - 1;
        let start = position.saturating_sub(TEMPOGRAM_WINDOW / 2);
        let end = (start + TEMPOGRAM_WINDOW).min(curve.len());
        let slice = &curve[start..end];
        if slice.len() < MIN_TEMPOGRAM_SLICE {
            return None;
        }

        let mean = slice.iter().sum::<f32>() / slice.len() as f32;
        let taper_span = (slice.len() - 1) as f32;
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            *slot = match slice.get(i) {
                Some(&value) => {
                    let window = 0.5 - 0.5 * (2.0 * PI * i as f32 / taper_span).cos();
                    Complex::new((value - mean) * window, 0.0)
                }
                None => Complex::new(0.0, 0.0),
            };
        }

        self.fft.process(&mut self.buffer);

        let bpm_per_bin = frames_per_second * 60.0 / TEMPOGRAM_FFT_SIZE as f32;
        let (bpm, magnitude) = self.buffer[1..TEMPOGRAM_FFT_SIZE / 2]
            .iter()
            .enumerate()
            .map(|(i, c)| ((i + 1) as f32 * bpm_per_bin, c.norm()))
            .filter(|&(bpm, _)| bpm >= self.min_bpm && bpm <= self.max_bpm)
            .fold(None, |best: Option<(f32, f32)>, (bpm, magnitude)| match best {
                Some((_, top)) if top >= magnitude => best,
                _ => Some((bpm, magnitude)),
            })?;

        if magnitude <= SILENCE_EPSILON {
            return None;
        }
        Some(TempoCandidate::new(
            bpm,
            TEMPOGRAM_STRENGTH,
            CandidateSource::Tempogram,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FPS: f32 = 60.0;

    /// Baseline 5 with a spike of 15 every 30 frames (120 BPM at 60 fps)
    fn pulse_curve(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| if i % 30 == 0 { 15.0 } else { 5.0 })
            .collect()
    }

    #[test]
    fn test_curve_is_bounded() {
        let mut curve = OnsetCurve::new(8);
        for i in 0..20 {
            curve.push(i as f64 / 60.0, i as f32);
        }
        assert_eq!(curve.len(), 8);
        assert_eq!(curve.strengths()[0], 12.0);
        assert!((curve.frames_per_second().unwrap() - 60.0).abs() < 0.01);
    }

    #[test]
    fn test_frame_rate_needs_a_span() {
        let mut curve = OnsetCurve::new(8);
        assert_eq!(curve.frames_per_second(), None);
        curve.push(1.0, 0.0);
        curve.push(1.0, 0.0);
        assert_eq!(curve.frames_per_second(), None);
    }

    #[test]
    fn test_autocorrelation_finds_pulse() {
        let estimator = AutocorrelationEstimator::new(90.0, 250.0);
        let candidate = estimator.estimate(&pulse_curve(240), FPS).unwrap();
        assert!((candidate.bpm - 120.0).abs() < 1.0);
        assert!(candidate.strength > 0.9);
        assert_eq!(candidate.source, CandidateSource::Autocorrelation);
    }

    #[test]
    fn test_autocorrelation_rejects_flat_curve() {
        let estimator = AutocorrelationEstimator::default();
        assert!(estimator.estimate(&vec![3.0; 240], FPS).is_none());
        assert!(estimator.estimate(&[1.0, 2.0], FPS).is_none());
    }

    #[test]
    fn test_tempogram_finds_pulse() {
        let mut estimator = TempogramEstimator::new(40.0, 200.0);
        let candidate = estimator.estimate(&pulse_curve(240), FPS).unwrap();
        assert!((candidate.bpm - 120.0).abs() < 3.0, "got {}", candidate.bpm);
        assert_eq!(candidate.strength, TEMPOGRAM_STRENGTH);
    }

    #[test]
    fn test_tempogram_rejects_silence() {
        let mut estimator = TempogramEstimator::default();
        assert!(estimator.estimate(&vec![0.0; 200], FPS).is_none());
        assert!(estimator.estimate(&pulse_curve(10), FPS).is_none());
    }
}
