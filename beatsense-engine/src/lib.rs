//! Real-time beat and tempo detection for beatsense
//!
//! The engine consumes one frequency-domain frame per analysis tick and
//! keeps a confidence-scored tempo estimate up to date:
//! - Onset: perceptually weighted band energies and spectral flux
//! - Detector: adaptive thresholding that emits discrete hits
//! - Clusterer: harmonic-aware interval clustering into a tempo candidate
//! - Octave: reconciliation of half/double/triple tempo candidates
//! - Tracker: smoothing with outlier damping and a confidence score
//! - Periodicity: autocorrelation and tempogram estimators over the onset curve
//! - Engine: per-frame orchestration and track-change handling

mod beatgrid;
mod clusterer;
mod config;
mod detector;
mod engine;
mod error;
mod frame;
mod octave;
mod onset;
mod periodicity;
mod spectrum;
mod tracker;

pub use beatgrid::{track_beats, BeatGrid};
pub use clusterer::{
    bpm_range_weight, cluster_bpm_values, BpmCluster, IntervalClusterer,
    DEFAULT_CONFIDENCE_THRESHOLD,
};
pub use config::EngineConfig;
pub use detector::{
    AdaptiveOnsetDetector, DetectorDiagnostics, GenreArchetype, GenreProfile, Hit, HitCache,
    OnsetSample,
};
pub use engine::{
    BeatAnalysisEngine, ClusterSnapshot, EngineDiagnostics, FrameOutcome, FIRST_HIT_BPM,
};
pub use error::{EngineError, Result};
pub use frame::{FrequencyFrame, MAX_MAGNITUDE};
pub use octave::{
    fold_onto_octave, musical_plausibility, CandidateSource, OctaveCorrector, TempoCandidate,
};
pub use onset::{perceptual_weight, BandEnergies, OnsetEnergyAnalyzer};
pub use periodicity::{AutocorrelationEstimator, OnsetCurve, TempogramEstimator};
pub use spectrum::{SpectrumFrameBuilder, DEFAULT_FFT_SIZE};
pub use tracker::{TempoTracker, TrackedBpm};
