//! # Analyzer Adapters Module
//!
//! Uniform adapters around independent tempo-estimation methods.
//!
//! ## Core Features
//!
//! - **[`TempoAnalyzer`] trait**: one `(bpm, confidence)` opinion per
//!   invocation, or none at all
//! - **Built-in estimators**: spectral-flux onsets and energy-envelope
//!   peaks, both interval-histogram based
//! - **External tools**: [`CommandAnalyzer`] wraps analyzer CLIs installed
//!   on the host (Essentia, Librosa, Madmom frontends)
//! - **[`AnalyzerRegistry`]**: name-based discovery and instantiation
//!
//! ## Usage
//!
//! ```rust
//! use tempo_consensus::analyzers::AnalyzerRegistry;
//!
//! let registry = AnalyzerRegistry::new();
//! let analyzer = registry.get_analyzer("spectral_flux").unwrap();
//! println!("Using analyzer: {}", analyzer.name());
//! ```

pub mod command;
pub mod energy;
pub mod registry;
pub mod spectral_flux;
pub mod traits;

pub use command::CommandAnalyzer;
pub use energy::EnergyPeakAnalyzer;
pub use registry::AnalyzerRegistry;
pub use spectral_flux::SpectralFluxAnalyzer;
pub use traits::TempoAnalyzer;

use std::collections::BTreeMap;

use crate::config::AnalysisConfig;

/// Derive a tempo from a set of inter-onset intervals
///
/// Intervals outside the configured BPM range are discarded, the rest are
/// quantized to 1ms and the most common interval wins. Confidence is the
/// fraction of intervals within 50ms of the winner.
///
/// Returns `None` when no interval falls inside the BPM range.
pub(crate) fn tempo_from_intervals(
    intervals: &[f64],
    config: &AnalysisConfig,
) -> Option<(f64, f64)> {
    let min_interval = 60.0 / config.max_bpm as f64;
    let max_interval = 60.0 / config.min_bpm as f64;

    let in_range: Vec<f64> = intervals
        .iter()
        .copied()
        .filter(|&interval| interval >= min_interval && interval <= max_interval)
        .collect();

    if in_range.is_empty() {
        return None;
    }

    // Quantize to 1ms for grouping; BTreeMap keeps the tie-break (shortest
    // interval wins) deterministic
    let mut interval_counts: BTreeMap<i64, usize> = BTreeMap::new();
    for &interval in &in_range {
        let quantized_ms = (interval * 1000.0).round() as i64;
        *interval_counts.entry(quantized_ms).or_insert(0) += 1;
    }

    let (&mode_ms, _) = interval_counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))?;
    let mode_interval = mode_ms as f64 / 1000.0;

    let bpm = 60.0 / mode_interval;

    let matching = in_range
        .iter()
        .filter(|&&interval| (interval - mode_interval).abs() < 0.05)
        .count();
    let confidence = (matching as f64 / in_range.len() as f64).min(1.0);

    Some((bpm, confidence))
}
