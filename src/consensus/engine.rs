use std::collections::HashMap;

use tracing::{debug, warn};

use crate::consensus::types::{AgreementLevel, ConsensusResult, Estimate};
use crate::error::{ConfigError, Result};

/// Configuration for the consensus engine
///
/// All numeric coefficients are deliberately configuration rather than code:
/// they are heuristics pending calibration against labeled data, and
/// recalibrating them must not require a rebuild.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConsensusConfig {
    /// Maximum deviation from the group median before an estimate is
    /// treated as an outlier (BPM)
    pub outlier_threshold_bpm: f64,

    /// Per-analyzer voting weights, keyed by analyzer identifier
    pub weights: HashMap<String, f64>,

    /// Weight applied to analyzers with no entry in `weights`
    pub default_weight: f64,

    /// Working-set variance at or below which agreement is "high"
    pub high_agreement_variance: f64,

    /// Working-set variance at or below which agreement is "medium"
    pub medium_agreement_variance: f64,

    /// Coefficients of the unified 0-100 confidence formula
    pub scoring: ScoringConfig,
}

/// Coefficients of the unified confidence formula
///
/// Each term is bounded on its own; the final clamp to [0, 100] is still
/// applied as the very last step, never folded into intermediate terms.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScoringConfig {
    /// Scale mapping mean analyzer confidence onto the unified score
    pub base_scale: f64,

    /// Bonus when the working-set variance is within `high_agreement_variance`
    pub agreement_bonus_full: f64,

    /// Bonus when the variance is within `partial_agreement_variance`
    pub agreement_bonus_partial: f64,

    /// Variance ceiling for the partial agreement bonus
    pub partial_agreement_variance: f64,

    /// Penalty once variance exceeds `medium_agreement_variance`
    pub variance_penalty_moderate: f64,

    /// Penalty once variance exceeds `severe_variance`
    pub variance_penalty_severe: f64,

    /// Variance threshold for the severe penalty
    pub severe_variance: f64,

    /// Penalty per estimate removed as an outlier
    pub outlier_penalty: f64,

    /// Bonus per contributing estimate beyond the first
    pub count_bonus_step: f64,

    /// Cap on the total count bonus
    pub count_bonus_cap: f64,

    /// Ceiling for a result backed by a single analyzer; cross-analyzer
    /// agreement is itself evidence and one source cannot supply it
    pub single_source_cap: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert("essentia".to_string(), 0.5);
        weights.insert("librosa".to_string(), 0.3);
        weights.insert("madmom".to_string(), 0.2);

        Self {
            outlier_threshold_bpm: 10.0,
            weights,
            default_weight: 0.3,
            high_agreement_variance: 4.0,
            medium_agreement_variance: 25.0,
            scoring: ScoringConfig::default(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_scale: 60.0,
            agreement_bonus_full: 20.0,
            agreement_bonus_partial: 10.0,
            partial_agreement_variance: 16.0,
            variance_penalty_moderate: 10.0,
            variance_penalty_severe: 20.0,
            severe_variance: 100.0,
            outlier_penalty: 5.0,
            count_bonus_step: 5.0,
            count_bonus_cap: 10.0,
            single_source_cap: 70.0,
        }
    }
}

impl ConsensusConfig {
    /// Validate the configuration
    ///
    /// A malformed configuration indicates a misconfigured deployment, so
    /// this fails loudly at construction time rather than at analysis time.
    pub fn validate(&self) -> Result<()> {
        if !self.outlier_threshold_bpm.is_finite() || self.outlier_threshold_bpm <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "consensus.outlier_threshold_bpm".to_string(),
                value: self.outlier_threshold_bpm.to_string(),
            }
            .into());
        }

        if !self.default_weight.is_finite() || self.default_weight < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "consensus.default_weight".to_string(),
                value: self.default_weight.to_string(),
            }
            .into());
        }

        for (analyzer, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: format!("consensus.weights.{}", analyzer),
                    value: weight.to_string(),
                }
                .into());
            }
        }

        if !(self.high_agreement_variance > 0.0)
            || self.medium_agreement_variance <= self.high_agreement_variance
        {
            return Err(ConfigError::InvalidValue {
                key: "consensus.agreement_variance_range".to_string(),
                value: format!(
                    "{}-{}",
                    self.high_agreement_variance, self.medium_agreement_variance
                ),
            }
            .into());
        }

        let s = &self.scoring;
        let coefficients = [
            ("scoring.base_scale", s.base_scale),
            ("scoring.agreement_bonus_full", s.agreement_bonus_full),
            ("scoring.agreement_bonus_partial", s.agreement_bonus_partial),
            ("scoring.partial_agreement_variance", s.partial_agreement_variance),
            ("scoring.variance_penalty_moderate", s.variance_penalty_moderate),
            ("scoring.variance_penalty_severe", s.variance_penalty_severe),
            ("scoring.severe_variance", s.severe_variance),
            ("scoring.outlier_penalty", s.outlier_penalty),
            ("scoring.count_bonus_step", s.count_bonus_step),
            ("scoring.count_bonus_cap", s.count_bonus_cap),
            ("scoring.single_source_cap", s.single_source_cap),
        ];
        for (key, value) in coefficients {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: format!("consensus.{}", key),
                    value: value.to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Combines heterogeneous tempo estimates into a single robust BPM value
/// with a calibrated 0-100 confidence score
///
/// The engine is a pure function over its inputs: no I/O, no interior
/// state, deterministic for a given configuration. It never fails for
/// data reasons; every combination of zero, one, or many estimates
/// produces a well-typed [`ConsensusResult`].
pub struct ConsensusEngine {
    config: ConsensusConfig,
}

impl ConsensusEngine {
    /// Create an engine, rejecting malformed configuration up front
    pub fn new(config: ConsensusConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create an engine with the default configuration
    pub fn with_defaults() -> Self {
        Self {
            config: ConsensusConfig::default(),
        }
    }

    /// The configuration this engine was built with
    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Voting weight for an analyzer, falling back to the default weight
    /// for unknown identifiers
    pub fn weight_for(&self, analyzer: &str) -> f64 {
        self.config
            .weights
            .get(analyzer)
            .copied()
            .unwrap_or(self.config.default_weight)
    }

    /// Fuse a collection of estimates into a consensus result
    ///
    /// Estimates with a non-finite or non-positive BPM are dropped before
    /// any arithmetic. The returned `all_estimates` preserves the input
    /// order verbatim; the numeric outputs are independent of input order.
    pub fn calculate_consensus(&self, estimates: &[Estimate]) -> ConsensusResult {
        let all_estimates = estimates.to_vec();
        let valid: Vec<Estimate> = estimates.iter().filter(|e| e.is_valid()).cloned().collect();

        if valid.is_empty() {
            debug!("No valid tempo estimates, returning undetermined result");
            return ConsensusResult::none(all_estimates);
        }

        if valid.len() == 1 {
            return self.single_source_result(all_estimates, &valid[0], Vec::new());
        }

        let (mut working, mut outliers) = self.split_outliers(&valid);

        if working.is_empty() {
            // A degenerate split never fails the operation; vote over the
            // full set instead.
            warn!(
                estimates = valid.len(),
                "All estimates classified as outliers, falling back to full set"
            );
            working = valid;
            outliers = Vec::new();
        }

        if working.len() == 1 {
            return self.single_source_result(all_estimates, &working[0], outliers);
        }

        // Numeric passes run over the bpm-sorted working set so the result
        // does not depend on input order.
        let mut ranked = working.clone();
        ranked.sort_by(|a, b| {
            a.bpm
                .partial_cmp(&b.bpm)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.analyzer.cmp(&b.analyzer))
        });

        let bpm = round_bpm(self.weighted_average(&ranked));
        let variance = bpm_variance(&ranked);
        let agreement_level = self.classify_agreement(variance);
        let confidence = self.unified_confidence(&ranked, variance, outliers.len());

        debug!(
            bpm,
            confidence,
            variance,
            agreement = %agreement_level,
            outliers = outliers.len(),
            "Consensus computed"
        );

        ConsensusResult {
            bpm,
            confidence,
            num_algorithms: ranked.len(),
            agreement_level,
            all_estimates,
            outliers_removed: outliers,
        }
    }

    /// Result for a lone contributing estimate
    ///
    /// A single source is capped regardless of how confident that one
    /// analyzer claims to be.
    fn single_source_result(
        &self,
        all_estimates: Vec<Estimate>,
        estimate: &Estimate,
        outliers: Vec<Estimate>,
    ) -> ConsensusResult {
        let cap = self.config.scoring.single_source_cap;
        let confidence = (estimate.confidence.clamp(0.0, 1.0) * cap)
            .round()
            .clamp(0.0, 100.0) as u8;

        ConsensusResult {
            bpm: round_bpm(estimate.bpm),
            confidence,
            num_algorithms: 1,
            agreement_level: AgreementLevel::Single,
            all_estimates,
            outliers_removed: outliers,
        }
    }

    /// Partition valid estimates into working set and outliers around the
    /// group median, preserving input order within each partition
    ///
    /// The reference is the middle element of the bpm-sorted set (upper
    /// median for even counts). Because the reference is itself a member,
    /// a half- or double-tempo octave error in a two-analyzer set loses
    /// against the true tempo instead of dragging the midpoint with it.
    fn split_outliers(&self, valid: &[Estimate]) -> (Vec<Estimate>, Vec<Estimate>) {
        let mut sorted_bpms: Vec<f64> = valid.iter().map(|e| e.bpm).collect();
        sorted_bpms.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median = sorted_bpms[sorted_bpms.len() / 2];

        let threshold = self.config.outlier_threshold_bpm;
        let mut working = Vec::new();
        let mut outliers = Vec::new();

        for estimate in valid {
            if (estimate.bpm - median).abs() > threshold {
                debug!(
                    analyzer = %estimate.analyzer,
                    bpm = estimate.bpm,
                    median,
                    "Estimate removed as outlier"
                );
                outliers.push(estimate.clone());
            } else {
                working.push(estimate.clone());
            }
        }

        (working, outliers)
    }

    /// Confidence-weighted average of the working set, falling back to the
    /// arithmetic mean when every weight is zero
    fn weighted_average(&self, working: &[Estimate]) -> f64 {
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;

        for estimate in working {
            let weight = self.weight_for(&estimate.analyzer) * estimate.confidence;
            weighted_sum += estimate.bpm * weight;
            weight_total += weight;
        }

        if weight_total > 0.0 {
            weighted_sum / weight_total
        } else {
            working.iter().map(|e| e.bpm).sum::<f64>() / working.len() as f64
        }
    }

    fn classify_agreement(&self, variance: f64) -> AgreementLevel {
        if variance <= self.config.high_agreement_variance {
            AgreementLevel::High
        } else if variance <= self.config.medium_agreement_variance {
            AgreementLevel::Medium
        } else {
            AgreementLevel::Low
        }
    }

    /// Unified 0-100 confidence for a multi-estimate working set
    ///
    /// Additive terms, each bounded on its own; the clamp to [0, 100] is
    /// the very last step.
    fn unified_confidence(&self, working: &[Estimate], variance: f64, outliers_removed: usize) -> u8 {
        let s = &self.config.scoring;

        let mean_confidence =
            working.iter().map(|e| e.confidence).sum::<f64>() / working.len() as f64;
        let base = mean_confidence * s.base_scale;

        let agreement_bonus = if variance <= self.config.high_agreement_variance {
            s.agreement_bonus_full
        } else if variance <= s.partial_agreement_variance {
            s.agreement_bonus_partial
        } else {
            0.0
        };

        let variance_penalty = if variance > s.severe_variance {
            -s.variance_penalty_severe
        } else if variance > self.config.medium_agreement_variance {
            -s.variance_penalty_moderate
        } else {
            0.0
        };

        let outlier_penalty = -s.outlier_penalty * outliers_removed as f64;

        let count_bonus =
            (s.count_bonus_step * (working.len() as f64 - 1.0)).min(s.count_bonus_cap);

        let total = base + agreement_bonus + variance_penalty + outlier_penalty + count_bonus;
        total.clamp(0.0, 100.0) as u8
    }
}

/// Round a tempo to one decimal place
fn round_bpm(bpm: f64) -> f64 {
    (bpm * 10.0).round() / 10.0
}

/// Sample variance of the working-set tempos
///
/// Bessel-corrected (n - 1 denominator); a single-element set has no
/// spread to measure and yields 0.
fn bpm_variance(working: &[Estimate]) -> f64 {
    if working.len() < 2 {
        return 0.0;
    }

    let mean = working.iter().map(|e| e.bpm).sum::<f64>() / working.len() as f64;
    let sum_sq: f64 = working.iter().map(|e| (e.bpm - mean).powi(2)).sum();
    sum_sq / (working.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ConsensusEngine {
        ConsensusEngine::with_defaults()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConsensusConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_threshold_rejected_at_construction() {
        let config = ConsensusConfig {
            outlier_threshold_bpm: -5.0,
            ..Default::default()
        };
        assert!(ConsensusEngine::new(config).is_err());

        let config = ConsensusConfig {
            outlier_threshold_bpm: f64::NAN,
            ..Default::default()
        };
        assert!(ConsensusEngine::new(config).is_err());
    }

    #[test]
    fn test_negative_weight_rejected_at_construction() {
        let mut config = ConsensusConfig::default();
        config.weights.insert("essentia".to_string(), -0.5);
        assert!(ConsensusEngine::new(config).is_err());
    }

    #[test]
    fn test_weight_lookup_with_fallback() {
        let engine = engine();
        assert_eq!(engine.weight_for("essentia"), 0.5);
        assert_eq!(engine.weight_for("librosa"), 0.3);
        assert_eq!(engine.weight_for("madmom"), 0.2);
        assert_eq!(engine.weight_for("somebody_new"), 0.3);
    }

    #[test]
    fn test_no_estimates() {
        let result = engine().calculate_consensus(&[]);
        assert_eq!(result.bpm, 0.0);
        assert_eq!(result.confidence, 0);
        assert_eq!(result.num_algorithms, 0);
        assert_eq!(result.agreement_level, AgreementLevel::None);
        assert!(result.all_estimates.is_empty());
        assert!(result.outliers_removed.is_empty());
    }

    #[test]
    fn test_invalid_estimates_are_filtered_not_propagated() {
        let estimates = vec![
            Estimate::new(f64::NAN, 0.9, "essentia"),
            Estimate::new(0.0, 0.9, "librosa"),
            Estimate::new(-10.0, 0.9, "madmom"),
        ];
        let result = engine().calculate_consensus(&estimates);
        assert_eq!(result.agreement_level, AgreementLevel::None);
        assert_eq!(result.bpm, 0.0);
        // The audit trail still records what was received
        assert_eq!(result.all_estimates.len(), 3);
    }

    #[test]
    fn test_single_estimate_capped() {
        let estimates = vec![Estimate::new(110.0, 0.85, "essentia")];
        let result = engine().calculate_consensus(&estimates);

        assert_eq!(result.bpm, 110.0);
        assert_eq!(result.confidence, 60); // 0.85 * 70, rounded
        assert_eq!(result.num_algorithms, 1);
        assert_eq!(result.agreement_level, AgreementLevel::Single);
        assert!(result.outliers_removed.is_empty());
    }

    #[test]
    fn test_single_estimate_never_exceeds_cap() {
        let estimates = vec![Estimate::new(110.0, 1.0, "essentia")];
        let result = engine().calculate_consensus(&estimates);
        assert_eq!(result.confidence, 70);
    }

    #[test]
    fn test_high_agreement_pair() {
        let estimates = vec![
            Estimate::new(90.5, 0.92, "essentia"),
            Estimate::new(90.0, 0.65, "librosa"),
        ];
        let result = engine().calculate_consensus(&estimates);

        // (90.5 * 0.5*0.92 + 90.0 * 0.3*0.65) / (0.46 + 0.195)
        assert_eq!(result.bpm, 90.4);
        assert_eq!(result.agreement_level, AgreementLevel::High);
        // base 47.1 + full agreement 20 + count 5 = 72.1, truncated
        assert_eq!(result.confidence, 72);
        assert_eq!(result.num_algorithms, 2);
        assert!(result.outliers_removed.is_empty());
    }

    #[test]
    fn test_octave_error_rejected() {
        let estimates = vec![
            Estimate::new(104.0, 0.90, "essentia"),
            Estimate::new(26.0, 0.65, "librosa"),
        ];
        let result = engine().calculate_consensus(&estimates);

        assert_eq!(result.bpm, 104.0);
        assert_eq!(result.num_algorithms, 1);
        assert_eq!(result.agreement_level, AgreementLevel::Single);
        assert_eq!(result.outliers_removed.len(), 1);
        assert_eq!(result.outliers_removed[0].bpm, 26.0);
        assert_eq!(result.all_estimates.len(), 2);
        // Capped single-source score from the surviving estimate
        assert_eq!(result.confidence, 63); // 0.90 * 70
    }

    #[test]
    fn test_medium_agreement_pair() {
        let estimates = vec![
            Estimate::new(120.0, 0.88, "essentia"),
            Estimate::new(124.0, 0.60, "librosa"),
        ];
        let result = engine().calculate_consensus(&estimates);

        // (120 * 0.44 + 124 * 0.18) / 0.62 = 121.16...
        assert_eq!(result.bpm, 121.2);
        // Sample variance of {120, 124} is 8
        assert_eq!(result.agreement_level, AgreementLevel::Medium);
        // base 44.4 + partial agreement 10 + count 5 = 59.4, truncated
        assert_eq!(result.confidence, 59);
        assert!(result.outliers_removed.is_empty());
    }

    #[test]
    fn test_three_way_agreement_gets_count_bonus() {
        let estimates = vec![
            Estimate::new(128.0, 0.9, "essentia"),
            Estimate::new(128.2, 0.8, "librosa"),
            Estimate::new(127.8, 0.7, "madmom"),
        ];
        let result = engine().calculate_consensus(&estimates);

        assert_eq!(result.num_algorithms, 3);
        assert_eq!(result.agreement_level, AgreementLevel::High);
        // base 0.8*60 = 48 + 20 + count min(10, 2*5) = 78.x
        assert_eq!(result.confidence, 78);
        assert!((result.bpm - 128.0).abs() < 0.5);
    }

    #[test]
    fn test_count_bonus_is_capped() {
        let estimates: Vec<Estimate> = (0..5)
            .map(|i| Estimate::new(128.0, 1.0, format!("analyzer_{}", i)))
            .collect();
        let result = engine().calculate_consensus(&estimates);

        // base 60 + agreement 20 + count capped at 10 = 90
        assert_eq!(result.confidence, 90);
        assert_eq!(result.num_algorithms, 5);
    }

    #[test]
    fn test_identical_bpms_are_high_agreement() {
        let estimates = vec![
            Estimate::new(120.0, 0.5, "essentia"),
            Estimate::new(120.0, 0.5, "librosa"),
        ];
        let result = engine().calculate_consensus(&estimates);

        assert_eq!(result.bpm, 120.0);
        assert_eq!(result.agreement_level, AgreementLevel::High);
        // base 30 + 20 + 5 = 55
        assert_eq!(result.confidence, 55);
    }

    #[test]
    fn test_zero_confidence_falls_back_to_unweighted_mean() {
        let estimates = vec![
            Estimate::new(100.0, 0.0, "essentia"),
            Estimate::new(102.0, 0.0, "librosa"),
        ];
        let result = engine().calculate_consensus(&estimates);

        assert_eq!(result.bpm, 101.0);
        assert_eq!(result.num_algorithms, 2);
    }

    #[test]
    fn test_wide_spread_is_penalized() {
        let estimates = vec![
            Estimate::new(100.0, 0.9, "essentia"),
            Estimate::new(109.0, 0.9, "librosa"),
            Estimate::new(105.0, 0.9, "madmom"),
        ];
        let result = engine().calculate_consensus(&estimates);

        // Sample variance of {100, 109, 105} is 20.33: medium agreement,
        // no bonus, no penalty
        assert_eq!(result.agreement_level, AgreementLevel::Medium);
        // base 54 + count 10 = 64
        assert_eq!(result.confidence, 64);
    }

    #[test]
    fn test_outlier_penalty_applied() {
        let estimates = vec![
            Estimate::new(120.0, 0.9, "essentia"),
            Estimate::new(121.0, 0.8, "librosa"),
            Estimate::new(122.0, 0.7, "madmom"),
            Estimate::new(240.0, 0.9, "doubler"),
        ];
        let result = engine().calculate_consensus(&estimates);

        assert_eq!(result.num_algorithms, 3);
        assert_eq!(result.outliers_removed.len(), 1);
        assert_eq!(result.outliers_removed[0].bpm, 240.0);
        // base 48 + agreement 20 - outlier 5 + count 10 = 73
        assert_eq!(result.confidence, 73);
    }

    #[test]
    fn test_confidence_always_in_range() {
        let grids = [
            vec![],
            vec![Estimate::new(1.0, 1.0, "a")],
            vec![Estimate::new(300.0, 1.0, "a"), Estimate::new(1.0, 1.0, "b")],
            vec![
                Estimate::new(40.0, 0.0, "a"),
                Estimate::new(400.0, 1.0, "b"),
                Estimate::new(90.0, 0.5, "c"),
                Estimate::new(91.0, 0.5, "d"),
            ],
            (0..20)
                .map(|i| Estimate::new(60.0 + i as f64 * 13.0, (i % 3) as f64 / 2.0, format!("a{}", i)))
                .collect(),
        ];

        for estimates in grids {
            let result = engine().calculate_consensus(&estimates);
            assert!(result.confidence <= 100);
            assert!(result.outliers_removed.len() <= result.all_estimates.len());
        }
    }

    #[test]
    fn test_order_independence() {
        let forward = vec![
            Estimate::new(120.0, 0.88, "essentia"),
            Estimate::new(124.0, 0.60, "librosa"),
            Estimate::new(122.0, 0.70, "madmom"),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = engine().calculate_consensus(&forward);
        let b = engine().calculate_consensus(&reversed);

        assert_eq!(a.bpm, b.bpm);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.agreement_level, b.agreement_level);
        // The audit trail does follow input order
        assert_eq!(a.all_estimates[0].analyzer, "essentia");
        assert_eq!(b.all_estimates[0].analyzer, "madmom");
    }

    #[test]
    fn test_idempotence() {
        let estimates = vec![
            Estimate::new(90.5, 0.92, "essentia"),
            Estimate::new(90.0, 0.65, "librosa"),
        ];
        let engine = engine();
        assert_eq!(
            engine.calculate_consensus(&estimates),
            engine.calculate_consensus(&estimates)
        );
    }

    #[test]
    fn test_custom_weights_change_the_vote() {
        let mut config = ConsensusConfig::default();
        config.weights.insert("essentia".to_string(), 0.0);
        config.weights.insert("librosa".to_string(), 1.0);
        let engine = ConsensusEngine::new(config).unwrap();

        let estimates = vec![
            Estimate::new(120.0, 0.9, "essentia"),
            Estimate::new(124.0, 0.9, "librosa"),
        ];
        let result = engine.calculate_consensus(&estimates);
        assert_eq!(result.bpm, 124.0);
    }
}
