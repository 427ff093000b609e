use serde::{Deserialize, Serialize};

/// A single analyzer's opinion about the tempo of an audio signal
///
/// Estimates are produced once per analysis invocation, never mutated, and
/// carried through to the final result for auditing. An analyzer that fails
/// produces no `Estimate` at all; there is no zero-value sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Estimated tempo in beats per minute (finite and positive)
    pub bpm: f64,

    /// Analyzer-internal confidence (0.0-1.0)
    ///
    /// Scales differ between analyzers; this value is only ever combined
    /// through the consensus weighting, never compared directly.
    pub confidence: f64,

    /// Stable analyzer identifier ("essentia", "librosa", ...) used for
    /// weight lookup
    pub analyzer: String,

    /// Free-form note of the specific algorithm/mode used, carried for
    /// debugging only
    #[serde(default)]
    pub method: Option<String>,
}

impl Estimate {
    /// Create a new estimate, clamping confidence to the unit interval
    pub fn new<S: Into<String>>(bpm: f64, confidence: f64, analyzer: S) -> Self {
        Self {
            bpm,
            confidence: confidence.clamp(0.0, 1.0),
            analyzer: analyzer.into(),
            method: None,
        }
    }

    /// Attach a method tag describing how this estimate was produced
    pub fn with_method<S: Into<String>>(mut self, method: S) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Whether the estimate carries a usable tempo value
    pub fn is_valid(&self) -> bool {
        self.bpm.is_finite() && self.bpm > 0.0
    }
}

/// Categorical summary of how tightly the contributing estimates cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgreementLevel {
    /// No valid estimates at all
    None,

    /// Exactly one estimate contributed; agreement cannot be assessed
    Single,

    /// Estimates spread widely
    Low,

    /// Estimates within roughly +/-5 BPM of each other
    Medium,

    /// Estimates within roughly +/-2 BPM of each other
    High,
}

impl std::fmt::Display for AgreementLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgreementLevel::None => "none",
            AgreementLevel::Single => "single",
            AgreementLevel::Low => "low",
            AgreementLevel::Medium => "medium",
            AgreementLevel::High => "high",
        };
        write!(f, "{}", s)
    }
}

/// The fused outcome of combining all analyzer estimates
///
/// Constructed atomically by [`ConsensusEngine::calculate_consensus`] and
/// immutable afterwards, which lets it cross task boundaries without locking.
///
/// [`ConsensusEngine::calculate_consensus`]: crate::consensus::ConsensusEngine::calculate_consensus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Fused tempo, rounded to one decimal place (0.0 when undetermined)
    pub bpm: f64,

    /// Unified confidence on the 0-100 scale
    pub confidence: u8,

    /// Number of estimates that contributed to the weighted average
    pub num_algorithms: usize,

    /// How tightly the contributing estimates agreed
    pub agreement_level: AgreementLevel,

    /// Every estimate received, in invocation order, including outliers
    pub all_estimates: Vec<Estimate>,

    /// The subset of `all_estimates` excluded from the weighted average
    pub outliers_removed: Vec<Estimate>,
}

impl ConsensusResult {
    /// The well-defined "no tempo could be determined" result
    pub fn none(all_estimates: Vec<Estimate>) -> Self {
        Self {
            bpm: 0.0,
            confidence: 0,
            num_algorithms: 0,
            agreement_level: AgreementLevel::None,
            all_estimates,
            outliers_removed: Vec::new(),
        }
    }

    /// Whether a tempo was determined at all
    pub fn has_tempo(&self) -> bool {
        self.agreement_level != AgreementLevel::None
    }

    /// Serialize into the debug/metadata payload consumed by the
    /// persistence layer
    pub fn metadata_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "bpm_estimates": self.all_estimates,
            "bpm_outliers": self.outliers_removed,
            "agreement_level": self.agreement_level,
            "num_algorithms": self.num_algorithms,
            "consensus_bpm": self.bpm,
            "consensus_confidence": self.confidence,
        })
    }
}
