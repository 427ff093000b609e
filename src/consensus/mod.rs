//! # Tempo Consensus Module
//!
//! Combines independent, heterogeneous tempo estimates into a single robust
//! BPM value with a calibrated 0-100 confidence score.
//!
//! ## Core Features
//!
//! - **Outlier Rejection**: median-based filtering of octave errors and
//!   other gross disagreements
//! - **Weighted Voting**: per-analyzer weights scaled by each analyzer's
//!   own confidence
//! - **Agreement Classification**: none/single/low/medium/high clustering
//!   summary derived from working-set variance
//! - **Unified Confidence**: additive, bounded scoring with a hard final
//!   clamp to [0, 100]
//!
//! ## Usage
//!
//! ```rust
//! use tempo_consensus::consensus::{ConsensusEngine, Estimate};
//!
//! let engine = ConsensusEngine::with_defaults();
//! let estimates = vec![
//!     Estimate::new(90.5, 0.92, "essentia"),
//!     Estimate::new(90.0, 0.65, "librosa"),
//! ];
//!
//! let result = engine.calculate_consensus(&estimates);
//! println!("Consensus BPM: {} ({}/100)", result.bpm, result.confidence);
//! ```

pub mod engine;
pub mod types;

pub use engine::{ConsensusConfig, ConsensusEngine, ScoringConfig};
pub use types::{AgreementLevel, ConsensusResult, Estimate};
