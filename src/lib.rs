//! # Tempo Consensus
//!
//! Multi-analyzer tempo (BPM) detection with statistical consensus and a
//! calibrated 0-100 confidence score.
//!
//! Independent tempo-estimation methods disagree in characteristic ways,
//! most famously by an octave (reporting half or double the true tempo).
//! This library runs any number of analyzer adapters concurrently, rejects
//! outliers against the group median, fuses the survivors through
//! confidence-scaled weighted voting, and reports how strongly the
//! independent methods agreed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tempo_consensus::{
//!     analyzers::AnalyzerRegistry,
//!     config::Config,
//!     consensus::ConsensusEngine,
//!     orchestrator::Orchestrator,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let registry = AnalyzerRegistry::with_config(config.analysis.clone());
//!
//! let analyzers = registry
//!     .available_analyzers()
//!     .iter()
//!     .filter_map(|name| registry.get_analyzer(name))
//!     .collect();
//!
//! let engine = ConsensusEngine::new(config.consensus)?;
//! let orchestrator = Orchestrator::new(config.orchestrator, engine)
//!     .with_analyzers(analyzers);
//!
//! let result = orchestrator.analyze_file("song.wav").await?;
//! println!("{} BPM, {}/100, {}", result.bpm, result.confidence, result.agreement_level);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - [`consensus`] - The pure consensus engine and its result types
//! - [`analyzers`] - Analyzer adapters: built-in estimators, external
//!   tools, and the registry
//! - [`orchestrator`] - Concurrent fan-out with failure isolation
//! - [`audio`] - Audio decoding for the built-in analyzers
//! - [`config`] - Configuration management
//!
//! ## Plugging In Your Own Analyzer
//!
//! Implement the [`TempoAnalyzer`](analyzers::TempoAnalyzer) trait:
//!
//! ```rust
//! use async_trait::async_trait;
//! use tempo_consensus::analyzers::TempoAnalyzer;
//! use tempo_consensus::audio::AudioData;
//! use tempo_consensus::consensus::Estimate;
//! use tempo_consensus::error::Result;
//!
//! struct MyAnalyzer;
//!
//! #[async_trait]
//! impl TempoAnalyzer for MyAnalyzer {
//!     fn name(&self) -> &str {
//!         "my_analyzer"
//!     }
//!
//!     async fn estimate(&self, audio: &AudioData) -> Result<Option<Estimate>> {
//!         // Your estimation logic
//!         Ok(Some(Estimate::new(120.0, 0.8, "my_analyzer")))
//!     }
//! }
//! ```

pub mod analyzers;
pub mod audio;
pub mod config;
pub mod consensus;
pub mod error;
pub mod orchestrator;

// Re-export commonly used types for convenience
pub use crate::{
    analyzers::{AnalyzerRegistry, TempoAnalyzer},
    config::Config,
    consensus::{AgreementLevel, ConsensusEngine, ConsensusResult, Estimate},
    error::{Result, TempoError},
    orchestrator::Orchestrator,
};
