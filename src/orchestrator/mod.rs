//! # Orchestrator Module
//!
//! Concurrent fan-out over analyzer adapters with per-adapter failure
//! isolation.
//!
//! ## Core Features
//!
//! - **Parallel Execution**: all adapters run concurrently against the
//!   same audio
//! - **Failure Isolation**: an adapter that errors, times out, or is not
//!   installed contributes nothing and aborts nothing
//! - **Stateless**: every invocation is independent; the shared engine
//!   configuration is read-only
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tempo_consensus::analyzers::AnalyzerRegistry;
//! use tempo_consensus::config::OrchestratorConfig;
//! use tempo_consensus::consensus::ConsensusEngine;
//! use tempo_consensus::orchestrator::Orchestrator;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let registry = AnalyzerRegistry::new();
//! let analyzers = registry
//!     .available_analyzers()
//!     .iter()
//!     .filter_map(|name| registry.get_analyzer(name))
//!     .collect();
//!
//! let orchestrator = Orchestrator::new(
//!     OrchestratorConfig::default(),
//!     ConsensusEngine::with_defaults(),
//! )
//! .with_analyzers(analyzers);
//!
//! let result = orchestrator.analyze_file("song.wav").await?;
//! println!("{} BPM ({}/100)", result.bpm, result.confidence);
//! # Ok(())
//! # }
//! ```

pub mod engine;

pub use engine::Orchestrator;
