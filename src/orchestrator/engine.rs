use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::{
    analyzers::TempoAnalyzer,
    audio::{AudioData, AudioLoader},
    config::OrchestratorConfig,
    consensus::{ConsensusEngine, ConsensusResult, Estimate},
    error::Result,
};

/// Fans analysis out to every configured analyzer and fuses the survivors
///
/// Each invocation is independent: no caching, no shared mutable counters.
/// Adapters run concurrently under individual timeouts; one failing,
/// hanging, or absent adapter only shrinks the estimate set by one and can
/// never abort the operation. Zero surviving estimates is a normal
/// outcome, reported as an undetermined result rather than an error.
pub struct Orchestrator {
    config: OrchestratorConfig,
    engine: ConsensusEngine,
    analyzers: Vec<Arc<dyn TempoAnalyzer>>,
}

impl Orchestrator {
    /// Create an orchestrator with no analyzers registered yet
    pub fn new(config: OrchestratorConfig, engine: ConsensusEngine) -> Self {
        Self {
            config,
            engine,
            analyzers: Vec::new(),
        }
    }

    /// Register a set of analyzers, builder style
    pub fn with_analyzers(mut self, analyzers: Vec<Arc<dyn TempoAnalyzer>>) -> Self {
        self.analyzers = analyzers;
        self
    }

    /// Register a single analyzer
    pub fn add_analyzer(&mut self, analyzer: Arc<dyn TempoAnalyzer>) {
        self.analyzers.push(analyzer);
    }

    /// Number of registered analyzers
    pub fn analyzer_count(&self) -> usize {
        self.analyzers.len()
    }

    /// The consensus engine this orchestrator feeds
    pub fn engine(&self) -> &ConsensusEngine {
        &self.engine
    }

    /// Run every analyzer against the audio and fuse their estimates
    ///
    /// Estimates are collected in analyzer registration order, so the
    /// result's audit trail is reproducible run over run regardless of
    /// which adapter happened to finish first.
    pub async fn analyze(&self, audio: &AudioData) -> ConsensusResult {
        let timeout = Duration::from_secs(self.config.adapter_timeout_secs);

        info!(
            analyzers = self.analyzers.len(),
            path = %audio.file_path.display(),
            "Starting tempo analysis"
        );

        let futures = self.analyzers.iter().map(|analyzer| {
            let analyzer = Arc::clone(analyzer);
            async move {
                let name = analyzer.name().to_string();
                match tokio::time::timeout(timeout, analyzer.estimate(audio)).await {
                    Ok(Ok(Some(estimate))) => {
                        debug!(
                            analyzer = %name,
                            bpm = estimate.bpm,
                            confidence = estimate.confidence,
                            "Analyzer produced estimate"
                        );
                        Some(estimate)
                    }
                    Ok(Ok(None)) => {
                        debug!(analyzer = %name, "Analyzer found no tempo");
                        None
                    }
                    Ok(Err(e)) => {
                        warn!(analyzer = %name, error = %e, "Analyzer failed");
                        None
                    }
                    Err(_) => {
                        warn!(
                            analyzer = %name,
                            timeout_secs = self.config.adapter_timeout_secs,
                            "Analyzer timed out"
                        );
                        None
                    }
                }
            }
        });

        let estimates: Vec<Estimate> = join_all(futures).await.into_iter().flatten().collect();

        info!(
            estimates = estimates.len(),
            of = self.analyzers.len(),
            "Collected tempo estimates"
        );

        self.engine.calculate_consensus(&estimates)
    }

    /// Convenience wrapper: load an audio file, then analyze it
    pub async fn analyze_file<P: AsRef<Path>>(&self, path: P) -> Result<ConsensusResult> {
        let audio = AudioLoader::load(path).await?;
        Ok(self.analyze(&audio).await)
    }
}
