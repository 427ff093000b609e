use std::collections::HashMap;
use std::sync::Arc;

use crate::analyzers::{EnergyPeakAnalyzer, SpectralFluxAnalyzer, TempoAnalyzer};
use crate::config::AnalysisConfig;

type AnalyzerFactory = Box<dyn Fn() -> Arc<dyn TempoAnalyzer> + Send + Sync>;

/// Registry for managing available tempo analyzers
///
/// The registry provides a central place to discover and instantiate
/// analyzers. Analyzers are registered by name and can be retrieved for
/// use in the orchestrator.
pub struct AnalyzerRegistry {
    analyzers: HashMap<String, AnalyzerFactory>,
}

impl AnalyzerRegistry {
    /// Create a new registry with all built-in analyzers using default
    /// analysis settings
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    /// Create a new registry with all built-in analyzers using the given
    /// analysis settings
    pub fn with_config(config: AnalysisConfig) -> Self {
        let mut registry = Self {
            analyzers: HashMap::new(),
        };

        registry.register_builtin_analyzers(config);
        registry
    }

    /// Register all built-in analyzers
    fn register_builtin_analyzers(&mut self, config: AnalysisConfig) {
        let flux_config = config.clone();
        self.analyzers.insert(
            "spectral_flux".to_string(),
            Box::new(move || Arc::new(SpectralFluxAnalyzer::with_config(flux_config.clone()))),
        );

        self.analyzers.insert(
            "energy".to_string(),
            Box::new(move || Arc::new(EnergyPeakAnalyzer::with_config(config.clone()))),
        );
    }

    /// Register a custom analyzer
    ///
    /// # Arguments
    ///
    /// * `name` - Unique name for the analyzer
    /// * `factory` - Function that creates new instances of the analyzer
    pub fn register<F>(&mut self, name: String, factory: F)
    where
        F: Fn() -> Arc<dyn TempoAnalyzer> + Send + Sync + 'static,
    {
        self.analyzers.insert(name, Box::new(factory));
    }

    /// Get an analyzer by name
    ///
    /// Returns a new instance of the requested analyzer, or None if it is
    /// not registered.
    pub fn get_analyzer(&self, name: &str) -> Option<Arc<dyn TempoAnalyzer>> {
        self.analyzers.get(name).map(|factory| factory())
    }

    /// Get all available analyzer names
    pub fn available_analyzers(&self) -> Vec<String> {
        self.analyzers.keys().cloned().collect()
    }

    /// Check if an analyzer is available
    pub fn has_analyzer(&self, name: &str) -> bool {
        self.analyzers.contains_key(name)
    }

    /// Get the number of registered analyzers
    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
