use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    consensus::ConsensusConfig,
    error::{ConfigError, Result},
};

/// Main configuration for tempo-consensus
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Consensus engine settings (weights, outlier threshold, scoring)
    pub consensus: ConsensusConfig,

    /// Orchestrator settings (timeouts, external analyzer commands)
    pub orchestrator: OrchestratorConfig,

    /// Signal analysis settings for the built-in analyzers
    pub analysis: AnalysisConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|_| ConfigError::ParseFailed {
            path: path.display().to_string(),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.consensus.validate()?;
        self.orchestrator.validate()?;
        self.analysis.validate()?;
        Ok(())
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Per-adapter timeout in seconds; an adapter exceeding it simply
    /// contributes no estimate
    pub adapter_timeout_secs: u64,

    /// Externally installed analyzer tools to run alongside the built-ins
    #[serde(default)]
    pub external_analyzers: Vec<ExternalAnalyzerConfig>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_secs: 10,
            external_analyzers: Vec::new(),
        }
    }
}

impl OrchestratorConfig {
    fn validate(&self) -> Result<()> {
        if self.adapter_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "orchestrator.adapter_timeout_secs".to_string(),
                value: self.adapter_timeout_secs.to_string(),
            }
            .into());
        }

        for external in &self.external_analyzers {
            if external.analyzer.is_empty() || external.program.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "orchestrator.external_analyzers".to_string(),
                    value: format!("{:?}", external),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// An externally installed analyzer tool invoked as a subprocess
///
/// The tool receives the audio file path as its last argument and must
/// print a JSON object with `bpm` and `confidence` fields to stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalAnalyzerConfig {
    /// Analyzer identifier used for weight lookup ("essentia", ...)
    pub analyzer: String,

    /// Program to execute
    pub program: String,

    /// Arguments passed before the audio file path
    #[serde(default)]
    pub args: Vec<String>,

    /// Optional method tag recorded on the produced estimates
    #[serde(default)]
    pub method: Option<String>,
}

/// Signal analysis configuration for the built-in analyzers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Window size for FFT analysis
    pub window_size: usize,

    /// Hop size for analysis windows
    pub hop_size: usize,

    /// Minimum BPM to detect
    pub min_bpm: f32,

    /// Maximum BPM to detect
    pub max_bpm: f32,

    /// Onset detection sensitivity (0.0-1.0)
    pub onset_sensitivity: f32,

    /// Energy analysis window size in seconds
    pub energy_window_size: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_size: 1024,
            hop_size: 512,
            min_bpm: 60.0,
            max_bpm: 200.0,
            onset_sensitivity: 0.7,
            energy_window_size: 0.1, // 100ms windows
        }
    }
}

impl AnalysisConfig {
    /// Validate analysis parameters
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 || !self.window_size.is_power_of_two() {
            return Err(ConfigError::InvalidValue {
                key: "analysis.window_size".to_string(),
                value: self.window_size.to_string(),
            }
            .into());
        }

        if self.hop_size == 0 || self.hop_size > self.window_size {
            return Err(ConfigError::InvalidValue {
                key: "analysis.hop_size".to_string(),
                value: self.hop_size.to_string(),
            }
            .into());
        }

        if self.min_bpm >= self.max_bpm {
            return Err(ConfigError::InvalidValue {
                key: "analysis.bpm_range".to_string(),
                value: format!("{}-{}", self.min_bpm, self.max_bpm),
            }
            .into());
        }

        if !(0.0..=1.0).contains(&self.onset_sensitivity) {
            return Err(ConfigError::InvalidValue {
                key: "analysis.onset_sensitivity".to_string(),
                value: self.onset_sensitivity.to_string(),
            }
            .into());
        }

        if self.energy_window_size <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "analysis.energy_window_size".to_string(),
                value: self.energy_window_size.to_string(),
            }
            .into());
        }

        Ok(())
    }
}
