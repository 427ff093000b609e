use thiserror::Error;

/// Main error type for the tempo-consensus library
#[derive(Error, Debug)]
pub enum TempoError {
    #[error("Audio processing error: {0}")]
    Audio(#[from] AudioError),

    #[error("Analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Audio-specific errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to load audio file: {path}")]
    LoadFailed { path: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Invalid audio parameters: {details}")]
    InvalidParameters { details: String },
}

/// Analyzer-specific errors
///
/// These never escape the orchestrator: a failing adapter is logged and
/// simply contributes no estimate.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Analyzer not available: {name} - {reason}")]
    NotAvailable { name: String, reason: String },

    #[error("Tempo estimation failed: {name} - {reason}")]
    EstimationFailed { name: String, reason: String },

    #[error("Unparseable analyzer output: {name} - {details}")]
    InvalidOutput { name: String, details: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using TempoError
pub type Result<T> = std::result::Result<T, TempoError>;

impl TempoError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // IO errors might be temporary
            Self::Io(_) => true,
            // Audio loading might work on retry
            Self::Audio(AudioError::LoadFailed { .. }) => true,
            // A missing analyzer binary may get installed between runs
            Self::Analyzer(AnalyzerError::NotAvailable { .. }) => true,
            // Most other errors are permanent
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Audio(AudioError::LoadFailed { path }) => {
                format!("Could not load audio file '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Analyzer(AnalyzerError::NotAvailable { name, .. }) => {
                format!("Analyzer '{}' is not available on this host.", name)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
