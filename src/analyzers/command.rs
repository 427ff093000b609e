use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::analyzers::TempoAnalyzer;
use crate::audio::AudioData;
use crate::config::ExternalAnalyzerConfig;
use crate::consensus::Estimate;
use crate::error::{AnalyzerError, Result};

/// Adapter for an externally installed analyzer tool
///
/// Wraps command-line frontends of analyzers this crate cannot link
/// directly (an Essentia rhythm extractor, a Librosa beat-track script, a
/// Madmom processor, ...). The tool is invoked with the audio file path as
/// its final argument and must print a JSON object with `bpm` and
/// `confidence` fields on one line of stdout.
///
/// A missing binary, a non-zero exit, or unparseable output all surface as
/// analyzer errors; the orchestrator degrades them to "no estimate".
pub struct CommandAnalyzer {
    analyzer: String,
    program: String,
    args: Vec<String>,
    method: Option<String>,
}

/// The JSON object expected on the tool's stdout
#[derive(Debug, Deserialize)]
struct ExternalReport {
    bpm: f64,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default)]
    method: Option<String>,
}

/// Tools that report no confidence are taken at face value, middling
fn default_confidence() -> f64 {
    0.5
}

impl CommandAnalyzer {
    /// Create an adapter from its configuration entry
    pub fn from_config(config: &ExternalAnalyzerConfig) -> Self {
        Self {
            analyzer: config.analyzer.clone(),
            program: config.program.clone(),
            args: config.args.clone(),
            method: config.method.clone(),
        }
    }

    /// Find the first stdout line that parses as an external report
    fn parse_output(&self, stdout: &[u8]) -> Result<ExternalReport> {
        let text = String::from_utf8_lossy(stdout);
        text.lines()
            .filter_map(|line| serde_json::from_str::<ExternalReport>(line.trim()).ok())
            .next()
            .ok_or_else(|| {
                AnalyzerError::InvalidOutput {
                    name: self.analyzer.clone(),
                    details: format!("no JSON tempo report in {} bytes of output", stdout.len()),
                }
                .into()
            })
    }
}

#[async_trait]
impl TempoAnalyzer for CommandAnalyzer {
    fn name(&self) -> &str {
        &self.analyzer
    }

    fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    async fn estimate(&self, audio: &AudioData) -> Result<Option<Estimate>> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&audio.file_path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AnalyzerError::NotAvailable {
                name: self.analyzer.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(AnalyzerError::EstimationFailed {
                name: self.analyzer.clone(),
                reason: format!(
                    "exit status {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }
            .into());
        }

        let report = self.parse_output(&output.stdout)?;

        if !report.bpm.is_finite() || report.bpm <= 0.0 {
            // The tool ran but found no tempo; that is an answer, not an error
            return Ok(None);
        }

        let mut estimate = Estimate::new(report.bpm, report.confidence, &self.analyzer);
        if let Some(method) = report.method.or_else(|| self.method.clone()) {
            estimate = estimate.with_method(method);
        }

        Ok(Some(estimate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioData, AudioFormat};
    use std::path::PathBuf;

    fn dummy_audio() -> AudioData {
        AudioData {
            samples: vec![],
            sample_rate: 44100,
            channels: 1,
            duration: 0.0,
            file_path: PathBuf::from("/tmp/test.wav"),
            format: AudioFormat {
                extension: "wav".to_string(),
                bit_depth: None,
                compression: None,
                bitrate: None,
            },
        }
    }

    fn shell_analyzer(analyzer: &str, script: &str) -> CommandAnalyzer {
        CommandAnalyzer::from_config(&ExternalAnalyzerConfig {
            analyzer: analyzer.to_string(),
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            method: None,
        })
    }

    #[tokio::test]
    async fn test_json_report_parsed() {
        let analyzer = shell_analyzer(
            "essentia",
            r#"echo '{"bpm": 128.0, "confidence": 0.87, "method": "multifeature"}'"#,
        );

        let estimate = analyzer.estimate(&dummy_audio()).await.unwrap().unwrap();
        assert_eq!(estimate.bpm, 128.0);
        assert_eq!(estimate.confidence, 0.87);
        assert_eq!(estimate.analyzer, "essentia");
        assert_eq!(estimate.method.as_deref(), Some("multifeature"));
    }

    #[tokio::test]
    async fn test_missing_confidence_defaults() {
        let analyzer = shell_analyzer("librosa", r#"echo '{"bpm": 95.5}'"#);

        let estimate = analyzer.estimate(&dummy_audio()).await.unwrap().unwrap();
        assert_eq!(estimate.bpm, 95.5);
        assert_eq!(estimate.confidence, 0.5);
    }

    #[tokio::test]
    async fn test_chatter_before_report_is_skipped() {
        let analyzer = shell_analyzer(
            "madmom",
            r#"echo 'loading model...'; echo '{"bpm": 174.0, "confidence": 0.6}'"#,
        );

        let estimate = analyzer.estimate(&dummy_audio()).await.unwrap().unwrap();
        assert_eq!(estimate.bpm, 174.0);
    }

    #[tokio::test]
    async fn test_zero_bpm_means_no_estimate() {
        let analyzer = shell_analyzer("librosa", r#"echo '{"bpm": 0.0, "confidence": 0.0}'"#);

        let estimate = analyzer.estimate(&dummy_audio()).await.unwrap();
        assert!(estimate.is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_available() {
        let analyzer = CommandAnalyzer::from_config(&ExternalAnalyzerConfig {
            analyzer: "essentia".to_string(),
            program: "definitely-not-installed-anywhere".to_string(),
            args: vec![],
            method: None,
        });

        let result = analyzer.estimate(&dummy_audio()).await;
        assert!(matches!(
            result,
            Err(crate::error::TempoError::Analyzer(AnalyzerError::NotAvailable { .. }))
        ));
    }

    #[tokio::test]
    async fn test_garbage_output_is_invalid() {
        let analyzer = shell_analyzer("essentia", "echo 'not json at all'");

        let result = analyzer.estimate(&dummy_audio()).await;
        assert!(matches!(
            result,
            Err(crate::error::TempoError::Analyzer(AnalyzerError::InvalidOutput { .. }))
        ));
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails() {
        let analyzer = shell_analyzer("essentia", "echo 'boom' >&2; exit 3");

        let result = analyzer.estimate(&dummy_audio()).await;
        assert!(matches!(
            result,
            Err(crate::error::TempoError::Analyzer(AnalyzerError::EstimationFailed { .. }))
        ));
    }
}
