use async_trait::async_trait;

use crate::analyzers::{tempo_from_intervals, TempoAnalyzer};
use crate::audio::AudioData;
use crate::config::AnalysisConfig;
use crate::consensus::Estimate;
use crate::error::{AnalyzerError, Result};

const METHOD: &str = "energy-peak-intervals";

/// Built-in tempo estimator based on the RMS energy envelope
///
/// Slides an energy window over the signal, picks peaks above an adaptive
/// threshold, and derives the tempo from the peak interval histogram.
/// Cruder than spectral flux but robust on heavily compressed material
/// where the spectrum barely moves between frames.
pub struct EnergyPeakAnalyzer {
    config: AnalysisConfig,
}

impl EnergyPeakAnalyzer {
    /// Create a new analyzer with default configuration
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    /// Create a new analyzer with custom configuration
    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// RMS energy envelope over sliding windows with 50% overlap
    fn energy_envelope(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> Vec<(f64, f32)> {
        let window_samples = (config.energy_window_size * sample_rate as f64) as usize;
        if window_samples == 0 || samples.len() < window_samples {
            return Vec::new();
        }
        let hop_samples = (window_samples / 2).max(1);

        samples
            .windows(window_samples)
            .step_by(hop_samples)
            .enumerate()
            .map(|(i, window)| {
                let time = (i * hop_samples) as f64 / sample_rate as f64;
                let rms =
                    (window.iter().map(|&x| x * x).sum::<f32>() / window.len() as f32).sqrt();
                (time, rms)
            })
            .collect()
    }

    /// Pick peak times from the envelope
    fn pick_peaks(&self, envelope: &[(f64, f32)]) -> Vec<f64> {
        if envelope.len() < 10 {
            return Vec::new();
        }

        let energies: Vec<f32> = envelope.iter().map(|&(_, rms)| rms).collect();
        let mean_energy = energies.iter().sum::<f32>() / energies.len() as f32;
        let max_energy = energies.iter().fold(0.0f32, |acc, &x| acc.max(x));
        if max_energy <= mean_energy {
            return Vec::new();
        }

        let threshold = mean_energy + (max_energy - mean_energy) * 0.3;
        let min_peak_interval = 60.0 / self.config.max_bpm as f64;

        let mut peaks = Vec::new();
        let mut last_peak_time = f64::NEG_INFINITY;

        for (i, &(time, rms)) in envelope.iter().enumerate() {
            if rms <= threshold {
                continue;
            }

            let window_start = i.saturating_sub(2);
            let window_end = (i + 3).min(envelope.len());
            let is_local_max = envelope[window_start..window_end]
                .iter()
                .all(|&(_, other)| other <= rms);

            if is_local_max && time - last_peak_time >= min_peak_interval {
                peaks.push(time);
                last_peak_time = time;
            }
        }

        peaks
    }
}

impl Default for EnergyPeakAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TempoAnalyzer for EnergyPeakAnalyzer {
    fn name(&self) -> &str {
        "energy"
    }

    fn method(&self) -> Option<&str> {
        Some(METHOD)
    }

    async fn estimate(&self, audio: &AudioData) -> Result<Option<Estimate>> {
        let samples = audio.mono_samples();
        let sample_rate = audio.sample_rate;
        let analyzer = Self {
            config: self.config.clone(),
        };

        let result = tokio::task::spawn_blocking(move || {
            let envelope = Self::energy_envelope(&samples, sample_rate, &analyzer.config);
            let peaks = analyzer.pick_peaks(&envelope);
            tracing::debug!(peaks = peaks.len(), "Energy peak detection complete");

            let intervals: Vec<f64> = peaks.windows(2).map(|pair| pair[1] - pair[0]).collect();
            tempo_from_intervals(&intervals, &analyzer.config)
        })
        .await
        .map_err(|e| AnalyzerError::EstimationFailed {
            name: "energy".to_string(),
            reason: e.to_string(),
        })?;

        Ok(result
            .map(|(bpm, confidence)| Estimate::new(bpm, confidence, "energy").with_method(METHOD)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFormat;
    use std::path::PathBuf;

    fn pulse_track(bpm: f64, seconds: f64, sample_rate: u32) -> AudioData {
        let total = (seconds * sample_rate as f64) as usize;
        let beat_period = (60.0 / bpm * sample_rate as f64) as usize;
        let burst = sample_rate as usize / 20; // 50ms bursts
        let mut samples = vec![0.0f32; total];

        for (i, sample) in samples.iter_mut().enumerate() {
            if i % beat_period < burst {
                let t = i as f32 / sample_rate as f32;
                *sample = (t * 220.0 * 2.0 * std::f32::consts::PI).sin() * 0.8;
            }
        }

        AudioData {
            samples,
            sample_rate,
            channels: 1,
            duration: seconds,
            file_path: PathBuf::from("pulse.wav"),
            format: AudioFormat {
                extension: "wav".to_string(),
                bit_depth: Some(16),
                compression: None,
                bitrate: None,
            },
        }
    }

    #[tokio::test]
    async fn test_pulse_track_tempo() {
        let audio = pulse_track(100.0, 12.0, 44100);
        let analyzer = EnergyPeakAnalyzer::new();

        let estimate = analyzer.estimate(&audio).await.unwrap();
        let estimate = estimate.expect("pulse track should yield an estimate");

        assert_eq!(estimate.analyzer, "energy");
        assert!(estimate.confidence > 0.0 && estimate.confidence <= 1.0);
        assert!(
            (estimate.bpm - 100.0).abs() < 8.0,
            "expected ~100 BPM, got {}",
            estimate.bpm
        );
    }

    #[tokio::test]
    async fn test_short_audio_yields_no_estimate() {
        let audio = AudioData {
            samples: vec![0.1; 1024],
            sample_rate: 44100,
            channels: 1,
            duration: 1024.0 / 44100.0,
            file_path: PathBuf::from("short.wav"),
            format: AudioFormat {
                extension: "wav".to_string(),
                bit_depth: Some(16),
                compression: None,
                bitrate: None,
            },
        };

        let analyzer = EnergyPeakAnalyzer::new();
        let estimate = analyzer.estimate(&audio).await.unwrap();
        assert!(estimate.is_none());
    }
}
