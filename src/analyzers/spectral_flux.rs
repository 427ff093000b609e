use async_trait::async_trait;
use realfft::RealFftPlanner;

use crate::analyzers::{tempo_from_intervals, TempoAnalyzer};
use crate::audio::AudioData;
use crate::config::AnalysisConfig;
use crate::consensus::Estimate;
use crate::error::{AnalyzerError, Result};

const METHOD: &str = "spectral-flux-onsets";

/// Built-in tempo estimator based on FFT spectral flux
///
/// Detects onsets as peaks in the frame-to-frame positive spectral
/// difference, then derives the tempo from the inter-onset interval
/// histogram. Works best on material with percussive attacks.
pub struct SpectralFluxAnalyzer {
    config: AnalysisConfig,
}

impl SpectralFluxAnalyzer {
    /// Create a new analyzer with default configuration
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    /// Create a new analyzer with custom configuration
    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Compute the spectral flux curve over analysis windows
    fn spectral_flux(samples: &[f32], config: &AnalysisConfig) -> Vec<f32> {
        let mut planner = RealFftPlanner::new();
        let fft = planner.plan_fft_forward(config.window_size);
        let mut input_buffer = fft.make_input_vec();
        let mut spectrum_buffer = fft.make_output_vec();

        let mut previous_magnitude = vec![0.0f32; config.window_size / 2 + 1];
        let mut flux_curve = Vec::new();

        for window in samples.windows(config.window_size).step_by(config.hop_size) {
            // Hann window
            for (i, &sample) in window.iter().enumerate() {
                let window_val = 0.5
                    * (1.0
                        - (2.0 * std::f32::consts::PI * i as f32
                            / (config.window_size - 1) as f32)
                            .cos());
                input_buffer[i] = sample * window_val;
            }

            if fft.process(&mut input_buffer, &mut spectrum_buffer).is_err() {
                // A malformed frame poisons only itself
                flux_curve.push(0.0);
                continue;
            }

            // Sum of positive magnitude differences against the previous frame
            let mut flux = 0.0f32;
            for (bin, &value) in spectrum_buffer.iter().enumerate() {
                let magnitude = value.norm();
                flux += (magnitude - previous_magnitude[bin]).max(0.0);
                previous_magnitude[bin] = magnitude;
            }
            flux_curve.push(flux);
        }

        flux_curve
    }

    /// Pick onset times as local flux maxima above an adaptive threshold
    fn pick_onsets(&self, flux_curve: &[f32], sample_rate: u32) -> Vec<f64> {
        let mut onsets = Vec::new();
        if flux_curve.len() < 7 {
            return onsets;
        }

        let hop_time = self.config.hop_size as f64 / sample_rate as f64;

        for i in 3..flux_curve.len() - 3 {
            let flux = flux_curve[i];
            let neighborhood = &flux_curve[i - 3..i + 4];

            let local_max = neighborhood.iter().fold(0.0f32, |acc, &x| acc.max(x));
            let local_mean = neighborhood.iter().sum::<f32>() / neighborhood.len() as f32;
            let threshold =
                local_mean + self.config.onset_sensitivity * (local_max - local_mean) * 0.5;

            if flux >= threshold && flux == local_max && flux > local_mean * 1.5 {
                onsets.push(i as f64 * hop_time);
            }
        }

        // Adaptive picking finds nothing on very uniform material; retry
        // with a plain global threshold before giving up
        if onsets.is_empty() {
            let mean_flux = flux_curve.iter().sum::<f32>() / flux_curve.len() as f32;
            let threshold = mean_flux * (2.0 + self.config.onset_sensitivity);

            for (i, &flux) in flux_curve.iter().enumerate() {
                if flux > threshold {
                    onsets.push(i as f64 * hop_time);
                }
            }
        }

        onsets
    }
}

impl Default for SpectralFluxAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TempoAnalyzer for SpectralFluxAnalyzer {
    fn name(&self) -> &str {
        "spectral_flux"
    }

    fn method(&self) -> Option<&str> {
        Some(METHOD)
    }

    async fn estimate(&self, audio: &AudioData) -> Result<Option<Estimate>> {
        let samples = audio.mono_samples();
        let sample_rate = audio.sample_rate;
        let config = self.config.clone();
        let analyzer = Self { config };

        // Windowed FFT over a full track is CPU-bound; keep it off the
        // async executor
        let result = tokio::task::spawn_blocking(move || {
            let flux_curve = Self::spectral_flux(&samples, &analyzer.config);
            let onsets = analyzer.pick_onsets(&flux_curve, sample_rate);
            tracing::debug!(onsets = onsets.len(), "Spectral flux onset detection complete");

            let intervals: Vec<f64> = onsets.windows(2).map(|pair| pair[1] - pair[0]).collect();
            tempo_from_intervals(&intervals, &analyzer.config)
        })
        .await
        .map_err(|e| AnalyzerError::EstimationFailed {
            name: "spectral_flux".to_string(),
            reason: e.to_string(),
        })?;

        Ok(result.map(|(bpm, confidence)| {
            Estimate::new(bpm, confidence, "spectral_flux").with_method(METHOD)
        }))
    }
}
