use async_trait::async_trait;

use crate::audio::AudioData;
use crate::consensus::Estimate;
use crate::error::Result;

/// Core trait that all tempo analyzer adapters must implement
///
/// An adapter wraps one independent tempo-estimation method (a built-in
/// estimator or an external tool) behind a uniform result contract:
/// zero or one [`Estimate`] per invocation.
///
/// Returning `Ok(None)` means the analyzer ran but could not determine a
/// tempo; an `Err` means it failed outright. The orchestrator treats both
/// as "no estimate" and never lets them abort the other adapters — the
/// distinction only affects log levels.
#[async_trait]
pub trait TempoAnalyzer: Send + Sync {
    /// Stable identifier of this analyzer, used for consensus weight lookup
    fn name(&self) -> &str;

    /// Free-form note of the specific algorithm/mode used
    ///
    /// Recorded on produced estimates for debugging; never affects the
    /// consensus computation.
    fn method(&self) -> Option<&str> {
        None
    }

    /// Estimate the tempo of the given audio
    async fn estimate(&self, audio: &AudioData) -> Result<Option<Estimate>>;
}
