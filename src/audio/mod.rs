//! # Audio Module
//!
//! Decoding and sample handling for the built-in tempo analyzers.
//!
//! ## Core Features
//!
//! - **Multi-format Loading**: WAV via hound, MP3/FLAC/OGG/M4A/AAC via Symphonia
//! - **Sample Access**: interleaved f32 samples with mono mixdown and
//!   per-channel extraction
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tempo_consensus::audio::AudioLoader;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let audio_data = AudioLoader::load("song.wav").await?;
//! println!("Loaded {:.1}s at {} Hz", audio_data.duration, audio_data.sample_rate);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod types;

pub use loader::AudioLoader;
pub use types::{AudioData, AudioFormat};
