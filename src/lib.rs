//! # narrate-rs
//!
//! Narration audio from text: a small library plus two command-line tools
//! built on pluggable text-to-speech engines.
//!
//! ## Features
//!
//! - **Engine seam**: any [`SpeechEngine`] can drive the tools; Kokoro-82M ships behind
//!   the `kokoro` feature
//! - **Post-processing strategy**: audio passes through a [`postprocess::PostProcessor`]
//!   before it is written (identity by default, so no watermark is ever embedded)
//! - **Scene tables**: batch narration from an ordered name/text table loaded from JSON
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! narrate-rs = { version = "2026.2", features = ["kokoro"] }
//! ```
//!
//! ```ignore
//! use std::path::Path;
//! use narrate::{engines::kokoro::KokoroEngine, Narrator, SampleEncoding};
//!
//! let mut engine = KokoroEngine::new();
//! engine.load_model(Path::new("models/kokoro"))?;
//!
//! let mut narrator = Narrator::new(engine);
//! let speech = narrator.speak_to_file("Hello, world!", Path::new("output.wav"), SampleEncoding::Pcm16)?;
//! println!("{:.2}s", speech.duration_secs());
//! # Ok::<(), narrate::Error>(())
//! ```

pub mod batch;
pub mod cli;
pub mod config;
pub mod engines;
mod error;
pub mod narrator;
pub mod postprocess;
pub mod scenes;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::{Error, Result};
pub use narrator::Narrator;

/// Sample rate every bundled engine produces and every tool reports against.
pub const SAMPLE_RATE: u32 = 24_000;

/// Mono audio produced by a single synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct Speech {
    /// Raw audio samples as f32 values, nominally in [-1, 1]
    pub samples: Vec<f32>,
    /// Sample rate of the audio in Hz
    pub sample_rate: u32,
}

/// Sample format used when encoding [`Speech`] to WAV.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    /// 16-bit signed PCM; samples are clipped to [-1, 1].
    #[default]
    Pcm16,
    /// 32-bit IEEE float, written as-is.
    Float32,
}

impl SampleEncoding {
    fn wav_spec(self, sample_rate: u32) -> hound::WavSpec {
        let (bits_per_sample, sample_format) = match self {
            SampleEncoding::Pcm16 => (16, hound::SampleFormat::Int),
            SampleEncoding::Float32 => (32, hound::SampleFormat::Float),
        };
        hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

impl Speech {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Write the audio to a mono WAV file, replacing any existing file.
    pub fn write_wav(&self, path: &Path, encoding: SampleEncoding) -> Result<()> {
        let mut writer = hound::WavWriter::create(path, encoding.wav_spec(self.sample_rate))?;
        match encoding {
            SampleEncoding::Pcm16 => {
                for &sample in &self.samples {
                    writer.write_sample(to_pcm16(sample))?;
                }
            }
            SampleEncoding::Float32 => {
                for &sample in &self.samples {
                    writer.write_sample(sample)?;
                }
            }
        }
        writer.finalize()?;
        Ok(())
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value (0.0 for an empty buffer).
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .fold(0.0f32, |peak, &s| if s.abs() > peak { s.abs() } else { peak })
    }
}

fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Common interface for text-to-speech synthesis engines.
///
/// Engines own their model state; loading is engine specific and happens
/// before the engine is handed to a [`Narrator`].
pub trait SpeechEngine {
    /// Parameters for configuring inference behavior (voice, speed, etc.)
    type SynthesisParams: Clone;

    /// Synthesize speech from the given text.
    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<Speech>;
}

impl<E: SpeechEngine + ?Sized> SpeechEngine for Box<E> {
    type SynthesisParams = E::SynthesisParams;

    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<Speech> {
        (**self).synthesize(text, params)
    }
}
