//! Speech synthesis engines.
//!
//! Enable engines via Cargo features:
//! - `kokoro` - Kokoro TTS (ONNX format, espeak-ng required)
//!
//! Any other engine plugs in by implementing [`SpeechEngine`](crate::SpeechEngine).

#[cfg(feature = "kokoro")]
pub mod kokoro;
