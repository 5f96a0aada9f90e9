//! Kokoro-82M text-to-speech engine.
//!
//! Runs the Kokoro-82M ONNX export through ONNX Runtime and phonemizes text
//! with espeak-ng. Output is mono f32 at 24 kHz.
//!
//! # System Requirements
//!
//! **espeak-ng** must be installed, or its location passed via
//! [`KokoroEngine::with_espeak`]:
//! - **Linux**: `sudo apt-get install espeak-ng`
//! - **macOS**: `brew install espeak-ng`
//! - **Windows**: <https://espeak-ng.org/download>
//!
//! # Model Directory Layout
//!
//! ```text
//! models/kokoro/
//! ├── kokoro-quant-convinteger.onnx   # preferred; any *.onnx is accepted
//! ├── voices-v1.0.bin                  # voice style tables (.npz)
//! └── config.json                      # optional vocabulary
//! ```
//!
//! Download links:
//! - Model: <https://github.com/taylorchu/kokoro-onnx/releases/tag/v0.2.0>
//! - Voices: <https://github.com/thewh1teagle/kokoro-onnx/releases/tag/model-files-v1.0>
//!
//! # Voices
//!
//! Voice names are `{language_prefix}_{name}`. The prefix picks the espeak-ng
//! language: `af`/`am` American English, `bf`/`bm` British English, `ef`/`em`
//! Spanish, `ff` French, `hf`/`hm` Hindi, `if`/`im` Italian, `jf`/`jm`
//! Japanese, `pf`/`pm` Brazilian Portuguese, `zf`/`zm` Mandarin.
//!
//! # Example
//!
//! ```rust,no_run
//! use narrate::engines::kokoro::{KokoroEngine, KokoroInferenceParams};
//! use narrate::{Narrator, SampleEncoding};
//! use std::path::Path;
//!
//! let mut engine = KokoroEngine::new();
//! engine.load_model(Path::new("models/kokoro"))?;
//!
//! let mut narrator = Narrator::new(engine).with_params(KokoroInferenceParams {
//!     voice: "bf_emma".to_string(),
//!     speed: 0.9,
//!     ..Default::default()
//! });
//! narrator.speak_to_file("Hello from British Emma!", Path::new("out.wav"), SampleEncoding::Pcm16)?;
//! # Ok::<(), narrate::Error>(())
//! ```

mod engine;
mod model;
mod phonemizer;
mod vocab;
mod voices;

pub use engine::{narrator, KokoroEngine, KokoroInferenceParams, KokoroModelParams};
pub use model::{KokoroError, SAMPLE_RATE};
