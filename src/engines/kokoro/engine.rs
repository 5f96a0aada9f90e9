use std::path::{Path, PathBuf};

use crate::config::NarrationSettings;
use crate::postprocess::PeakNormalize;
use crate::{Narrator, Result, Speech, SpeechEngine};

use super::model::{KokoroError, KokoroModel, SAMPLE_RATE};
use super::phonemizer::EspeakConfig;

/// Parameters for configuring Kokoro model loading.
#[derive(Debug, Clone, Default)]
pub struct KokoroModelParams {
    /// Number of CPU threads to use for inference.
    /// `None` uses the ORT default (typically all available cores).
    pub num_threads: Option<usize>,
    /// Where to cache the optimized ONNX graph between runs.
    ///
    /// Must be writable; the first load creates it, later loads skip graph
    /// optimization by reading it back.
    pub optimized_model_cache_path: Option<PathBuf>,
}

/// Parameters for configuring a Kokoro synthesis request.
#[derive(Debug, Clone)]
pub struct KokoroInferenceParams {
    /// Voice name (e.g. `"af_heart"`, `"bf_emma"`, `"jf_alpha"`).
    pub voice: String,
    /// Speech speed multiplier. Range: 0.5–2.0, default 1.0.
    pub speed: f32,
    /// Override the style vector index. `None` = auto (uses phoneme token count).
    pub style_index: Option<usize>,
}

impl Default for KokoroInferenceParams {
    fn default() -> Self {
        Self {
            voice: crate::config::DEFAULT_VOICE.to_string(),
            speed: 1.0,
            style_index: None,
        }
    }
}

impl From<&NarrationSettings> for KokoroInferenceParams {
    fn from(settings: &NarrationSettings) -> Self {
        Self {
            voice: settings.voice.clone(),
            speed: settings.speed,
            style_index: None,
        }
    }
}

/// Kokoro-82M text-to-speech engine.
///
/// ```rust,no_run
/// use narrate::{SpeechEngine, engines::kokoro::KokoroEngine};
/// use std::path::Path;
///
/// let mut engine = KokoroEngine::new();
/// engine.load_model(Path::new("models/kokoro"))?;
/// let speech = engine.synthesize("Hello, world!", None)?;
/// # Ok::<(), narrate::Error>(())
/// ```
pub struct KokoroEngine {
    model: Option<KokoroModel>,
    model_path: Option<PathBuf>,
    espeak: EspeakConfig,
}

impl Default for KokoroEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl KokoroEngine {
    /// Create an engine that runs `espeak-ng` from PATH.
    pub fn new() -> Self {
        Self::with_espeak(None, None)
    }

    /// Create an engine with explicit espeak-ng binary and data paths.
    /// Either may be `None` to use the system default.
    pub fn with_espeak(bin_path: Option<PathBuf>, data_path: Option<PathBuf>) -> Self {
        Self {
            model: None,
            model_path: None,
            espeak: EspeakConfig {
                bin_path,
                data_path,
            },
        }
    }

    /// Build and load an engine as described by `settings`.
    pub fn from_settings(settings: &NarrationSettings) -> Result<Self> {
        let mut engine = Self::with_espeak(settings.espeak_bin.clone(), settings.espeak_data.clone());
        engine.load_model_with_params(
            &settings.model_dir,
            KokoroModelParams {
                num_threads: settings.num_threads,
                optimized_model_cache_path: None,
            },
        )?;
        Ok(engine)
    }

    /// Load the model from `model_path` with default parameters.
    pub fn load_model(&mut self, model_path: &Path) -> Result<()> {
        self.load_model_with_params(model_path, KokoroModelParams::default())
    }

    pub fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: KokoroModelParams,
    ) -> Result<()> {
        let model = KokoroModel::load(model_path, &params)?;
        self.model = Some(model);
        self.model_path = Some(model_path.to_path_buf());
        Ok(())
    }

    /// Drop the loaded model and free the ONNX session.
    pub fn unload_model(&mut self) {
        if let Some(path) = self.model_path.take() {
            log::debug!("Unloading Kokoro model from {}", path.display());
        }
        self.model = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Directory the current model was loaded from.
    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    /// List all available voice names (empty until a model is loaded).
    pub fn list_voices(&self) -> Vec<&str> {
        self.model
            .as_ref()
            .map(|m| m.list_voices())
            .unwrap_or_default()
    }
}

impl Drop for KokoroEngine {
    fn drop(&mut self) {
        self.unload_model();
    }
}

impl SpeechEngine for KokoroEngine {
    type SynthesisParams = KokoroInferenceParams;

    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<Speech> {
        let model = self.model.as_mut().ok_or(KokoroError::ModelNotLoaded)?;
        let params = params.unwrap_or_default();
        let samples = model.synthesize(text, &params, &self.espeak)?;
        Ok(Speech::new(samples, SAMPLE_RATE))
    }
}

/// A narrator over a loaded Kokoro engine, configured from `settings`.
pub fn narrator(
    settings: &NarrationSettings,
) -> Result<Narrator<KokoroEngine, Option<PeakNormalize>>> {
    let engine = KokoroEngine::from_settings(settings)?;
    Ok(Narrator::new(engine)
        .with_params(KokoroInferenceParams::from(settings))
        .with_post_processor(settings.post_processor()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesize_requires_loaded_model() {
        let mut engine = KokoroEngine::new();
        assert!(!engine.is_loaded());
        assert!(engine.list_voices().is_empty());
        let err = engine.synthesize("hello", None).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Kokoro(KokoroError::ModelNotLoaded)
        ));
    }

    #[test]
    fn loading_from_missing_directory_fails() {
        let mut engine = KokoroEngine::new();
        assert!(engine
            .load_model(Path::new("/nonexistent/kokoro-model"))
            .is_err());
        assert!(engine.model_path().is_none());
    }

    #[test]
    fn inference_params_follow_settings() {
        let settings = NarrationSettings::builder()
            .voice("bf_emma")
            .speed(0.8)
            .build()
            .unwrap();
        let params = KokoroInferenceParams::from(&settings);
        assert_eq!(params.voice, "bf_emma");
        assert_eq!(params.speed, 0.8);
        assert!(params.style_index.is_none());
    }
}
