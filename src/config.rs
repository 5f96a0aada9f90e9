//! Runtime settings shared by the `say` and `narrate` tools.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::Serialize;

use crate::postprocess::PeakNormalize;
use crate::{Error, Result, SampleEncoding};

/// Default model directory, relative to the working directory.
pub const DEFAULT_MODEL_DIR: &str = "models/kokoro";

/// Default voice name.
pub const DEFAULT_VOICE: &str = "af_heart";

/// How narration is synthesized and encoded.
///
/// ```
/// use narrate::config::NarrationSettingsBuilder;
///
/// let settings = NarrationSettingsBuilder::default()
///     .voice("bf_emma")
///     .speed(0.9)
///     .build()?;
/// assert_eq!(settings.voice, "bf_emma");
/// # Ok::<(), narrate::config::NarrationSettingsBuilderError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Builder)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct NarrationSettings {
    /// Directory holding the model files.
    #[builder(setter(into))]
    pub model_dir: PathBuf,
    /// Voice name (e.g. `"af_heart"`, `"bf_emma"`).
    #[builder(setter(into))]
    pub voice: String,
    /// Speech speed multiplier. Range: 0.5–2.0.
    pub speed: f32,
    /// Inference threads; `None` lets the runtime decide.
    #[builder(setter(strip_option))]
    pub num_threads: Option<usize>,
    /// espeak-ng binary; `None` resolves `espeak-ng` from PATH.
    #[builder(setter(into, strip_option))]
    pub espeak_bin: Option<PathBuf>,
    /// espeak-ng data directory; `None` uses the binary's default.
    #[builder(setter(into, strip_option))]
    pub espeak_data: Option<PathBuf>,
    pub encoding: SampleEncoding,
    /// Peak level to normalize to; `None` writes engine output unchanged.
    #[builder(setter(strip_option))]
    pub normalize_peak: Option<f32>,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            voice: DEFAULT_VOICE.to_string(),
            speed: 1.0,
            num_threads: None,
            espeak_bin: None,
            espeak_data: None,
            encoding: SampleEncoding::default(),
            normalize_peak: None,
        }
    }
}

impl NarrationSettingsBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(speed) = self.speed {
            if !(0.5..=2.0).contains(&speed) {
                return Err(format!("speed must be within 0.5..=2.0, got {speed}"));
            }
        }
        if let Some(voice) = &self.voice {
            if voice.trim().is_empty() {
                return Err("voice must not be empty".to_string());
            }
        }
        if let Some(Some(peak)) = self.normalize_peak {
            if !(peak > 0.0 && peak <= 1.0) {
                return Err(format!("normalize peak must be within (0, 1], got {peak}"));
            }
        }
        if let Some(Some(0)) = self.num_threads {
            return Err("thread count must be at least 1".to_string());
        }
        Ok(())
    }
}

impl NarrationSettings {
    /// Start a builder seeded with the defaults.
    pub fn builder() -> NarrationSettingsBuilder {
        NarrationSettingsBuilder::default()
    }

    /// The post-processing these settings ask for.
    pub fn post_processor(&self) -> Option<PeakNormalize> {
        self.normalize_peak.map(PeakNormalize::new)
    }
}

impl From<NarrationSettingsBuilderError> for Error {
    fn from(e: NarrationSettingsBuilderError) -> Self {
        Error::InvalidSettings(e.to_string())
    }
}

/// Build settings, mapping builder failures into the crate error.
pub fn build(builder: &NarrationSettingsBuilder) -> Result<NarrationSettings> {
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default() {
        let built = NarrationSettings::builder().build().unwrap();
        assert_eq!(built, NarrationSettings::default());
        assert_eq!(built.model_dir, PathBuf::from("models/kokoro"));
        assert_eq!(built.encoding, SampleEncoding::Pcm16);
        assert!(built.post_processor().is_none());
    }

    #[test]
    fn builder_sets_optional_fields() {
        let settings = NarrationSettings::builder()
            .model_dir("/opt/kokoro")
            .num_threads(2)
            .espeak_bin("/usr/local/bin/espeak-ng")
            .normalize_peak(0.8)
            .encoding(SampleEncoding::Float32)
            .build()
            .unwrap();
        assert_eq!(settings.num_threads, Some(2));
        assert_eq!(
            settings.espeak_bin,
            Some(PathBuf::from("/usr/local/bin/espeak-ng"))
        );
        assert_eq!(settings.post_processor().map(|p| p.target), Some(0.8));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(NarrationSettings::builder().speed(3.0).build().is_err());
        assert!(NarrationSettings::builder().normalize_peak(1.5).build().is_err());
        assert!(NarrationSettings::builder().num_threads(0).build().is_err());
        assert!(NarrationSettings::builder().voice(" ").build().is_err());
    }

    #[test]
    fn builder_errors_become_crate_errors() {
        let err = build(NarrationSettings::builder().speed(0.1)).unwrap_err();
        assert!(matches!(err, Error::InvalidSettings(ref msg) if msg.contains("speed")));
    }

    #[test]
    fn serializes_encoding_in_lowercase() {
        let json = serde_json::to_value(NarrationSettings::default()).unwrap();
        assert_eq!(json["encoding"], "pcm16");
        assert_eq!(json["voice"], "af_heart");
    }
}
