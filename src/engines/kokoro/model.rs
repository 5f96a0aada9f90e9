use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ndarray::{arr1, Array2, ArrayView2};
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use super::engine::{KokoroInferenceParams, KokoroModelParams};
use super::phonemizer::{voice_lang, EspeakConfig, Phonemizer};
use super::vocab;
use super::voices::{StyleVector, VoiceStore, STYLE_DIM};

/// Output sample rate of Kokoro-82M.
pub const SAMPLE_RATE: u32 = crate::SAMPLE_RATE;

/// Token budget for one inference call, excluding the two pad tokens.
pub const MAX_TOKENS_PER_CHUNK: usize = 510;

/// Overlap used to blend consecutive chunks (10ms @ 24kHz).
const CROSSFADE_SAMPLES: usize = 240;

/// Token ids for `; : , . ! ?` in the Kokoro vocabulary.
const SENTENCE_BREAK_IDS: [i64; 6] = [1, 2, 3, 4, 5, 6];

const PREFERRED_ONNX_FILE: &str = "kokoro-quant-convinteger.onnx";
const VOICES_FILE: &str = "voices-v1.0.bin";
const CONFIG_FILE: &str = "config.json";

#[derive(thiserror::Error, Debug)]
pub enum KokoroError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Model file missing: {0}")]
    MissingFile(PathBuf),
    #[error(
        "espeak-ng not found. Install: Linux: `sudo apt-get install espeak-ng`, \
         macOS: `brew install espeak-ng`, Windows: https://espeak-ng.org/download"
    )]
    EspeakNotFound,
    #[error("Phonemization failed: {0}")]
    PhonemizerFailed(String),
    #[error("Voice '{0}' not found. Call list_voices() to see available voices.")]
    VoiceNotFound(String),
    #[error("Model not loaded. Call load_model() first.")]
    ModelNotLoaded,
    #[error("Invalid config.json: {0}")]
    Config(String),
    #[error("Failed to parse voice file: {0}")]
    VoiceParse(String),
    #[error("Model produced no waveform output")]
    NoOutput,
}

/// Shape of the session inputs, which differs between Kokoro exports.
#[derive(Debug, Clone)]
struct InputLayout {
    /// "input_ids" or "tokens"
    tokens: String,
    speed_is_int32: bool,
}

impl InputLayout {
    fn detect(session: &Session) -> Self {
        let mut tokens = None;
        // Current exports take an int32 speed.
        let mut speed_is_int32 = true;
        for input in session.inputs() {
            match input.name() {
                "input_ids" | "tokens" if tokens.is_none() => {
                    tokens = Some(input.name().to_string());
                }
                "speed" => {
                    let dtype = format!("{:?}", input.dtype());
                    speed_is_int32 = dtype.to_ascii_lowercase().contains("int32");
                }
                _ => {}
            }
        }
        Self {
            tokens: tokens.unwrap_or_else(|| "input_ids".to_string()),
            speed_is_int32,
        }
    }
}

/// A loaded Kokoro ONNX session with its voices and vocabulary.
pub struct KokoroModel {
    session: Session,
    layout: InputLayout,
    voices: VoiceStore,
    vocab: HashMap<char, i64>,
}

impl KokoroModel {
    /// Load the model from a directory holding an `.onnx` export,
    /// `voices-v1.0.bin`, and optionally `config.json`.
    pub fn load(model_dir: &Path, params: &KokoroModelParams) -> Result<Self, KokoroError> {
        let onnx_path = locate_onnx(model_dir)?;
        log::info!("Loading Kokoro model from {}", onnx_path.display());
        let session = build_session(
            &onnx_path,
            params.num_threads,
            params.optimized_model_cache_path.as_deref(),
        )?;

        let layout = InputLayout::detect(&session);
        log::debug!(
            "Kokoro inputs: tokens='{}', speed_is_int32={}",
            layout.tokens,
            layout.speed_is_int32
        );

        let voices_path = model_dir.join(VOICES_FILE);
        if !voices_path.is_file() {
            return Err(KokoroError::MissingFile(voices_path));
        }
        let voices = VoiceStore::load(&voices_path)?;

        let config_path = model_dir.join(CONFIG_FILE);
        let vocab = if config_path.is_file() {
            vocab::load_vocab(&config_path)?
        } else {
            log::warn!(
                "{} not found in {}, using built-in vocabulary",
                CONFIG_FILE,
                model_dir.display()
            );
            vocab::builtin_vocab()
        };

        Ok(Self {
            session,
            layout,
            voices,
            vocab,
        })
    }

    /// Synthesize `text`, chunking long token sequences and blending the pieces.
    pub fn synthesize(
        &mut self,
        text: &str,
        params: &KokoroInferenceParams,
        espeak: &EspeakConfig,
    ) -> Result<Vec<f32>, KokoroError> {
        let phonemizer = Phonemizer::new(espeak, voice_lang(&params.voice), &self.vocab);
        let tokens = phonemizer.tokenize(text)?;
        if tokens.is_empty() {
            log::warn!("Text produced no phoneme tokens: {text:?}");
            return Ok(Vec::new());
        }

        // One style row for the whole utterance keeps prosody stable across chunks.
        let style = *self
            .voices
            .style(&params.voice, params.style_index.unwrap_or(tokens.len()))?;

        let chunks = chunk_tokens(&tokens, MAX_TOKENS_PER_CHUNK);
        if chunks.len() > 1 {
            log::debug!(
                "Split {} tokens into {} chunks",
                tokens.len(),
                chunks.len()
            );
        }

        let mut audio = Vec::with_capacity(tokens.len() * 300);
        for chunk in chunks {
            let piece = self.infer(chunk, &style, params.speed)?;
            crossfade_append(&mut audio, &piece, CROSSFADE_SAMPLES);
        }
        Ok(audio)
    }

    fn infer(
        &mut self,
        tokens: &[i64],
        style: &StyleVector,
        speed: f32,
    ) -> Result<Vec<f32>, KokoroError> {
        // Sequence is framed by pad token 0 on both sides.
        let mut framed = Vec::with_capacity(tokens.len() + 2);
        framed.push(0);
        framed.extend_from_slice(tokens);
        framed.push(0);
        let tokens_arr = Array2::from_shape_vec((1, framed.len()), framed)?;
        let style_arr = ArrayView2::from_shape((1, STYLE_DIM), style.as_slice())?;

        let tokens_name = self.layout.tokens.as_str();
        let outputs = if self.layout.speed_is_int32 {
            let speed_arr = arr1(&[speed.round() as i32]);
            self.session.run(inputs![
                tokens_name => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_arr)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ])?
        } else {
            let speed_arr = arr1(&[speed]);
            self.session.run(inputs![
                tokens_name => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_arr)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ])?
        };

        let (_, waveform) = outputs.iter().next().ok_or(KokoroError::NoOutput)?;
        let waveform = waveform.try_extract_array::<f32>()?;
        Ok(waveform.iter().copied().collect())
    }

    pub fn list_voices(&self) -> Vec<&str> {
        self.voices.names()
    }
}

/// Pick the `.onnx` export in `model_dir`, preferring the quantized CPU build.
fn locate_onnx(model_dir: &Path) -> Result<PathBuf, KokoroError> {
    let preferred = model_dir.join(PREFERRED_ONNX_FILE);
    if preferred.is_file() {
        return Ok(preferred);
    }

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(model_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "onnx"))
        .collect();
    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| KokoroError::MissingFile(model_dir.join("*.onnx")))
}

/// Create the ORT session.
///
/// With a cache path, the first load runs full graph optimization and
/// serializes the result there; later loads read the cached graph with
/// optimization disabled.
fn build_session(
    onnx_path: &Path,
    num_threads: Option<usize>,
    cache_path: Option<&Path>,
) -> Result<Session, KokoroError> {
    let cached = cache_path.filter(|p| p.is_file());
    let (source, level) = match cached {
        Some(cache) => {
            log::info!("Loading pre-optimized Kokoro graph from {}", cache.display());
            (cache, GraphOptimizationLevel::Disable)
        }
        None => (onnx_path, GraphOptimizationLevel::Level3),
    };

    let mut builder = Session::builder()?
        .with_optimization_level(level)?
        .with_execution_providers(vec![CPUExecutionProvider::default().build()])?
        .with_parallel_execution(true)?;

    if let (None, Some(cache)) = (cached, cache_path) {
        log::info!("Saving optimized Kokoro graph to {}", cache.display());
        builder = builder.with_optimized_model_path(cache)?;
    }
    if let Some(threads) = num_threads {
        builder = builder
            .with_intra_threads(threads)?
            .with_inter_threads(threads)?;
    }

    Ok(builder.commit_from_file(source)?)
}

/// Split `tokens` into runs of at most `max`, cutting after the last
/// sentence break inside each window when there is one.
fn chunk_tokens(tokens: &[i64], max: usize) -> Vec<&[i64]> {
    let mut chunks = Vec::new();
    let mut rest = tokens;
    while rest.len() > max {
        let cut = rest[..max]
            .iter()
            .rposition(|id| SENTENCE_BREAK_IDS.contains(id))
            .map_or(max, |pos| pos + 1);
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}

/// Append `src` to `dst`, linearly blending the first `overlap` samples of
/// `src` into the tail of `dst`.
fn crossfade_append(dst: &mut Vec<f32>, src: &[f32], overlap: usize) {
    let overlap = overlap.min(dst.len()).min(src.len());
    let start = dst.len() - overlap;
    let steps = overlap as f32 + 1.0;
    for (i, (out, &incoming)) in dst[start..].iter_mut().zip(src).enumerate() {
        let t = (i + 1) as f32 / steps;
        *out = *out * (1.0 - t) + incoming * t;
    }
    dst.extend_from_slice(&src[overlap..]);
}
