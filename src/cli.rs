//! Command-line front ends for the `say` and `narrate` binaries.
//!
//! Parsing and console reporting live here so both tools share engine
//! options and so the behavior can be exercised without a loaded model.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Args, Parser};

use crate::batch::{self, BatchEvent, BatchReport};
use crate::config::{self, NarrationSettings, DEFAULT_MODEL_DIR, DEFAULT_VOICE};
use crate::postprocess::PostProcessor;
use crate::scenes::SceneTable;
use crate::{Narrator, Result, SampleEncoding, Speech, SpeechEngine};

/// Exit status for bad invocations, including a missing `<TEXT>`.
pub const USAGE_EXIT_CODE: i32 = 1;

/// Default output file for `say`.
pub const DEFAULT_SAY_OUTPUT: &str = "output.wav";

const SAY_EXAMPLES: &str = "\
Examples:
    say \"Hello world!\" hello.wav
    say \"This is a test\"            # saves to output.wav";

/// Longest text echoed back verbatim before it is shortened.
const PREVIEW_LIMIT: usize = 80;

/// Engine options shared by both tools.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Directory containing the Kokoro ONNX model and voices-v1.0.bin
    #[arg(long, default_value = DEFAULT_MODEL_DIR)]
    pub model_dir: PathBuf,

    /// Voice name (e.g. af_heart, bf_emma)
    #[arg(long, default_value = DEFAULT_VOICE)]
    pub voice: String,

    /// Speech speed multiplier (0.5-2.0)
    #[arg(long, default_value_t = 1.0)]
    pub speed: f32,

    /// Number of inference threads
    #[arg(long)]
    pub threads: Option<usize>,

    /// Path to the espeak-ng binary (defaults to espeak-ng on PATH)
    #[arg(long)]
    pub espeak_bin: Option<PathBuf>,

    /// Path to the espeak-ng data directory
    #[arg(long)]
    pub espeak_data: Option<PathBuf>,

    /// WAV sample encoding
    #[arg(long, value_enum, default_value_t = SampleEncoding::Pcm16)]
    pub encoding: SampleEncoding,

    /// Normalize each clip so its peak reaches this level (0-1]
    #[arg(long, value_name = "PEAK")]
    pub normalize: Option<f32>,
}

impl EngineArgs {
    /// Validate the flags into [`NarrationSettings`].
    pub fn settings(&self) -> Result<NarrationSettings> {
        let mut builder = NarrationSettings::builder();
        builder
            .model_dir(self.model_dir.clone())
            .voice(self.voice.clone())
            .speed(self.speed)
            .encoding(self.encoding);
        if let Some(threads) = self.threads {
            builder.num_threads(threads);
        }
        if let Some(bin) = &self.espeak_bin {
            builder.espeak_bin(bin.clone());
        }
        if let Some(data) = &self.espeak_data {
            builder.espeak_data(data.clone());
        }
        if let Some(peak) = self.normalize {
            builder.normalize_peak(peak);
        }
        config::build(&builder)
    }
}

/// say: synthesize one utterance to a WAV file
#[derive(Parser, Debug, Clone)]
#[command(name = "say", version, after_help = SAY_EXAMPLES)]
pub struct SayArgs {
    /// Text to speak
    #[arg(allow_hyphen_values = true)]
    pub text: String,

    /// Output WAV file
    #[arg(default_value = DEFAULT_SAY_OUTPUT)]
    pub output: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// narrate: generate one WAV file per scene
#[derive(Parser, Debug, Clone)]
#[command(name = "narrate", version)]
pub struct NarrateArgs {
    /// JSON scene table (list of {"name","text"} or a name-to-text map);
    /// the built-in table is used when omitted
    #[arg(long)]
    pub scenes: Option<PathBuf>,

    /// Directory the scene files are written into
    #[arg(long, default_value = batch::DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,
}

impl NarrateArgs {
    pub fn scene_table(&self) -> Result<SceneTable> {
        match &self.scenes {
            Some(path) => SceneTable::load(path),
            None => Ok(SceneTable::default()),
        }
    }
}

/// Parsing stopped before any work: help, version, or a usage error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarlyExit {
    pub code: i32,
    pub message: String,
}

impl EarlyExit {
    /// Print the message to the appropriate stream and return the exit code.
    pub fn report(&self) -> i32 {
        if self.code == 0 {
            print!("{}", self.message);
        } else {
            eprint!("{}", self.message);
        }
        self.code
    }
}

/// Parse `say` arguments. A missing `<TEXT>` yields usage text and exit code 1.
pub fn parse_say<I, T>(args: I) -> std::result::Result<SayArgs, EarlyExit>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    SayArgs::try_parse_from(args).map_err(|e| early_exit(e, Some(SAY_EXAMPLES)))
}

/// Parse `narrate` arguments.
pub fn parse_narrate<I, T>(args: I) -> std::result::Result<NarrateArgs, EarlyExit>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    NarrateArgs::try_parse_from(args).map_err(|e| early_exit(e, None))
}

fn early_exit(err: clap::Error, examples: Option<&str>) -> EarlyExit {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EarlyExit {
            code: 0,
            message: err.to_string(),
        },
        _ => {
            let mut message = err.to_string();
            if let Some(examples) = examples {
                message.push('\n');
                message.push_str(examples);
                message.push('\n');
            }
            EarlyExit {
                code: USAGE_EXIT_CODE,
                message,
            }
        }
    }
}

/// Shorten long text for console echo, counting characters rather than bytes.
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_LIMIT {
        let head: String = text.chars().take(PREVIEW_LIMIT - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Run `say` against a ready narrator, reporting to `out`.
pub fn say<E, P>(
    narrator: &mut Narrator<E, P>,
    args: &SayArgs,
    encoding: SampleEncoding,
    out: &mut dyn Write,
) -> Result<Speech>
where
    E: SpeechEngine,
    P: PostProcessor,
{
    writeln!(out, "Generating: {}", args.output.display())?;
    writeln!(out, "   Text: {}", preview(&args.text))?;

    let speech = narrator.speak_to_file(&args.text, &args.output, encoding)?;

    writeln!(
        out,
        "Generated: {} ({:.2}s)",
        args.output.display(),
        speech.duration_secs()
    )?;
    Ok(speech)
}

/// Run `narrate` over `scenes`, printing per-scene progress and a summary to `out`.
pub fn narrate<E, P>(
    narrator: &mut Narrator<E, P>,
    scenes: &SceneTable,
    args: &NarrateArgs,
    encoding: SampleEncoding,
    out: &mut dyn Write,
) -> Result<BatchReport>
where
    E: SpeechEngine,
    P: PostProcessor,
{
    let mut console_error = None;
    let report = batch::generate_scenes(narrator, scenes, &args.output_dir, encoding, |event| {
        if let Err(e) = print_event(&mut *out, event) {
            console_error.get_or_insert(e);
        }
    })?;
    if let Some(e) = console_error {
        return Err(e.into());
    }

    writeln!(
        out,
        "\nAll narrations generated in: {}/",
        report.output_dir.display()
    )?;
    writeln!(out, "\nFiles created:")?;
    for file in &report.files {
        writeln!(out, "   - {}", file.file_name())?;
    }
    Ok(report)
}

fn print_event(out: &mut dyn Write, event: BatchEvent<'_>) -> std::io::Result<()> {
    match event {
        BatchEvent::Started { scene, .. } => {
            writeln!(out, "\nGenerating: {}.wav", scene.name)?;
            writeln!(out, "   Text: {}", scene.text)
        }
        BatchEvent::Finished { file, .. } => writeln!(out, "   Done: {:.2}s", file.duration_secs),
    }
}

/// Initialize `env_logger`, defaulting to `info` when `RUST_LOG` is unset.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn say_requires_text() {
        let exit = parse_say(["say"]).unwrap_err();
        assert_eq!(exit.code, USAGE_EXIT_CODE);
        assert!(exit.message.contains("Usage"));
        assert!(exit.message.contains("Examples"));
    }

    #[test]
    fn say_defaults_output_path() {
        let args = parse_say(["say", "Hello world!"]).unwrap();
        assert_eq!(args.text, "Hello world!");
        assert_eq!(args.output, PathBuf::from("output.wav"));
        assert_eq!(args.engine.voice, "af_heart");
        assert_eq!(args.engine.encoding, SampleEncoding::Pcm16);
    }

    #[test]
    fn say_keeps_text_starting_with_hyphen() {
        let args = parse_say(["say", "-5 degrees outside"]).unwrap();
        assert_eq!(args.text, "-5 degrees outside");
        assert_eq!(args.output, PathBuf::from("output.wav"));

        let args = parse_say(["say", "--", "--verbose is a flag"]).unwrap();
        assert_eq!(args.text, "--verbose is a flag");
    }

    #[test]
    fn say_accepts_explicit_output_and_engine_flags() {
        let args = parse_say([
            "say",
            "Hi",
            "hi.wav",
            "--voice",
            "bf_emma",
            "--encoding",
            "float32",
            "--normalize",
            "0.9",
        ])
        .unwrap();
        assert_eq!(args.output, PathBuf::from("hi.wav"));
        let settings = args.engine.settings().unwrap();
        assert_eq!(settings.voice, "bf_emma");
        assert_eq!(settings.encoding, SampleEncoding::Float32);
        assert_eq!(settings.normalize_peak, Some(0.9));
    }

    #[test]
    fn help_exits_successfully() {
        let exit = parse_say(["say", "--help"]).unwrap_err();
        assert_eq!(exit.code, 0);
    }

    #[test]
    fn invalid_speed_is_rejected_by_settings() {
        let args = parse_say(["say", "Hi", "--speed", "5"]).unwrap();
        assert!(args.engine.settings().is_err());
    }

    #[test]
    fn narrate_runs_without_arguments() {
        let args = parse_narrate(["narrate"]).unwrap();
        assert_eq!(args.output_dir, PathBuf::from("scene_audio"));
        assert!(args.scenes.is_none());
        assert_eq!(args.scene_table().unwrap(), SceneTable::default());
    }

    #[test]
    fn preview_truncates_long_text() {
        let short = "a".repeat(80);
        assert_eq!(preview(&short), short);

        let long = "é".repeat(100);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), 80);
    }
}
