//! narrate: generate one narration WAV file per scene.
//!
//! With no arguments the built-in scene table is written to `scene_audio/`.

use std::io;
use std::time::Instant;

use narrate::cli::{self, NarrateArgs};
use narrate::engines::kokoro;
use narrate::Result;

fn main() {
    let args = match cli::parse_narrate(std::env::args_os()) {
        Ok(args) => args,
        Err(exit) => std::process::exit(exit.report()),
    };
    cli::init_logging();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &NarrateArgs) -> Result<()> {
    let settings = args.engine.settings()?;
    let scenes = args.scene_table()?;
    log::debug!("Settings: {}", serde_json::to_string(&settings)?);

    println!("Loading Kokoro TTS from {}...", settings.model_dir.display());
    let load_start = Instant::now();
    let mut narrator = kokoro::narrator(&settings)?;
    log::info!("Model loaded in {:.2?}", load_start.elapsed());

    let start = Instant::now();
    let report = cli::narrate(
        &mut narrator,
        &scenes,
        args,
        settings.encoding,
        &mut io::stdout().lock(),
    )?;
    log::info!(
        "Generated {} files ({:.2}s of audio) in {:.2?}",
        report.files.len(),
        report.total_duration_secs(),
        start.elapsed()
    );
    Ok(())
}
