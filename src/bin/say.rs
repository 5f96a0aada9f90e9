//! say: synthesize one utterance to a WAV file.
//!
//! ```text
//! say "Hello world!" hello.wav
//! say "This is a test"            # saves to output.wav
//! ```

use std::io;
use std::time::Instant;

use narrate::cli::{self, SayArgs};
use narrate::engines::kokoro;
use narrate::Result;

fn main() {
    let args = match cli::parse_say(std::env::args_os()) {
        Ok(args) => args,
        Err(exit) => std::process::exit(exit.report()),
    };
    cli::init_logging();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &SayArgs) -> Result<()> {
    let settings = args.engine.settings()?;

    println!("Loading Kokoro TTS from {}...", settings.model_dir.display());
    let load_start = Instant::now();
    let mut narrator = kokoro::narrator(&settings)?;
    log::info!("Model loaded in {:.2?}", load_start.elapsed());

    cli::say(&mut narrator, args, settings.encoding, &mut io::stdout().lock())?;
    Ok(())
}
