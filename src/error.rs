use std::path::PathBuf;

/// Errors produced while synthesizing and writing narration.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid scene table: {0}")]
    InvalidScenes(String),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Failed to create output directory {}: {source}", .path.display())]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Scene '{name}' failed: {source}")]
    Scene {
        name: String,
        #[source]
        source: Box<Error>,
    },
    /// Failure reported by an engine that has no dedicated variant.
    #[error("Speech engine error: {0}")]
    Engine(String),
    #[cfg(feature = "kokoro")]
    #[error(transparent)]
    Kokoro(#[from] crate::engines::kokoro::KokoroError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Attach the scene currently being generated to an error.
    pub fn in_scene(self, name: &str) -> Self {
        Error::Scene {
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}
