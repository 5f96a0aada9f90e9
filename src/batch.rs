//! Batch narration: one WAV file per scene, written in table order.

use std::path::{Path, PathBuf};

use crate::postprocess::PostProcessor;
use crate::scenes::{Scene, SceneTable};
use crate::{Error, Narrator, Result, SampleEncoding, SpeechEngine};

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "scene_audio";

/// A file written for one scene.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub scene: String,
    pub path: PathBuf,
    pub samples: usize,
    pub duration_secs: f64,
}

impl GeneratedFile {
    /// File name without the directory, e.g. `intro.wav`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Outcome of a completed batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub output_dir: PathBuf,
    pub files: Vec<GeneratedFile>,
}

impl BatchReport {
    pub fn total_duration_secs(&self) -> f64 {
        self.files.iter().map(|f| f.duration_secs).sum()
    }
}

/// Progress notifications emitted while a batch runs.
#[derive(Debug, Clone, Copy)]
pub enum BatchEvent<'a> {
    Started {
        index: usize,
        total: usize,
        scene: &'a Scene,
    },
    Finished {
        index: usize,
        total: usize,
        file: &'a GeneratedFile,
    },
}

/// Narrate every scene in `scenes` into `output_dir`.
///
/// The directory is created if missing and existing files are overwritten.
/// Scenes are processed one at a time; the first failure stops the run and
/// is returned wrapped in [`Error::Scene`]. Files written before the failure
/// are left in place.
pub fn generate_scenes<E, P, F>(
    narrator: &mut Narrator<E, P>,
    scenes: &SceneTable,
    output_dir: &Path,
    encoding: SampleEncoding,
    mut on_progress: F,
) -> Result<BatchReport>
where
    E: SpeechEngine,
    P: PostProcessor,
    F: FnMut(BatchEvent<'_>),
{
    if !output_dir.is_dir() {
        log::info!("Creating output directory {}", output_dir.display());
    }
    std::fs::create_dir_all(output_dir).map_err(|source| Error::CreateOutputDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let total = scenes.len();
    let mut files = Vec::with_capacity(total);

    for (index, scene) in scenes.iter().enumerate() {
        on_progress(BatchEvent::Started {
            index,
            total,
            scene,
        });
        log::debug!("[{}/{}] Generating scene '{}'", index + 1, total, scene.name);

        let path = scene.output_path(output_dir);
        let speech = narrator
            .speak_to_file(&scene.text, &path, encoding)
            .map_err(|e| e.in_scene(&scene.name))?;

        let file = GeneratedFile {
            scene: scene.name.clone(),
            path,
            samples: speech.samples.len(),
            duration_secs: speech.duration_secs(),
        };
        log::debug!(
            "[{}/{}] Wrote {} ({:.2}s)",
            index + 1,
            total,
            file.path.display(),
            file.duration_secs
        );
        on_progress(BatchEvent::Finished {
            index,
            total,
            file: &file,
        });
        files.push(file);
    }

    Ok(BatchReport {
        output_dir: output_dir.to_path_buf(),
        files,
    })
}
