//! Scene tables: ordered name/text pairs narrated by the batch generator.
//!
//! A table is either the built-in default or a JSON file in one of two shapes:
//!
//! ```json
//! [{ "name": "intro", "text": "Welcome." }, { "name": "outro", "text": "Bye." }]
//! ```
//!
//! ```json
//! { "intro": "Welcome.", "outro": "Bye." }
//! ```
//!
//! Both shapes keep the order they are written in.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// One narration entry. `name` becomes the output file stem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scene {
    pub name: String,
    pub text: String,
}

impl Scene {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// `<name>.wav` inside `dir`.
    pub fn output_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.wav", self.name))
    }
}

/// A scene file as written, before validation. Map entries stay as pairs so
/// a repeated key reaches the duplicate check instead of replacing the first.
enum SceneFile {
    List(Vec<Scene>),
    Map(Vec<(String, serde_json::Value)>),
}

impl<'de> Deserialize<'de> for SceneFile {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(SceneFileVisitor)
    }
}

struct SceneFileVisitor;

impl<'de> Visitor<'de> for SceneFileVisitor {
    type Value = SceneFile;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a list of scenes or a map of scene names to text")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<SceneFile, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut scenes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(scene) = seq.next_element()? {
            scenes.push(scene);
        }
        Ok(SceneFile::List(scenes))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<SceneFile, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
            entries.push(entry);
        }
        Ok(SceneFile::Map(entries))
    }
}

/// Ordered, validated list of scenes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SceneTable {
    scenes: Vec<Scene>,
}

/// The Rails 8.1 Local CI video narration, used when no table is supplied.
const DEFAULT_SCENES: &[(&str, &str)] = &[
    ("title", "Rails 8.1 Local CI. Standardize your testing workflow."),
    (
        "problem",
        "Testing inconsistencies between local and CI servers cause frustration and wasted time.",
    ),
    (
        "solution",
        "Rails 8.1 introduces Local CI. One command, everywhere. No duplication.",
    ),
    (
        "demo",
        "Run bin slash ci. Setup, style checks, security audits, and tests execute in sequence with timing.",
    ),
    (
        "benefits",
        "Catch issues early. Same workflow locally and remotely. Faster development cycles.",
    ),
    (
        "cta",
        "Upgrade to Rails 8.1 today and experience standardized CI workflows.",
    ),
];

impl Default for SceneTable {
    fn default() -> Self {
        Self {
            scenes: DEFAULT_SCENES
                .iter()
                .map(|&(name, text)| Scene::new(name, text))
                .collect(),
        }
    }
}

impl SceneTable {
    /// Build a table, rejecting empty, duplicate, or path-like scene names.
    pub fn new(scenes: Vec<Scene>) -> Result<Self> {
        let mut seen = HashSet::new();
        for scene in &scenes {
            validate_name(&scene.name)?;
            if !seen.insert(scene.name.as_str()) {
                return Err(Error::InvalidScenes(format!(
                    "duplicate scene name '{}'",
                    scene.name
                )));
            }
        }
        Ok(Self { scenes })
    }

    /// Parse a table from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let scenes = match serde_json::from_str::<SceneFile>(json)? {
            SceneFile::List(scenes) => scenes,
            SceneFile::Map(map) => map
                .into_iter()
                .map(|(name, value)| match value {
                    serde_json::Value::String(text) => Ok(Scene { name, text }),
                    other => Err(Error::InvalidScenes(format!(
                        "scene '{name}' must map to a string, got {other}"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
        };
        Self::new(scenes)
    }

    /// Load a table from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        log::info!("Loading scene table from {}", path.display());
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Scene> {
        self.scenes.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenes.iter().map(|s| s.name.as_str())
    }
}

impl<'a> IntoIterator for &'a SceneTable {
    type Item = &'a Scene;
    type IntoIter = std::slice::Iter<'a, Scene>;

    fn into_iter(self) -> Self::IntoIter {
        self.scenes.iter()
    }
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = |why: &str| Err(Error::InvalidScenes(format!("scene name {name:?} {why}")));
    if name.trim().is_empty() {
        return invalid("is empty");
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return invalid("is not a plain file name");
    }
    if name.contains('\0') {
        return invalid("contains a NUL byte");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_keeps_original_order() {
        let table = SceneTable::default();
        let names: Vec<&str> = table.names().collect();
        assert_eq!(
            names,
            ["title", "problem", "solution", "demo", "benefits", "cta"]
        );
    }

    #[test]
    fn parses_list_form() {
        let table = SceneTable::from_json(
            r#"[{"name": "b", "text": "second"}, {"name": "a", "text": "first"}]"#,
        )
        .unwrap();
        let names: Vec<&str> = table.names().collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn parses_map_form_in_written_order() {
        let table =
            SceneTable::from_json(r#"{"zeta": "z", "alpha": "a", "mid": "m"}"#).unwrap();
        let scenes: Vec<&Scene> = table.iter().collect();
        assert_eq!(scenes[0], &Scene::new("zeta", "z"));
        assert_eq!(scenes[1], &Scene::new("alpha", "a"));
        assert_eq!(scenes[2], &Scene::new("mid", "m"));
    }

    #[test]
    fn rejects_repeated_map_keys() {
        let err = SceneTable::from_json(r#"{"intro": "first", "intro": "second"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidScenes(_)));
        assert!(err.to_string().contains("duplicate scene name 'intro'"));
    }

    #[test]
    fn rejects_other_json_shapes() {
        let err = SceneTable::from_json(r#""just text""#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn map_values_must_be_strings() {
        let err = SceneTable::from_json(r#"{"intro": 3}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidScenes(_)));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = SceneTable::new(vec![Scene::new("a", "x"), Scene::new("a", "y")]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_path_like_names() {
        for bad in ["", "  ", ".", "..", "../escape", "dir/file", "c:\\x"] {
            assert!(
                SceneTable::new(vec![Scene::new(bad, "text")]).is_err(),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn empty_text_is_accepted() {
        assert!(SceneTable::new(vec![Scene::new("quiet", "")]).is_ok());
    }

    #[test]
    fn output_path_appends_wav() {
        let scene = Scene::new("intro", "hi");
        assert_eq!(
            scene.output_path(Path::new("out")),
            Path::new("out").join("intro.wav")
        );
    }
}
