use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::model::KokoroError;

#[derive(Deserialize)]
struct ModelConfig {
    vocab: HashMap<String, i64>,
}

/// Read the `"vocab"` map (single IPA character -> token id) from a Kokoro `config.json`.
pub fn load_vocab(config_path: &Path) -> Result<HashMap<char, i64>, KokoroError> {
    log::info!("Loading vocabulary from {}", config_path.display());
    let content = std::fs::read_to_string(config_path)?;
    let config: ModelConfig =
        serde_json::from_str(&content).map_err(|e| KokoroError::Config(e.to_string()))?;

    config
        .vocab
        .into_iter()
        .map(|(key, id)| {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Ok((ch, id)),
                _ => Err(KokoroError::Config(format!(
                    "vocab key {key:?} is not a single character"
                ))),
            }
        })
        .collect()
}

/// Vocabulary shipped with Kokoro v1.0, used when the model directory has no `config.json`.
pub fn builtin_vocab() -> HashMap<char, i64> {
    BUILTIN.iter().copied().collect()
}

#[rustfmt::skip]
const BUILTIN: &[(char, i64)] = &[
    (';', 1), (':', 2), (',', 3), ('.', 4), ('!', 5), ('?', 6),
    ('—', 9), ('…', 10), ('"', 11), ('(', 12), (')', 13), ('\u{201c}', 14),
    ('\u{201d}', 15), (' ', 16), ('\u{0303}', 17), ('ʣ', 18), ('ʥ', 19), ('ʦ', 20),
    ('ʨ', 21), ('ᵝ', 22), ('ꭧ', 23), ('A', 24), ('I', 25), ('O', 31),
    ('Q', 33), ('S', 35), ('T', 36), ('W', 39), ('Y', 41), ('ᵊ', 42),
    ('a', 43), ('b', 44), ('c', 45), ('d', 46), ('e', 47), ('f', 48),
    ('h', 50), ('i', 51), ('j', 52), ('k', 53), ('l', 54), ('m', 55),
    ('n', 56), ('o', 57), ('p', 58), ('q', 59), ('r', 60), ('s', 61),
    ('t', 62), ('u', 63), ('v', 64), ('w', 65), ('x', 66), ('y', 67),
    ('z', 68), ('ɑ', 69), ('ɐ', 70), ('ɒ', 71), ('æ', 72), ('β', 75),
    ('ɔ', 76), ('ɕ', 77), ('ç', 78), ('ɖ', 80), ('ð', 81), ('ʤ', 82),
    ('ə', 83), ('ɚ', 85), ('ɛ', 86), ('ɜ', 87), ('ɟ', 90), ('ɡ', 92),
    ('ɥ', 99), ('ɨ', 101), ('ɪ', 102), ('ʝ', 103), ('ɯ', 110), ('ɰ', 111),
    ('ŋ', 112), ('ɳ', 113), ('ɲ', 114), ('ɴ', 115), ('ø', 116), ('ɸ', 118),
    ('θ', 119), ('œ', 120), ('ɹ', 123), ('ɾ', 125), ('ɻ', 126), ('ʁ', 128),
    ('ɽ', 129), ('ʂ', 130), ('ʃ', 131), ('ʈ', 132), ('ʧ', 133), ('ʊ', 135),
    ('ʋ', 136), ('ʌ', 138), ('ɣ', 139), ('ɤ', 140), ('χ', 142), ('ʎ', 143),
    ('ʒ', 147), ('ʔ', 148), ('ˈ', 156), ('ˌ', 157), ('ː', 158), ('ʰ', 162),
    ('ʲ', 164), ('↓', 169), ('→', 171), ('↗', 172), ('↘', 173), ('ᵻ', 177),
];

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builtin_covers_punctuation_ids() {
        let vocab = builtin_vocab();
        assert_eq!(vocab[&';'], 1);
        assert_eq!(vocab[&'?'], 6);
        assert_eq!(vocab[&' '], 16);
        assert_eq!(vocab.len(), BUILTIN.len());
    }

    #[test]
    fn loads_vocab_from_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"n_token": 178, "vocab": {"a": 43, "ə": 83}}"#).unwrap();

        let vocab = load_vocab(&path).unwrap();
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab[&'ə'], 83);
    }

    #[test]
    fn rejects_multi_character_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"vocab": {"ab": 1}}"#).unwrap();
        assert!(matches!(load_vocab(&path), Err(KokoroError::Config(_))));
    }

    #[test]
    fn missing_vocab_field_is_a_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(matches!(load_vocab(&path), Err(KokoroError::Config(_))));
    }
}
