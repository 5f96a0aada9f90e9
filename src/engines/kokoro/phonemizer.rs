//! Text to Kokoro token ids, via espeak-ng IPA output.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::model::KokoroError;

/// Where to find espeak-ng. `None` fields fall back to the system install.
#[derive(Debug, Clone, Default)]
pub struct EspeakConfig {
    pub bin_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
}

impl EspeakConfig {
    fn command(&self) -> Command {
        let mut cmd = match &self.bin_path {
            Some(bin) => Command::new(bin),
            None => Command::new("espeak-ng"),
        };
        if let Some(data) = &self.data_path {
            cmd.env("ESPEAK_DATA_PATH", data);
        }
        cmd
    }

    /// Run espeak-ng over newline-separated `input`, returning its IPA output.
    fn ipa(&self, input: &str, lang: &str) -> Result<String, KokoroError> {
        let mut child = self
            .command()
            .args(["--ipa", "--stdin", "-q", "-v", lang])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => KokoroError::EspeakNotFound,
                _ => KokoroError::Io(e),
            })?;

        // stdin is fed from its own thread while stdout drains, so neither
        // pipe can fill up and stall the child.
        let stdin = child.stdin.take();
        let (output, written) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || -> std::io::Result<()> {
                if let Some(mut stdin) = stdin {
                    // espeak-ng drops the final token of an unterminated last line.
                    stdin.write_all(input.as_bytes())?;
                    if !input.ends_with('\n') {
                        stdin.write_all(b"\n")?;
                    }
                }
                Ok(())
            });
            let output = child.wait_with_output();
            (output, writer.join())
        });

        let output = output?;
        if !output.status.success() {
            return Err(KokoroError::PhonemizerFailed(format!(
                "espeak-ng exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        written.map_err(|_| {
            KokoroError::PhonemizerFailed("espeak-ng input writer panicked".to_string())
        })??;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// espeak-ng language for a Kokoro voice, taken from its two-letter prefix
/// (`af_heart` -> `en-us`). Unknown prefixes fall back to American English.
pub fn voice_lang(voice: &str) -> &'static str {
    match voice.get(..2).unwrap_or(voice) {
        "bf" | "bm" => "en-gb",
        "ef" | "em" => "es",
        "ff" => "fr",
        "hf" | "hm" => "hi",
        "if" | "im" => "it",
        "jf" | "jm" => "ja",
        "pf" | "pm" => "pt-br",
        "zf" | "zm" => "cmn",
        _ => "en-us",
    }
}

/// A run of words, or a punctuation mark that is passed to the model directly.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Words(String),
    Mark(char),
}

/// Converts text into token ids for one language.
pub struct Phonemizer<'a> {
    espeak: &'a EspeakConfig,
    lang: &'a str,
    vocab: &'a HashMap<char, i64>,
}

impl<'a> Phonemizer<'a> {
    pub fn new(espeak: &'a EspeakConfig, lang: &'a str, vocab: &'a HashMap<char, i64>) -> Self {
        Self {
            espeak,
            lang,
            vocab,
        }
    }

    /// Token ids for `text`. Characters outside the vocabulary are dropped.
    pub fn tokenize(&self, text: &str) -> Result<Vec<i64>, KokoroError> {
        let pieces = split_pieces(text);
        let words: Vec<&str> = pieces
            .iter()
            .filter_map(|piece| match piece {
                Piece::Words(w) => Some(w.as_str()),
                Piece::Mark(_) => None,
            })
            .collect();
        let mut phonemized = self.phonemize_all(&words)?.into_iter();

        let mut ids = Vec::new();
        for piece in &pieces {
            match piece {
                Piece::Words(_) => {
                    if let Some(word_ids) = phonemized.next() {
                        ids.extend(word_ids);
                    }
                }
                Piece::Mark(mark) => ids.extend(self.vocab.get(mark).copied()),
            }
        }
        Ok(ids)
    }

    /// Phonemize every run in one espeak-ng call, one line per run.
    fn phonemize_all(&self, runs: &[&str]) -> Result<Vec<Vec<i64>>, KokoroError> {
        if runs.is_empty() {
            return Ok(Vec::new());
        }
        let output = self.espeak.ipa(&runs.join("\n"), self.lang)?;
        let lines: Vec<&str> = output.lines().collect();
        if lines.len() == runs.len() {
            return Ok(lines.iter().map(|line| self.ipa_ids(line)).collect());
        }

        log::debug!(
            "espeak-ng returned {} lines for {} runs, phonemizing one at a time",
            lines.len(),
            runs.len()
        );
        runs.iter()
            .map(|run| Ok(self.ipa_ids(&self.espeak.ipa(run, self.lang)?)))
            .collect()
    }

    fn ipa_ids(&self, ipa: &str) -> Vec<i64> {
        ipa.lines()
            .flat_map(|line| line.trim().chars())
            .filter(|&ch| ch != '_')
            .filter_map(|ch| self.vocab.get(&ch).copied())
            .collect()
    }
}

/// Punctuation that ends a word run, mapped to the mark fed to the model.
fn boundary_mark(ch: char) -> Option<char> {
    match ch {
        '.' | '!' | '?' | ',' | ';' | ':' | '—' | '…' | '"' | '(' | ')' | '\u{201c}'
        | '\u{201d}' => Some(ch),
        '\n' | '\r' => Some('.'),
        _ => None,
    }
}

/// True for `.` or `,` sitting between two digits, as in `2.0` or `1,000`.
fn is_digit_separator(prev: Option<char>, ch: char, next: Option<char>) -> bool {
    matches!(ch, '.' | ',')
        && prev.is_some_and(|c| c.is_ascii_digit())
        && next.is_some_and(|c| c.is_ascii_digit())
}

fn split_pieces(text: &str) -> Vec<Piece> {
    let chars: Vec<char> = text.chars().collect();
    let mut pieces = Vec::new();
    let mut run = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        match boundary_mark(ch) {
            Some(mark) if !is_digit_separator(prev, ch, next) => {
                flush_run(&mut run, &mut pieces);
                pieces.push(Piece::Mark(mark));
            }
            _ if ch.is_whitespace() => {
                if !run.is_empty() && !run.ends_with(' ') {
                    run.push(' ');
                }
            }
            _ => run.push(ch),
        }
    }
    flush_run(&mut run, &mut pieces);
    pieces
}

fn flush_run(run: &mut String, pieces: &mut Vec<Piece>) {
    let words = run.trim();
    if !words.is_empty() {
        pieces.push(Piece::Words(words.to_string()));
    }
    run.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::kokoro::vocab::builtin_vocab;

    fn words(s: &str) -> Piece {
        Piece::Words(s.to_string())
    }

    fn espeak_available() -> bool {
        Command::new("espeak-ng").arg("--version").output().is_ok()
    }

    #[test]
    fn splits_words_and_marks() {
        assert_eq!(
            split_pieces("Hello, world. Testing!"),
            vec![
                words("Hello"),
                Piece::Mark(','),
                words("world"),
                Piece::Mark('.'),
                words("Testing"),
                Piece::Mark('!'),
            ]
        );
    }

    #[test]
    fn digit_separators_stay_inside_words() {
        assert_eq!(
            split_pieces("Version 2.0 reached 1,000 users."),
            vec![words("Version 2.0 reached 1,000 users"), Piece::Mark('.')]
        );
        assert_eq!(
            split_pieces("Value 2, next"),
            vec![words("Value 2"), Piece::Mark(','), words("next")]
        );
    }

    #[test]
    fn newlines_become_full_stops_and_spaces_collapse() {
        assert_eq!(
            split_pieces("one   two\nthree"),
            vec![words("one two"), Piece::Mark('.'), words("three")]
        );
        assert!(split_pieces("   ").is_empty());
    }

    #[test]
    fn voice_prefix_selects_language() {
        assert_eq!(voice_lang("af_heart"), "en-us");
        assert_eq!(voice_lang("bf_emma"), "en-gb");
        assert_eq!(voice_lang("zf_xiaobei"), "cmn");
        assert_eq!(voice_lang("x"), "en-us");
    }

    #[test]
    fn ipa_ids_skip_unknown_and_ties() {
        let vocab = builtin_vocab();
        let espeak = EspeakConfig::default();
        let phonemizer = Phonemizer::new(&espeak, "en-us", &vocab);
        let ids = phonemizer.ipa_ids("h_ə#\n");
        assert_eq!(ids, vec![vocab[&'h'], vocab[&'ə']]);
    }

    #[test]
    fn marks_only_text_needs_no_espeak() {
        let vocab = builtin_vocab();
        let espeak = EspeakConfig {
            bin_path: Some(PathBuf::from("/nonexistent/espeak-ng")),
            data_path: None,
        };
        let ids = Phonemizer::new(&espeak, "en-us", &vocab)
            .tokenize("?!")
            .unwrap();
        assert_eq!(ids, vec![6, 5]);
    }

    #[test]
    fn missing_binary_is_reported() {
        let vocab = builtin_vocab();
        let espeak = EspeakConfig {
            bin_path: Some(PathBuf::from("/nonexistent/espeak-ng")),
            data_path: None,
        };
        let err = Phonemizer::new(&espeak, "en-us", &vocab)
            .tokenize("hello")
            .unwrap_err();
        assert!(matches!(err, KokoroError::EspeakNotFound));
    }

    #[test]
    fn long_input_is_phonemized_in_one_pass() {
        if !espeak_available() {
            return;
        }
        let vocab = builtin_vocab();
        let espeak = EspeakConfig::default();
        // Far more IPA output than a pipe buffer holds.
        let text = "hello world ".repeat(20_000);
        let ids = Phonemizer::new(&espeak, "en-us", &vocab)
            .tokenize(&text)
            .expect("espeak-ng should phonemize");
        assert!(ids.len() > 100_000);
    }

    #[test]
    fn keeps_terminal_schwa() {
        if !espeak_available() {
            return;
        }
        let vocab = builtin_vocab();
        let espeak = EspeakConfig::default();
        let ids = Phonemizer::new(&espeak, "en-us", &vocab)
            .tokenize("America")
            .expect("espeak-ng should phonemize");
        assert_eq!(ids.last(), vocab.get(&'ə'));
    }
}
