use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::model::KokoroError;

/// Style vector dimension for Kokoro.
pub const STYLE_DIM: usize = 256;

pub type StyleVector = [f32; STYLE_DIM];

const NPY_MAGIC: &[u8] = b"\x93NUMPY";

/// Per-voice style tables, indexed by phoneme token count.
pub struct VoiceStore {
    voices: HashMap<String, Vec<StyleVector>>,
}

impl VoiceStore {
    /// Read every `<voice>.npy` entry of a numpy `.npz` archive.
    pub fn load(path: &Path) -> Result<Self, KokoroError> {
        let mut archive = zip::ZipArchive::new(File::open(path)?)
            .map_err(|e| KokoroError::VoiceParse(format!("{}: {e}", path.display())))?;

        let mut voices = HashMap::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| KokoroError::VoiceParse(format!("archive entry {index}: {e}")))?;
            if entry.is_dir() {
                continue;
            }
            let entry_name = entry.name().to_string();
            let voice = entry_name.strip_suffix(".npy").unwrap_or(&entry_name);
            if voice.is_empty() {
                continue;
            }

            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| KokoroError::VoiceParse(format!("{entry_name}: {e}")))?;
            voices.insert(voice.to_string(), parse_style_table(&bytes, &entry_name)?);
        }

        log::info!("Loaded {} voices from {}", voices.len(), path.display());
        Ok(Self { voices })
    }

    /// Style row for `voice`; `row` is clamped to the table length.
    pub fn style(&self, voice: &str, row: usize) -> Result<&StyleVector, KokoroError> {
        let table = self
            .voices
            .get(voice)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| KokoroError::VoiceNotFound(voice.to_string()))?;
        Ok(&table[row.min(table.len() - 1)])
    }

    /// Voice names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.voices.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Decode a little-endian float32 `.npy` array of shape `[N, 256]`.
fn parse_style_table(data: &[u8], name: &str) -> Result<Vec<StyleVector>, KokoroError> {
    let fail = |msg: String| KokoroError::VoiceParse(format!("{name}: {msg}"));

    if data.len() < 10 || !data.starts_with(NPY_MAGIC) {
        return Err(fail("not a numpy array".to_string()));
    }
    // Format 1.x stores a u16 header length, 2.x and later a u32.
    let (header_start, header_len) = match data[6] {
        1 => (10, u16::from_le_bytes([data[8], data[9]]) as usize),
        _ if data.len() >= 12 => (
            12,
            u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize,
        ),
        major => return Err(fail(format!("truncated v{major} header"))),
    };
    let payload_start = header_start + header_len;
    let header = data
        .get(header_start..payload_start)
        .ok_or_else(|| fail(format!("header needs {payload_start} bytes, got {}", data.len())))?;

    let header = String::from_utf8_lossy(header);
    if !header.contains("'<f4'") {
        return Err(fail(format!("expected little-endian float32, header {header:?}")));
    }
    if header.contains("'fortran_order': True") {
        return Err(fail("fortran-ordered arrays are not supported".to_string()));
    }

    let payload = &data[payload_start..];
    let row_bytes = STYLE_DIM * 4;
    if payload.len() % row_bytes != 0 {
        return Err(fail(format!(
            "{} payload bytes is not a whole number of {STYLE_DIM}-wide rows",
            payload.len()
        )));
    }

    Ok(payload
        .chunks_exact(row_bytes)
        .map(|row| {
            let mut style = [0f32; STYLE_DIM];
            for (value, bytes) in style.iter_mut().zip(row.chunks_exact(4)) {
                *value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            style
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npy(rows: usize, descr: &str) -> Vec<u8> {
        let mut header =
            format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': ({rows}, 256), }}");
        while (10 + header.len() + 1) % 64 != 0 {
            header.push(' ');
        }
        header.push('\n');

        let mut data = NPY_MAGIC.to_vec();
        data.extend_from_slice(&[1, 0]);
        data.extend_from_slice(&(header.len() as u16).to_le_bytes());
        data.extend_from_slice(header.as_bytes());
        for i in 0..rows * STYLE_DIM {
            data.extend_from_slice(&(i as f32).to_le_bytes());
        }
        data
    }

    #[test]
    fn parses_rows_in_order() {
        let table = parse_style_table(&npy(3, "<f4"), "af_test.npy").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table[0][0], 0.0);
        assert_eq!(table[1][0], 256.0);
        assert_eq!(table[2][255], 767.0);
    }

    #[test]
    fn rejects_other_dtypes() {
        let err = parse_style_table(&npy(1, "<f8"), "x.npy").unwrap_err();
        assert!(err.to_string().contains("float32"));
    }

    #[test]
    fn rejects_partial_rows() {
        let mut data = npy(1, "<f4");
        data.truncate(data.len() - 4);
        assert!(parse_style_table(&data, "x.npy").is_err());
    }

    #[test]
    fn rejects_non_numpy_bytes() {
        assert!(parse_style_table(b"PK\x03\x04garbage", "x.npy").is_err());
    }

    #[test]
    fn style_row_is_clamped() {
        let mut voices = HashMap::new();
        voices.insert(
            "af_test".to_string(),
            parse_style_table(&npy(2, "<f4"), "af_test.npy").unwrap(),
        );
        let store = VoiceStore { voices };
        assert_eq!(store.style("af_test", 99).unwrap()[0], 256.0);
        assert!(matches!(
            store.style("zz_missing", 0),
            Err(KokoroError::VoiceNotFound(_))
        ));
        assert_eq!(store.names(), ["af_test"]);
    }
}
