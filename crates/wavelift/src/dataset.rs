//! Directory-backed recording source.
//!
//! A dataset is a flat directory of WAV recordings, addressed by index in
//! filename order. A sibling `.txt` file with the same stem, when present,
//! supplies the transcript used in log lines and artifact labels.

use std::path::{Path, PathBuf};

use crate::audio::{parse_wav_bytes, Waveform};
use crate::InputError;

#[derive(Debug, Clone)]
pub struct Recording {
    pub transcript: Option<String>,
    pub waveform: Waveform,
}

#[derive(Debug)]
pub struct RecordingStore {
    entries: Vec<PathBuf>,
}

impl RecordingStore {
    /// Scan `dir` for WAV files. The listing is sorted by filename so
    /// indices are stable across runs.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, InputError> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            let is_wav = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
            if is_wav {
                entries.push(path);
            }
        }
        entries.sort();
        tracing::debug!(
            dir = %dir.as_ref().display(),
            count = entries.len(),
            "scanned recording directory"
        );
        Ok(Self { entries })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Recording, InputError> {
        let path = self
            .entries
            .get(index)
            .ok_or(InputError::IndexOutOfRange {
                index,
                count: self.entries.len(),
            })?;

        let bytes = std::fs::read(path)?;
        let waveform = parse_wav_bytes(&bytes)?;

        let transcript = std::fs::read_to_string(path.with_extension("txt"))
            .ok()
            .map(|t| t.trim().to_string());

        Ok(Recording {
            transcript,
            waveform,
        })
    }
}
