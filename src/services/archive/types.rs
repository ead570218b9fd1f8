use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tempfile::{TempDir, TempPath};

/// Supported archive format, detected from file extension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    Zip,
    SevenZ,
    Rar,
}

impl ArchiveFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "zip" => Some(Self::Zip),
            "7z" => Some(Self::SevenZ),
            "rar" => Some(Self::Rar),
            _ => None,
        }
    }
}

/// One archive entry as reported by the backing library, with the name
/// normalized to forward slashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveEntryInfo {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
}

/// Readable stream over one archive entry.
///
/// The stream owns every temp file backing it: the extracted entry, any
/// scratch extraction directory, and the staged copy of the source when the
/// source path needed a non-direct tier. They are deleted when the stream is
/// dropped, so the caller controls their lifetime by holding the stream.
pub struct EntryStream {
    reader: Box<dyn Read + Send>,
    _entry_file: Option<TempPath>,
    _extract_dir: Option<TempDir>,
    _staged_source: Option<TempPath>,
}

impl EntryStream {
    pub(super) fn new(
        reader: Box<dyn Read + Send>,
        entry_file: Option<TempPath>,
        extract_dir: Option<TempDir>,
        staged_source: Option<TempPath>,
    ) -> Self {
        Self {
            reader,
            _entry_file: entry_file,
            _extract_dir: extract_dir,
            _staged_source: staged_source,
        }
    }
}

impl std::fmt::Debug for EntryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStream")
            .field("_entry_file", &self._entry_file)
            .field("_extract_dir", &self._extract_dir)
            .field("_staged_source", &self._staged_source)
            .finish_non_exhaustive()
    }
}

impl Read for EntryStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}
