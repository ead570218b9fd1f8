use crate::types::errors::{FileError, FileResult};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// One directory listing row, tier-agnostic.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DirEntryInfo {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub size: u64,
}

/// Uniform file primitives implemented once per access tier. The gateway
/// picks an implementation per call; nothing below this trait may let an
/// `std::io::Error` escape raw.
pub trait StorageBackend: Send + Sync {
    fn exists(&self, path: &Path) -> FileResult<bool>;
    fn is_file(&self, path: &Path) -> FileResult<bool>;
    fn list_entries(&self, dir: &Path) -> FileResult<Vec<DirEntryInfo>>;
    fn delete(&self, path: &Path) -> FileResult<()>;
    fn mkdir(&self, path: &Path) -> FileResult<()>;
    fn rename(&self, from: &Path, to: &Path) -> FileResult<()>;
    fn last_modified(&self, path: &Path) -> FileResult<DateTime<Utc>>;
    fn size(&self, path: &Path) -> FileResult<u64>;
    fn open_read(&self, path: &Path) -> FileResult<Box<dyn Read + Send>>;
    fn create_write(&self, path: &Path) -> FileResult<Box<dyn Write + Send>>;

    /// Same-tier copy. Backends with a native fast path override this.
    fn copy_within(&self, from: &Path, to: &Path) -> FileResult<u64> {
        let mut reader = self.open_read(from)?;
        let mut writer = self.create_write(to)?;
        std::io::copy(&mut reader, &mut writer)
            .map_err(|e| FileError::from_io(&e, to, FileError::CopyFailed))
    }
}

/// Plain `std::fs` tier for the app sandbox and legitimately writable
/// shared paths.
pub struct DirectBackend;

impl StorageBackend for DirectBackend {
    fn exists(&self, path: &Path) -> FileResult<bool> {
        Ok(path.exists())
    }

    fn is_file(&self, path: &Path) -> FileResult<bool> {
        Ok(path.is_file())
    }

    fn list_entries(&self, dir: &Path) -> FileResult<Vec<DirEntryInfo>> {
        let read = fs::read_dir(dir).map_err(|e| FileError::from_io(&e, dir, FileError::ReadFailed))?;
        let mut entries = Vec::new();
        for entry in read {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {}: {e}", dir.display());
                    continue;
                }
            };
            let path = entry.path();
            let meta = entry
                .metadata()
                .map_err(|e| FileError::from_io(&e, &path, FileError::ReadFailed))?;
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().to_string(),
                path,
                is_dir: meta.is_dir(),
                size: if meta.is_dir() { 0 } else { meta.len() },
            });
        }
        Ok(entries)
    }

    fn delete(&self, path: &Path) -> FileResult<()> {
        let result = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| FileError::from_io(&e, path, FileError::DeleteFailed))
    }

    fn mkdir(&self, path: &Path) -> FileResult<()> {
        fs::create_dir_all(path).map_err(|e| FileError::from_io(&e, path, FileError::WriteFailed))
    }

    fn rename(&self, from: &Path, to: &Path) -> FileResult<()> {
        crate::services::fs_utils::file_utils::rename_cross_drive_fallback(from, to)
            .map_err(|e| FileError::from_io(&e, to, FileError::CopyFailed))
    }

    fn last_modified(&self, path: &Path) -> FileResult<DateTime<Utc>> {
        let meta =
            fs::metadata(path).map_err(|e| FileError::from_io(&e, path, FileError::ReadFailed))?;
        let modified = meta
            .modified()
            .map_err(|e| FileError::from_io(&e, path, FileError::ReadFailed))?;
        Ok(DateTime::<Utc>::from(modified))
    }

    fn size(&self, path: &Path) -> FileResult<u64> {
        fs::metadata(path)
            .map(|m| m.len())
            .map_err(|e| FileError::from_io(&e, path, FileError::ReadFailed))
    }

    fn open_read(&self, path: &Path) -> FileResult<Box<dyn Read + Send>> {
        let file =
            fs::File::open(path).map_err(|e| FileError::from_io(&e, path, FileError::ReadFailed))?;
        Ok(Box::new(file))
    }

    fn create_write(&self, path: &Path) -> FileResult<Box<dyn Write + Send>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| FileError::from_io(&e, parent, FileError::WriteFailed))?;
        }
        let file = fs::File::create(path)
            .map_err(|e| FileError::from_io(&e, path, FileError::WriteFailed))?;
        Ok(Box::new(file))
    }

    fn copy_within(&self, from: &Path, to: &Path) -> FileResult<u64> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| FileError::from_io(&e, parent, FileError::WriteFailed))?;
        }
        fs::copy(from, to).map_err(|e| FileError::from_io(&e, to, FileError::CopyFailed))
    }
}
