use super::backend::{DirEntryInfo, StorageBackend};
use crate::types::errors::{FileError, FileResult};
use chrono::{DateTime, Utc};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

/// File primitives over a granted scoped document tree. The host platform
/// glue translates these to its document API; tests substitute a local
/// double rooted in a temp directory.
pub trait DocumentTreeProvider: Send + Sync {
    fn exists(&self, path: &Path) -> io::Result<bool>;
    fn is_file(&self, path: &Path) -> io::Result<bool>;
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>>;
    fn delete(&self, path: &Path) -> io::Result<()>;
    fn mkdir(&self, path: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn last_modified(&self, path: &Path) -> io::Result<SystemTime>;
    fn size(&self, path: &Path) -> io::Result<u64>;
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;
    fn create_write(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;
}

/// Provider used when no document-tree glue is wired up.
pub struct NoTreeProvider;

impl DocumentTreeProvider for NoTreeProvider {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        Err(no_provider(path))
    }
    fn is_file(&self, path: &Path) -> io::Result<bool> {
        Err(no_provider(path))
    }
    fn list_entries(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        Err(no_provider(path))
    }
    fn delete(&self, path: &Path) -> io::Result<()> {
        Err(no_provider(path))
    }
    fn mkdir(&self, path: &Path) -> io::Result<()> {
        Err(no_provider(path))
    }
    fn rename(&self, from: &Path, _to: &Path) -> io::Result<()> {
        Err(no_provider(from))
    }
    fn last_modified(&self, path: &Path) -> io::Result<SystemTime> {
        Err(no_provider(path))
    }
    fn size(&self, path: &Path) -> io::Result<u64> {
        Err(no_provider(path))
    }
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Err(no_provider(path))
    }
    fn create_write(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        Err(no_provider(path))
    }
}

fn no_provider(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("no document tree provider for {}", path.display()),
    )
}

/// Storage tier backed by a granted scoped tree.
pub struct TreeBackend {
    provider: Arc<dyn DocumentTreeProvider>,
}

impl TreeBackend {
    pub fn new(provider: Arc<dyn DocumentTreeProvider>) -> Self {
        Self { provider }
    }
}

impl StorageBackend for TreeBackend {
    fn exists(&self, path: &Path) -> FileResult<bool> {
        self.provider
            .exists(path)
            .map_err(|e| FileError::from_io(&e, path, FileError::ReadFailed))
    }

    fn is_file(&self, path: &Path) -> FileResult<bool> {
        self.provider
            .is_file(path)
            .map_err(|e| FileError::from_io(&e, path, FileError::ReadFailed))
    }

    fn list_entries(&self, dir: &Path) -> FileResult<Vec<DirEntryInfo>> {
        self.provider
            .list_entries(dir)
            .map_err(|e| FileError::from_io(&e, dir, FileError::ReadFailed))
    }

    fn delete(&self, path: &Path) -> FileResult<()> {
        self.provider
            .delete(path)
            .map_err(|e| FileError::from_io(&e, path, FileError::DeleteFailed))
    }

    fn mkdir(&self, path: &Path) -> FileResult<()> {
        self.provider
            .mkdir(path)
            .map_err(|e| FileError::from_io(&e, path, FileError::WriteFailed))
    }

    fn rename(&self, from: &Path, to: &Path) -> FileResult<()> {
        self.provider
            .rename(from, to)
            .map_err(|e| FileError::from_io(&e, to, FileError::CopyFailed))
    }

    fn last_modified(&self, path: &Path) -> FileResult<DateTime<Utc>> {
        self.provider
            .last_modified(path)
            .map(DateTime::<Utc>::from)
            .map_err(|e| FileError::from_io(&e, path, FileError::ReadFailed))
    }

    fn size(&self, path: &Path) -> FileResult<u64> {
        self.provider
            .size(path)
            .map_err(|e| FileError::from_io(&e, path, FileError::ReadFailed))
    }

    fn open_read(&self, path: &Path) -> FileResult<Box<dyn Read + Send>> {
        self.provider
            .open_read(path)
            .map_err(|e| FileError::from_io(&e, path, FileError::ReadFailed))
    }

    fn create_write(&self, path: &Path) -> FileResult<Box<dyn Write + Send>> {
        self.provider
            .create_write(path)
            .map_err(|e| FileError::from_io(&e, path, FileError::WriteFailed))
    }
}
