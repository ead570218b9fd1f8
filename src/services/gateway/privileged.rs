use super::backend::{DirEntryInfo, StorageBackend};
use crate::services::access::PrivilegedState;
use crate::types::errors::{FileError, FileResult};
use chrono::{DateTime, Utc};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

/// Wire-level file primitives of the privileged IPC channel. Implemented by
/// the host platform glue; tests substitute a local double.
pub trait PrivilegedTransport: Send + Sync {
    fn state(&self) -> PrivilegedState;
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

/// Transport used when no privileged channel is wired up at all.
pub struct DisconnectedTransport;

impl PrivilegedTransport for DisconnectedTransport {
    fn state(&self) -> PrivilegedState {
        PrivilegedState::NotInstalled
    }
    fn exists(&self, _: &Path) -> io::Result<bool> {
        Err(not_connected())
    }
    fn is_file(&self, _: &Path) -> io::Result<bool> {
        Err(not_connected())
    }
    fn list_entries(&self, _: &Path) -> io::Result<Vec<DirEntryInfo>> {
        Err(not_connected())
    }
    fn delete(&self, _: &Path) -> io::Result<()> {
        Err(not_connected())
    }
    fn mkdir(&self, _: &Path) -> io::Result<()> {
        Err(not_connected())
    }
    fn rename(&self, _: &Path, _: &Path) -> io::Result<()> {
        Err(not_connected())
    }
    fn last_modified(&self, _: &Path) -> io::Result<SystemTime> {
        Err(not_connected())
    }
    fn size(&self, _: &Path) -> io::Result<u64> {
        Err(not_connected())
    }
    fn open_read(&self, _: &Path) -> io::Result<Box<dyn Read + Send>> {
        Err(not_connected())
    }
    fn create_write(&self, _: &Path) -> io::Result<Box<dyn Write + Send>> {
        Err(not_connected())
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "privileged channel not connected")
}

/// Storage tier that proxies every primitive over the privileged channel.
pub struct PrivilegedBackend {
    transport: Arc<dyn PrivilegedTransport>,
}

impl PrivilegedBackend {
    pub fn new(transport: Arc<dyn PrivilegedTransport>) -> Self {
        Self { transport }
    }

    /// Channel liveness is re-checked per call; it can die between calls.
    fn guard(&self) -> FileResult<()> {
        match self.transport.state() {
            PrivilegedState::Ready => Ok(()),
            other => Err(FileError::IpcDisconnected(format!(
                "privileged channel unavailable: {other:?}"
            ))),
        }
    }
}

fn map_ipc(error: io::Error, path: &Path, fallback: fn(String) -> FileError) -> FileError {
    match error.kind() {
        io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset => {
            FileError::IpcDisconnected(format!("{}: {error}", path.display()))
        }
        _ => FileError::from_io(&error, path, fallback),
    }
}

impl StorageBackend for PrivilegedBackend {
    fn exists(&self, path: &Path) -> FileResult<bool> {
        self.guard()?;
        self.transport
            .exists(path)
            .map_err(|e| map_ipc(e, path, FileError::ReadFailed))
    }

    fn is_file(&self, path: &Path) -> FileResult<bool> {
        self.guard()?;
        self.transport
            .is_file(path)
            .map_err(|e| map_ipc(e, path, FileError::ReadFailed))
    }

    fn list_entries(&self, dir: &Path) -> FileResult<Vec<DirEntryInfo>> {
        self.guard()?;
        self.transport
            .list_entries(dir)
            .map_err(|e| map_ipc(e, dir, FileError::ReadFailed))
    }

    fn delete(&self, path: &Path) -> FileResult<()> {
        self.guard()?;
        self.transport
            .delete(path)
            .map_err(|e| map_ipc(e, path, FileError::DeleteFailed))
    }

    fn mkdir(&self, path: &Path) -> FileResult<()> {
        self.guard()?;
        self.transport
            .mkdir(path)
            .map_err(|e| map_ipc(e, path, FileError::WriteFailed))
    }

    fn rename(&self, from: &Path, to: &Path) -> FileResult<()> {
        self.guard()?;
        self.transport
            .rename(from, to)
            .map_err(|e| map_ipc(e, to, FileError::CopyFailed))
    }

    fn last_modified(&self, path: &Path) -> FileResult<DateTime<Utc>> {
        self.guard()?;
        self.transport
            .last_modified(path)
            .map(DateTime::<Utc>::from)
            .map_err(|e| map_ipc(e, path, FileError::ReadFailed))
    }

    fn size(&self, path: &Path) -> FileResult<u64> {
        self.guard()?;
        self.transport
            .size(path)
            .map_err(|e| map_ipc(e, path, FileError::ReadFailed))
    }

    fn open_read(&self, path: &Path) -> FileResult<Box<dyn Read + Send>> {
        self.guard()?;
        self.transport
            .open_read(path)
            .map_err(|e| map_ipc(e, path, FileError::ReadFailed))
    }

    fn create_write(&self, path: &Path) -> FileResult<Box<dyn Write + Send>> {
        self.guard()?;
        self.transport
            .create_write(path)
            .map_err(|e| map_ipc(e, path, FileError::WriteFailed))
    }
}
