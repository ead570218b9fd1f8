use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// File-level failures surfaced by the gateway. Every backend error is
/// folded into one of these kinds before it crosses the gateway boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Copy failed: {0}")]
    CopyFailed(String),
    #[error("Delete failed: {0}")]
    DeleteFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Read failed: {0}")]
    ReadFailed(String),
    #[error("Privileged service disconnected: {0}")]
    IpcDisconnected(String),
    #[error("File error: {0}")]
    Unknown(String),
}

impl FileError {
    /// Map an `std::io::Error` into the closest typed kind, falling back to
    /// the operation-specific kind produced by `fallback`.
    pub fn from_io(
        error: &std::io::Error,
        path: &Path,
        fallback: fn(String) -> FileError,
    ) -> FileError {
        let detail = format!("{}: {error}", path.display());
        match error.kind() {
            std::io::ErrorKind::NotFound => FileError::NotFound(detail),
            std::io::ErrorKind::PermissionDenied => FileError::PermissionDenied(detail),
            _ => fallback(detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    #[error("Extraction failed: {0}")]
    ExtractFailed(String),
    #[error("Wrong password: {0}")]
    WrongPassword(String),
    #[error("Archive is encrypted and needs a password: {0}")]
    EncryptedNeedPassword(String),
    #[error("Corrupted archive: {0}")]
    CorruptedArchive(String),
    #[error("Archive is empty: {0}")]
    EmptyArchive(String),
    #[error("Entry not found in archive: {0}")]
    ItemNotFound(String),
    #[error("Archive error: {0}")]
    Unknown(String),
}

impl ArchiveError {
    /// Classify a free-text library error into the closest typed kind.
    ///
    /// Archive backends report password and corruption conditions as plain
    /// message text, so this is substring matching and can misclassify when
    /// a library changes its wording.
    pub fn classify(message: impl Into<String>, had_password: bool) -> ArchiveError {
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("password") || lower.contains("encrypted") || lower.contains("decrypt") {
            if had_password {
                return ArchiveError::WrongPassword(message);
            }
            return ArchiveError::EncryptedNeedPassword(message);
        }
        if lower.contains("corrupt")
            || lower.contains("malformed")
            || lower.contains("unexpected eof")
            || lower.contains("checksum")
            || lower.contains("invalid")
        {
            return ArchiveError::CorruptedArchive(message);
        }
        if lower.contains("not found") || lower.contains("no such") {
            return ArchiveError::ItemNotFound(message);
        }
        ArchiveError::Unknown(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModError {
    #[error("File missing: {0}")]
    FileMissing(String),
    #[error("Invalid mod data: {0}")]
    InvalidModData(String),
    #[error("MD5 calculation failed: {0}")]
    Md5CalculationFailed(String),
    #[error("Copy failed: {0}")]
    CopyFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Read failed: {0}")]
    ReadFailed(String),
    #[error("Create directory failed: {0}")]
    CreateDirectoryFailed(String),
    #[error("Backup failed: {0}")]
    BackupFailed(String),
    #[error("Enable failed: {0}")]
    EnableFailed(String),
    #[error("Disable failed: {0}")]
    DisableFailed(String),
    #[error("Restore failed: {0}")]
    RestoreFailed(String),
    #[error("Invalid mod structure: {0}")]
    InvalidStructure(String),
    #[error("Decrypt failed: {0}")]
    DecryptFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    #[error("Storage permission denied for {0}")]
    StoragePermissionDenied(String),
    #[error("No granted document tree covers {0}")]
    UriPermissionNotGranted(String),
    #[error("Privileged service is not installed")]
    PrivilegedServiceNotInstalled,
    #[error("Privileged service is not running")]
    PrivilegedServiceNotRunning,
    #[error("Privileged service permission denied")]
    PrivilegedPermissionDenied,
}

macro_rules! serialize_as_display {
    ($($ty:ty),+ $(,)?) => {
        $(impl Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.to_string().as_ref())
            }
        })+
    };
}

serialize_as_display!(FileError, ArchiveError, ModError, PermissionError);

pub type FileResult<T> = Result<T, FileError>;
pub type ArchiveResult<T> = Result<T, ArchiveError>;
pub type ModResult<T> = Result<T, ModError>;

#[cfg(test)]
#[path = "tests/errors_tests.rs"]
mod tests;
