//! Tier-aware archive gateway.
//!
//! Archive libraries only speak direct file I/O, so any source whose path
//! resolves to a privileged or scoped-tree tier is first staged into a
//! private temp copy. Staged copies are deleted on every exit path; the one
//! exception is `open_entry_stream`, where temp-file ownership transfers
//! into the returned stream and ends when the caller drops it.

pub mod types;

mod extract;
mod list;
mod password;
mod stream;

use crate::services::access::AccessTier;
use crate::services::gateway::FileGateway;
use crate::types::errors::{ArchiveError, ArchiveResult};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use types::{ArchiveEntryInfo, ArchiveFormat, EntryStream};

const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "7z", "rar"];

pub struct ArchiveGateway {
    gateway: Arc<FileGateway>,
    staging_root: PathBuf,
}

/// A usable local path for an archive: either the original (direct tier) or
/// a staged temp copy that deletes itself on drop.
struct StagedArchive {
    local: PathBuf,
    temp: Option<TempPath>,
}

impl ArchiveGateway {
    pub fn new(gateway: Arc<FileGateway>, staging_root: PathBuf) -> Self {
        Self {
            gateway,
            staging_root,
        }
    }

    pub fn is_archive(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| ARCHIVE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    fn format_of(path: &Path) -> ArchiveResult<ArchiveFormat> {
        ArchiveFormat::from_path(path).ok_or_else(|| {
            ArchiveError::Unknown(format!("Unsupported archive format: {}", path.display()))
        })
    }

    /// Scratch extractions and staged copies all land under the staging
    /// root, which may not exist yet on first use.
    fn ensure_staging(&self) -> ArchiveResult<()> {
        fs::create_dir_all(&self.staging_root)
            .map_err(|e| ArchiveError::Unknown(format!("Failed to create staging root: {e}")))
    }

    /// Stage the archive into the private scratch area when its tier rules
    /// out direct library access.
    fn stage(&self, path: &Path) -> ArchiveResult<StagedArchive> {
        if self.gateway.tier_of(path) == AccessTier::DirectFile {
            return Ok(StagedArchive {
                local: path.to_path_buf(),
                temp: None,
            });
        }

        let mut temp = tempfile::Builder::new()
            .prefix("staged_")
            .tempfile_in(&self.staging_root)
            .map_err(|e| ArchiveError::Unknown(format!("Failed to create staging file: {e}")))?;

        let mut reader = self
            .gateway
            .open_read(path)
            .map_err(|e| ArchiveError::Unknown(format!("Failed to stage archive: {e}")))?;
        io::copy(&mut reader, &mut temp)
            .map_err(|e| ArchiveError::Unknown(format!("Failed to stage archive: {e}")))?;

        log::debug!("Staged {} for archive access", path.display());
        Ok(StagedArchive {
            local: temp.path().to_path_buf(),
            temp: Some(temp.into_temp_path()),
        })
    }

    pub fn list_entries(
        &self,
        path: &Path,
        password: Option<&str>,
    ) -> ArchiveResult<Vec<ArchiveEntryInfo>> {
        let format = Self::format_of(path)?;
        self.ensure_staging()?;
        let staged = self.stage(path)?;
        list::list_entries(&staged.local, format, password, &self.staging_root)
    }

    pub fn extract_all(
        &self,
        path: &Path,
        dest: &Path,
        password: Option<&str>,
    ) -> ArchiveResult<usize> {
        let format = Self::format_of(path)?;
        self.ensure_staging()?;
        let staged = self.stage(path)?;
        extract::extract_all(&staged.local, format, dest, password)
    }

    pub fn extract_subset(
        &self,
        path: &Path,
        dest: &Path,
        names: &[String],
        password: Option<&str>,
    ) -> ArchiveResult<Vec<PathBuf>> {
        let format = Self::format_of(path)?;
        self.ensure_staging()?;
        let staged = self.stage(path)?;
        extract::extract_subset(
            &staged.local,
            format,
            dest,
            names,
            password,
            &self.staging_root,
        )
    }

    /// Open one entry as a readable stream. Temp files backing the stream
    /// (including a staged source copy) live until the stream is dropped.
    pub fn open_entry_stream(
        &self,
        path: &Path,
        entry_name: &str,
        password: Option<&str>,
    ) -> ArchiveResult<EntryStream> {
        let format = Self::format_of(path)?;
        self.ensure_staging()?;
        let staged = self.stage(path)?;
        stream::open_entry(
            &staged.local,
            format,
            entry_name,
            password,
            &self.staging_root,
            staged.temp,
        )
    }

    /// Read one entry fully into memory. Intended for small cosmetic assets.
    pub fn read_entry_bytes(
        &self,
        path: &Path,
        entry_name: &str,
        password: Option<&str>,
    ) -> ArchiveResult<Vec<u8>> {
        let mut stream = self.open_entry_stream(path, entry_name, password)?;
        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .map_err(|e| ArchiveError::classify(format!("Failed to read {entry_name}: {e}"), password.is_some()))?;
        Ok(bytes)
    }

    pub fn is_encrypted(&self, path: &Path) -> ArchiveResult<bool> {
        let format = Self::format_of(path)?;
        self.ensure_staging()?;
        let staged = self.stage(path)?;
        password::is_encrypted(&staged.local, format, &self.staging_root)
    }

    pub fn validate_password(&self, path: &Path, password: &str) -> ArchiveResult<bool> {
        let format = Self::format_of(path)?;
        self.ensure_staging()?;
        let staged = self.stage(path)?;
        password::validate_password(&staged.local, format, password, &self.staging_root)
    }
}

#[cfg(test)]
#[path = "tests/archive_tests.rs"]
mod tests;
