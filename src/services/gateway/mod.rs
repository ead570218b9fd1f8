//! Tier-dispatched file gateway.
//!
//! Every primitive resolves its access tier independently, per call, then
//! runs against the backend for that tier. Two-path operations may span two
//! tiers; those bridge by streaming between backends.

pub mod backend;
pub mod privileged;
pub mod tree;

use crate::services::access::{self, AccessTier, PathDomains, PermissionProbe};
use crate::types::errors::{FileError, FileResult};
use backend::{DirEntryInfo, DirectBackend, StorageBackend};
use chrono::{DateTime, Utc};
use privileged::{DisconnectedTransport, PrivilegedBackend, PrivilegedTransport};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use tree::{DocumentTreeProvider, NoTreeProvider, TreeBackend};

const COPY_BUF_SIZE: usize = 64 * 1024;

pub struct FileGateway {
    domains: PathDomains,
    probe: Arc<dyn PermissionProbe>,
    direct: DirectBackend,
    privileged: PrivilegedBackend,
    tree: TreeBackend,
}

impl FileGateway {
    pub fn new(
        domains: PathDomains,
        probe: Arc<dyn PermissionProbe>,
        transport: Arc<dyn PrivilegedTransport>,
        provider: Arc<dyn DocumentTreeProvider>,
    ) -> Self {
        Self {
            domains,
            probe,
            direct: DirectBackend,
            privileged: PrivilegedBackend::new(transport),
            tree: TreeBackend::new(provider),
        }
    }

    /// Gateway for hosts without a tiered permission model: everything is
    /// plain file I/O. This is also the test configuration.
    pub fn direct_only() -> Self {
        Self::new(
            PathDomains::default(),
            Arc::new(access::resolver::FixedProbe::legacy()),
            Arc::new(DisconnectedTransport),
            Arc::new(NoTreeProvider),
        )
    }

    /// Tier servicing `path` right now. Recomputed from a fresh permission
    /// snapshot on every call.
    pub fn tier_of(&self, path: &Path) -> AccessTier {
        access::resolver::resolve(path, &self.probe.snapshot(), &self.domains)
    }

    fn backend_for(&self, path: &Path) -> FileResult<(&dyn StorageBackend, AccessTier)> {
        let snapshot = self.probe.snapshot();
        match access::resolver::resolve(path, &snapshot, &self.domains) {
            AccessTier::DirectFile => Ok((&self.direct, AccessTier::DirectFile)),
            AccessTier::PrivilegedIpc => Ok((&self.privileged, AccessTier::PrivilegedIpc)),
            AccessTier::DocumentTree => Ok((&self.tree, AccessTier::DocumentTree)),
            AccessTier::None => {
                let denial = access::resolver::describe_denial(path, &snapshot, &self.domains);
                Err(FileError::PermissionDenied(denial.to_string()))
            }
        }
    }

    pub fn exists(&self, path: &Path) -> FileResult<bool> {
        self.backend_for(path)?.0.exists(path)
    }

    pub fn is_file(&self, path: &Path) -> FileResult<bool> {
        self.backend_for(path)?.0.is_file(path)
    }

    pub fn list_entries(&self, dir: &Path) -> FileResult<Vec<DirEntryInfo>> {
        self.backend_for(dir)?.0.list_entries(dir)
    }

    pub fn list_names(&self, dir: &Path) -> FileResult<Vec<String>> {
        Ok(self
            .list_entries(dir)?
            .into_iter()
            .map(|e| e.name)
            .collect())
    }

    /// Recursive listing filtered by lowercase extensions. Empty filter
    /// returns every file.
    pub fn list_recursive_with_ext(
        &self,
        dir: &Path,
        extensions: &[&str],
    ) -> FileResult<Vec<DirEntryInfo>> {
        let mut out = Vec::new();
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            for entry in self.list_entries(&current)? {
                if entry.is_dir {
                    pending.push(entry.path.clone());
                    continue;
                }
                let ext = entry
                    .path
                    .extension()
                    .map(|e| e.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                if extensions.is_empty() || extensions.contains(&ext.as_str()) {
                    out.push(entry);
                }
            }
        }
        Ok(out)
    }

    pub fn read_text(&self, path: &Path) -> FileResult<String> {
        let mut reader = self.backend_for(path)?.0.open_read(path)?;
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| FileError::from_io(&e, path, FileError::ReadFailed))?;
        Ok(text)
    }

    pub fn write_text(&self, path: &Path, text: &str) -> FileResult<()> {
        let mut writer = self.backend_for(path)?.0.create_write(path)?;
        writer
            .write_all(text.as_bytes())
            .map_err(|e| FileError::from_io(&e, path, FileError::WriteFailed))
    }

    /// Create `path` from an arbitrary byte stream. Returns bytes written.
    pub fn create_from_reader(&self, path: &Path, reader: &mut dyn Read) -> FileResult<u64> {
        let mut writer = self.backend_for(path)?.0.create_write(path)?;
        let mut buf = [0u8; COPY_BUF_SIZE];
        let mut written: u64 = 0;
        loop {
            let n = reader
                .read(&mut buf)
                .map_err(|e| FileError::from_io(&e, path, FileError::ReadFailed))?;
            if n == 0 {
                break;
            }
            writer
                .write_all(&buf[..n])
                .map_err(|e| FileError::from_io(&e, path, FileError::WriteFailed))?;
            written += n as u64;
        }
        writer
            .flush()
            .map_err(|e| FileError::from_io(&e, path, FileError::WriteFailed))?;
        Ok(written)
    }

    pub fn open_read(&self, path: &Path) -> FileResult<Box<dyn Read + Send>> {
        self.backend_for(path)?.0.open_read(path)
    }

    pub fn mkdir(&self, path: &Path) -> FileResult<()> {
        self.backend_for(path)?.0.mkdir(path)
    }

    pub fn rename(&self, from: &Path, to: &Path) -> FileResult<()> {
        let (backend, from_tier) = self.backend_for(from)?;
        let (_, to_tier) = self.backend_for(to)?;
        if from_tier == to_tier {
            backend.rename(from, to)
        } else {
            self.copy(from, to)?;
            self.delete(from)
        }
    }

    pub fn delete(&self, path: &Path) -> FileResult<()> {
        self.backend_for(path)?.0.delete(path)
    }

    pub fn last_modified(&self, path: &Path) -> FileResult<DateTime<Utc>> {
        self.backend_for(path)?.0.last_modified(path)
    }

    pub fn size(&self, path: &Path) -> FileResult<u64> {
        self.backend_for(path)?.0.size(path)
    }

    /// MD5 of the file content, streamed in one pass.
    pub fn content_md5(&self, path: &Path) -> FileResult<String> {
        let mut reader = self.backend_for(path)?.0.open_read(path)?;
        let mut context = md5::Context::new();
        let mut buf = [0u8; COPY_BUF_SIZE];
        loop {
            let n = reader
                .read(&mut buf)
                .map_err(|e| FileError::from_io(&e, path, FileError::ReadFailed))?;
            if n == 0 {
                break;
            }
            context.consume(&buf[..n]);
        }
        Ok(format!("{:x}", context.compute()))
    }

    /// Copy `from` to `to`. Same-tier copies use the backend's native path;
    /// cross-tier copies bridge by streaming.
    pub fn copy(&self, from: &Path, to: &Path) -> FileResult<u64> {
        let (from_backend, from_tier) = self.backend_for(from)?;
        let (to_backend, to_tier) = self.backend_for(to)?;
        if from_tier == to_tier {
            return from_backend.copy_within(from, to);
        }
        log::debug!(
            "Bridging copy across tiers: {} ({from_tier:?}) -> {} ({to_tier:?})",
            from.display(),
            to.display()
        );
        let mut reader = from_backend.open_read(from)?;
        let mut writer = to_backend.create_write(to)?;
        std::io::copy(&mut reader, &mut writer)
            .map_err(|e| FileError::from_io(&e, to, FileError::CopyFailed))
    }

    /// Move `from` to `to` as copy-plus-delete, optionally pre-deleting an
    /// existing destination.
    pub fn move_file(&self, from: &Path, to: &Path, pre_delete: bool) -> FileResult<()> {
        if pre_delete && self.exists(to)? {
            self.delete(to)?;
        }
        let (from_backend, from_tier) = self.backend_for(from)?;
        let (_, to_tier) = self.backend_for(to)?;
        if from_tier == to_tier {
            return from_backend.rename(from, to);
        }
        self.copy(from, to)?;
        self.delete(from)
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
