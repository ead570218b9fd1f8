//! Pure storage-access tier resolution.
//!
//! Every file operation routes through one of three mutually incompatible
//! backends. The resolver decides which one can service a given path from
//! the current permission grants. It does no I/O and is recomputed on every
//! gateway call because grants change between calls.

use crate::types::errors::PermissionError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which backend must service a path. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessTier {
    PrivilegedIpc,
    DocumentTree,
    DirectFile,
    None,
}

/// Permission model of the running platform generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformGeneration {
    /// Pre-scoped-storage: plain file I/O works everywhere.
    Legacy,
    /// Scoped storage: the full four-step decision order applies.
    Scoped,
    /// No usable permission model at all.
    Unmanaged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivilegedState {
    NotInstalled,
    NotRunning,
    Denied,
    Ready,
}

/// Point-in-time view of every grant the platform can hand out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionSnapshot {
    pub generation: PlatformGeneration,
    /// Legacy broad read/write grant over shared storage.
    pub broad_storage_granted: bool,
    /// Roots of previously granted scoped document trees.
    pub granted_tree_roots: Vec<PathBuf>,
    pub privileged: PrivilegedState,
}

/// Queried fresh on every call; grants can change between calls.
pub trait PermissionProbe: Send + Sync {
    fn snapshot(&self) -> PermissionSnapshot;
}

/// Probe returning a fixed snapshot. Suits hosts whose grants cannot change
/// at runtime, and tests.
pub struct FixedProbe {
    snapshot: PermissionSnapshot,
}

impl FixedProbe {
    pub fn new(snapshot: PermissionSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn legacy() -> Self {
        Self::new(PermissionSnapshot {
            generation: PlatformGeneration::Legacy,
            broad_storage_granted: true,
            granted_tree_roots: Vec::new(),
            privileged: PrivilegedState::NotInstalled,
        })
    }
}

impl PermissionProbe for FixedProbe {
    fn snapshot(&self) -> PermissionSnapshot {
        self.snapshot.clone()
    }
}

/// Static path topology of the device: where the app may always write
/// directly, and where foreign-app private data lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathDomains {
    /// The app's own sandbox roots.
    pub sandbox_roots: Vec<PathBuf>,
    /// Universally writable shared folders (downloads etc.).
    pub shared_writable_roots: Vec<PathBuf>,
    /// Parent of per-app private data directories. Grants inside it are
    /// only ever issued at the per-app boundary.
    pub foreign_data_root: Option<PathBuf>,
}

/// Decide the tier servicing `path`, highest capability first.
pub fn resolve(path: &Path, perms: &PermissionSnapshot, domains: &PathDomains) -> AccessTier {
    match perms.generation {
        PlatformGeneration::Legacy => AccessTier::DirectFile,
        PlatformGeneration::Unmanaged => AccessTier::None,
        PlatformGeneration::Scoped => {
            if domains.sandbox_roots.iter().any(|r| path.starts_with(r)) {
                return AccessTier::DirectFile;
            }
            if perms.broad_storage_granted
                && domains
                    .shared_writable_roots
                    .iter()
                    .any(|r| path.starts_with(r))
            {
                return AccessTier::DirectFile;
            }
            if perms.privileged == PrivilegedState::Ready {
                return AccessTier::PrivilegedIpc;
            }
            if perms
                .granted_tree_roots
                .iter()
                .any(|root| tree_covers(root, path, domains))
            {
                return AccessTier::DocumentTree;
            }
            AccessTier::None
        }
    }
}

/// The boundary at which a scoped grant for `path` is actually issued.
/// Paths under a foreign app's private data directory normalize to that
/// app's data-root; everything else is its own boundary.
pub fn grant_boundary(path: &Path, domains: &PathDomains) -> PathBuf {
    let Some(foreign_root) = &domains.foreign_data_root else {
        return path.to_path_buf();
    };
    let Ok(rest) = path.strip_prefix(foreign_root) else {
        return path.to_path_buf();
    };
    match rest.components().next() {
        Some(first) => foreign_root.join(first),
        None => path.to_path_buf(),
    }
}

fn tree_covers(granted_root: &Path, path: &Path, domains: &PathDomains) -> bool {
    let granted = grant_boundary(granted_root, domains);
    grant_boundary(path, domains).starts_with(&granted) || path.starts_with(&granted)
}

/// Why a path resolved to [`AccessTier::None`], as the grant the caller
/// should request. Permission gaps are never auto-retried.
pub fn describe_denial(
    path: &Path,
    perms: &PermissionSnapshot,
    domains: &PathDomains,
) -> PermissionError {
    if perms.generation == PlatformGeneration::Scoped
        && !perms.broad_storage_granted
        && domains
            .shared_writable_roots
            .iter()
            .any(|r| path.starts_with(r))
    {
        return PermissionError::StoragePermissionDenied(path.display().to_string());
    }
    PermissionError::UriPermissionNotGranted(grant_boundary(path, domains).display().to_string())
}

#[cfg(test)]
#[path = "tests/resolver_tests.rs"]
mod tests;
