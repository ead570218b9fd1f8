use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fixed filesystem roots supplied by the host configuration. The core never
/// decides these locations, it only writes inside them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageLayout {
    /// Private scratch area for staged archive copies and probe extractions.
    pub staging_root: PathBuf,
    /// Recompressed unit icons.
    pub icon_cache_root: PathBuf,
    /// Recompressed unit gallery images.
    pub image_cache_root: PathBuf,
    /// Per-package backup trees mirroring game subdirectory structure.
    pub backup_root: PathBuf,
}
