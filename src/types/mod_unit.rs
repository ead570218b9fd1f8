use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// One activatable mod: an ordered set of source entries paired with the
/// game file paths they replace.
///
/// `mod_files` holds source-relative entry paths for archive sources and
/// absolute paths for folder sources. `game_files_path` is always absolute
/// and positionally paired with `mod_files`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModUnit {
    pub id: Uuid,
    pub source_path: PathBuf,
    pub mod_files: Vec<String>,
    pub game_files_path: Vec<PathBuf>,
    /// Source-path prefix that clustered this unit's entries.
    pub group_key: String,
    /// Synthetic node path for integrated packs (source path + group key).
    pub virtual_path: Option<PathBuf>,
    pub name: String,
    pub mod_type: String,
    pub is_archive: bool,
    pub is_encrypted: bool,
    pub password: Option<String>,
    /// Cache path of the recompressed icon, or the raw entry name while the
    /// source is still encrypted.
    pub icon: Option<String>,
    pub images: Vec<String>,
    pub readme: Option<String>,
    pub description: Option<String>,
    pub is_enabled: bool,
    pub last_modified: DateTime<Utc>,
}

impl ModUnit {
    /// Pairing invariant: both lists non-empty and positionally matched.
    pub fn has_valid_pairing(&self) -> bool {
        !self.mod_files.is_empty() && self.mod_files.len() == self.game_files_path.len()
    }
}

/// One preserved original game file, created by backup and consumed by
/// restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub mod_id: Uuid,
    pub file_name: String,
    pub game_file_path: PathBuf,
    pub backup_path: PathBuf,
    /// MD5 of the game file before it was overwritten.
    pub original_md5: String,
    pub backup_time: DateTime<Utc>,
}
