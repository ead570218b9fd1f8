use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One configured game directory that legitimately receives mod files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDirectory {
    pub path: PathBuf,
    /// Label attached to units matched against this directory.
    pub mod_type: String,
}

/// External, read-only description of a managed game. Directory order is
/// significant: it is the mode-B tie-break.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDirectorySpec {
    pub package_name: String,
    pub game_directories: Vec<GameDirectory>,
    /// Selects the identification strategy: `true` when multiple game
    /// directories can contain same-named files.
    pub repeated_file_names: bool,
    pub mod_root: PathBuf,
}

impl GameDirectory {
    /// Bare folder name, lowercased, used for repeated-filename matching.
    pub fn folder_name_lower(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}
