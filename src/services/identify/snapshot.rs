use crate::services::gateway::FileGateway;
use crate::types::game_spec::GameDirectorySpec;
use std::collections::HashSet;
use std::path::PathBuf;

/// Case-insensitive view of the file names currently present in one
/// configured game directory.
#[derive(Debug, Clone)]
pub struct DirListing {
    pub path: PathBuf,
    pub folder_name_lower: String,
    pub mod_type: String,
    names_lower: HashSet<String>,
}

impl DirListing {
    pub fn contains(&self, file_name: &str) -> bool {
        self.names_lower.contains(&file_name.to_lowercase())
    }

    #[cfg(test)]
    pub fn synthetic(path: PathBuf, mod_type: &str, names: &[&str]) -> Self {
        let folder_name_lower = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self {
            path,
            folder_name_lower,
            mod_type: mod_type.to_string(),
            names_lower: names.iter().map(|n| n.to_lowercase()).collect(),
        }
    }
}

/// Live snapshot of every configured game directory, captured once per
/// identification run. Matching never touches the disk again after this.
#[derive(Debug, Clone)]
pub struct DirectorySnapshot {
    listings: Vec<DirListing>,
}

impl DirectorySnapshot {
    /// List each configured directory. A directory that cannot be listed
    /// contributes an empty name set rather than failing the whole run.
    pub fn capture(gateway: &FileGateway, spec: &GameDirectorySpec) -> Self {
        let mut listings = Vec::with_capacity(spec.game_directories.len());
        for dir in &spec.game_directories {
            let names_lower = match gateway.list_entries(&dir.path) {
                Ok(entries) => entries
                    .into_iter()
                    .filter(|e| !e.is_dir)
                    .map(|e| e.name.to_lowercase())
                    .collect(),
                Err(e) => {
                    log::warn!("Game directory {} not listable: {e}", dir.path.display());
                    HashSet::new()
                }
            };
            listings.push(DirListing {
                path: dir.path.clone(),
                folder_name_lower: dir.folder_name_lower(),
                mod_type: dir.mod_type.clone(),
                names_lower,
            });
        }
        Self { listings }
    }

    #[cfg(test)]
    pub fn from_listings(listings: Vec<DirListing>) -> Self {
        Self { listings }
    }

    /// First configured directory whose bare folder name matches,
    /// case-insensitive.
    pub fn find_by_folder_name(&self, folder_name_lower: &str) -> Option<(usize, &DirListing)> {
        self.listings
            .iter()
            .enumerate()
            .find(|(_, l)| l.folder_name_lower == folder_name_lower)
    }

    /// First configured directory currently containing `file_name`. The
    /// configured order is the tie-break when several directories hold the
    /// same name.
    pub fn first_containing(&self, file_name: &str) -> Option<(usize, &DirListing)> {
        self.listings
            .iter()
            .enumerate()
            .find(|(_, l)| l.contains(file_name))
    }

    pub fn listing(&self, index: usize) -> Option<&DirListing> {
        self.listings.get(index)
    }
}
