//! Identification mode for games with globally unique file names: the
//! basename alone decides the destination, searched across all configured
//! directories in order.

use super::snapshot::DirectorySnapshot;
use super::{GroupFile, RawGroup, SourceEntry};
use crate::services::fs_utils::path_utils;
use std::collections::HashMap;

/// Grouping key shared by entries sitting at the source root.
pub(super) const ROOT_KEY: &str = "";

pub(super) fn group_entries(entries: &[SourceEntry], snap: &DirectorySnapshot) -> Vec<RawGroup> {
    let mut groups: Vec<RawGroup> = Vec::new();
    let mut key_index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let basename = path_utils::entry_basename(&entry.rel);
        // First configured directory wins when the name exists in several.
        let Some((dir_index, listing)) = snap.first_containing(basename) else {
            continue;
        };

        let key = match entry.rel.rfind('/') {
            Some(split) => entry.rel[..split].to_string(),
            None => ROOT_KEY.to_string(),
        };
        #[cfg(feature = "debug_matcher")]
        log::debug!(
            "Accepted {basename} -> {} (group {key})",
            listing.path.display()
        );
        let file = GroupFile {
            raw: entry.raw.clone(),
            rel: entry.rel.clone(),
            dest: listing.path.join(basename),
            dir_index,
        };

        match key_index.get(&key) {
            Some(&i) => groups[i].files.push(file),
            None => {
                key_index.insert(key.clone(), groups.len());
                groups.push(RawGroup {
                    key,
                    files: vec![file],
                });
            }
        }
    }

    groups
}
