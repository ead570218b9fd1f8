//! Identification mode for games whose directories legitimately repeat file
//! names: the entry's parent folder name must match a configured game
//! directory, and the file must already exist in that directory.

use super::snapshot::DirectorySnapshot;
use super::{GroupFile, RawGroup, SourceEntry};
use std::collections::HashMap;

pub(super) fn group_entries(entries: &[SourceEntry], snap: &DirectorySnapshot) -> Vec<RawGroup> {
    let mut groups: Vec<RawGroup> = Vec::new();
    let mut key_index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let segments: Vec<&str> = entry.rel.split('/').filter(|s| !s.is_empty()).collect();
        // A root-level file has no parent folder to match against.
        if segments.len() < 2 {
            continue;
        }

        let parent_lower = segments[segments.len() - 2].to_lowercase();
        let Some((dir_index, listing)) = snap.find_by_folder_name(&parent_lower) else {
            continue;
        };

        // Path remainder after the matched directory-name segment, relative
        // to the matched game directory.
        let suffix = segments[segments.len() - 1];
        if !listing.contains(suffix) {
            // Bundled extras that don't correspond to live game files are
            // not mod files.
            log::debug!("Rejecting {}: {suffix} not present in game dir", entry.rel);
            continue;
        }

        let key = segments[..segments.len() - 1].join("/");
        #[cfg(feature = "debug_matcher")]
        log::debug!(
            "Accepted {} -> {} (group {key})",
            entry.rel,
            listing.path.display()
        );
        let file = GroupFile {
            raw: entry.raw.clone(),
            rel: entry.rel.clone(),
            dest: listing.path.join(suffix),
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
