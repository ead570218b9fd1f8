use std::path::{Component, Path};

/// Normalize an archive entry name: backslashes become forward slashes and
/// leading `./` segments are dropped. RAR and 7z archives produced on other
/// platforms routinely mix separators.
pub fn normalize_entry_name(name: &str) -> String {
    let normalized = name.replace('\\', "/");
    let trimmed = normalized.trim_start_matches("./").trim_start_matches('/');
    trimmed.to_string()
}

/// Validates that `target_path` strictly resolves _inside_ `base_path`.
/// Rejects traversal attempts using `..` or absolute components.
pub fn is_path_safe(base_path: &Path, target_path: &Path) -> bool {
    if target_path.is_absolute() {
        return target_path.starts_with(base_path);
    }

    let mut depth = 0;
    for component in target_path.components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            Component::Normal(_) => {
                depth += 1;
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }

    true
}

/// Last path segment of a normalized entry name.
pub fn entry_basename(entry: &str) -> &str {
    entry.rsplit('/').next().unwrap_or(entry)
}

/// File extension of an entry name, lowercased, without the dot.
pub fn entry_extension(entry: &str) -> String {
    Path::new(entry_basename(entry))
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "tests/path_utils_tests.rs"]
mod tests;
