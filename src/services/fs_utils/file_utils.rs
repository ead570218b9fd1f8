use std::fs;
use std::path::Path;

/// Tries to rename a file using `std::fs::rename`. If it fails (likely a
/// cross-device link error), falls back to `fs_extra` copy-and-remove.
pub fn rename_cross_drive_fallback(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(_) => Ok(()),
        Err(e) => {
            log::warn!(
                "fs::rename failed (cross-device?): {}. Attempting fallback move...",
                e
            );

            if !from.exists() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Source path does not exist",
                ));
            }

            if to.exists() {
                return Err(e); // Propagate the original error (e.g., AlreadyExists)
            }

            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut options = fs_extra::file::CopyOptions::new();
            options.overwrite = false;

            fs_extra::file::move_file(from, to, &options)
                .map(|_| ())
                .map_err(|err| std::io::Error::other(err.to_string()))
        }
    }
}

#[cfg(test)]
#[path = "tests/file_utils_tests.rs"]
mod tests;
