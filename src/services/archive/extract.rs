use super::types::ArchiveFormat;
use crate::services::fs_utils::path_utils;
use crate::types::errors::{ArchiveError, ArchiveResult};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub(super) fn extract_all(
    local: &Path,
    format: ArchiveFormat,
    dest: &Path,
    password: Option<&str>,
) -> ArchiveResult<usize> {
    fs::create_dir_all(dest)
        .map_err(|e| ArchiveError::ExtractFailed(format!("Failed to create destination: {e}")))?;

    match format {
        ArchiveFormat::Zip => extract_zip(local, dest, password, None).map(|p| p.len()),
        ArchiveFormat::SevenZ => extract_7z_all(local, dest, password),
        ArchiveFormat::Rar => extract_rar_all(local, dest, password),
    }
}

pub(super) fn extract_subset(
    local: &Path,
    format: ArchiveFormat,
    dest: &Path,
    names: &[String],
    password: Option<&str>,
    staging_root: &Path,
) -> ArchiveResult<Vec<PathBuf>> {
    fs::create_dir_all(dest)
        .map_err(|e| ArchiveError::ExtractFailed(format!("Failed to create destination: {e}")))?;

    let wanted: HashSet<String> = names
        .iter()
        .map(|n| path_utils::normalize_entry_name(n))
        .collect();

    match format {
        ArchiveFormat::Zip => extract_zip(local, dest, password, Some(&wanted)),
        ArchiveFormat::SevenZ => extract_7z_subset(local, dest, password, &wanted),
        ArchiveFormat::Rar => extract_rar_subset(local, dest, password, &wanted, staging_root),
    }
}

fn extract_zip(
    local: &Path,
    dest: &Path,
    password: Option<&str>,
    only: Option<&HashSet<String>>,
) -> ArchiveResult<Vec<PathBuf>> {
    let file = fs::File::open(local)
        .map_err(|e| ArchiveError::classify(format!("Failed to open archive: {e}"), false))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| ArchiveError::classify(format!("Invalid or corrupt ZIP: {e}"), false))?;

    let mut written = Vec::new();
    for i in 0..archive.len() {
        if let Some(filter) = only {
            let name = {
                let raw = archive.by_index_raw(i).map_err(|e| {
                    ArchiveError::classify(format!("Failed to read entry {i}: {e}"), false)
                })?;
                path_utils::normalize_entry_name(raw.name())
            };
            if !filter.contains(&name) {
                continue;
            }
        }

        let mut entry = match password {
            Some(pw) => archive.by_index_decrypt(i, pw.as_bytes()).map_err(|e| {
                ArchiveError::classify(format!("Failed to read entry {i}: {e}"), true)
            })?,
            None => archive.by_index(i).map_err(|e| {
                ArchiveError::classify(format!("Failed to read entry {i}: {e}"), false)
            })?,
        };

        let entry_path = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => continue, // Skip unsafe paths
        };

        let output_path = dest.join(&entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&output_path)
                .map_err(|e| ArchiveError::ExtractFailed(format!("Failed to create dir: {e}")))?;
        } else {
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    ArchiveError::ExtractFailed(format!("Failed to create parent: {e}"))
                })?;
            }
            let mut outfile = fs::File::create(&output_path)
                .map_err(|e| ArchiveError::ExtractFailed(format!("Failed to create file: {e}")))?;
            io::copy(&mut entry, &mut outfile).map_err(|e| {
                ArchiveError::classify(format!("Failed to write file: {e}"), password.is_some())
            })?;
            written.push(output_path);
        }
    }
    Ok(written)
}

fn extract_7z_all(local: &Path, dest: &Path, password: Option<&str>) -> ArchiveResult<usize> {
    let result = match password {
        Some(pw) => sevenz_rust::decompress_file_with_password(local, dest, pw.into()),
        None => sevenz_rust::decompress_file(local, dest),
    };
    result
        .map_err(|e| ArchiveError::classify(format!("Failed to extract 7z: {e}"), password.is_some()))?;

    // The library reports no per-file count, so count what landed.
    let count = walkdir::WalkDir::new(dest)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .count();
    Ok(count)
}

fn extract_7z_subset(
    local: &Path,
    dest: &Path,
    password: Option<&str>,
    wanted: &HashSet<String>,
) -> ArchiveResult<Vec<PathBuf>> {
    let pw = match password {
        Some(p) => sevenz_rust::Password::from(p),
        None => sevenz_rust::Password::empty(),
    };
    let mut reader = sevenz_rust::SevenZReader::open(local, pw)
        .map_err(|e| ArchiveError::classify(format!("Failed to open 7z: {e}"), password.is_some()))?;

    let mut written = Vec::new();
    let mut failure: Option<ArchiveError> = None;
    reader
        .for_each_entries(|entry, entry_reader| {
            let name = path_utils::normalize_entry_name(entry.name());
            if entry.is_directory() || !wanted.contains(&name) {
                return Ok(true);
            }
            if !path_utils::is_path_safe(dest, Path::new(&name)) {
                log::warn!("Skipping unsafe 7z entry path: {name}");
                return Ok(true);
            }

            let output_path = dest.join(&name);
            if let Some(parent) = output_path.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    failure = Some(ArchiveError::ExtractFailed(format!(
                        "Failed to create parent: {e}"
                    )));
                    return Ok(false);
                }
            }
            match fs::File::create(&output_path) {
                Ok(mut outfile) => {
                    if let Err(e) = io::copy(entry_reader, &mut outfile) {
                        failure = Some(ArchiveError::classify(
                            format!("Failed to write {name}: {e}"),
                            false,
                        ));
                        return Ok(false);
                    }
                    written.push(output_path);
                }
                Err(e) => {
                    failure = Some(ArchiveError::ExtractFailed(format!(
                        "Failed to create file: {e}"
                    )));
                    return Ok(false);
                }
            }
            Ok(true)
        })
        .map_err(|e| {
            ArchiveError::classify(format!("Failed to extract 7z subset: {e}"), password.is_some())
        })?;

    if let Some(error) = failure {
        return Err(error);
    }
    Ok(written)
}

fn extract_rar_all(local: &Path, dest: &Path, password: Option<&str>) -> ArchiveResult<usize> {
    let path_str = local
        .to_str()
        .ok_or_else(|| ArchiveError::Unknown("RAR path contains invalid UTF-8".to_string()))?;
    let dest_str = dest
        .to_str()
        .ok_or_else(|| ArchiveError::Unknown("Dest path contains invalid UTF-8".to_string()))?;

    rar::Archive::extract_all(path_str, dest_str, password.unwrap_or("")).map_err(|e| {
        ArchiveError::classify(format!("Failed to extract RAR: {e:?}"), password.is_some())
    })?;

    let count = walkdir::WalkDir::new(dest)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .count();
    Ok(count)
}

/// RAR has no selective extraction, so the subset goes through a scratch
/// full extraction and the requested entries are moved out of it.
fn extract_rar_subset(
    local: &Path,
    dest: &Path,
    password: Option<&str>,
    wanted: &HashSet<String>,
    staging_root: &Path,
) -> ArchiveResult<Vec<PathBuf>> {
    let scratch = tempfile::tempdir_in(staging_root).map_err(|e| {
        ArchiveError::Unknown(format!("Failed to create scratch dir for RAR subset: {e}"))
    })?;
    extract_rar_all(local, scratch.path(), password)?;

    let mut written = Vec::new();
    for name in wanted {
        if !path_utils::is_path_safe(dest, Path::new(name)) {
            log::warn!("Skipping unsafe RAR entry path: {name}");
            continue;
        }
        let extracted = scratch.path().join(name);
        if !extracted.is_file() {
            return Err(ArchiveError::ItemNotFound(name.clone()));
        }
        let output_path = dest.join(name);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ArchiveError::ExtractFailed(format!("Failed to create parent: {e}")))?;
        }
        fs::rename(&extracted, &output_path).or_else(|_| {
            fs::copy(&extracted, &output_path)
                .map(|_| ())
                .map_err(|e| ArchiveError::ExtractFailed(format!("Failed to move {name}: {e}")))
        })?;
        written.push(output_path);
    }
    Ok(written)
}
