use super::types::{ArchiveEntryInfo, ArchiveFormat};
use crate::services::fs_utils::path_utils;
use crate::types::errors::{ArchiveError, ArchiveResult};
use std::fs;
use std::path::Path;

pub(super) fn list_entries(
    local: &Path,
    format: ArchiveFormat,
    password: Option<&str>,
    staging_root: &Path,
) -> ArchiveResult<Vec<ArchiveEntryInfo>> {
    match format {
        ArchiveFormat::Zip => list_zip(local),
        ArchiveFormat::SevenZ => list_7z(local, password),
        ArchiveFormat::Rar => list_rar(local, password, staging_root),
    }
}

fn list_zip(local: &Path) -> ArchiveResult<Vec<ArchiveEntryInfo>> {
    let file = fs::File::open(local)
        .map_err(|e| ArchiveError::classify(format!("Failed to open archive: {e}"), false))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| ArchiveError::classify(format!("Failed to read ZIP: {e}"), false))?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        // Raw access does not require the password, so encrypted archives
        // still list.
        let entry = archive
            .by_index_raw(i)
            .map_err(|e| ArchiveError::classify(format!("Failed to read entry {i}: {e}"), false))?;
        entries.push(ArchiveEntryInfo {
            name: path_utils::normalize_entry_name(entry.name()),
            size: entry.size(),
            is_dir: entry.is_dir(),
        });
    }
    Ok(entries)
}

fn list_7z(local: &Path, password: Option<&str>) -> ArchiveResult<Vec<ArchiveEntryInfo>> {
    let pw = match password {
        Some(p) => sevenz_rust::Password::from(p),
        None => sevenz_rust::Password::empty(),
    };
    let mut reader = sevenz_rust::SevenZReader::open(local, pw)
        .map_err(|e| ArchiveError::classify(format!("Failed to open 7z: {e}"), password.is_some()))?;

    let mut entries = Vec::new();
    reader
        .for_each_entries(|entry, _reader| {
            entries.push(ArchiveEntryInfo {
                name: path_utils::normalize_entry_name(entry.name()),
                size: entry.size(),
                is_dir: entry.is_directory(),
            });
            Ok(true)
        })
        .map_err(|e| {
            ArchiveError::classify(format!("Failed to list 7z: {e}"), password.is_some())
        })?;
    Ok(entries)
}

/// The RAR backend cannot enumerate without extracting, so listing goes
/// through a scratch extraction that is deleted before returning.
fn list_rar(
    local: &Path,
    password: Option<&str>,
    staging_root: &Path,
) -> ArchiveResult<Vec<ArchiveEntryInfo>> {
    let scratch = tempfile::tempdir_in(staging_root).map_err(|e| {
        ArchiveError::Unknown(format!("Failed to create scratch dir for RAR listing: {e}"))
    })?;

    let path_str = local
        .to_str()
        .ok_or_else(|| ArchiveError::Unknown("RAR path contains invalid UTF-8".to_string()))?;
    let scratch_str = scratch
        .path()
        .to_str()
        .ok_or_else(|| ArchiveError::Unknown("Scratch path contains invalid UTF-8".to_string()))?;

    let archive = rar::Archive::extract_all(path_str, scratch_str, password.unwrap_or(""))
        .map_err(|e| ArchiveError::classify(format!("Failed to parse RAR: {e:?}"), password.is_some()))?;

    let mut entries = Vec::new();
    for entry in &archive.files {
        let name = path_utils::normalize_entry_name(&entry.name);
        let is_dir = scratch.path().join(&name).is_dir();
        entries.push(ArchiveEntryInfo {
            name,
            size: entry.unpacked_size,
            is_dir,
        });
    }
    Ok(entries)
}
