use super::types::{ArchiveFormat, EntryStream};
use crate::services::fs_utils::path_utils;
use crate::types::errors::{ArchiveError, ArchiveResult};
use std::fs;
use std::io;
use std::path::Path;
use tempfile::TempPath;

/// Extract one entry into a private temp file and open it for reading.
/// The temp file travels inside the returned stream and is deleted when the
/// stream is dropped.
pub(super) fn open_entry(
    local: &Path,
    format: ArchiveFormat,
    entry_name: &str,
    password: Option<&str>,
    staging_root: &Path,
    staged_source: Option<TempPath>,
) -> ArchiveResult<EntryStream> {
    let wanted = path_utils::normalize_entry_name(entry_name);
    match format {
        ArchiveFormat::Zip => open_zip_entry(local, &wanted, password, staging_root, staged_source),
        ArchiveFormat::SevenZ => {
            open_7z_entry(local, &wanted, password, staging_root, staged_source)
        }
        ArchiveFormat::Rar => open_rar_entry(local, &wanted, password, staging_root, staged_source),
    }
}

fn entry_temp_file(staging_root: &Path) -> ArchiveResult<tempfile::NamedTempFile> {
    fs::create_dir_all(staging_root)
        .map_err(|e| ArchiveError::Unknown(format!("Failed to create staging root: {e}")))?;
    tempfile::Builder::new()
        .prefix("entry_")
        .tempfile_in(staging_root)
        .map_err(|e| ArchiveError::Unknown(format!("Failed to create entry temp file: {e}")))
}

fn reopen(temp: tempfile::NamedTempFile) -> ArchiveResult<(Box<dyn io::Read + Send>, TempPath)> {
    let temp_path = temp.into_temp_path();
    let file = fs::File::open(&temp_path)
        .map_err(|e| ArchiveError::Unknown(format!("Failed to reopen extracted entry: {e}")))?;
    Ok((Box::new(file), temp_path))
}

fn open_zip_entry(
    local: &Path,
    wanted: &str,
    password: Option<&str>,
    staging_root: &Path,
    staged_source: Option<TempPath>,
) -> ArchiveResult<EntryStream> {
    let file = fs::File::open(local)
        .map_err(|e| ArchiveError::classify(format!("Failed to open archive: {e}"), false))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| ArchiveError::classify(format!("Invalid or corrupt ZIP: {e}"), false))?;

    let mut index = None;
    for i in 0..archive.len() {
        let raw = archive
            .by_index_raw(i)
            .map_err(|e| ArchiveError::classify(format!("Failed to read entry {i}: {e}"), false))?;
        if path_utils::normalize_entry_name(raw.name()) == wanted && !raw.is_dir() {
            index = Some(i);
            break;
        }
    }
    let index = index.ok_or_else(|| ArchiveError::ItemNotFound(wanted.to_string()))?;

    let mut entry = match password {
        Some(pw) => archive
            .by_index_decrypt(index, pw.as_bytes())
            .map_err(|e| ArchiveError::classify(format!("Failed to read {wanted}: {e}"), true))?,
        None => archive
            .by_index(index)
            .map_err(|e| ArchiveError::classify(format!("Failed to read {wanted}: {e}"), false))?,
    };

    let mut temp = entry_temp_file(staging_root)?;
    io::copy(&mut entry, &mut temp)
        .map_err(|e| ArchiveError::classify(format!("Failed to extract {wanted}: {e}"), password.is_some()))?;

    let (reader, temp_path) = reopen(temp)?;
    Ok(EntryStream::new(reader, Some(temp_path), None, staged_source))
}

fn open_7z_entry(
    local: &Path,
    wanted: &str,
    password: Option<&str>,
    staging_root: &Path,
    staged_source: Option<TempPath>,
) -> ArchiveResult<EntryStream> {
    let pw = match password {
        Some(p) => sevenz_rust::Password::from(p),
        None => sevenz_rust::Password::empty(),
    };
    let mut reader = sevenz_rust::SevenZReader::open(local, pw)
        .map_err(|e| ArchiveError::classify(format!("Failed to open 7z: {e}"), password.is_some()))?;

    let mut temp = Some(entry_temp_file(staging_root)?);
    let mut found = None;
    let mut failure: Option<ArchiveError> = None;
    reader
        .for_each_entries(|entry, entry_reader| {
            if entry.is_directory() || path_utils::normalize_entry_name(entry.name()) != wanted {
                return Ok(true);
            }
            let Some(mut out) = temp.take() else {
                return Ok(false);
            };
            if let Err(e) = io::copy(entry_reader, &mut out) {
                failure = Some(ArchiveError::classify(
                    format!("Failed to extract {}: {e}", entry.name()),
                    false,
                ));
                return Ok(false);
            }
            found = Some(out);
            Ok(false) // Stop after the requested entry
        })
        .map_err(|e| ArchiveError::classify(format!("Failed to read 7z: {e}"), password.is_some()))?;

    if let Some(error) = failure {
        return Err(error);
    }
    let temp = found.ok_or_else(|| ArchiveError::ItemNotFound(wanted.to_string()))?;
    let (reader, temp_path) = reopen(temp)?;
    Ok(EntryStream::new(reader, Some(temp_path), None, staged_source))
}

/// RAR cannot stream a single entry; the whole archive is extracted into a
/// scratch dir that lives as long as the stream.
fn open_rar_entry(
    local: &Path,
    wanted: &str,
    password: Option<&str>,
    staging_root: &Path,
    staged_source: Option<TempPath>,
) -> ArchiveResult<EntryStream> {
    fs::create_dir_all(staging_root)
        .map_err(|e| ArchiveError::Unknown(format!("Failed to create staging root: {e}")))?;
    let scratch = tempfile::tempdir_in(staging_root)
        .map_err(|e| ArchiveError::Unknown(format!("Failed to create scratch dir: {e}")))?;

    super::extract::extract_all(local, ArchiveFormat::Rar, scratch.path(), password)?;

    if !path_utils::is_path_safe(scratch.path(), Path::new(wanted)) {
        return Err(ArchiveError::ItemNotFound(wanted.to_string()));
    }
    let extracted = scratch.path().join(wanted);
    if !extracted.is_file() {
        return Err(ArchiveError::ItemNotFound(wanted.to_string()));
    }
    let file = fs::File::open(&extracted)
        .map_err(|e| ArchiveError::Unknown(format!("Failed to open extracted entry: {e}")))?;
    Ok(EntryStream::new(
        Box::new(file),
        None,
        Some(scratch),
        staged_source,
    ))
}
