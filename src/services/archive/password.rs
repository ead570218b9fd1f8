use super::list;
use super::types::{ArchiveEntryInfo, ArchiveFormat};
use crate::types::errors::{ArchiveError, ArchiveResult};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Result of the direct library password check. Some formats cannot report
/// correctness without an actual decode attempt.
enum DirectCheck {
    Confirmed(bool),
    Inconclusive,
}

pub(super) fn is_encrypted(
    local: &Path,
    format: ArchiveFormat,
    staging_root: &Path,
) -> ArchiveResult<bool> {
    match format {
        ArchiveFormat::Zip => zip_is_encrypted(local),
        ArchiveFormat::SevenZ => sevenz_is_encrypted(local),
        ArchiveFormat::Rar => rar_is_encrypted(local, staging_root),
    }
}

/// Two-layer validation: a direct library check first, then a probe
/// extraction of one small entry when the library cannot say.
pub(super) fn validate_password(
    local: &Path,
    format: ArchiveFormat,
    password: &str,
    staging_root: &Path,
) -> ArchiveResult<bool> {
    let direct = match format {
        ArchiveFormat::Zip => zip_direct_check(local, password)?,
        ArchiveFormat::SevenZ => sevenz_direct_check(local, password)?,
        ArchiveFormat::Rar => DirectCheck::Inconclusive,
    };

    match direct {
        DirectCheck::Confirmed(ok) => Ok(ok),
        DirectCheck::Inconclusive => probe_extraction(local, format, password, staging_root),
    }
}

fn zip_is_encrypted(local: &Path) -> ArchiveResult<bool> {
    let file = fs::File::open(local)
        .map_err(|e| ArchiveError::classify(format!("Failed to open archive: {e}"), false))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| ArchiveError::classify(format!("Failed to read ZIP: {e}"), false))?;

    for i in 0..archive.len() {
        let is_dir = archive
            .by_index_raw(i)
            .map(|entry| entry.is_dir())
            .map_err(|e| ArchiveError::classify(format!("Failed to read entry {i}: {e}"), false))?;
        if is_dir {
            continue;
        }
        // Opening a protected entry without a password fails with a
        // password-required error; an unprotected entry just opens.
        return match archive.by_index(i) {
            Ok(_) => Ok(false),
            Err(e) => match ArchiveError::classify(format!("{e}"), false) {
                ArchiveError::EncryptedNeedPassword(_) => Ok(true),
                other => Err(other),
            },
        };
    }
    Ok(false)
}

fn sevenz_is_encrypted(local: &Path) -> ArchiveResult<bool> {
    // Try reading one byte of the first file entry without a password. A
    // failure here, or at open time for header-encrypted archives, means
    // encrypted.
    let mut reader = match sevenz_rust::SevenZReader::open(local, sevenz_rust::Password::empty()) {
        Ok(reader) => reader,
        Err(e) => {
            return match ArchiveError::classify(format!("{e}"), false) {
                ArchiveError::EncryptedNeedPassword(_) => Ok(true),
                other => Err(other),
            };
        }
    };

    let mut encrypted = false;
    let result = reader.for_each_entries(|entry, entry_reader| {
        if entry.is_directory() {
            return Ok(true);
        }
        let mut buf = [0u8; 1];
        if entry_reader.read(&mut buf).is_err() {
            encrypted = true;
        }
        Ok(false) // One file entry is enough
    });
    match result {
        Ok(_) => Ok(encrypted),
        Err(e) => match ArchiveError::classify(format!("{e}"), false) {
            ArchiveError::EncryptedNeedPassword(_) => Ok(true),
            other if encrypted => {
                log::debug!("7z encryption probe error after detection: {other}");
                Ok(true)
            }
            other => Err(other),
        },
    }
}

/// The RAR backend only exposes whole-archive extraction, so encryption
/// detection is an extraction attempt into scratch space.
fn rar_is_encrypted(local: &Path, staging_root: &Path) -> ArchiveResult<bool> {
    let scratch = tempfile::tempdir_in(staging_root)
        .map_err(|e| ArchiveError::Unknown(format!("Failed to create scratch dir: {e}")))?;
    match super::extract::extract_all(local, ArchiveFormat::Rar, scratch.path(), None) {
        Ok(_) => Ok(false),
        Err(ArchiveError::EncryptedNeedPassword(_)) | Err(ArchiveError::WrongPassword(_)) => {
            Ok(true)
        }
        Err(other) => Err(other),
    }
}

fn zip_direct_check(local: &Path, password: &str) -> ArchiveResult<DirectCheck> {
    let file = fs::File::open(local)
        .map_err(|e| ArchiveError::classify(format!("Failed to open archive: {e}"), false))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| ArchiveError::classify(format!("Failed to read ZIP: {e}"), false))?;

    let mut candidate = None;
    for i in 0..archive.len() {
        let entry = archive
            .by_index_raw(i)
            .map_err(|e| ArchiveError::classify(format!("Failed to read entry {i}: {e}"), false))?;
        if !entry.is_dir() {
            candidate = Some(i);
            break;
        }
    }
    let Some(index) = candidate else {
        return Err(ArchiveError::EmptyArchive(local.display().to_string()));
    };

    let result = match archive.by_index_decrypt(index, password.as_bytes()) {
        Ok(mut entry) => {
            // Legacy zip encryption only reveals a wrong password through a
            // checksum failure while reading.
            let mut sink = io::sink();
            match io::copy(&mut entry, &mut sink) {
                Ok(_) => Ok(DirectCheck::Confirmed(true)),
                Err(_) => Ok(DirectCheck::Confirmed(false)),
            }
        }
        Err(e) => match ArchiveError::classify(format!("{e}"), true) {
            ArchiveError::WrongPassword(_) | ArchiveError::EncryptedNeedPassword(_) => {
                Ok(DirectCheck::Confirmed(false))
            }
            _ => Ok(DirectCheck::Inconclusive),
        },
    };
    result
}

fn sevenz_direct_check(local: &Path, password: &str) -> ArchiveResult<DirectCheck> {
    let mut reader =
        match sevenz_rust::SevenZReader::open(local, sevenz_rust::Password::from(password)) {
            Ok(reader) => reader,
            Err(e) => {
                return match ArchiveError::classify(format!("{e}"), true) {
                    ArchiveError::WrongPassword(_) => Ok(DirectCheck::Confirmed(false)),
                    _ => Ok(DirectCheck::Inconclusive),
                };
            }
        };

    let mut verdict = DirectCheck::Inconclusive;
    let result = reader.for_each_entries(|entry, entry_reader| {
        if entry.is_directory() {
            return Ok(true);
        }
        let mut sink = io::sink();
        verdict = match io::copy(entry_reader, &mut sink) {
            Ok(_) => DirectCheck::Confirmed(true),
            Err(_) => DirectCheck::Confirmed(false),
        };
        Ok(false)
    });
    if result.is_err() {
        // AES decode failures surface here rather than from the read itself.
        return Ok(DirectCheck::Confirmed(false));
    }
    Ok(verdict)
}

/// Last-resort check: extract the smallest file entry into scratch space and
/// judge success by the output existing with a non-zero length.
fn probe_extraction(
    local: &Path,
    format: ArchiveFormat,
    password: &str,
    staging_root: &Path,
) -> ArchiveResult<bool> {
    let entries = list::list_entries(local, format, Some(password), staging_root);
    let entries = match entries {
        Ok(entries) => entries,
        Err(ArchiveError::WrongPassword(_)) | Err(ArchiveError::EncryptedNeedPassword(_)) => {
            return Ok(false)
        }
        Err(other) => return Err(other),
    };

    let Some(smallest) = smallest_file_entry(&entries) else {
        return Err(ArchiveError::EmptyArchive(local.display().to_string()));
    };

    let scratch = tempfile::tempdir_in(staging_root)
        .map_err(|e| ArchiveError::Unknown(format!("Failed to create scratch dir: {e}")))?;

    let extracted = super::extract::extract_subset(
        local,
        format,
        scratch.path(),
        &[smallest.name.clone()],
        Some(password),
        staging_root,
    );

    match extracted {
        Ok(paths) => {
            let ok = paths
                .first()
                .map(|p| p.is_file() && fs::metadata(p).map(|m| m.len() > 0).unwrap_or(false))
                .unwrap_or(false);
            Ok(ok)
        }
        Err(ArchiveError::WrongPassword(_)) | Err(ArchiveError::EncryptedNeedPassword(_)) => {
            Ok(false)
        }
        Err(other) => Err(other),
    }
}

fn smallest_file_entry(entries: &[ArchiveEntryInfo]) -> Option<&ArchiveEntryInfo> {
    entries
        .iter()
        .filter(|e| !e.is_dir && e.size > 0)
        .min_by_key(|e| e.size)
        .or_else(|| entries.iter().find(|e| !e.is_dir))
}
