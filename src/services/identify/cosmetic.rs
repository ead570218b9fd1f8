//! Cosmetic-entry handling: icon/image/readme selection and WebP
//! recompression into the cache roots.

use super::SourceEntry;
use crate::services::archive::ArchiveGateway;
use crate::services::fs_utils::path_utils;
use crate::services::gateway::FileGateway;
use crate::types::layout::StorageLayout;
use image::{imageops::FilterType, ImageFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub(super) const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

const ICON_MAX: u32 = 512;
const IMAGE_MAX_WIDTH: u32 = 1280;
const IMAGE_MAX_HEIGHT: u32 = 720;

pub(super) fn is_image_entry(rel: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&path_utils::entry_extension(rel).as_str())
}

pub(super) fn is_readme_entry(rel: &str) -> bool {
    let base = path_utils::entry_basename(rel).to_lowercase();
    base.starts_with("readme") || base.ends_with(".txt")
}

/// Cosmetic entries are never mod files, whatever directory they sit in.
pub(super) fn is_cosmetic_entry(rel: &str) -> bool {
    is_image_entry(rel) || is_readme_entry(rel)
}

/// Preview fields resolved for one unit.
#[derive(Debug, Default, Clone)]
pub(super) struct CosmeticAssets {
    pub icon: Option<String>,
    pub images: Vec<String>,
    pub readme: Option<String>,
    pub description: Option<String>,
}

/// Pick the icon entry for a group: an entry named like an icon or preview
/// wins over an arbitrary first image.
fn pick_icon<'a>(images: &[&'a SourceEntry]) -> Option<&'a SourceEntry> {
    images
        .iter()
        .find(|e| path_utils::entry_basename(&e.rel).to_lowercase().contains("icon"))
        .or_else(|| {
            images.iter().find(|e| {
                path_utils::entry_basename(&e.rel)
                    .to_lowercase()
                    .contains("preview")
            })
        })
        .or_else(|| images.first())
        .copied()
}

pub(super) struct CosmeticContext<'a> {
    pub gateway: &'a FileGateway,
    pub archives: &'a ArchiveGateway,
    pub layout: &'a StorageLayout,
    pub source: &'a Path,
    pub is_archive: bool,
    pub password: Option<&'a str>,
}

impl CosmeticContext<'_> {
    fn read_entry(&self, entry: &SourceEntry) -> Result<Vec<u8>, String> {
        if self.is_archive {
            self.archives
                .read_entry_bytes(self.source, &entry.raw, self.password)
                .map_err(|e| e.to_string())
        } else {
            let mut reader = self
                .gateway
                .open_read(Path::new(&entry.raw))
                .map_err(|e| e.to_string())?;
            let mut bytes = Vec::new();
            std::io::Read::read_to_end(&mut reader, &mut bytes).map_err(|e| e.to_string())?;
            Ok(bytes)
        }
    }
}

/// Resolve the preview assets of one group.
///
/// For readable (unencrypted) sources the image entries are recompressed
/// into the caches and `description` is filled from the readme text. For
/// encrypted sources only the raw entry references are kept; they are
/// resolved later once a password is supplied.
pub(super) fn collect(
    ctx: &CosmeticContext<'_>,
    cosmetics: &[&SourceEntry],
    cache_key: &str,
    extract: bool,
) -> CosmeticAssets {
    let images: Vec<&SourceEntry> = cosmetics
        .iter()
        .filter(|e| is_image_entry(&e.rel))
        .copied()
        .collect();
    let readme = cosmetics
        .iter()
        .find(|e| !is_image_entry(&e.rel) && is_readme_entry(&e.rel))
        .copied();
    let icon = pick_icon(&images);

    if !extract {
        return CosmeticAssets {
            icon: icon.map(|e| e.raw.clone()),
            images: images.iter().map(|e| e.raw.clone()).collect(),
            readme: readme.map(|e| e.raw.clone()),
            description: None,
        };
    }

    let mut assets = CosmeticAssets::default();

    if let Some(entry) = icon {
        match ctx.read_entry(entry).and_then(|bytes| {
            recompress(
                &bytes,
                &ctx.layout.icon_cache_root.join(cache_key),
                &cache_stem(entry),
                ICON_MAX,
                ICON_MAX,
            )
        }) {
            Ok(path) => assets.icon = Some(path.to_string_lossy().to_string()),
            Err(e) => log::warn!("Icon extraction failed for {}: {e}", entry.rel),
        }
    }

    for entry in &images {
        match ctx.read_entry(entry).and_then(|bytes| {
            recompress(
                &bytes,
                &ctx.layout.image_cache_root.join(cache_key),
                &cache_stem(entry),
                IMAGE_MAX_WIDTH,
                IMAGE_MAX_HEIGHT,
            )
        }) {
            Ok(path) => assets.images.push(path.to_string_lossy().to_string()),
            Err(e) => log::warn!("Image extraction failed for {}: {e}", entry.rel),
        }
    }

    if let Some(entry) = readme {
        assets.readme = Some(entry.raw.clone());
        match ctx.read_entry(entry) {
            Ok(bytes) => {
                assets.description = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            Err(e) => log::warn!("Readme extraction failed for {}: {e}", entry.rel),
        }
    }

    assets
}

fn cache_stem(entry: &SourceEntry) -> String {
    let base = path_utils::entry_basename(&entry.rel);
    let stem = Path::new(base)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| base.to_string());
    sanitize_filename::sanitize(stem)
}

/// Decode, bound, and re-encode an image as lossy web-friendly WebP.
fn recompress(
    bytes: &[u8],
    dest_dir: &Path,
    stem: &str,
    max_width: u32,
    max_height: u32,
) -> Result<PathBuf, String> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| format!("Invalid image data: {e}"))?;

    let resized = if decoded.width() > max_width || decoded.height() > max_height {
        decoded.resize(max_width, max_height, FilterType::Lanczos3)
    } else {
        decoded
    };

    std::fs::create_dir_all(dest_dir).map_err(|e| format!("Failed to create cache dir: {e}"))?;
    let target = dest_dir.join(format!("{stem}.webp"));

    let mut encoded = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut encoded), ImageFormat::WebP)
        .map_err(|e| format!("Failed to encode preview image: {e}"))?;
    std::fs::write(&target, encoded).map_err(|e| format!("Failed to save preview image: {e}"))?;

    Ok(target)
}

/// Derive a cache folder name for a unit from its source and group key.
pub(super) fn cache_key(source: &Path, group_key: &str) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "source".to_string());
    if group_key.is_empty() {
        sanitize_filename::sanitize(stem)
    } else {
        sanitize_filename::sanitize(format!("{stem}_{}", group_key.replace('/', "_")))
    }
}

#[cfg(test)]
#[path = "tests/cosmetic_tests.rs"]
mod tests;
