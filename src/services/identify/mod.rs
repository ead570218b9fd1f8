//! Mod identification: mapping source entries onto live game directories.
//!
//! Two mutually exclusive strategies sit behind one dispatch point, selected
//! by the game's `repeated_file_names` flag. Both work purely against a
//! [`snapshot::DirectorySnapshot`] captured at the start of the run.

pub mod snapshot;

mod cosmetic;
mod repeated;
mod unique;

use crate::services::archive::ArchiveGateway;
use crate::services::gateway::FileGateway;
use crate::types::errors::{ArchiveError, ModError, ModResult};
use crate::types::events::{is_cancelled, BatchOutcome, CancelFlag, ProgressEvent, Reporter};
use crate::types::game_spec::GameDirectorySpec;
use crate::types::layout::StorageLayout;
use crate::types::mod_unit::ModUnit;
use chrono::Utc;
use cosmetic::CosmeticContext;
use snapshot::DirectorySnapshot;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// One flat entry of a source. `raw` is what goes into `ModUnit::mod_files`
/// (archive-relative name, or absolute path for folder sources); `rel` is
/// the normalized source-relative path used for matching.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub raw: String,
    pub rel: String,
}

/// One accepted entry inside a group.
#[derive(Debug, Clone)]
pub(crate) struct GroupFile {
    pub raw: String,
    pub rel: String,
    pub dest: PathBuf,
    pub dir_index: usize,
}

/// Entries clustered under one grouping key; becomes one ModUnit.
#[derive(Debug, Clone)]
pub(crate) struct RawGroup {
    pub key: String,
    pub files: Vec<GroupFile>,
}

/// Result of reconciling known units against their sources on disk.
#[derive(Debug, Default)]
pub struct RescanReport {
    pub retained: Vec<ModUnit>,
    pub removed: Vec<ModUnit>,
    /// Enabled units whose source is gone: surfaced, not deleted.
    pub missing_enabled: Vec<ModUnit>,
}

pub struct ModIdentificationEngine {
    gateway: Arc<FileGateway>,
    archives: Arc<ArchiveGateway>,
    layout: StorageLayout,
}

impl ModIdentificationEngine {
    pub fn new(
        gateway: Arc<FileGateway>,
        archives: Arc<ArchiveGateway>,
        layout: StorageLayout,
    ) -> Self {
        Self {
            gateway,
            archives,
            layout,
        }
    }

    /// Identify every mod unit inside `source` (archive file or folder).
    /// Units found before a cancellation are carried out in the outcome.
    pub fn identify_source(
        &self,
        source: &Path,
        spec: &GameDirectorySpec,
        reporter: &Reporter,
        cancel: &CancelFlag,
    ) -> BatchOutcome<Vec<ModUnit>, ModError> {
        match self.identify_inner(source, spec, reporter, cancel, true) {
            Ok((units, cancelled)) => {
                if cancelled {
                    BatchOutcome::Cancelled(units)
                } else {
                    BatchOutcome::Completed(units)
                }
            }
            Err(error) => BatchOutcome::Failed {
                partial: Vec::new(),
                error,
            },
        }
    }

    /// Probe mode: does this source contain at least one non-empty unit?
    /// No previews are extracted and no events are emitted.
    pub fn probe(&self, source: &Path, spec: &GameDirectorySpec) -> ModResult<bool> {
        let flag = crate::types::events::new_cancel_flag();
        let (units, _) =
            self.identify_inner(source, spec, &Reporter::disabled(), &flag, false)?;
        Ok(!units.is_empty())
    }

    fn identify_inner(
        &self,
        source: &Path,
        spec: &GameDirectorySpec,
        reporter: &Reporter,
        cancel: &CancelFlag,
        extract_previews: bool,
    ) -> ModResult<(Vec<ModUnit>, bool)> {
        let is_archive = ArchiveGateway::is_archive(source);
        reporter.progress("scan", &source.display().to_string(), 0, 0);

        let (entries, is_encrypted) = if is_archive {
            let is_encrypted = if extract_previews {
                self.archives.is_encrypted(source).unwrap_or_else(|e| {
                    log::warn!("Encryption check failed for {}: {e}", source.display());
                    false
                })
            } else {
                false
            };
            (self.list_archive_entries(source)?, is_encrypted)
        } else {
            (self.walk_folder(source)?, false)
        };

        let snapshot = DirectorySnapshot::capture(&self.gateway, spec);

        let mut candidates = Vec::new();
        let mut cosmetics = Vec::new();
        for entry in entries {
            if cosmetic::is_cosmetic_entry(&entry.rel) {
                cosmetics.push(entry);
            } else {
                candidates.push(entry);
            }
        }

        let groups = if spec.repeated_file_names {
            repeated::group_entries(&candidates, &snapshot)
        } else {
            unique::group_entries(&candidates, &snapshot)
        };

        let last_modified = self
            .gateway
            .last_modified(source)
            .unwrap_or_else(|_| Utc::now());

        let cosmetic_ctx = CosmeticContext {
            gateway: &self.gateway,
            archives: &self.archives,
            layout: &self.layout,
            source,
            is_archive,
            password: None,
        };

        let keys: Vec<String> = groups.iter().map(|g| g.key.clone()).collect();
        let assigned = assign_cosmetics(&cosmetics, &keys);

        let total = groups.len();
        let mut units = Vec::new();
        for (i, group) in groups.into_iter().enumerate() {
            if is_cancelled(cancel) {
                return Ok((units, true));
            }
            // Empty groups cannot come out of the strategies, but the
            // invariant is cheap to hold here too.
            if group.files.is_empty() {
                continue;
            }

            reporter.progress("identify", &group.key, i + 1, total);

            let assets = cosmetic::collect(
                &cosmetic_ctx,
                &assigned[i],
                &cosmetic::cache_key(source, &group.key),
                extract_previews && !is_encrypted,
            );

            let unit = self.build_unit(
                source,
                &snapshot,
                group,
                assets,
                is_archive,
                is_encrypted,
                last_modified,
            );
            reporter.item_found(&unit);
            units.push(unit);
        }

        Ok((units, false))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_unit(
        &self,
        source: &Path,
        snapshot: &DirectorySnapshot,
        group: RawGroup,
        assets: cosmetic::CosmeticAssets,
        is_archive: bool,
        is_encrypted: bool,
        last_modified: chrono::DateTime<Utc>,
    ) -> ModUnit {
        let mod_type = group
            .files
            .first()
            .and_then(|f| snapshot.listing(f.dir_index))
            .map(|l| l.mod_type.clone())
            .unwrap_or_default();

        let mut mod_files = Vec::with_capacity(group.files.len());
        let mut game_files_path = Vec::with_capacity(group.files.len());
        for file in &group.files {
            mod_files.push(file.raw.clone());
            game_files_path.push(file.dest.clone());
        }

        let virtual_path = if group.key.is_empty() {
            None
        } else {
            Some(source.join(&group.key))
        };

        ModUnit {
            id: Uuid::new_v4(),
            source_path: source.to_path_buf(),
            mod_files,
            game_files_path,
            name: display_name(source, &group.key),
            group_key: group.key,
            virtual_path,
            mod_type,
            is_archive,
            is_encrypted,
            password: None,
            icon: assets.icon,
            images: assets.images,
            readme: assets.readme,
            description: assets.description,
            is_enabled: false,
            last_modified,
        }
    }

    /// Reconcile previously known units against the current state of their
    /// sources. Units whose source vanished are dropped unless they are
    /// enabled; an enabled unit with a missing source is surfaced for the
    /// caller to resolve, never silently deleted.
    pub fn reconcile_units(&self, units: Vec<ModUnit>) -> RescanReport {
        let mut report = RescanReport::default();
        for unit in units {
            let present = self.gateway.exists(&unit.source_path).unwrap_or(false);
            if present {
                report.retained.push(unit);
            } else if unit.is_enabled {
                log::warn!(
                    "Source missing for enabled unit {}: {}",
                    unit.name,
                    unit.source_path.display()
                );
                report.missing_enabled.push(unit);
            } else {
                log::info!("Dropping unit {}: source gone", unit.name);
                report.removed.push(unit);
            }
        }
        report
    }

    /// Re-extract a unit's cosmetic previews now that its archive password
    /// is known, replacing the raw entry references kept at identification
    /// time with cache paths and readme text.
    pub fn refresh_previews(&self, unit: &mut ModUnit, password: &str) -> ModResult<()> {
        let listed = self
            .archives
            .list_entries(&unit.source_path, Some(password))
            .map_err(|e| ModError::DecryptFailed(format!("{}: {e}", unit.source_path.display())))?;

        let cosmetics: Vec<SourceEntry> = listed
            .into_iter()
            .filter(|e| !e.is_dir && cosmetic::is_cosmetic_entry(&e.name))
            .map(|e| SourceEntry {
                raw: e.name.clone(),
                rel: e.name,
            })
            .collect();

        // Prefer cosmetics sitting under this unit's own group key; a pack
        // whose cosmetics live at the root shares them.
        let claimed: Vec<&SourceEntry> = cosmetics
            .iter()
            .filter(|c| {
                !unit.group_key.is_empty() && c.rel.starts_with(&format!("{}/", unit.group_key))
            })
            .collect();
        let selected = if claimed.is_empty() {
            cosmetics.iter().collect()
        } else {
            claimed
        };

        let ctx = CosmeticContext {
            gateway: &self.gateway,
            archives: &self.archives,
            layout: &self.layout,
            source: &unit.source_path,
            is_archive: true,
            password: Some(password),
        };
        let assets = cosmetic::collect(
            &ctx,
            &selected,
            &cosmetic::cache_key(&unit.source_path, &unit.group_key),
            true,
        );

        unit.icon = assets.icon;
        unit.images = assets.images;
        unit.readme = assets.readme;
        unit.description = assets.description;
        unit.password = Some(password.to_string());
        Ok(())
    }

    fn list_archive_entries(&self, source: &Path) -> ModResult<Vec<SourceEntry>> {
        let listed = self.archives.list_entries(source, None).map_err(|e| match e {
            ArchiveError::EncryptedNeedPassword(m) | ArchiveError::WrongPassword(m) => {
                ModError::DecryptFailed(m)
            }
            other => ModError::ReadFailed(other.to_string()),
        })?;
        Ok(listed
            .into_iter()
            .filter(|e| !e.is_dir)
            .map(|e| SourceEntry {
                raw: e.name.clone(),
                rel: e.name,
            })
            .collect())
    }

    fn walk_folder(&self, source: &Path) -> ModResult<Vec<SourceEntry>> {
        if !source.is_dir() {
            return Err(ModError::FileMissing(source.display().to_string()));
        }
        let mut entries = Vec::new();
        for entry in walkdir::WalkDir::new(source)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let rel = path
                .strip_prefix(source)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            entries.push(SourceEntry {
                raw: path.to_string_lossy().to_string(),
                rel,
            });
        }
        Ok(entries)
    }
}

/// Human-readable unit name: `source(parts|joined)`, collapsing to the bare
/// source name when the group key is empty.
fn display_name(source: &Path, group_key: &str) -> String {
    let base = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| source.display().to_string());
    if group_key.is_empty() {
        return base;
    }
    let parts: Vec<&str> = group_key.split('/').filter(|s| !s.is_empty()).collect();
    if parts.is_empty() {
        base
    } else {
        format!("{base}({})", parts.join("|"))
    }
}

/// Cosmetics belong to the group whose key prefixes their path; anything no
/// group claims falls to the first group, so a pack-level readme or icon
/// still surfaces somewhere.
fn assign_cosmetics<'a>(
    cosmetics: &'a [SourceEntry],
    keys: &[String],
) -> Vec<Vec<&'a SourceEntry>> {
    let mut assigned: Vec<Vec<&SourceEntry>> = vec![Vec::new(); keys.len()];
    if keys.is_empty() {
        return assigned;
    }
    for entry in cosmetics {
        let claimed = keys
            .iter()
            .position(|key| !key.is_empty() && entry.rel.starts_with(&format!("{key}/")));
        match claimed {
            Some(i) => assigned[i].push(entry),
            None => assigned[0].push(entry),
        }
    }
    assigned
}

/// Async entry point: runs identification on the blocking pool, streaming
/// progress and found units into `events`.
pub async fn identify_source_async(
    engine: Arc<ModIdentificationEngine>,
    source: PathBuf,
    spec: GameDirectorySpec,
    events: UnboundedSender<ProgressEvent>,
    cancel: CancelFlag,
) -> BatchOutcome<Vec<ModUnit>, ModError> {
    let reporter = Reporter::new(events);
    match tokio::task::spawn_blocking(move || {
        engine.identify_source(&source, &spec, &reporter, &cancel)
    })
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => BatchOutcome::Failed {
            partial: Vec::new(),
            error: ModError::ReadFailed(format!("Identification worker failed: {e}")),
        },
    }
}

#[cfg(test)]
#[path = "tests/identify_tests.rs"]
mod tests;
