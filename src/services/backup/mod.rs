//! Backup and restore of original game files.
//!
//! Backup snapshots originals into a per-package mirror tree before
//! activation overwrites them. Restore puts them back, unless the live file
//! changed since activation, in which case it is deliberately left alone.

use crate::services::gateway::FileGateway;
use crate::types::errors::ModError;
use crate::types::events::{is_cancelled, BatchOutcome, CancelFlag, ProgressEvent, Reporter};
use crate::types::game_spec::GameDirectorySpec;
use crate::types::layout::StorageLayout;
use crate::types::mod_unit::{BackupRecord, ModUnit};
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// What happened to each record during a restore pass.
#[derive(Debug, Clone, Default)]
pub struct RestoreSummary {
    pub restored: Vec<PathBuf>,
    /// Live hash no longer matched the activation-time hash; the game file
    /// was changed externally (typically a game update) and is kept as-is.
    pub skipped: Vec<PathBuf>,
}

pub struct BackupEngine {
    gateway: Arc<FileGateway>,
    layout: StorageLayout,
}

impl BackupEngine {
    pub fn new(gateway: Arc<FileGateway>, layout: StorageLayout) -> Self {
        Self { gateway, layout }
    }

    /// Mirror path for a game file: the per-package backup root plus the
    /// game file's path relative to its configured game directory.
    fn backup_path_for(&self, spec: &GameDirectorySpec, game_file: &Path) -> PathBuf {
        let package_root = self.layout.backup_root.join(&spec.package_name);
        for dir in &spec.game_directories {
            if let Ok(suffix) = game_file.strip_prefix(&dir.path) {
                let dir_name = dir
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                return package_root.join(dir_name).join(suffix);
            }
        }
        // A destination outside every configured directory still mirrors by
        // file name.
        match game_file.file_name() {
            Some(name) => package_root.join(name),
            None => package_root.join("unnamed"),
        }
    }

    /// Snapshot every game file the unit will overwrite, in unit order.
    /// A destination that does not exist yet cannot be backed up and fails
    /// the batch with FileMissing; records completed before the failure are
    /// returned as the partial set.
    pub fn backup(
        &self,
        unit: &ModUnit,
        spec: &GameDirectorySpec,
        reporter: &Reporter,
        cancel: &CancelFlag,
    ) -> BatchOutcome<Vec<BackupRecord>, ModError> {
        let total = unit.game_files_path.len();
        let mut records = Vec::new();

        for (i, game_file) in unit.game_files_path.iter().enumerate() {
            if is_cancelled(cancel) {
                log::info!("Backup cancelled after {i}/{total} files for {}", unit.name);
                return BatchOutcome::Cancelled(records);
            }
            let file_name = game_file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            reporter.progress("backup", &file_name, i + 1, total);

            match self.backup_one(unit, spec, game_file, &file_name) {
                Ok(record) => records.push(record),
                Err(error) => {
                    return BatchOutcome::Failed {
                        partial: records,
                        error,
                    }
                }
            }
        }

        BatchOutcome::Completed(records)
    }

    fn backup_one(
        &self,
        unit: &ModUnit,
        spec: &GameDirectorySpec,
        game_file: &Path,
        file_name: &str,
    ) -> Result<BackupRecord, ModError> {
        let exists = self
            .gateway
            .exists(game_file)
            .map_err(|e| ModError::BackupFailed(format!("{}: {e}", game_file.display())))?;
        if !exists {
            return Err(ModError::FileMissing(game_file.display().to_string()));
        }

        let original_md5 = self
            .gateway
            .content_md5(game_file)
            .map_err(|e| ModError::Md5CalculationFailed(format!("{}: {e}", game_file.display())))?;

        let backup_path = self.backup_path_for(spec, game_file);
        if let Some(parent) = backup_path.parent() {
            self.gateway
                .mkdir(parent)
                .map_err(|e| ModError::CreateDirectoryFailed(format!("{}: {e}", parent.display())))?;
        }
        self.gateway
            .copy(game_file, &backup_path)
            .map_err(|e| ModError::BackupFailed(format!("{}: {e}", game_file.display())))?;

        Ok(BackupRecord {
            mod_id: unit.id,
            file_name: file_name.to_string(),
            game_file_path: game_file.to_path_buf(),
            backup_path,
            original_md5,
            backup_time: Utc::now(),
        })
    }

    /// Restore backed-up originals. For each record the live game file's
    /// current hash is compared with the hash recorded when the mod was
    /// activated: a mismatch means the file was updated externally, and
    /// restoring would clobber newer game content, so that record is
    /// skipped (a reported outcome, not an error) and its backup is kept. A
    /// missing backup file is a hard failure that aborts the remaining
    /// batch.
    pub fn restore(
        &self,
        records: &[BackupRecord],
        activation_hashes: &HashMap<PathBuf, String>,
        unit: &ModUnit,
        reporter: &Reporter,
        cancel: &CancelFlag,
    ) -> BatchOutcome<RestoreSummary, ModError> {
        let total = records.len();
        let mut summary = RestoreSummary::default();

        for (i, record) in records.iter().enumerate() {
            if is_cancelled(cancel) {
                log::info!("Restore cancelled after {i}/{total} files for {}", unit.name);
                return BatchOutcome::Cancelled(summary);
            }
            reporter.progress("restore", &record.file_name, i + 1, total);

            match self.restore_one(record, activation_hashes) {
                Ok(true) => summary.restored.push(record.game_file_path.clone()),
                Ok(false) => summary.skipped.push(record.game_file_path.clone()),
                Err(error) => {
                    return BatchOutcome::Failed {
                        partial: summary,
                        error,
                    }
                }
            }
        }

        BatchOutcome::Completed(summary)
    }

    /// Returns Ok(true) when restored, Ok(false) when skipped.
    fn restore_one(
        &self,
        record: &BackupRecord,
        activation_hashes: &HashMap<PathBuf, String>,
    ) -> Result<bool, ModError> {
        let game_file = &record.game_file_path;

        let recorded = activation_hashes.get(game_file);
        let live_exists = self
            .gateway
            .exists(game_file)
            .map_err(|e| ModError::RestoreFailed(format!("{}: {e}", game_file.display())))?;

        if live_exists {
            let current = self.gateway.content_md5(game_file).map_err(|e| {
                ModError::Md5CalculationFailed(format!("{}: {e}", game_file.display()))
            })?;
            match recorded {
                Some(recorded) if *recorded == current => {}
                _ => {
                    log::info!(
                        "Skipping restore of {}: changed since activation",
                        game_file.display()
                    );
                    return Ok(false);
                }
            }
        }
        // A deleted live file cannot hold newer content; restoring it is
        // always safe.

        let backup_exists = self
            .gateway
            .exists(&record.backup_path)
            .map_err(|e| ModError::RestoreFailed(format!("{}: {e}", record.backup_path.display())))?;
        if !backup_exists {
            return Err(ModError::FileMissing(record.backup_path.display().to_string()));
        }

        self.gateway
            .copy(&record.backup_path, game_file)
            .map_err(|e| ModError::RestoreFailed(format!("{}: {e}", game_file.display())))?;

        if let Err(e) = self.gateway.delete(&record.backup_path) {
            // The original is back in place; a stale backup copy is only
            // disk noise.
            log::warn!(
                "Failed to delete consumed backup {}: {e}",
                record.backup_path.display()
            );
        }
        Ok(true)
    }
}

/// Async entry points on the blocking pool.
pub async fn backup_async(
    engine: Arc<BackupEngine>,
    unit: ModUnit,
    spec: GameDirectorySpec,
    events: UnboundedSender<ProgressEvent>,
    cancel: CancelFlag,
) -> BatchOutcome<Vec<BackupRecord>, ModError> {
    let reporter = Reporter::new(events);
    match tokio::task::spawn_blocking(move || engine.backup(&unit, &spec, &reporter, &cancel)).await
    {
        Ok(outcome) => outcome,
        Err(e) => BatchOutcome::Failed {
            partial: Vec::new(),
            error: ModError::BackupFailed(format!("Backup worker failed: {e}")),
        },
    }
}

pub async fn restore_async(
    engine: Arc<BackupEngine>,
    records: Vec<BackupRecord>,
    activation_hashes: HashMap<PathBuf, String>,
    unit: ModUnit,
    events: UnboundedSender<ProgressEvent>,
    cancel: CancelFlag,
) -> BatchOutcome<RestoreSummary, ModError> {
    let reporter = Reporter::new(events);
    match tokio::task::spawn_blocking(move || {
        engine.restore(&records, &activation_hashes, &unit, &reporter, &cancel)
    })
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => BatchOutcome::Failed {
            partial: RestoreSummary::default(),
            error: ModError::RestoreFailed(format!("Restore worker failed: {e}")),
        },
    }
}

#[cfg(test)]
#[path = "tests/backup_tests.rs"]
mod tests;
