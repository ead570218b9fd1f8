//! Relocating valid mod archives from arbitrary external folders into the
//! managed mod root.

use crate::services::archive::ArchiveGateway;
use crate::services::gateway::FileGateway;
use crate::services::identify::ModIdentificationEngine;
use crate::types::errors::ModError;
use crate::types::events::{is_cancelled, BatchOutcome, CancelFlag, ProgressEvent, Reporter};
use crate::types::game_spec::GameDirectorySpec;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Outcome of one transfer sweep. Per-item failures accumulate here and do
/// not abort the remaining candidates.
#[derive(Debug, Clone, Default)]
pub struct TransferReport {
    pub moved: Vec<PathBuf>,
    pub failures: Vec<(String, String)>,
}

pub struct SourceTransferService {
    gateway: Arc<FileGateway>,
    identifier: Arc<ModIdentificationEngine>,
}

impl SourceTransferService {
    pub fn new(gateway: Arc<FileGateway>, identifier: Arc<ModIdentificationEngine>) -> Self {
        Self {
            gateway,
            identifier,
        }
    }

    /// Scan each candidate folder one level deep for archives, keep those
    /// that identify as at least one non-empty mod unit, and move them into
    /// the managed mod root, overwriting same-named files.
    pub fn scan_and_transfer(
        &self,
        folders: &[PathBuf],
        spec: &GameDirectorySpec,
        reporter: &Reporter,
        cancel: &CancelFlag,
    ) -> BatchOutcome<TransferReport, ModError> {
        let mut report = TransferReport::default();
        let total_dirs = folders.len();

        for (d, folder) in folders.iter().enumerate() {
            if is_cancelled(cancel) {
                return BatchOutcome::Cancelled(report);
            }
            reporter.progress("scan_folder", &folder.display().to_string(), d + 1, total_dirs);

            let entries = match self.gateway.list_entries(folder) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("Skipping unreadable folder {}: {e}", folder.display());
                    report
                        .failures
                        .push((folder.display().to_string(), e.to_string()));
                    continue;
                }
            };

            let archives: Vec<_> = entries
                .into_iter()
                .filter(|e| !e.is_dir && ArchiveGateway::is_archive(&e.path))
                .collect();
            let total_files = archives.len();

            for (i, candidate) in archives.into_iter().enumerate() {
                if is_cancelled(cancel) {
                    return BatchOutcome::Cancelled(report);
                }
                reporter.progress("transfer", &candidate.name, i + 1, total_files);

                match self.transfer_one(&candidate.path, &candidate.name, spec) {
                    Ok(Some(dest)) => report.moved.push(dest),
                    Ok(None) => {
                        log::debug!("{} does not identify as a mod source", candidate.name);
                    }
                    Err(reason) => {
                        report.failures.push((candidate.name.clone(), reason));
                    }
                }
            }
        }

        BatchOutcome::Completed(report)
    }

    /// Ok(None) means the archive is not a mod source and stays where it is.
    fn transfer_one(
        &self,
        path: &PathBuf,
        name: &str,
        spec: &GameDirectorySpec,
    ) -> Result<Option<PathBuf>, String> {
        let is_source = self
            .identifier
            .probe(path, spec)
            .map_err(|e| e.to_string())?;
        if !is_source {
            return Ok(None);
        }

        let dest = spec.mod_root.join(name);
        self.gateway
            .mkdir(&spec.mod_root)
            .map_err(|e| e.to_string())?;
        self.gateway
            .move_file(path, &dest, true)
            .map_err(|e| e.to_string())?;
        log::info!("Transferred {name} into mod root");
        Ok(Some(dest))
    }
}

/// Async entry point on the blocking pool.
pub async fn scan_and_transfer_async(
    service: Arc<SourceTransferService>,
    folders: Vec<PathBuf>,
    spec: GameDirectorySpec,
    events: UnboundedSender<ProgressEvent>,
    cancel: CancelFlag,
) -> BatchOutcome<TransferReport, ModError> {
    let reporter = Reporter::new(events);
    match tokio::task::spawn_blocking(move || {
        service.scan_and_transfer(&folders, &spec, &reporter, &cancel)
    })
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => BatchOutcome::Failed {
            partial: TransferReport::default(),
            error: ModError::CopyFailed(format!("Transfer worker failed: {e}")),
        },
    }
}

#[cfg(test)]
#[path = "tests/transfer_tests.rs"]
mod tests;
