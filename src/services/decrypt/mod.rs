//! Password validation and preview unlocking for encrypted sources.

use crate::services::archive::ArchiveGateway;
use crate::services::identify::ModIdentificationEngine;
use crate::types::errors::ModError;
use crate::types::events::{is_cancelled, BatchOutcome, CancelFlag, ProgressEvent, Reporter};
use crate::types::mod_unit::ModUnit;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// Units successfully updated, and per-unit failures that did not stop the
/// rest of the batch.
#[derive(Debug, Clone, Default)]
pub struct DecryptReport {
    pub updated: usize,
    pub failed: Vec<(Uuid, String)>,
}

pub struct DecryptionService {
    archives: Arc<ArchiveGateway>,
    identifier: Arc<ModIdentificationEngine>,
}

impl DecryptionService {
    pub fn new(archives: Arc<ArchiveGateway>, identifier: Arc<ModIdentificationEngine>) -> Self {
        Self {
            archives,
            identifier,
        }
    }

    /// Validate the password once, then unlock previews for every unit
    /// identified from this archive. A per-unit extraction failure is
    /// recorded and processing continues.
    pub fn decrypt_previews(
        &self,
        archive: &Path,
        password: &str,
        units: &mut [ModUnit],
        reporter: &Reporter,
        cancel: &CancelFlag,
    ) -> BatchOutcome<DecryptReport, ModError> {
        match self.archives.validate_password(archive, password) {
            Ok(true) => {}
            Ok(false) => {
                return BatchOutcome::Failed {
                    partial: DecryptReport::default(),
                    error: ModError::DecryptFailed(format!(
                        "Wrong password for {}",
                        archive.display()
                    )),
                }
            }
            Err(e) => {
                return BatchOutcome::Failed {
                    partial: DecryptReport::default(),
                    error: ModError::DecryptFailed(format!("{}: {e}", archive.display())),
                }
            }
        }

        let total = units.len();
        let mut report = DecryptReport::default();
        for (i, unit) in units.iter_mut().enumerate() {
            if is_cancelled(cancel) {
                return BatchOutcome::Cancelled(report);
            }
            reporter.progress("decrypt", &unit.name, i + 1, total);

            match self.identifier.refresh_previews(unit, password) {
                Ok(()) => {
                    report.updated += 1;
                    reporter.item_updated(unit);
                }
                Err(e) => {
                    log::warn!("Preview unlock failed for {}: {e}", unit.name);
                    report.failed.push((unit.id, e.to_string()));
                }
            }
        }

        BatchOutcome::Completed(report)
    }
}

/// Async entry point on the blocking pool. Returns the updated units along
/// with the report, since the blocking task takes ownership.
pub async fn decrypt_previews_async(
    service: Arc<DecryptionService>,
    archive: PathBuf,
    password: String,
    mut units: Vec<ModUnit>,
    events: UnboundedSender<ProgressEvent>,
    cancel: CancelFlag,
) -> (Vec<ModUnit>, BatchOutcome<DecryptReport, ModError>) {
    let reporter = Reporter::new(events);
    match tokio::task::spawn_blocking(move || {
        let outcome =
            service.decrypt_previews(&archive, &password, &mut units, &reporter, &cancel);
        (units, outcome)
    })
    .await
    {
        Ok(result) => result,
        Err(e) => (
            Vec::new(),
            BatchOutcome::Failed {
                partial: DecryptReport::default(),
                error: ModError::DecryptFailed(format!("Decrypt worker failed: {e}")),
            },
        ),
    }
}

#[cfg(test)]
#[path = "tests/decrypt_tests.rs"]
mod tests;
