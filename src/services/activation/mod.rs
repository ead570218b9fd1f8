//! Activation: streaming mod file bytes into game paths.
//!
//! Pure install. Backup and restore live in the backup engine; `disable`
//! here is a pass-through so the layering stays honest.

pub mod md5_stream;

use crate::services::archive::ArchiveGateway;
use crate::services::gateway::FileGateway;
use crate::types::errors::{ModError, ModResult};
use crate::types::events::{is_cancelled, BatchOutcome, CancelFlag, ProgressEvent, Reporter};
use crate::types::mod_unit::ModUnit;
use md5_stream::Md5Reader;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

pub type ActivationHashes = HashMap<PathBuf, String>;

pub struct ActivationEngine {
    gateway: Arc<FileGateway>,
    archives: Arc<ArchiveGateway>,
}

impl ActivationEngine {
    pub fn new(gateway: Arc<FileGateway>, archives: Arc<ArchiveGateway>) -> Self {
        Self { gateway, archives }
    }

    /// Stream every mod file into its paired game path, hashing the bytes in
    /// the same pass. On the first failure the whole operation reports that
    /// destination and returns an empty hash map; files already written stay
    /// written (no rollback). Full success returns `game path -> md5` for
    /// every file.
    pub fn enable(
        &self,
        unit: &ModUnit,
        reporter: &Reporter,
        cancel: &CancelFlag,
    ) -> BatchOutcome<ActivationHashes, ModError> {
        if !unit.has_valid_pairing() {
            return BatchOutcome::Failed {
                partial: HashMap::new(),
                error: ModError::InvalidModData(format!(
                    "{}: {} mod files vs {} game paths",
                    unit.name,
                    unit.mod_files.len(),
                    unit.game_files_path.len()
                )),
            };
        }

        let total = unit.mod_files.len();
        let mut hashes = HashMap::new();
        for (i, (mod_file, game_path)) in unit
            .mod_files
            .iter()
            .zip(unit.game_files_path.iter())
            .enumerate()
        {
            if is_cancelled(cancel) {
                log::info!("Enable cancelled after {i}/{total} files for {}", unit.name);
                return BatchOutcome::Cancelled(hashes);
            }
            reporter.progress("enable", mod_file, i + 1, total);

            match self.write_one(unit, mod_file, game_path) {
                Ok(digest) => {
                    hashes.insert(game_path.clone(), digest);
                }
                Err(error) => {
                    log::warn!("Enable failed at {}: {error}", game_path.display());
                    // A half-applied hash map must never leak into enabled
                    // state.
                    return BatchOutcome::Failed {
                        partial: HashMap::new(),
                        error: ModError::EnableFailed(format!(
                            "{}: {error}",
                            game_path.display()
                        )),
                    };
                }
            }
        }

        BatchOutcome::Completed(hashes)
    }

    /// File restoration on disable is the backup engine's job; activation
    /// itself has nothing to undo.
    pub fn disable(&self, unit: &ModUnit) -> ModResult<()> {
        log::debug!("Disable pass-through for {}", unit.name);
        Ok(())
    }

    fn open_source(&self, unit: &ModUnit, mod_file: &str) -> ModResult<Box<dyn Read + Send>> {
        if unit.is_archive {
            let stream = self
                .archives
                .open_entry_stream(&unit.source_path, mod_file, unit.password.as_deref())
                .map_err(|e| ModError::ReadFailed(format!("{mod_file}: {e}")))?;
            Ok(Box::new(stream))
        } else {
            self.gateway
                .open_read(Path::new(mod_file))
                .map_err(|e| ModError::ReadFailed(format!("{mod_file}: {e}")))
        }
    }

    fn write_one(&self, unit: &ModUnit, mod_file: &str, game_path: &Path) -> ModResult<String> {
        let source = self.open_source(unit, mod_file)?;
        let mut hashing = Md5Reader::new(source);
        self.gateway
            .create_from_reader(game_path, &mut hashing)
            .map_err(|e| ModError::WriteFailed(format!("{}: {e}", game_path.display())))?;
        Ok(hashing.finalize())
    }
}

/// Async entry point on the blocking pool.
pub async fn enable_async(
    engine: Arc<ActivationEngine>,
    unit: ModUnit,
    events: UnboundedSender<ProgressEvent>,
    cancel: CancelFlag,
) -> BatchOutcome<ActivationHashes, ModError> {
    let reporter = Reporter::new(events);
    match tokio::task::spawn_blocking(move || engine.enable(&unit, &reporter, &cancel)).await {
        Ok(outcome) => outcome,
        Err(e) => BatchOutcome::Failed {
            partial: HashMap::new(),
            error: ModError::EnableFailed(format!("Activation worker failed: {e}")),
        },
    }
}

#[cfg(test)]
#[path = "tests/activation_tests.rs"]
mod tests;
