use crate::types::mod_unit::ModUnit;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Non-terminal events emitted on a per-invocation, single-consumer channel
/// while a long operation runs. The terminal outcome is the value the
/// operation resolves to (see [`BatchOutcome`]).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress {
        step: String,
        current_item: String,
        current: usize,
        total: usize,
    },
    ItemFound {
        unit: Box<ModUnit>,
    },
    ItemUpdated {
        unit: Box<ModUnit>,
    },
}

/// Progress sink handed down into blocking pipelines. A disabled reporter
/// (probe mode) swallows everything, so inner code never branches on it.
#[derive(Clone)]
pub struct Reporter {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl Reporter {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn progress(&self, step: &str, current_item: &str, current: usize, total: usize) {
        self.emit(ProgressEvent::Progress {
            step: step.to_string(),
            current_item: current_item.to_string(),
            current,
            total,
        });
    }

    pub fn item_found(&self, unit: &ModUnit) {
        self.emit(ProgressEvent::ItemFound {
            unit: Box::new(unit.clone()),
        });
    }

    pub fn item_updated(&self, unit: &ModUnit) {
        self.emit(ProgressEvent::ItemUpdated {
            unit: Box::new(unit.clone()),
        });
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // A dropped receiver only means nobody is watching anymore.
            let _ = tx.send(event);
        }
    }
}

/// Cooperative cancellation flag checked at every suspension point.
pub type CancelFlag = Arc<AtomicBool>;

pub fn new_cancel_flag() -> CancelFlag {
    Arc::new(AtomicBool::new(false))
}

pub fn is_cancelled(flag: &AtomicBool) -> bool {
    flag.load(Ordering::Relaxed)
}

/// Terminal outcome of a batch pipeline. Work completed before a failure or
/// a cancellation is always carried out of the operation, never discarded.
#[derive(Debug, Clone)]
pub enum BatchOutcome<T, E> {
    Completed(T),
    Cancelled(T),
    Failed { partial: T, error: E },
}

impl<T, E> BatchOutcome<T, E> {
    pub fn is_completed(&self) -> bool {
        matches!(self, BatchOutcome::Completed(_))
    }

    /// The payload regardless of how the operation ended.
    pub fn partial(&self) -> &T {
        match self {
            BatchOutcome::Completed(value) | BatchOutcome::Cancelled(value) => value,
            BatchOutcome::Failed { partial, .. } => partial,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            BatchOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}
