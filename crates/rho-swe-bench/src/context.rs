use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use crate::task::SweBenchTaskRef;

/// Shared handle to the benchmark task currently under evaluation.
///
/// Cloned handles share one task slot. The expected usage is a single write
/// at evaluation start followed by reads from concurrently executing tool
/// calls; the lock makes interleaved writes safe but the single-writer
/// expectation is not otherwise enforced.
#[derive(Debug, Clone, Default)]
pub struct SweBenchContext {
    current: Arc<RwLock<SweBenchTaskRef>>,
}

impl SweBenchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `instance_id` and installs it as the active task, overwriting
    /// any previous value.
    pub fn set_current_task(&self, instance_id: &str) {
        let task = SweBenchTaskRef::parse(instance_id);
        match (task.owner_repo.as_deref(), task.issue_number) {
            (Some(owner_repo), Some(issue_number)) => info!(
                repo = owner_repo,
                issue_number, "set current SWE-Bench task"
            ),
            _ => warn!(instance_id, "could not parse SWE-Bench instance id"),
        }
        *write_or_recover(&self.current) = task;
    }

    /// Snapshot of the active task; all fields absent when nothing was set
    /// or the last instance id did not parse.
    pub fn current_task(&self) -> SweBenchTaskRef {
        read_or_recover(&self.current).clone()
    }
}

fn read_or_recover<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_or_recover<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
