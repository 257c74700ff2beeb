//! Per-project batch guard.
//!
//! A project's batch run rewrites its document after every step, so two
//! runs on one project would race. The guard hands out at most one
//! [`BatchPermit`] per project; the permit is released on drop.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use picturebook_core::error::CoreError;

#[derive(Debug, Clone, Default)]
pub struct BatchGuard {
    active: Arc<Mutex<HashSet<String>>>,
}

impl BatchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `project_id`, or fail with [`CoreError::Conflict`] when a
    /// batch for it is already running.
    pub fn try_acquire(&self, project_id: &str) -> Result<BatchPermit, CoreError> {
        if !self.lock().insert(project_id.to_string()) {
            return Err(CoreError::Conflict(format!(
                "Illustration generation already in progress for project {project_id}"
            )));
        }
        Ok(BatchPermit {
            project_id: project_id.to_string(),
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_active(&self, project_id: &str) -> bool {
        self.lock().contains(project_id)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Exclusive right to run a batch for one project.
#[derive(Debug)]
pub struct BatchPermit {
    project_id: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl BatchPermit {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

impl Drop for BatchPermit {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.project_id);
    }
}
