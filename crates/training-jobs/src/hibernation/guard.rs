use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::job::JobKey;

/// Jobs with a hibernation change currently being applied
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    keys: Arc<Mutex<HashSet<JobKey>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` if the job already has a change in flight
    pub fn try_acquire(&self, key: JobKey) -> Option<InFlightGuard> {
        let mut keys = self.keys.lock().unwrap_or_else(|p| p.into_inner());
        if !keys.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            keys: Arc::clone(&self.keys),
            key,
        })
    }

    pub fn contains(&self, key: &JobKey) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(key)
    }
}

/// Releases the job's slot when dropped
#[derive(Debug)]
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<JobKey>>>,
    key: JobKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.key);
    }
}
