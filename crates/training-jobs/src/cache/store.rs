use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{job::JobKey, status::JobState};

/// Derived state per job, shared between the poller, the reconciler and the HTTP layer
///
/// A refresh swaps in a whole new map so entries for deleted jobs never linger.
#[derive(Debug, Clone, Default)]
pub struct StatusCache {
    states: Arc<RwLock<Arc<HashMap<JobKey, JobState>>>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, states: HashMap<JobKey, JobState>) {
        *self.states.write().unwrap_or_else(|p| p.into_inner()) = Arc::new(states);
    }

    /// Overwrites a single entry ahead of the next refresh
    pub fn update(&self, key: JobKey, state: JobState) {
        let mut guard = self.states.write().unwrap_or_else(|p| p.into_inner());
        Arc::make_mut(&mut *guard).insert(key, state);
    }

    pub fn get(&self, key: &JobKey) -> Option<JobState> {
        self.snapshot().get(key).copied()
    }

    pub fn snapshot(&self) -> Arc<HashMap<JobKey, JobState>> {
        Arc::clone(&self.states.read().unwrap_or_else(|p| p.into_inner()))
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// False once every entry is terminal or there are no entries
    pub fn needs_polling(&self) -> bool {
        self.snapshot().values().any(|state| !state.is_terminal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_drops_removed_jobs() {
        let cache = StatusCache::new();
        cache.replace(HashMap::from([
            (JobKey::new("a"), JobState::Running),
            (JobKey::new("b"), JobState::Queued),
        ]));
        assert_eq!(cache.len(), 2);

        cache.replace(HashMap::from([(JobKey::new("b"), JobState::Running)]));
        assert_eq!(cache.get(&JobKey::new("a")), None);
        assert_eq!(cache.get(&JobKey::new("b")), Some(JobState::Running));
    }

    #[test]
    fn snapshots_are_unaffected_by_later_writes() {
        let cache = StatusCache::new();
        cache.update(JobKey::new("a"), JobState::Running);
        let before = cache.snapshot();

        cache.update(JobKey::new("a"), JobState::Paused);
        assert_eq!(before.get(&JobKey::new("a")), Some(&JobState::Running));
        assert_eq!(cache.get(&JobKey::new("a")), Some(JobState::Paused));
    }

    #[test]
    fn polling_stops_when_everything_is_terminal() {
        let cache = StatusCache::new();
        assert!(!cache.needs_polling());

        cache.replace(HashMap::from([
            (JobKey::new("a"), JobState::Succeeded),
            (JobKey::new("b"), JobState::Running),
        ]));
        assert!(cache.needs_polling());

        cache.update(JobKey::new("b"), JobState::Failed);
        assert!(!cache.needs_polling());

        // hibernated jobs can be resumed elsewhere, so they keep the poller alive
        cache.update(JobKey::new("c"), JobState::Paused);
        assert!(cache.needs_polling());
    }
}
