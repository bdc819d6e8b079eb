//! Process-local level cache.

use crate::domain::levels::LevelReport;
use crate::ports::cache_port::{LevelCache, LevelCacheKey};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct InMemoryLevelCache {
    entries: Mutex<HashMap<LevelCacheKey, LevelReport>>,
}

impl InMemoryLevelCache {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned map only means another thread panicked mid-insert; the
    // entries themselves are still whole reports.
    fn lock(&self) -> MutexGuard<'_, HashMap<LevelCacheKey, LevelReport>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl LevelCache for InMemoryLevelCache {
    fn get(&self, key: &LevelCacheKey) -> Option<LevelReport> {
        self.lock().get(key).cloned()
    }

    fn put(&self, key: LevelCacheKey, report: LevelReport) {
        self.lock().insert(key, report);
    }

    fn invalidate(&self, instrument: &str) {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| key.instrument != instrument);
        log::debug!(
            "invalidated {} cached level reports for {}",
            before - entries.len(),
            instrument
        );
    }

    fn clear(&self) {
        self.lock().clear();
    }
}
