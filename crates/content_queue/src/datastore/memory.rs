use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    datastore::{QueueStore, HISTORY_LIMIT},
    HistoryEntry, QueueEntry,
};

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<QueueEntry>,
    history: Vec<HistoryEntry>,
}

/// Process-local queue store. Contents are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueueStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl QueueStore for MemoryQueueStore {
    async fn load_entries(&self) -> anyhow::Result<Vec<QueueEntry>> {
        Ok(self.lock().entries.clone())
    }

    async fn save_entries(&self, entries: &[QueueEntry]) -> anyhow::Result<()> {
        self.lock().entries = entries.to_vec();
        Ok(())
    }

    async fn load_history(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        Ok(self.lock().history.clone())
    }

    async fn push_history(&self, entry: &HistoryEntry) -> anyhow::Result<()> {
        let mut inner = self.lock();
        inner.history.insert(0, entry.clone());
        inner.history.truncate(HISTORY_LIMIT);
        Ok(())
    }
}
