use content_queue::{HistoryEntry, MemoryQueueStore, QueueEntry, QueueStore};

/// Memory backed store whose writes can be made to fail
#[derive(Clone)]
pub struct MockQueueStore {
    pub inner: MemoryQueueStore,
    pub save_error: Option<String>,
    pub history_error: Option<String>,
}

impl MockQueueStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryQueueStore::new(),
            save_error: None,
            history_error: None,
        }
    }

    pub fn failing_saves(msg: &str) -> Self {
        Self {
            save_error: Some(msg.to_string()),
            ..Self::new()
        }
    }

    pub fn failing_history(msg: &str) -> Self {
        Self {
            history_error: Some(msg.to_string()),
            ..Self::new()
        }
    }
}

impl QueueStore for MockQueueStore {
    async fn load_entries(&self) -> anyhow::Result<Vec<QueueEntry>> {
        self.inner.load_entries().await
    }

    async fn save_entries(&self, entries: &[QueueEntry]) -> anyhow::Result<()> {
        if let Some(ref msg) = self.save_error {
            anyhow::bail!("{}", msg);
        }
        self.inner.save_entries(entries).await
    }

    async fn load_history(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        self.inner.load_history().await
    }

    async fn push_history(&self, entry: &HistoryEntry) -> anyhow::Result<()> {
        if let Some(ref msg) = self.history_error {
            anyhow::bail!("{}", msg);
        }
        self.inner.push_history(entry).await
    }
}
