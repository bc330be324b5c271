use std::future::Future;

use crate::{HistoryEntry, QueueEntry};

pub mod kv;
pub mod memory;

/// Number of finished entries retained for deduplication
pub const HISTORY_LIMIT: usize = 500;

/// Raw persistence for the pending queue and the processed history.
///
/// Implementations treat both as opaque lists: the queue is read and written
/// wholesale, history is append-only (newest first) and capped at
/// [`HISTORY_LIMIT`].
pub trait QueueStore {
    fn load_entries(&self) -> impl Future<Output = anyhow::Result<Vec<QueueEntry>>> + Send;

    fn save_entries(
        &self,
        entries: &[QueueEntry],
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn load_history(&self) -> impl Future<Output = anyhow::Result<Vec<HistoryEntry>>> + Send;

    fn push_history(&self, entry: &HistoryEntry)
        -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl<T: QueueStore + Send + Sync> QueueStore for &T {
    async fn load_entries(&self) -> anyhow::Result<Vec<QueueEntry>> {
        (**self).load_entries().await
    }

    async fn save_entries(&self, entries: &[QueueEntry]) -> anyhow::Result<()> {
        (**self).save_entries(entries).await
    }

    async fn load_history(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        (**self).load_history().await
    }

    async fn push_history(&self, entry: &HistoryEntry) -> anyhow::Result<()> {
        (**self).push_history(entry).await
    }
}

/// Runtime selected backend: the KV REST store when credentials are present,
/// otherwise a process-local store
#[derive(Debug, Clone)]
pub enum QueueBackend {
    Kv(kv::KvQueueStore),
    Memory(memory::MemoryQueueStore),
}

impl QueueBackend {
    pub fn name(&self) -> &'static str {
        match self {
            QueueBackend::Kv(_) => "kv",
            QueueBackend::Memory(_) => "memory",
        }
    }
}

impl QueueStore for QueueBackend {
    async fn load_entries(&self) -> anyhow::Result<Vec<QueueEntry>> {
        match self {
            QueueBackend::Kv(store) => store.load_entries().await,
            QueueBackend::Memory(store) => store.load_entries().await,
        }
    }

    async fn save_entries(&self, entries: &[QueueEntry]) -> anyhow::Result<()> {
        match self {
            QueueBackend::Kv(store) => store.save_entries(entries).await,
            QueueBackend::Memory(store) => store.save_entries(entries).await,
        }
    }

    async fn load_history(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        match self {
            QueueBackend::Kv(store) => store.load_history().await,
            QueueBackend::Memory(store) => store.load_history().await,
        }
    }

    async fn push_history(&self, entry: &HistoryEntry) -> anyhow::Result<()> {
        match self {
            QueueBackend::Kv(store) => store.push_history(entry).await,
            QueueBackend::Memory(store) => store.push_history(entry).await,
        }
    }
}
