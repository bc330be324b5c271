use std::collections::HashSet;

use anyhow::Context;
use itertools::Itertools;
use serde::Serialize;

use crate::{datastore::QueueStore, HistoryEntry, QueueEntry, QueueStatus, VideoRef};

/// Entries that failed this many times are no longer picked up automatically
pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    Added,
    AlreadyQueued,
    AlreadyProcessed,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub entries: Vec<QueueEntry>,
    pub history: Vec<HistoryEntry>,
}

/// Dedup and approval semantics on top of a [`QueueStore`].
///
/// Every mutation is a read followed by a write of the whole queue, there is
/// no transaction around the pair.
#[derive(Debug, Clone)]
pub struct Queue<S> {
    store: S,
}

impl<S> Queue<S>
where
    S: QueueStore + Send + Sync,
{
    pub fn new(store: S) -> Self {
        Queue { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn entries(&self) -> anyhow::Result<Vec<QueueEntry>> {
        self.store.load_entries().await
    }

    pub async fn history(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        self.store.load_history().await
    }

    pub async fn snapshot(&self) -> anyhow::Result<QueueSnapshot> {
        Ok(QueueSnapshot {
            entries: self.entries().await?,
            history: self.history().await?,
        })
    }

    /// Ids currently queued or already processed
    pub async fn known_ids(&self) -> anyhow::Result<HashSet<String>> {
        let queued = self.entries().await.context("Failed to read queue")?;
        let history = self.history().await.context("Failed to read history")?;

        Ok(queued
            .iter()
            .map(|e| e.video_id().to_string())
            .chain(history.iter().map(|h| h.video_id().to_string()))
            .collect())
    }

    #[tracing::instrument(skip(self, video), fields(video_id = %video.video_id))]
    pub async fn add(&self, video: VideoRef, client: &str) -> anyhow::Result<AddOutcome> {
        let history = self.history().await?;
        if history.iter().any(|h| h.video_id() == video.video_id) {
            tracing::debug!("Video already processed");
            return Ok(AddOutcome::AlreadyProcessed);
        }

        let mut entries = self.entries().await?;
        if entries.iter().any(|e| e.video_id() == video.video_id) {
            tracing::debug!("Video already queued");
            return Ok(AddOutcome::AlreadyQueued);
        }

        entries.push(QueueEntry::new(video, client));
        self.store.save_entries(&entries).await?;
        tracing::info!(client, "Video queued");

        Ok(AddOutcome::Added)
    }

    /// Queues every video not yet known, returns the ones that were added
    pub async fn add_many(
        &self,
        videos: Vec<VideoRef>,
        client: &str,
    ) -> anyhow::Result<Vec<VideoRef>> {
        let mut known = self.known_ids().await?;
        let mut entries = self.entries().await?;

        let added = videos
            .into_iter()
            .filter(|v| known.insert(v.video_id.clone()))
            .collect::<Vec<_>>();

        if added.is_empty() {
            return Ok(added);
        }

        entries.extend(added.iter().cloned().map(|v| QueueEntry::new(v, client)));
        self.store.save_entries(&entries).await?;
        tracing::info!(count = added.len(), client, "Videos queued");

        Ok(added)
    }

    /// Replaces the queue with `videos`, dropping duplicates and anything in
    /// history. Entries that stay keep their status.
    pub async fn replace(&self, videos: Vec<VideoRef>, client: &str) -> anyhow::Result<usize> {
        let processed = self
            .history()
            .await?
            .into_iter()
            .map(|h| h.video_id().to_string())
            .collect::<HashSet<_>>();
        let current = self.entries().await?;

        let entries = videos
            .into_iter()
            .filter(|v| !processed.contains(&v.video_id))
            .unique_by(|v| v.video_id.clone())
            .map(|v| {
                current
                    .iter()
                    .find(|e| e.video_id() == v.video_id)
                    .cloned()
                    .unwrap_or_else(|| QueueEntry::new(v, client))
            })
            .collect::<Vec<_>>();

        self.store.save_entries(&entries).await?;
        Ok(entries.len())
    }

    async fn update<F>(&self, video_id: &str, f: F) -> anyhow::Result<Option<QueueEntry>>
    where
        F: FnOnce(&mut QueueEntry),
    {
        let mut entries = self.entries().await?;
        let Some(entry) = entries.iter_mut().find(|e| e.video_id() == video_id) else {
            return Ok(None);
        };
        f(entry);
        let updated = entry.clone();

        self.store.save_entries(&entries).await?;
        Ok(Some(updated))
    }

    /// Moves a pending entry to approved. `None` when the id is not queued.
    #[tracing::instrument(skip(self))]
    pub async fn approve(&self, video_id: &str) -> anyhow::Result<Option<QueueEntry>> {
        self.update(video_id, |e| {
            if e.status == QueueStatus::Pending {
                e.status = QueueStatus::Approved;
            }
            // a manual approval also clears the failure budget
            e.attempts = 0;
            e.last_error = None;
        })
        .await
    }

    /// Drops an entry without recording it in history
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, video_id: &str) -> anyhow::Result<Option<QueueEntry>> {
        let mut entries = self.entries().await?;
        let Some(idx) = entries.iter().position(|e| e.video_id() == video_id) else {
            return Ok(None);
        };
        let removed = entries.remove(idx);

        self.store.save_entries(&entries).await?;
        Ok(Some(removed))
    }

    /// First entry eligible for processing, in queue order
    pub async fn next_ready(&self, require_approval: bool) -> anyhow::Result<Option<QueueEntry>> {
        let entries = self.entries().await?;

        Ok(entries.into_iter().find(|e| {
            let status_ok = match e.status {
                QueueStatus::Approved => true,
                QueueStatus::Pending => !require_approval,
                QueueStatus::Posted => false,
            };
            status_ok && e.attempts < MAX_ATTEMPTS
        }))
    }

    pub async fn record_failure(&self, video_id: &str, error: &str) -> anyhow::Result<()> {
        self.update(video_id, |e| {
            e.attempts += 1;
            e.last_error = Some(error.to_string());
        })
        .await?;
        Ok(())
    }

    /// Appends the entry to history as posted, then removes it from the queue.
    /// History is written first: a failed write leaves the entry queued.
    #[tracing::instrument(skip(self))]
    pub async fn complete(
        &self,
        video_id: &str,
        image_url: Option<String>,
    ) -> anyhow::Result<Option<HistoryEntry>> {
        let entries = self.entries().await?;
        let Some(entry) = entries.into_iter().find(|e| e.video_id() == video_id) else {
            tracing::warn!("Completed entry was no longer queued");
            return Ok(None);
        };

        let record = HistoryEntry::posted(entry, image_url);
        self.store
            .push_history(&record)
            .await
            .context("Failed to record history")?;
        self.remove(video_id)
            .await
            .context("Failed to remove completed entry")?;

        Ok(Some(record))
    }

    /// Flags an entry as posted in place. Posted entries are never picked up
    /// again and still block re-adding the same video.
    #[tracing::instrument(skip(self))]
    pub async fn mark_posted(&self, video_id: &str) -> anyhow::Result<Option<QueueEntry>> {
        self.update(video_id, |e| e.status = QueueStatus::Posted).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryQueueStore;

    fn queue() -> Queue<MemoryQueueStore> {
        Queue::new(MemoryQueueStore::new())
    }

    /// Memory store whose history writes always fail
    struct HistoryDown(MemoryQueueStore);

    impl QueueStore for HistoryDown {
        async fn load_entries(&self) -> anyhow::Result<Vec<QueueEntry>> {
            self.0.load_entries().await
        }

        async fn save_entries(&self, entries: &[QueueEntry]) -> anyhow::Result<()> {
            self.0.save_entries(entries).await
        }

        async fn load_history(&self) -> anyhow::Result<Vec<HistoryEntry>> {
            self.0.load_history().await
        }

        async fn push_history(&self, _entry: &HistoryEntry) -> anyhow::Result<()> {
            anyhow::bail!("kv down")
        }
    }

    #[tokio::test]
    async fn test_add_rejects_duplicates() {
        let queue = queue();

        let first = queue.add(VideoRef::new("aaaaaaaaaaa"), "acme").await.unwrap();
        let second = queue.add(VideoRef::new("aaaaaaaaaaa"), "other").await.unwrap();

        assert_eq!(first, AddOutcome::Added);
        assert_eq!(second, AddOutcome::AlreadyQueued);
        assert_eq!(queue.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_rejects_processed_videos() {
        let queue = queue();
        queue.add(VideoRef::new("aaaaaaaaaaa"), "acme").await.unwrap();
        queue.complete("aaaaaaaaaaa", None).await.unwrap();

        let outcome = queue.add(VideoRef::new("aaaaaaaaaaa"), "acme").await.unwrap();
        assert_eq!(outcome, AddOutcome::AlreadyProcessed);
        assert!(queue.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_many_skips_known_and_repeated_ids() {
        let queue = queue();
        queue.add(VideoRef::new("aaaaaaaaaaa"), "acme").await.unwrap();

        let added = queue
            .add_many(
                vec![
                    VideoRef::new("aaaaaaaaaaa"),
                    VideoRef::new("bbbbbbbbbbb"),
                    VideoRef::new("bbbbbbbbbbb"),
                    VideoRef::new("ccccccccccc"),
                ],
                "acme",
            )
            .await
            .unwrap();

        let ids = added.iter().map(|v| v.video_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["bbbbbbbbbbb", "ccccccccccc"]);
        assert_eq!(queue.entries().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_next_ready_respects_approval() {
        let queue = queue();
        queue.add(VideoRef::new("aaaaaaaaaaa"), "acme").await.unwrap();
        queue.add(VideoRef::new("bbbbbbbbbbb"), "acme").await.unwrap();

        assert!(queue.next_ready(true).await.unwrap().is_none());
        assert_eq!(
            queue.next_ready(false).await.unwrap().unwrap().video_id(),
            "aaaaaaaaaaa"
        );

        queue.approve("bbbbbbbbbbb").await.unwrap();
        assert_eq!(
            queue.next_ready(true).await.unwrap().unwrap().video_id(),
            "bbbbbbbbbbb"
        );
    }

    #[tokio::test]
    async fn test_approve_unknown_id_returns_none() {
        let queue = queue();
        assert!(queue.approve("zzzzzzzzzzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_entries_are_skipped_after_max_attempts() {
        let queue = queue();
        queue.add(VideoRef::new("aaaaaaaaaaa"), "acme").await.unwrap();
        queue.add(VideoRef::new("bbbbbbbbbbb"), "acme").await.unwrap();

        for _ in 0..MAX_ATTEMPTS {
            queue.record_failure("aaaaaaaaaaa", "boom").await.unwrap();
        }

        let next = queue.next_ready(false).await.unwrap().unwrap();
        assert_eq!(next.video_id(), "bbbbbbbbbbb");

        let failed = queue.entries().await.unwrap().remove(0);
        assert_eq!(failed.attempts, MAX_ATTEMPTS);
        assert_eq!(failed.last_error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_complete_moves_entry_to_history() {
        let queue = queue();
        queue.add(VideoRef::new("aaaaaaaaaaa"), "acme").await.unwrap();

        let record = queue
            .complete("aaaaaaaaaaa", Some("https://img".into()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.entry.status, QueueStatus::Posted);
        let snapshot = queue.snapshot().await.unwrap();
        assert!(snapshot.entries.is_empty());
        assert_eq!(snapshot.history.len(), 1);
        assert!(queue.known_ids().await.unwrap().contains("aaaaaaaaaaa"));
    }

    #[tokio::test]
    async fn test_replace_keeps_existing_status_and_drops_history() {
        let queue = queue();
        queue.add(VideoRef::new("aaaaaaaaaaa"), "acme").await.unwrap();
        queue.add(VideoRef::new("bbbbbbbbbbb"), "acme").await.unwrap();
        queue.approve("aaaaaaaaaaa").await.unwrap();
        queue.complete("bbbbbbbbbbb", None).await.unwrap();

        let kept = queue
            .replace(
                vec![
                    VideoRef::new("aaaaaaaaaaa"),
                    VideoRef::new("bbbbbbbbbbb"),
                    VideoRef::new("ccccccccccc"),
                    VideoRef::new("ccccccccccc"),
                ],
                "acme",
            )
            .await
            .unwrap();

        assert_eq!(kept, 2);
        let entries = queue.entries().await.unwrap();
        assert_eq!(entries[0].status, QueueStatus::Approved);
        assert_eq!(entries[1].video_id(), "ccccccccccc");
        assert_eq!(entries[1].status, QueueStatus::Pending);
    }

    #[tokio::test]
    async fn test_complete_keeps_entry_when_history_write_fails() {
        let queue = Queue::new(HistoryDown(MemoryQueueStore::new()));
        queue.add(VideoRef::new("aaaaaaaaaaa"), "acme").await.unwrap();

        let err = queue.complete("aaaaaaaaaaa", None).await.unwrap_err();
        assert!(format!("{err:#}").contains("kv down"));

        let entries = queue.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].video_id(), "aaaaaaaaaaa");
    }

    #[tokio::test]
    async fn test_posted_entries_are_not_picked_up_or_re_added() {
        let queue = queue();
        queue.add(VideoRef::new("aaaaaaaaaaa"), "acme").await.unwrap();

        let marked = queue.mark_posted("aaaaaaaaaaa").await.unwrap().unwrap();
        assert_eq!(marked.status, QueueStatus::Posted);

        assert!(queue.next_ready(false).await.unwrap().is_none());
        let outcome = queue.add(VideoRef::new("aaaaaaaaaaa"), "acme").await.unwrap();
        assert_eq!(outcome, AddOutcome::AlreadyQueued);
    }
}
