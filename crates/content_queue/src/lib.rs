//! # Content Queue
//!
//! Domain types for discovered videos and the work queue that feeds the
//! content pipeline, together with the persistence layer behind it.
//!
//! The queue is stored as an opaque list in a Redis compatible REST key-value
//! store (Upstash / Vercel KV), with an in-memory fallback for local runs and
//! tests. [`Queue`] layers deduplication, approval and history on top of any
//! [`QueueStore`].

mod datastore;
mod domain;
mod queue;

pub use datastore::kv::KvQueueStore;
pub use datastore::memory::MemoryQueueStore;
pub use datastore::{QueueBackend, QueueStore, HISTORY_LIMIT};
pub use domain::{
    extract_video_id, HistoryEntry, InvalidVideoUrl, QueueEntry, QueueStatus, VideoRef,
    YOUTUBE_WATCH_BASE_URL,
};
pub use queue::{AddOutcome, Queue, QueueSnapshot, MAX_ATTEMPTS};
