use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use chrono::{TimeZone, Utc};
use content_pulse::yt::VideoLister;
use content_queue::VideoRef;

/// Returns every video it holds, whatever the source and bound, so callers
/// have to apply their own bound. The requested bound is recorded per call.
#[derive(Clone)]
pub struct MockVideoLister {
    pub videos: Vec<VideoRef>,
    /// `(kind, id, max_results)` per call
    pub calls: Arc<Mutex<Vec<(String, String, usize)>>>,
    pub failing_ids: HashSet<String>,
}

impl MockVideoLister {
    pub fn new(videos: Vec<VideoRef>) -> Self {
        Self {
            videos,
            calls: Arc::new(Mutex::new(Vec::new())),
            failing_ids: HashSet::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Lookups for `id` fail, as a quota or not found error would
    pub fn failing_for(mut self, id: &str) -> Self {
        self.failing_ids.insert(id.to_string());
        self
    }

    fn list(&self, kind: &str, id: &str, max_results: usize) -> anyhow::Result<Vec<VideoRef>> {
        self.calls
            .lock()
            .unwrap()
            .push((kind.to_string(), id.to_string(), max_results));
        if self.failing_ids.contains(id) {
            anyhow::bail!("quotaExceeded for {id}");
        }
        Ok(self.videos.clone())
    }
}

/// `count` videos with ids `vid000000NN`, the first one published earliest
pub fn dated_videos(count: u32) -> Vec<VideoRef> {
    (0..count)
        .map(|i| {
            VideoRef::new(format!("vid{i:08}"))
                .with_title(format!("Episode {i}"))
                .published_at(Utc.with_ymd_and_hms(2025, 1, 1 + i, 12, 0, 0).unwrap())
        })
        .collect()
}

impl VideoLister for MockVideoLister {
    type Error = anyhow::Error;

    async fn channel_videos(
        &self,
        channel_id: &str,
        max_results: usize,
    ) -> Result<Vec<VideoRef>, Self::Error> {
        self.list("channel", channel_id, max_results)
    }

    async fn playlist_videos(
        &self,
        playlist_id: &str,
        max_results: usize,
    ) -> Result<Vec<VideoRef>, Self::Error> {
        self.list("playlist", playlist_id, max_results)
    }

    async fn search_videos(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<VideoRef>, Self::Error> {
        self.list("search", query, max_results)
    }
}
