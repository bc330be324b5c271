use std::{cmp::Reverse, fmt, sync::LazyLock};

use anyhow::Context;
use content_queue::{Queue, QueueStore, VideoRef};
use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::yt::VideoLister;

static CLIENT_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Where new videos are looked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DiscoverySource {
    Channel(String),
    Playlist(String),
    Search(String),
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoverySource::Channel(id) => write!(f, "channel:{id}"),
            DiscoverySource::Playlist(id) => write!(f, "playlist:{id}"),
            DiscoverySource::Search(query) => write!(f, "search:{query}"),
        }
    }
}

/// A watched source and the client its videos are queued for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchTarget {
    pub source: DiscoverySource,
    pub client: String,
}

impl WatchTarget {
    /// Parses a comma separated list where each item is either `id` or
    /// `client:id`.
    ///
    /// A prefix only counts as a client tag when it is a single word, so a
    /// query like `rust: async tips` stays a query.
    pub fn parse_list(
        raw: &str,
        source: fn(String) -> DiscoverySource,
        default_client: &str,
    ) -> Vec<WatchTarget> {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .filter_map(|item| {
                let (client, value) = match item.split_once(':') {
                    Some((client, value))
                        if CLIENT_TAG_REGEX.is_match(client.trim())
                            && !value.trim().is_empty() =>
                    {
                        (client.trim(), value.trim())
                    }
                    _ => (default_client, item),
                };

                (!value.is_empty()).then(|| WatchTarget {
                    source: source(value.to_string()),
                    client: client.to_string(),
                })
            })
            .collect()
    }

    /// Builds the full watch list from the three env style lists
    pub fn watch_list(
        channels: &str,
        playlists: &str,
        queries: &str,
        default_client: &str,
    ) -> Vec<WatchTarget> {
        let mut targets = Self::parse_list(channels, DiscoverySource::Channel, default_client);
        targets.extend(Self::parse_list(
            playlists,
            DiscoverySource::Playlist,
            default_client,
        ));
        targets.extend(Self::parse_list(
            queries,
            DiscoverySource::Search,
            default_client,
        ));
        targets
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: DiscoverySource,
    pub client: String,
    pub found: usize,
    pub added: Vec<VideoRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AutoDiscoverReport {
    pub sources: Vec<SourceReport>,
}

impl AutoDiscoverReport {
    pub fn total_added(&self) -> usize {
        self.sources.iter().map(|s| s.added.len()).sum()
    }

    pub fn failed(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }
}

/// Finds new videos and feeds them into the queue
#[derive(Debug, Clone)]
pub struct Discovery<L, Q> {
    lister: L,
    queue: Queue<Q>,
    watch_list: Vec<WatchTarget>,
    per_source_limit: usize,
}

impl<L, Q> Discovery<L, Q>
where
    L: VideoLister + Send + Sync,
    Q: QueueStore + Send + Sync,
{
    pub const DEFAULT_PER_SOURCE_LIMIT: usize = 5;

    pub fn new(lister: L, queue: Queue<Q>) -> Self {
        Self {
            lister,
            queue,
            watch_list: Vec::new(),
            per_source_limit: Self::DEFAULT_PER_SOURCE_LIMIT,
        }
    }

    pub fn with_watch_list(mut self, targets: Vec<WatchTarget>, per_source_limit: usize) -> Self {
        self.watch_list = targets;
        self.per_source_limit = per_source_limit;
        self
    }

    pub fn watch_list(&self) -> &[WatchTarget] {
        &self.watch_list
    }

    pub fn queue(&self) -> &Queue<Q> {
        &self.queue
    }

    /// At most `max_results` videos from `source`, newest first with undated
    /// entries last
    #[tracing::instrument(skip(self, source), fields(source = %source))]
    pub async fn discover(
        &self,
        source: &DiscoverySource,
        max_results: usize,
    ) -> anyhow::Result<Vec<VideoRef>> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let videos = match source {
            DiscoverySource::Channel(id) => self.lister.channel_videos(id, max_results).await,
            DiscoverySource::Playlist(id) => self.lister.playlist_videos(id, max_results).await,
            DiscoverySource::Search(query) => self.lister.search_videos(query, max_results).await,
        }
        .map_err(|e| anyhow::anyhow!("Failed to list videos for {source}: {e:?}"))?;

        let videos = videos
            .into_iter()
            .unique_by(|v| v.video_id.clone())
            .sorted_by_key(|v| Reverse(v.published_at))
            .take(max_results)
            .collect::<Vec<_>>();

        tracing::info!(count = videos.len(), "Discovered videos");
        Ok(videos)
    }

    /// Like [`Discovery::discover`] minus everything already queued or
    /// processed
    pub async fn discover_new(
        &self,
        source: &DiscoverySource,
        max_results: usize,
    ) -> anyhow::Result<Vec<VideoRef>> {
        let videos = self.discover(source, max_results).await?;
        let known = self.queue.known_ids().await?;

        Ok(videos
            .into_iter()
            .filter(|v| !known.contains(&v.video_id))
            .collect())
    }

    /// Discovers and queues new videos for `client`, returns what was added
    pub async fn discover_and_enqueue(
        &self,
        source: &DiscoverySource,
        max_results: usize,
        client: &str,
    ) -> anyhow::Result<Vec<VideoRef>> {
        let videos = self.discover(source, max_results).await?;
        self.queue.add_many(videos, client).await
    }

    /// Walks the watch list. A failing source is reported and skipped.
    #[tracing::instrument(skip(self), fields(targets = self.watch_list.len()))]
    pub async fn auto_discover(&self) -> anyhow::Result<AutoDiscoverReport> {
        let mut report = AutoDiscoverReport::default();

        for target in &self.watch_list {
            let mut line = SourceReport {
                source: target.source.clone(),
                client: target.client.clone(),
                found: 0,
                added: Vec::new(),
                error: None,
            };

            let outcome = match self.discover(&target.source, self.per_source_limit).await {
                Ok(videos) => {
                    line.found = videos.len();
                    self.queue
                        .add_many(videos, &target.client)
                        .await
                        .context("Failed to queue discovered videos")
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(added) => line.added = added,
                Err(e) => {
                    tracing::warn!(source = %target.source, error = %e, "Skipping source");
                    line.error = Some(format!("{e:#}"));
                }
            }

            report.sources.push(line);
        }

        tracing::info!(
            added = report.total_added(),
            failed = report.failed(),
            "Auto discovery finished"
        );
        Ok(report)
    }
}
