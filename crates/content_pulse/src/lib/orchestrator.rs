use anyhow::Context;
use chrono::Utc;
use content_queue::{
    AddOutcome, HistoryEntry, Queue, QueueEntry, QueueSnapshot, QueueStore, VideoRef,
};
use serde::Serialize;

use crate::{
    media::is_remote_url,
    output::ArtifactSet,
    processor::ArtifactGenerator,
    social::{schedule::PostingSchedule, PostReceipt, PostRequest, SocialPublisher},
};

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Only `approved` entries are processed when set
    pub require_approval: bool,
    pub default_client: String,
    /// Posts go out immediately when `None`
    pub schedule: Option<PostingSchedule>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            require_approval: false,
            default_client: "default".into(),
            schedule: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessOutcome {
    /// Nothing eligible in the queue
    Idle,
    Posted {
        history: HistoryEntry,
        artifacts: Box<ArtifactSet>,
        receipt: PostReceipt,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct EnqueueOutcome {
    pub video_id: String,
    pub outcome: AddOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplaceOutcome {
    pub queued: usize,
    pub invalid: Vec<String>,
}

/// Drives queued videos through generation and publishing
#[derive(Debug)]
pub struct Orchestrator<Q, G, P> {
    queue: Queue<Q>,
    generator: G,
    publisher: P,
    settings: OrchestratorSettings,
}

impl<Q, G, P> Orchestrator<Q, G, P>
where
    Q: QueueStore + Send + Sync,
    G: ArtifactGenerator + Send + Sync,
    P: SocialPublisher + Send + Sync,
{
    pub fn new(queue: Queue<Q>, generator: G, publisher: P, settings: OrchestratorSettings) -> Self {
        Self {
            queue,
            generator,
            publisher,
            settings,
        }
    }

    pub fn queue(&self) -> &Queue<Q> {
        &self.queue
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    fn client_or_default<'a>(&'a self, client: Option<&'a str>) -> &'a str {
        client
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.settings.default_client)
    }

    /// Generates, publishes and retires the first eligible entry.
    ///
    /// A failure before publishing leaves the entry queued with its attempt
    /// counted. Once published, the entry is never picked up again.
    #[tracing::instrument(skip(self), fields(require_approval = self.settings.require_approval))]
    pub async fn process_next(&self) -> anyhow::Result<ProcessOutcome> {
        let Some(entry) = self
            .queue
            .next_ready(self.settings.require_approval)
            .await
            .context("Failed to read queue")?
        else {
            tracing::info!("No eligible entry in the queue");
            return Ok(ProcessOutcome::Idle);
        };

        let video_id = entry.video_id().to_string();
        tracing::info!(%video_id, client = %entry.client, attempt = entry.attempts + 1, "Processing entry");

        let (artifacts, receipt) = match self.generate_and_publish(&entry).await {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(%video_id, error = ?e, "Failed to process entry");
                if let Err(record_err) = self.queue.record_failure(&video_id, &format!("{e:#}")).await
                {
                    tracing::error!(%video_id, error = ?record_err, "Failed to record failure");
                }
                return Err(e);
            }
        };

        // the post is already out, a bookkeeping failure must not fail the run
        let image_url = Some(artifacts.image.hosted_url.clone());
        let history = match self.queue.complete(&video_id, image_url.clone()).await {
            Ok(Some(history)) => history,
            Ok(None) => HistoryEntry::posted(entry, image_url),
            Err(e) => {
                tracing::error!(%video_id, error = ?e, "Failed to move posted entry to history");
                if let Err(mark_err) = self.queue.mark_posted(&video_id).await {
                    tracing::error!(%video_id, error = ?mark_err, "Failed to flag entry as posted");
                }
                HistoryEntry::posted(entry, image_url)
            }
        };

        Ok(ProcessOutcome::Posted {
            history,
            artifacts: Box::new(artifacts),
            receipt,
        })
    }

    async fn generate_and_publish(
        &self,
        entry: &QueueEntry,
    ) -> anyhow::Result<(ArtifactSet, PostReceipt)> {
        let artifacts = self.generator.generate(&entry.video).await?;

        let media_urls = Some(&artifacts.image.hosted_url)
            .filter(|url| is_remote_url(url))
            .cloned()
            .into_iter()
            .collect::<Vec<_>>();
        if media_urls.is_empty() {
            tracing::warn!("Image has no public url, posting text only");
        }

        let request = PostRequest {
            text: artifacts.linkedin_post.clone(),
            media_urls,
            client: entry.client.clone(),
            scheduled_time: self.settings.schedule.map(|s| s.next_slot(Utc::now())),
        };
        let receipt = self
            .publisher
            .publish(&request)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to publish post: {e:?}"))?;
        tracing::info!(post_id = ?receipt.id, scheduled = ?receipt.scheduled_time, "Post submitted");

        Ok((artifacts, receipt))
    }

    pub async fn approve(&self, video_id: &str) -> anyhow::Result<Option<QueueEntry>> {
        self.queue.approve(video_id).await
    }

    pub async fn reject(&self, video_id: &str) -> anyhow::Result<Option<QueueEntry>> {
        self.queue.remove(video_id).await
    }

    /// Queues a single url. Fails with [`content_queue::InvalidVideoUrl`]
    /// when no id can be extracted.
    pub async fn enqueue(&self, url: &str, client: Option<&str>) -> anyhow::Result<EnqueueOutcome> {
        let video = VideoRef::from_url(url)?;
        let video_id = video.video_id.clone();
        let outcome = self.queue.add(video, self.client_or_default(client)).await?;

        Ok(EnqueueOutcome { video_id, outcome })
    }

    /// Replaces the queue. Urls without a recognisable id are skipped and
    /// returned.
    pub async fn replace(
        &self,
        urls: &[String],
        client: Option<&str>,
    ) -> anyhow::Result<ReplaceOutcome> {
        let mut videos = Vec::with_capacity(urls.len());
        let mut invalid = Vec::new();
        for url in urls {
            match VideoRef::from_url(url) {
                Ok(video) => videos.push(video),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping url");
                    invalid.push(url.clone());
                }
            }
        }

        let queued = self
            .queue
            .replace(videos, self.client_or_default(client))
            .await?;
        Ok(ReplaceOutcome { queued, invalid })
    }

    pub async fn snapshot(&self) -> anyhow::Result<QueueSnapshot> {
        self.queue.snapshot().await
    }

    /// Runs the generation stages only, nothing is posted or queued
    pub async fn generate(&self, url: &str) -> anyhow::Result<ArtifactSet> {
        let video = VideoRef::from_url(url)?;
        self.generator.generate(&video).await
    }

    /// Publishes hand written text with an image, immediately
    #[tracing::instrument(skip(self, text))]
    pub async fn post_custom(
        &self,
        text: &str,
        image_url: &str,
        client: Option<&str>,
    ) -> anyhow::Result<PostReceipt> {
        if text.trim().is_empty() || image_url.trim().is_empty() {
            anyhow::bail!("Both the post text and the image url are required");
        }
        if !is_remote_url(image_url) {
            anyhow::bail!("The image url must be an http(s) url");
        }

        let request = PostRequest {
            text: text.to_string(),
            media_urls: vec![image_url.to_string()],
            client: self.client_or_default(client).to_string(),
            scheduled_time: None,
        };
        self.publisher
            .publish(&request)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to publish post: {e:?}"))
    }
}
