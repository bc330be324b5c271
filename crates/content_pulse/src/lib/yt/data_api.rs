use content_queue::VideoRef;
use serde::de::DeserializeOwned;

use crate::{
    types::{
        ApiErrorEnvelope, ChannelListResponse, PlaylistItem, PlaylistItemsResponse, SearchItem,
        SearchResponse,
    },
    yt::VideoLister,
};

/// Client for the YouTube Data API v3
#[derive(Debug, Clone)]
pub struct YouTubeDataApi {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum YouTubeApiError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("YouTube API quota exhausted: {0}")]
    QuotaExhausted(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("API error: {status} ({reason}) - {message}")]
    Api {
        status: u16,
        reason: String,
        message: String,
    },
}

impl YouTubeDataApi {
    /// Upper bound the API accepts for `maxResults`
    const MAX_PAGE_SIZE: usize = 50;

    pub fn new(api_key: impl Into<String>) -> Self {
        YouTubeDataApi {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://www.googleapis.com/youtube/v3".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[tracing::instrument(skip(self, query))]
    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, String)],
    ) -> Result<T, YouTubeApiError> {
        let resp = self
            .http
            .get(format!("{}/{resource}", self.base_url))
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            let err = classify_error(status, &body);
            tracing::error!(error = %err, "YouTube API request failed");
            return Err(err);
        }

        Ok(resp.json::<T>().await?)
    }

    async fn uploads_playlist_id(&self, channel_id: &str) -> Result<String, YouTubeApiError> {
        let resp = self
            .get_json::<ChannelListResponse>(
                "channels",
                &[
                    ("part", "contentDetails".into()),
                    ("id", channel_id.into()),
                ],
            )
            .await?;

        resp.items
            .into_iter()
            .next()
            .map(|c| c.content_details.related_playlists.uploads)
            .ok_or_else(|| YouTubeApiError::NotFound(format!("channel {channel_id}")))
    }
}

/// Maps an error response to a typed error, keeping quota exhaustion and
/// missing resources apart from generic failures
fn classify_error(status: u16, body: &str) -> YouTubeApiError {
    let (reason, message) = match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => (
            envelope
                .error
                .errors
                .into_iter()
                .next()
                .map(|d| d.reason)
                .unwrap_or_default(),
            envelope.error.message,
        ),
        Err(_) => (String::new(), body.to_string()),
    };

    match reason.as_str() {
        "quotaExceeded" | "dailyLimitExceeded" => YouTubeApiError::QuotaExhausted(message),
        "playlistNotFound" | "channelNotFound" | "videoNotFound" | "notFound" => {
            YouTubeApiError::NotFound(message)
        }
        _ if status == 404 => YouTubeApiError::NotFound(message),
        _ => YouTubeApiError::Api {
            status,
            reason,
            message,
        },
    }
}

fn video_from_playlist_item(item: PlaylistItem, playlist_id: &str) -> Option<VideoRef> {
    let snippet = item.snippet;
    let video_id = snippet.resource_id.video_id?;

    let published_at = item
        .content_details
        .and_then(|d| d.video_published_at)
        .or(snippet.published_at);
    let channel_id = snippet.video_owner_channel_id.or(snippet.channel_id);

    let mut video = VideoRef::new(video_id)
        .with_title(snippet.title)
        .with_playlist(snippet.playlist_id.unwrap_or_else(|| playlist_id.to_string()));
    if let Some(channel_id) = channel_id {
        video = video.with_channel(channel_id);
    }
    if let Some(published_at) = published_at {
        video = video.published_at(published_at);
    }

    Some(video)
}

fn video_from_search_item(item: SearchItem) -> Option<VideoRef> {
    let video_id = item.id.video_id?;
    let mut video = VideoRef::new(video_id).with_title(item.snippet.title);

    if let Some(channel_id) = item.snippet.channel_id {
        video = video.with_channel(channel_id);
    }
    if let Some(published_at) = item.snippet.published_at {
        video = video.published_at(published_at);
    }

    Some(video)
}

impl VideoLister for YouTubeDataApi {
    type Error = YouTubeApiError;

    #[tracing::instrument(skip(self))]
    async fn channel_videos(
        &self,
        channel_id: &str,
        max_results: usize,
    ) -> Result<Vec<VideoRef>, Self::Error> {
        let uploads = self.uploads_playlist_id(channel_id).await?;
        tracing::debug!(%uploads, "Resolved uploads playlist");

        self.playlist_videos(&uploads, max_results).await
    }

    #[tracing::instrument(skip(self))]
    async fn playlist_videos(
        &self,
        playlist_id: &str,
        max_results: usize,
    ) -> Result<Vec<VideoRef>, Self::Error> {
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;

        while videos.len() < max_results {
            let page_size = (max_results - videos.len()).min(Self::MAX_PAGE_SIZE);
            let mut query = vec![
                ("part", "snippet,contentDetails".to_string()),
                ("playlistId", playlist_id.to_string()),
                ("maxResults", page_size.to_string()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page = self
                .get_json::<PlaylistItemsResponse>("playlistItems", &query)
                .await?;

            videos.extend(
                page.items
                    .into_iter()
                    .filter_map(|item| video_from_playlist_item(item, playlist_id)),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        videos.truncate(max_results);
        Ok(videos)
    }

    #[tracing::instrument(skip(self))]
    async fn search_videos(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<VideoRef>, Self::Error> {
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;

        while videos.len() < max_results {
            let page_size = (max_results - videos.len()).min(Self::MAX_PAGE_SIZE);
            let mut params = vec![
                ("part", "snippet".to_string()),
                ("type", "video".to_string()),
                ("order", "date".to_string()),
                ("q", query.to_string()),
                ("maxResults", page_size.to_string()),
            ];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let page = self.get_json::<SearchResponse>("search", &params).await?;
            if page.items.is_empty() {
                break;
            }

            videos.extend(page.items.into_iter().filter_map(video_from_search_item));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        videos.truncate(max_results);
        Ok(videos)
    }
}
