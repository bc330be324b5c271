use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub(crate) static BARE_VIDEO_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_-]{11}$").unwrap());

pub(crate) static VIDEO_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|/embed/|/shorts/|/v/)([0-9A-Za-z_-]{11})(?:[^0-9A-Za-z_-]|$)")
        .unwrap()
});

pub const YOUTUBE_WATCH_BASE_URL: &str = "https://www.youtube.com/watch";

/// Extracts the 11 character YouTube video id from a bare id or any of the
/// common url shapes (`watch?v=`, `youtu.be/`, `/embed/`, `/shorts/`, `/v/`).
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if BARE_VIDEO_ID_REGEX.is_match(input) {
        return Some(input.to_string());
    }

    VIDEO_URL_REGEX
        .captures(input)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    pub video_id: String,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub discovered_at: DateTime<Utc>,
}

impl VideoRef {
    pub fn new(video_id: impl Into<String>) -> Self {
        let video_id = video_id.into();
        VideoRef {
            url: format!("{YOUTUBE_WATCH_BASE_URL}?v={video_id}"),
            video_id,
            title: String::new(),
            channel_id: None,
            playlist_id: None,
            published_at: None,
            discovered_at: Utc::now(),
        }
    }

    /// Builds a reference from a user supplied url or bare id
    pub fn from_url(url: &str) -> Result<Self, InvalidVideoUrl> {
        extract_video_id(url)
            .map(VideoRef::new)
            .ok_or_else(|| InvalidVideoUrl(url.trim().to_string()))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    pub fn with_playlist(mut self, playlist_id: impl Into<String>) -> Self {
        self.playlist_id = Some(playlist_id.into());
        self
    }

    pub fn published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Could not extract a YouTube video id from '{0}'")]
pub struct InvalidVideoUrl(pub String);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    #[default]
    Pending,
    Approved,
    Posted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub video: VideoRef,
    pub client: String,
    #[serde(default)]
    pub status: QueueStatus,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl QueueEntry {
    pub fn new(video: VideoRef, client: impl Into<String>) -> Self {
        QueueEntry {
            video,
            client: client.into(),
            status: QueueStatus::Pending,
            added_at: Utc::now(),
            attempts: 0,
            last_error: None,
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video.video_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub entry: QueueEntry,
    pub done_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl HistoryEntry {
    pub fn posted(mut entry: QueueEntry, image_url: Option<String>) -> Self {
        entry.status = QueueStatus::Posted;
        HistoryEntry {
            entry,
            done_at: Utc::now(),
            image_url,
        }
    }

    pub fn video_id(&self) -> &str {
        self.entry.video_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_id_from_common_url_shapes() {
        let cases = [
            "https://www.youtube.com/watch?v=snF5eGKoiJI",
            "http://www.youtube.com/watch?v=snF5eGKoiJI",
            "www.youtube.com/watch?v=snF5eGKoiJI",
            "youtube.com/watch?v=snF5eGKoiJI",
            "https://youtu.be/snF5eGKoiJI",
            "snF5eGKoiJI",
            "https://www.youtube.com/shorts/snF5eGKoiJI",
            "youtube.com/shorts/snF5eGKoiJI",
            "https://www.youtube.com/watch?v=snF5eGKoiJI&t=123",
            "https://www.youtube.com/watch?feature=share&v=snF5eGKoiJI",
            "https://www.youtube.com/embed/snF5eGKoiJI?autoplay=1",
            "  https://youtu.be/snF5eGKoiJI?si=abc  ",
        ];

        for url in cases {
            assert_eq!(
                extract_video_id(url).as_deref(),
                Some("snF5eGKoiJI"),
                "failed for {url}"
            );
        }
    }

    #[test]
    fn test_rejects_unrecognised_input() {
        assert_eq!(extract_video_id("https://example.com/watch"), None);
        assert_eq!(extract_video_id("not a url"), None);
        assert_eq!(extract_video_id("https://youtu.be/short"), None);
        assert!(VideoRef::from_url("https://vimeo.com/123456").is_err());
    }

    #[test]
    fn test_video_ref_has_canonical_url() {
        let video = VideoRef::from_url("https://youtu.be/snF5eGKoiJI").unwrap();
        assert_eq!(video.video_id, "snF5eGKoiJI");
        assert_eq!(video.url, "https://www.youtube.com/watch?v=snF5eGKoiJI");
    }

    #[test]
    fn test_history_entry_marks_posted() {
        let entry = QueueEntry::new(VideoRef::new("snF5eGKoiJI"), "acme");
        let history = HistoryEntry::posted(entry, None);
        assert_eq!(history.entry.status, QueueStatus::Posted);
        assert_eq!(history.video_id(), "snF5eGKoiJI");
    }

    #[test]
    fn test_queue_status_serializes_lowercase() {
        let json = serde_json::to_string(&QueueStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
    }
}
