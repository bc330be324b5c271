use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT};

use crate::{
    parser::{parse_timedtext_xml, parse_vtt, pick_english_track, YtHtmlDocument},
    types::InvidiousCaptions,
    yt::TranscriptSource,
};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error(transparent)]
    Parse(#[from] crate::error::Error),
    #[error("Caption request failed with status {0}")]
    Status(u16),
    #[error("No English captions available for {0}")]
    NoEnglishTrack(String),
    #[error("Transcript for {0} was empty")]
    Empty(String),
    #[error("All transcript sources failed. {primary_name}: {primary}; {fallback_name}: {fallback}")]
    Exhausted {
        primary_name: &'static str,
        primary: String,
        fallback_name: &'static str,
        fallback: String,
    },
}

async fn get_text(request: reqwest::RequestBuilder) -> Result<String, TranscriptError> {
    let resp = request
        .header(USER_AGENT, BROWSER_USER_AGENT)
        .send()
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

    if !resp.status().is_success() {
        return Err(TranscriptError::Status(resp.status().as_u16()));
    }

    Ok(resp.text().await?)
}

/// Reads the caption tracks embedded in the YouTube watch page and downloads
/// the English timed-text track
#[derive(Debug, Clone)]
pub struct WatchPageTranscripts {
    http: reqwest::Client,
    base_url: String,
}

impl WatchPageTranscripts {
    pub fn new() -> Self {
        WatchPageTranscripts {
            http: reqwest::Client::new(),
            base_url: "https://www.youtube.com".into(),
        }
    }

    /// Routes every request through `proxy_url`, YouTube blocks most
    /// datacenter addresses
    pub fn with_proxy(mut self, proxy_url: &str) -> Result<Self, reqwest::Error> {
        self.http = reqwest::Client::builder()
            .proxy(reqwest::Proxy::all(proxy_url)?)
            .build()?;
        Ok(self)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl Default for WatchPageTranscripts {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptSource for WatchPageTranscripts {
    const SOURCE_NAME: &'static str = "youtube";

    type Error = TranscriptError;

    #[tracing::instrument(skip(self))]
    async fn fetch_transcript(&self, video_id: &str) -> Result<String, Self::Error> {
        let page = get_text(
            self.http
                .get(format!("{}/watch", self.base_url))
                .query(&[("v", video_id)])
                .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9"),
        )
        .await?;

        let tracks = YtHtmlDocument::from(page).caption_tracks()?;
        let track = pick_english_track(&tracks)
            .ok_or_else(|| TranscriptError::NoEnglishTrack(video_id.to_string()))?;
        tracing::debug!(language = %track.language_code, kind = ?track.kind, "Using caption track");

        let xml = get_text(self.http.get(&track.base_url)).await?;
        let transcript = parse_timedtext_xml(&xml);
        if transcript.is_empty() {
            return Err(TranscriptError::Empty(video_id.to_string()));
        }

        Ok(transcript)
    }
}

/// Fetches WebVTT captions through an Invidious instance
#[derive(Debug, Clone)]
pub struct InvidiousTranscripts {
    http: reqwest::Client,
    base_url: String,
}

impl InvidiousTranscripts {
    pub const DEFAULT_INSTANCE: &str = "https://inv.nadeko.net";

    pub fn new(base_url: impl Into<String>) -> Self {
        InvidiousTranscripts {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for InvidiousTranscripts {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INSTANCE)
    }
}

impl TranscriptSource for InvidiousTranscripts {
    const SOURCE_NAME: &'static str = "invidious";

    type Error = TranscriptError;

    #[tracing::instrument(skip(self))]
    async fn fetch_transcript(&self, video_id: &str) -> Result<String, Self::Error> {
        let listing = get_text(
            self.http
                .get(format!("{}/api/v1/captions/{video_id}", self.base_url)),
        )
        .await?;
        let captions = serde_json::from_str::<InvidiousCaptions>(&listing)
            .map_err(crate::error::Error::from)?;

        let track = captions
            .captions
            .iter()
            .find(|c| c.language_code.to_lowercase().starts_with("en"))
            .ok_or_else(|| TranscriptError::NoEnglishTrack(video_id.to_string()))?;
        tracing::debug!(label = %track.label, "Using caption track");

        let url = if track.url.starts_with("http") {
            track.url.clone()
        } else {
            format!("{}{}", self.base_url, track.url)
        };

        let vtt = get_text(self.http.get(url)).await?;
        let transcript = parse_vtt(&vtt);
        if transcript.is_empty() {
            return Err(TranscriptError::Empty(video_id.to_string()));
        }

        Ok(transcript)
    }
}

/// Tries `primary` and falls back to `fallback` once. When both fail the
/// error carries both causes.
#[derive(Debug, Clone)]
pub struct FallbackTranscripts<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackTranscripts<P, F>
where
    P: TranscriptSource + Send + Sync,
    F: TranscriptSource + Send + Sync,
{
    pub fn new(primary: P, fallback: F) -> Self {
        FallbackTranscripts { primary, fallback }
    }
}

impl<P, F> TranscriptSource for FallbackTranscripts<P, F>
where
    P: TranscriptSource + Send + Sync,
    F: TranscriptSource + Send + Sync,
{
    const SOURCE_NAME: &'static str = "fallback";

    type Error = TranscriptError;

    async fn fetch_transcript(&self, video_id: &str) -> Result<String, Self::Error> {
        let primary_err = match self.primary.fetch_transcript(video_id).await {
            Ok(transcript) => return Ok(transcript),
            Err(e) => e,
        };
        tracing::warn!(
            error = ?primary_err,
            source = P::SOURCE_NAME,
            fallback = F::SOURCE_NAME,
            "Primary transcript source failed, trying fallback"
        );

        self.fallback
            .fetch_transcript(video_id)
            .await
            .map_err(|fallback_err| TranscriptError::Exhausted {
                primary_name: P::SOURCE_NAME,
                primary: format!("{primary_err:?}"),
                fallback_name: F::SOURCE_NAME,
                fallback: format!("{fallback_err:?}"),
            })
    }
}
