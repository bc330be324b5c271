use axum::{extract::State, http::HeaderMap, Json};
use content_queue::QueueStore;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::{
    discovery::DiscoverySource, media::is_remote_url, processor::ArtifactGenerator,
    social::SocialPublisher, yt::VideoLister,
};

const DEFAULT_MAX_RESULTS: usize = 5;

type ApiResult = Result<Json<Value>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct DiscoverRequest {
    channel_id: Option<String>,
    playlist_id: Option<String>,
    query: Option<String>,
    max_results: Option<usize>,
    #[serde(default)]
    enqueue: bool,
    client: Option<String>,
}

impl DiscoverRequest {
    fn source(&self) -> Result<DiscoverySource, ApiError> {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        match (
            present(&self.channel_id),
            present(&self.playlist_id),
            present(&self.query),
        ) {
            (Some(id), None, None) => Ok(DiscoverySource::Channel(id)),
            (None, Some(id), None) => Ok(DiscoverySource::Playlist(id)),
            (None, None, Some(query)) => Ok(DiscoverySource::Search(query)),
            _ => Err(ApiError::BadRequest(
                "Provide exactly one of channel_id, playlist_id or query".into(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    client: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceQueueRequest {
    #[serde(default)]
    urls: Vec<String>,
    #[serde(default)]
    client: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VideoIdRequest {
    #[serde(default)]
    video_id: Option<String>,
}

impl VideoIdRequest {
    fn video_id(&self) -> Result<&str, ApiError> {
        self.video_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::BadRequest("video_id is required".into()))
    }
}

#[derive(Debug, Deserialize)]
pub struct PostCustomRequest {
    #[serde(default)]
    post: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    client: Option<String>,
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ApiError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{name} is required")))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn discover<L, Q, G, P>(
    State(state): State<AppState<L, Q, G, P>>,
    Json(req): Json<DiscoverRequest>,
) -> ApiResult
where
    L: VideoLister + Send + Sync + 'static,
    Q: QueueStore + Send + Sync + 'static,
    G: ArtifactGenerator + Send + Sync + 'static,
    P: SocialPublisher + Send + Sync + 'static,
{
    let source = req.source()?;
    let max_results = req.max_results.unwrap_or(DEFAULT_MAX_RESULTS);

    let videos = state.discovery.discover_new(&source, max_results).await?;

    let enqueued = if req.enqueue {
        let client = req
            .client
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(state.orchestrator.settings().default_client.as_str());
        state
            .discovery
            .queue()
            .add_many(videos.clone(), client)
            .await?
            .len()
    } else {
        0
    };

    Ok(Json(json!({
        "status": "success",
        "source": source,
        "videos": videos,
        "enqueued": enqueued,
    })))
}

pub async fn auto_discover<L, Q, G, P>(
    State(state): State<AppState<L, Q, G, P>>,
    headers: HeaderMap,
) -> ApiResult
where
    L: VideoLister + Send + Sync + 'static,
    Q: QueueStore + Send + Sync + 'static,
    G: ArtifactGenerator + Send + Sync + 'static,
    P: SocialPublisher + Send + Sync + 'static,
{
    state.authorize(&headers)?;

    let report = state.discovery.auto_discover().await?;
    Ok(Json(json!({
        "status": "success",
        "added": report.total_added(),
        "report": report,
    })))
}

pub async fn get_queue<L, Q, G, P>(State(state): State<AppState<L, Q, G, P>>) -> ApiResult
where
    L: VideoLister + Send + Sync + 'static,
    Q: QueueStore + Send + Sync + 'static,
    G: ArtifactGenerator + Send + Sync + 'static,
    P: SocialPublisher + Send + Sync + 'static,
{
    let snapshot = state.orchestrator.snapshot().await?;
    Ok(Json(json!(snapshot)))
}

pub async fn replace_queue<L, Q, G, P>(
    State(state): State<AppState<L, Q, G, P>>,
    Json(req): Json<ReplaceQueueRequest>,
) -> ApiResult
where
    L: VideoLister + Send + Sync + 'static,
    Q: QueueStore + Send + Sync + 'static,
    G: ArtifactGenerator + Send + Sync + 'static,
    P: SocialPublisher + Send + Sync + 'static,
{
    let outcome = state
        .orchestrator
        .replace(&req.urls, req.client.as_deref())
        .await?;

    Ok(Json(json!({
        "status": "saved",
        "queued": outcome.queued,
        "invalid": outcome.invalid,
    })))
}

pub async fn add<L, Q, G, P>(
    State(state): State<AppState<L, Q, G, P>>,
    Json(req): Json<UrlRequest>,
) -> ApiResult
where
    L: VideoLister + Send + Sync + 'static,
    Q: QueueStore + Send + Sync + 'static,
    G: ArtifactGenerator + Send + Sync + 'static,
    P: SocialPublisher + Send + Sync + 'static,
{
    let url = required(&req.url, "url")?;
    let added = state
        .orchestrator
        .enqueue(url, req.client.as_deref())
        .await?;

    Ok(Json(json!({
        "status": added.outcome,
        "video_id": added.video_id,
    })))
}

pub async fn approve<L, Q, G, P>(
    State(state): State<AppState<L, Q, G, P>>,
    Json(req): Json<VideoIdRequest>,
) -> ApiResult
where
    L: VideoLister + Send + Sync + 'static,
    Q: QueueStore + Send + Sync + 'static,
    G: ArtifactGenerator + Send + Sync + 'static,
    P: SocialPublisher + Send + Sync + 'static,
{
    let video_id = req.video_id()?;
    let entry = state
        .orchestrator
        .approve(video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{video_id} is not queued")))?;

    Ok(Json(json!({ "status": "approved", "entry": entry })))
}

pub async fn reject<L, Q, G, P>(
    State(state): State<AppState<L, Q, G, P>>,
    Json(req): Json<VideoIdRequest>,
) -> ApiResult
where
    L: VideoLister + Send + Sync + 'static,
    Q: QueueStore + Send + Sync + 'static,
    G: ArtifactGenerator + Send + Sync + 'static,
    P: SocialPublisher + Send + Sync + 'static,
{
    let video_id = req.video_id()?;
    let entry = state
        .orchestrator
        .reject(video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{video_id} is not queued")))?;

    Ok(Json(json!({ "status": "rejected", "entry": entry })))
}

pub async fn generate<L, Q, G, P>(
    State(state): State<AppState<L, Q, G, P>>,
    Json(req): Json<UrlRequest>,
) -> ApiResult
where
    L: VideoLister + Send + Sync + 'static,
    Q: QueueStore + Send + Sync + 'static,
    G: ArtifactGenerator + Send + Sync + 'static,
    P: SocialPublisher + Send + Sync + 'static,
{
    let url = required(&req.url, "url")?;
    let artifacts = state.orchestrator.generate(url).await?;

    Ok(Json(json!({
        "status": "success",
        "result": artifacts.result_document(),
    })))
}

pub async fn post_custom<L, Q, G, P>(
    State(state): State<AppState<L, Q, G, P>>,
    Json(req): Json<PostCustomRequest>,
) -> ApiResult
where
    L: VideoLister + Send + Sync + 'static,
    Q: QueueStore + Send + Sync + 'static,
    G: ArtifactGenerator + Send + Sync + 'static,
    P: SocialPublisher + Send + Sync + 'static,
{
    let text = required(&req.post, "post")?;
    let image_url = required(&req.url, "url")?;
    if !is_remote_url(image_url) {
        return Err(ApiError::BadRequest("url must be an http(s) url".into()));
    }

    let receipt = state
        .orchestrator
        .post_custom(text, image_url, req.client.as_deref())
        .await?;

    Ok(Json(json!({ "status": "success", "receipt": receipt })))
}

pub async fn process_next<L, Q, G, P>(State(state): State<AppState<L, Q, G, P>>) -> ApiResult
where
    L: VideoLister + Send + Sync + 'static,
    Q: QueueStore + Send + Sync + 'static,
    G: ArtifactGenerator + Send + Sync + 'static,
    P: SocialPublisher + Send + Sync + 'static,
{
    let outcome = state.orchestrator.process_next().await?;
    Ok(Json(json!(outcome)))
}

pub async fn auto_process<L, Q, G, P>(
    State(state): State<AppState<L, Q, G, P>>,
    headers: HeaderMap,
) -> ApiResult
where
    L: VideoLister + Send + Sync + 'static,
    Q: QueueStore + Send + Sync + 'static,
    G: ArtifactGenerator + Send + Sync + 'static,
    P: SocialPublisher + Send + Sync + 'static,
{
    state.authorize(&headers)?;

    let outcome = state.orchestrator.process_next().await?;
    Ok(Json(json!(outcome)))
}
