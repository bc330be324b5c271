//! The HTTP clients driven against local stand-ins of the vendor endpoints.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use content_pulse::yt::{
    data_api::{YouTubeApiError, YouTubeDataApi},
    transcript::{FallbackTranscripts, InvidiousTranscripts, TranscriptError, WatchPageTranscripts},
    TranscriptSource, VideoLister,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

type Params = HashMap<String, String>;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

fn serve(listener: TcpListener, router: Router) {
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
}

fn api_error(status: StatusCode, reason: &str, message: &str) -> Response {
    let body = json!({
        "error": {
            "code": status.as_u16(),
            "message": message,
            "errors": [{ "reason": reason, "message": message }],
        }
    });
    (status, Json(body)).into_response()
}

// ─── YouTube Data API ────────────────────────────────────────────────────────

/// Query strings of every `playlistItems` request
#[derive(Clone, Default)]
struct DataApiStub {
    playlist_requests: Arc<Mutex<Vec<Params>>>,
}

async fn channels(Query(params): Query<Params>) -> Json<Value> {
    let items = match params.get("id").map(String::as_str) {
        Some("UCstub") => json!([{ "contentDetails": { "relatedPlaylists": { "uploads": "UUstub" } } }]),
        _ => json!([]),
    };
    Json(json!({ "items": items }))
}

async fn playlist_items(State(stub): State<DataApiStub>, Query(params): Query<Params>) -> Response {
    stub.playlist_requests.lock().unwrap().push(params.clone());

    let playlist_id = params.get("playlistId").cloned().unwrap_or_default();
    let total = match playlist_id.as_str() {
        "UUstub" => 120,
        "PLsmall" => 30,
        "PLquota" => {
            return api_error(
                StatusCode::FORBIDDEN,
                "quotaExceeded",
                "The request cannot be completed because you have exceeded your quota.",
            )
        }
        _ => {
            return api_error(
                StatusCode::NOT_FOUND,
                "playlistNotFound",
                "The playlist identified with the request's playlistId parameter cannot be found.",
            )
        }
    };

    let offset = params
        .get("pageToken")
        .and_then(|t| t.parse::<usize>().ok())
        .unwrap_or(0);
    let page_size = params
        .get("maxResults")
        .and_then(|m| m.parse::<usize>().ok())
        .unwrap_or(5)
        .min(50);
    let end = (offset + page_size).min(total);

    let items = (offset..end)
        .map(|i| {
            json!({
                "snippet": {
                    "title": format!("Episode {i}"),
                    "playlistId": playlist_id,
                    "resourceId": { "kind": "youtube#video", "videoId": format!("vid{i:08}") },
                },
                "contentDetails": { "videoPublishedAt": "2026-01-01T00:00:00Z" },
            })
        })
        .collect::<Vec<_>>();

    let mut body = json!({ "items": items });
    if end < total {
        body["nextPageToken"] = json!(end.to_string());
    }
    Json(body).into_response()
}

async fn search() -> Json<Value> {
    Json(json!({ "items": [] }))
}

async fn data_api() -> (YouTubeDataApi, DataApiStub) {
    let stub = DataApiStub::default();
    let router = Router::new()
        .route("/channels", get(channels))
        .route("/playlistItems", get(playlist_items))
        .route("/search", get(search))
        .with_state(stub.clone());

    let (listener, base) = bind().await;
    serve(listener, router);

    (YouTubeDataApi::new("test-key").with_base_url(base), stub)
}

#[tokio::test]
async fn test_channel_listing_pages_until_the_bound() {
    let (api, stub) = data_api().await;

    let videos = api.channel_videos("UCstub", 70).await.unwrap();

    assert_eq!(videos.len(), 70);
    assert_eq!(videos[0].video_id, "vid00000000");
    assert_eq!(videos[69].video_id, "vid00000069");
    assert_eq!(videos[0].playlist_id.as_deref(), Some("UUstub"));

    let requests = stub.playlist_requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].get("maxResults").map(String::as_str), Some("50"));
    assert_eq!(requests[0].get("pageToken"), None);
    assert_eq!(requests[1].get("maxResults").map(String::as_str), Some("20"));
    assert_eq!(requests[1].get("pageToken").map(String::as_str), Some("50"));
    assert!(requests.iter().all(|r| r.get("key").map(String::as_str) == Some("test-key")));
}

#[tokio::test]
async fn test_playlist_shorter_than_the_bound_stops_at_the_last_page() {
    let (api, stub) = data_api().await;

    let videos = api.playlist_videos("PLsmall", 100).await.unwrap();

    assert_eq!(videos.len(), 30);
    assert_eq!(stub.playlist_requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_quota_and_not_found_are_typed() {
    let (api, _) = data_api().await;

    let err = api.playlist_videos("PLquota", 5).await.unwrap_err();
    assert!(
        matches!(err, YouTubeApiError::QuotaExhausted(ref msg) if msg.contains("quota")),
        "{err:?}"
    );

    let err = api.playlist_videos("PLgone", 5).await.unwrap_err();
    assert!(matches!(err, YouTubeApiError::NotFound(_)), "{err:?}");

    let err = api.channel_videos("UCmissing", 5).await.unwrap_err();
    assert!(matches!(err, YouTubeApiError::NotFound(_)), "{err:?}");
}

#[tokio::test]
async fn test_search_without_hits_is_empty() {
    let (api, _) = data_api().await;

    let videos = api.search_videos("nothing matches this", 5).await.unwrap();
    assert!(videos.is_empty());
}

// ─── Transcripts ─────────────────────────────────────────────────────────────

const CAPTIONED_ID: &str = "dQw4w9WgXcQ";

async fn watch_page(State(base): State<String>, Query(params): Query<Params>) -> Response {
    match params.get("v").map(String::as_str) {
        Some(CAPTIONED_ID) => {
            let tracks = json!([
                { "baseUrl": format!("{base}/api/timedtext?v={CAPTIONED_ID}&lang=fr"), "languageCode": "fr" },
                { "baseUrl": format!("{base}/api/timedtext?v={CAPTIONED_ID}&lang=en&kind=asr"), "languageCode": "en", "kind": "asr" },
                { "baseUrl": format!("{base}/api/timedtext?v={CAPTIONED_ID}&lang=en"), "languageCode": "en" },
            ]);
            let html = format!(
                r#"<html><script>var ytInitialPlayerResponse = {{"captions":{{"playerCaptionsTracklistRenderer":{{"captionTracks":{tracks},"audioTracks":[]}}}}}};</script></html>"#
            );
            html.into_response()
        }
        Some("nocaptions0") => "<html><script>var ytInitialPlayerResponse = {};</script></html>"
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn timedtext(Query(params): Query<Params>) -> String {
    match (params.get("lang").map(String::as_str), params.get("kind")) {
        (Some("en"), None) => {
            r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="2">Ship small</text><text start="2" dur="2">ship   often</text></transcript>"#.into()
        }
        _ => r#"<transcript><text start="0">wrong track</text></transcript>"#.into(),
    }
}

async fn invidious_captions(
    State(base): State<String>,
    Path(video_id): Path<String>,
    Query(params): Query<Params>,
) -> Response {
    if params.contains_key("label") {
        return "WEBVTT\n\n1\n00:00:00.000 --> 00:00:02.000\nMeasure everything\n\n2\n00:00:02.000 --> 00:00:04.000\nin 2024\n"
            .into_response();
    }

    let captions = match video_id.as_str() {
        "nocaptions0" => json!([]),
        _ => json!([
            { "label": "Deutsch", "languageCode": "de", "url": format!("{base}/api/v1/captions/{video_id}?label=Deutsch") },
            { "label": "English", "languageCode": "en", "url": format!("/api/v1/captions/{video_id}?label=English") },
        ]),
    };
    Json(json!({ "captions": captions })).into_response()
}

async fn caption_server() -> String {
    let (listener, base) = bind().await;
    let router = Router::new()
        .route("/watch", get(watch_page))
        .route("/api/timedtext", get(timedtext))
        .route("/api/v1/captions/{video_id}", get(invidious_captions))
        .with_state(base.clone());
    serve(listener, router);
    base
}

#[tokio::test]
async fn test_watch_page_uses_the_manual_english_track() {
    let base = caption_server().await;
    let source = WatchPageTranscripts::new().with_base_url(base);

    let transcript = source.fetch_transcript(CAPTIONED_ID).await.unwrap();
    assert_eq!(transcript, "Ship small ship often");
}

#[tokio::test]
async fn test_watch_page_without_captions_fails() {
    let base = caption_server().await;
    let source = WatchPageTranscripts::new().with_base_url(base);

    let err = source.fetch_transcript("nocaptions0").await.unwrap_err();
    assert!(matches!(err, TranscriptError::Parse(_)), "{err:?}");
}

#[tokio::test]
async fn test_invidious_resolves_relative_caption_urls() {
    let base = caption_server().await;
    let source = InvidiousTranscripts::new(format!("{base}/"));

    let transcript = source.fetch_transcript(CAPTIONED_ID).await.unwrap();
    assert_eq!(transcript, "Measure everything in 2024");

    let err = source.fetch_transcript("nocaptions0").await.unwrap_err();
    assert!(matches!(err, TranscriptError::NoEnglishTrack(_)), "{err:?}");
}

#[tokio::test]
async fn test_fallback_reaches_invidious_when_the_watch_page_fails() {
    let base = caption_server().await;
    let source = FallbackTranscripts::new(
        WatchPageTranscripts::new().with_base_url(base.clone()),
        InvidiousTranscripts::new(base),
    );

    let transcript = source.fetch_transcript("unlisted000").await.unwrap();
    assert_eq!(transcript, "Measure everything in 2024");
}
