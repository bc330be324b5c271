mod handlers;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use content_queue::{InvalidVideoUrl, QueueStore};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    discovery::Discovery, orchestrator::Orchestrator, processor::ArtifactGenerator,
    social::SocialPublisher, yt::VideoLister,
};

/// Shared handles for the HTTP handlers
pub struct AppState<L, Q, G, P> {
    pub discovery: Arc<Discovery<L, Q>>,
    pub orchestrator: Arc<Orchestrator<Q, G, P>>,
    /// Bearer token required by the cron endpoints, open when `None`
    pub cron_secret: Option<String>,
}

// derive(Clone) would require every type parameter to be Clone
impl<L, Q, G, P> Clone for AppState<L, Q, G, P> {
    fn clone(&self) -> Self {
        Self {
            discovery: Arc::clone(&self.discovery),
            orchestrator: Arc::clone(&self.orchestrator),
            cron_secret: self.cron_secret.clone(),
        }
    }
}

impl<L, Q, G, P> AppState<L, Q, G, P> {
    pub fn new(
        discovery: Discovery<L, Q>,
        orchestrator: Orchestrator<Q, G, P>,
        cron_secret: Option<String>,
    ) -> Self {
        Self {
            discovery: Arc::new(discovery),
            orchestrator: Arc::new(orchestrator),
            cron_secret: cron_secret.filter(|s| !s.trim().is_empty()),
        }
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let Some(secret) = self.cron_secret.as_deref() else {
            return Ok(());
        };

        let provided = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);

        match provided {
            Some(token) if token == secret => Ok(()),
            _ => Err(ApiError::Unauthorized),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast_ref::<InvalidVideoUrl>() {
            Some(invalid) => ApiError::BadRequest(invalid.to_string()),
            None => ApiError::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(e) => {
                tracing::error!(error = ?e, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
            }
        };

        (status, Json(json!({ "status": "error", "error": message }))).into_response()
    }
}

pub fn router<L, Q, G, P>(state: AppState<L, Q, G, P>) -> Router
where
    L: VideoLister + Send + Sync + 'static,
    Q: QueueStore + Send + Sync + 'static,
    G: ArtifactGenerator + Send + Sync + 'static,
    P: SocialPublisher + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/discover", post(handlers::discover::<L, Q, G, P>))
        .route(
            "/api/auto_discover",
            post(handlers::auto_discover::<L, Q, G, P>),
        )
        .route(
            "/api/queue",
            get(handlers::get_queue::<L, Q, G, P>).post(handlers::replace_queue::<L, Q, G, P>),
        )
        .route("/api/add", post(handlers::add::<L, Q, G, P>))
        .route("/api/approve", post(handlers::approve::<L, Q, G, P>))
        .route("/api/reject", post(handlers::reject::<L, Q, G, P>))
        .route("/api/generate", post(handlers::generate::<L, Q, G, P>))
        .route("/api/post_custom", post(handlers::post_custom::<L, Q, G, P>))
        .route(
            "/api/process_next",
            post(handlers::process_next::<L, Q, G, P>),
        )
        .route(
            "/api/auto_process",
            post(handlers::auto_process::<L, Q, G, P>),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `router` on `addr` until `shutdown` is cancelled
pub async fn serve(router: Router, addr: SocketAddr, shutdown: CancellationToken) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server failed")
}
