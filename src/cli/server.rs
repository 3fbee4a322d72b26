//! HTTP server mode: the controller surface of the relay
//!
//! Commands are fire-and-forget: a `202 Accepted` only means the relay
//! received the command. Outcomes (progress, done, error, rejected, data)
//! arrive on the `GET /events` Server-Sent Events stream.

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::capture::{ObservedRequest, TemplateStore};
use crate::engine::RunConfig;
use crate::error::{Error, Result};
use crate::relay::{RelayCommand, RelayHandle};

/// Server configuration
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Where captures are persisted; `None` keeps them in memory only
    pub template_path: Option<PathBuf>,
}

/// App state shared across handlers
struct AppState {
    config: ServerConfig,
    relay: RelayHandle,
    store: TemplateStore,
}

/// Response wrapper
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Build the controller router
pub fn router(relay: RelayHandle, store: TemplateStore, config: ServerConfig) -> Router {
    let state = AppState {
        config,
        relay,
        store,
    };

    // Any origin: the controller is usually a local browser page
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/capture", post(capture))
        .route("/template", get(template))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/reset", post(reset))
        .route("/data", post(data))
        .route("/events", get(events))
        .route("/snapshot", get(snapshot))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Start the HTTP server
pub async fn serve(
    relay: RelayHandle,
    store: TemplateStore,
    config: ServerConfig,
    port: u16,
) -> Result<()> {
    let app = router(relay, store, config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind to port {port}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")))?;

    Ok(())
}

/// Health check endpoint, reporting the engine phase
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "phase": state.relay.phase() }))
}

/// Feed one observed request to the template store
async fn capture(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ObservedRequest>,
) -> Response {
    let Some(template) = state.store.observe(&request).await else {
        return (
            StatusCode::OK,
            Json(ApiResponse::success(json!({ "captured": false }))),
        )
            .into_response();
    };

    if let Some(path) = &state.config.template_path {
        if let Err(e) = state.store.save_to_file(path).await {
            warn!("Captured template not persisted: {e}");
        }
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(json!({
            "captured": true,
            "template": template.redacted(),
        }))),
    )
        .into_response()
}

/// Current template, credentials masked
async fn template(State(state): State<Arc<AppState>>) -> Response {
    match state.store.get().await {
        Some(template) => (
            StatusCode::OK,
            Json(ApiResponse::success(template.redacted())),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error(Error::TemplateMissing.to_string())),
        )
            .into_response(),
    }
}

async fn start(State(state): State<Arc<AppState>>, Json(config): Json<RunConfig>) -> Response {
    deliver(&state.relay, RelayCommand::Start(config)).await
}

async fn stop(State(state): State<Arc<AppState>>) -> Response {
    deliver(&state.relay, RelayCommand::Stop).await
}

async fn reset(State(state): State<Arc<AppState>>) -> Response {
    deliver(&state.relay, RelayCommand::Reset).await
}

async fn data(State(state): State<Arc<AppState>>) -> Response {
    deliver(&state.relay, RelayCommand::GetData).await
}

async fn deliver(relay: &RelayHandle, command: RelayCommand) -> Response {
    let name = command.name();
    match relay.send(command).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(ApiResponse::success(json!({ "command": name }))),
        )
            .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::<()>::error(e.to_string())),
        )
            .into_response(),
    }
}

/// Relay events as Server-Sent Events, from subscription onwards
async fn events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let receiver = state.relay.subscribe();
    let stream = futures::stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => match Event::default().event(event.kind()).json_data(&event) {
                    Ok(sse) => return Some((Ok::<_, Infallible>(sse), receiver)),
                    Err(e) => warn!("Dropping '{}' event: {e}", event.kind()),
                },
                Err(RecvError::Lagged(missed)) => {
                    warn!("Event stream lagged, {missed} events skipped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Records held by the engine, read directly for export
async fn snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let records = state.relay.snapshot().await;
    Json(ApiResponse::success(json!({
        "count": records.len(),
        "records": records,
    })))
}
