use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::Method,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use rentchat_store::clock::time_ago;
use rentchat_store::{
    Ack, ChatService, Message, SendRequest, Thread, ThreadRequest, TypingSetRequest, TypingStatus,
};

use crate::config::{BackendKind, ServerConfig};
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub config: Arc<ServerConfig>,
}

/// Queries are `GET /<procedure>?threadId=…`, mutations are
/// `POST /<procedure>` with a JSON body.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/threads.list", get(threads_list))
        .route("/threads.get", get(threads_get))
        .route("/messages.byThread", get(messages_by_thread))
        .route("/messages.send", post(messages_send))
        .route("/messages.markRead", post(messages_mark_read))
        .route("/messages.typingSet", post(messages_typing_set))
        .route("/messages.typingStatus", get(messages_typing_status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    store: &'static str,
}

/// A thread as shown in the conversation list.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreadView {
    #[serde(flatten)]
    thread: Thread,
    time_ago: String,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = match state.config.backend {
        BackendKind::Memory => "memory",
        BackendKind::Sqlite => "sqlite",
    };
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        store,
    })
}

async fn threads_list(State(state): State<AppState>) -> Result<Json<Vec<ThreadView>>, ServerError> {
    let now = state.chat.now();
    let threads = state
        .chat
        .list_threads()?
        .into_iter()
        .map(|thread| ThreadView {
            time_ago: time_ago(thread.timestamp, now),
            thread,
        })
        .collect();
    Ok(Json(threads))
}

async fn threads_get(
    State(state): State<AppState>,
    query: Result<Query<ThreadRequest>, QueryRejection>,
) -> Result<Json<Thread>, ServerError> {
    let Query(req) = query?;
    Ok(Json(state.chat.get_thread(&req.thread_id)?))
}

async fn messages_by_thread(
    State(state): State<AppState>,
    query: Result<Query<ThreadRequest>, QueryRejection>,
) -> Result<Json<Vec<Message>>, ServerError> {
    let Query(req) = query?;
    Ok(Json(state.chat.by_thread(&req.thread_id)?))
}

async fn messages_send(
    State(state): State<AppState>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<Message>, ServerError> {
    let Json(req) = payload?;
    Ok(Json(state.chat.send(req)?))
}

async fn messages_mark_read(
    State(state): State<AppState>,
    payload: Result<Json<ThreadRequest>, JsonRejection>,
) -> Result<Json<Ack>, ServerError> {
    let Json(req) = payload?;
    Ok(Json(state.chat.mark_read(&req.thread_id)?))
}

async fn messages_typing_set(
    State(state): State<AppState>,
    payload: Result<Json<TypingSetRequest>, JsonRejection>,
) -> Result<Json<Ack>, ServerError> {
    let Json(req) = payload?;
    Ok(Json(state.chat.typing_set(req)))
}

async fn messages_typing_status(
    State(state): State<AppState>,
    query: Result<Query<ThreadRequest>, QueryRejection>,
) -> Result<Json<TypingStatus>, ServerError> {
    let Query(req) = query?;
    Ok(Json(state.chat.typing_status(&req.thread_id)))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
