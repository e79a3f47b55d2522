//! HTTP route handlers for the chat relay API.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::conversations::Turn;
use crate::relay::RelayError;

use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(send_chat))
        .route("/api/chat/history", get(chat_history))
        .route("/api/chat/clear", post(clear_chat))
        .fallback(not_found)
        .with_state(state)
}

/// Errors surfaced to HTTP clients. Upstream detail is logged server-side and
/// never leaked into response bodies.
pub enum ApiError {
    /// Request is missing the user id.
    MissingUserId,
    /// Assistant call or other internal failure.
    Internal,
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::MissingUserId => Self::MissingUserId,
            RelayError::Assistant(inner) => {
                tracing::error!(error = %inner, "assistant call failed");
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingUserId => (StatusCode::BAD_REQUEST, "User ID is required"),
            Self::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "finchat-agent",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Fallback for unmatched routes.
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not Found" })),
    )
}

/// Chat message request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Client-generated user identifier.
    pub user_id: Option<String>,
    /// The user's message text.
    #[serde(default)]
    pub message: String,
}

/// Chat message response.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// The assistant's accumulated reply.
    pub reply: String,
}

/// Handle a chat message: relay it and return the reply.
async fn send_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let user_id = request.user_id.unwrap_or_default();
    let reply = state.relay.send_message(&user_id, &request.message).await?;
    Ok(Json(ChatResponse { reply }))
}

/// History query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    /// Client-generated user identifier.
    pub user_id: Option<String>,
}

/// History response.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Stored transcript, oldest turn first.
    pub messages: Vec<Turn>,
}

/// Return the stored transcript for a user.
async fn chat_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let user_id = params.user_id.unwrap_or_default();
    let messages = state.relay.get_history(&user_id).await?;
    Ok(Json(HistoryResponse { messages }))
}

/// Clear request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearRequest {
    /// Client-generated user identifier.
    pub user_id: Option<String>,
}

/// Clear response.
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    /// Human-readable completion message.
    pub message: String,
}

/// Reset a user's transcript to empty.
async fn clear_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClearRequest>,
) -> Result<Json<ClearResponse>, ApiError> {
    let user_id = request.user_id.unwrap_or_default();
    state.relay.clear_history(&user_id).await?;
    Ok(Json(ClearResponse {
        message: "Chat history cleared.".to_string(),
    }))
}
