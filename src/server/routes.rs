//! HTTP route handlers for the chat relay API.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::conversation::{Durability, Role, Turn};
use crate::llm::Reply;

use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/send-message", post(send_message))
        .route("/api/start-conversation", post(start_conversation))
        .route(
            "/api/conversation-history/{user_id}",
            get(conversation_history).delete(clear_conversation),
        )
        .with_state(state)
}

/// Error returned at the HTTP boundary.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// A 400 with the given message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "status": "error",
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "chat-relay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Send-message request.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Caller-supplied user identifier.
    pub user_id: Option<String>,
    /// The user's message.
    pub message: Option<String>,
}

/// Start-conversation request.
#[derive(Debug, Deserialize)]
pub struct StartConversationRequest {
    /// Caller-supplied user identifier.
    pub user_id: Option<String>,
}

/// Reply to a message or a conversation start.
#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    /// Always `"success"`.
    pub status: &'static str,
    /// Assistant text (the fallback apology when degraded).
    pub response: String,
    /// True when the completion call failed or a turn was not written to disk.
    pub degraded: bool,
}

impl ReplyResponse {
    fn new(reply: Reply, writes: &[Durability]) -> Self {
        Self {
            status: "success",
            degraded: reply.is_fallback() || !writes.iter().copied().all(Durability::is_durable),
            response: reply.text,
        }
    }
}

/// Conversation history response.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Always `"success"`.
    pub status: &'static str,
    /// Turns in chronological order.
    pub history: Vec<Turn>,
}

/// Clear-conversation response.
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    /// Always `"success"`.
    pub status: &'static str,
    /// Whether a conversation existed.
    pub cleared: bool,
}

/// Append the user's message, ask the model, append and return its reply.
async fn send_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<ReplyResponse>, ApiError> {
    let (user_id, message) = match payload {
        Ok(Json(SendMessageRequest {
            user_id: Some(user_id),
            message: Some(message),
        })) => (user_id, message),
        Ok(_) => return Err(ApiError::bad_request("message and user_id are required")),
        Err(rejection) => {
            tracing::warn!(error = %rejection, "rejected send-message body");
            return Err(ApiError::bad_request("message and user_id are required"));
        }
    };

    let asked = state.store.add_message(&user_id, Role::User, &message).await;
    let history = state.store.history(&user_id).await;
    let reply = state.completion.generate_reply(&history).await;
    let answered = state
        .store
        .add_message(&user_id, Role::Assistant, &reply.text)
        .await;

    Ok(Json(ReplyResponse::new(reply, &[asked.durability, answered.durability])))
}

/// Return a user's full history.
async fn conversation_history(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Json<HistoryResponse> {
    let history = state.store.history(&user_id).await;
    Json(HistoryResponse {
        status: "success",
        history,
    })
}

/// Ask the model for an unprompted opening line and store it.
async fn start_conversation(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StartConversationRequest>, JsonRejection>,
) -> Result<Json<ReplyResponse>, ApiError> {
    let Ok(Json(StartConversationRequest {
        user_id: Some(user_id),
    })) = payload
    else {
        return Err(ApiError::bad_request("user_id is required"));
    };

    let reply = state.completion.generate_reply(&[]).await;
    let receipt = state
        .store
        .add_message(&user_id, Role::Assistant, &reply.text)
        .await;

    Ok(Json(ReplyResponse::new(reply, &[receipt.durability])))
}

/// Drop a user's conversation.
async fn clear_conversation(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Json<ClearResponse> {
    let durability = state.store.clear_conversation(&user_id).await;
    Json(ClearResponse {
        status: "success",
        cleared: durability != Durability::Unchanged,
    })
}
