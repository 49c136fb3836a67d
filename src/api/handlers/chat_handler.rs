//! Chat API Handlers

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::chat_dto::*},
    error::AppError,
    security::{ValidatedJson, auth::Claims},
};

/// Open the thread with another user; marks their messages to me as read
///
/// GET /api/v1/chat/:user_id/messages
pub async fn get_thread(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(other_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    debug!("User {} opening thread with {}", claims.sub, other_id);
    let messages = state.chat_service.thread(claims.user_id(), &other_id).await?;
    Ok(Json(messages))
}

/// POST /api/v1/chat/:user_id/messages
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(other_id): Path<String>,
    ValidatedJson(request): ValidatedJson<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = state
        .chat_service
        .send(claims.user_id(), &other_id, &request.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/v1/chat/unread
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let unread = state.chat_service.unread_count(claims.user_id()).await?;
    Ok(Json(UnreadResponse { unread }))
}

/// GET /api/v1/chat/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let conversations = state.chat_service.conversations(claims.user_id()).await?;
    Ok(Json(conversations))
}
