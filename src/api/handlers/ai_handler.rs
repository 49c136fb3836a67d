//! AI API Handlers
//!
//! 模型输出无法解析时返回兜底结果而不是错误；只有 LLM 调用本身失败才报错。

use axum::{
    Json,
    extract::{Extension, State},
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::ai_dto::*},
    error::AppError,
    security::{ValidatedJson, auth::Claims},
};

/// POST /api/v1/ai/compatibility
pub async fn compatibility(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(request): ValidatedJson<CompatibilityRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!(
        "User {} requesting compatibility of {} and {}",
        claims.sub, request.user_one_id, request.user_two_id
    );

    let report = state
        .advisor_service
        .compatibility(&request.user_one_id, &request.user_two_id)
        .await?;

    Ok(Json(report))
}

/// POST /api/v1/ai/conversation-analysis
pub async fn conversation_analysis(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(request): ValidatedJson<ConversationAnalysisRequest>,
) -> Result<impl IntoResponse, AppError> {
    let analysis = state
        .advisor_service
        .conversation_analysis(claims.user_id(), &request.other_user_id)
        .await?;
    Ok(Json(analysis))
}

/// POST /api/v1/ai/profile-suggestions
pub async fn profile_suggestions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(request): ValidatedJson<ProfileSuggestionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let suggestions = state
        .advisor_service
        .profile_suggestions(claims.user_id(), request.current_profile)
        .await?;
    Ok(Json(suggestions))
}

/// POST /api/v1/ai/assistant
pub async fn assistant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(request): ValidatedJson<AssistantRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!(
        "Assistant turn for user {} with {} messages",
        claims.sub,
        request.messages.len()
    );

    let reply = state
        .advisor_service
        .assistant(
            request.messages,
            request.user_profile,
            request.other_user_profile,
        )
        .await?;

    Ok(Json(reply))
}
