//! AI Routes

use crate::api::handlers::ai_handler::*;
use axum::{Router, routing::post};

use crate::api::app_state::AppState;

/// 创建 AI 功能路由器
pub fn create_ai_router() -> Router<AppState> {
    Router::new()
        .route("/ai/compatibility", post(compatibility))
        .route("/ai/conversation-analysis", post(conversation_analysis))
        .route("/ai/profile-suggestions", post(profile_suggestions))
        .route("/ai/assistant", post(assistant))
}
