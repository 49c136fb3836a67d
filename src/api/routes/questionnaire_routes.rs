//! Questionnaire Routes

use crate::api::handlers::questionnaire_handler::*;
use axum::{Router, routing::get};

use crate::api::app_state::AppState;

/// 创建问卷路由器
pub fn create_questionnaire_router() -> Router<AppState> {
    Router::new()
        .route("/questions", get(list_questions))
        .route(
            "/questionnaire/answers",
            get(get_answers).put(save_answers),
        )
        .route("/questionnaire/status", get(get_status))
}
