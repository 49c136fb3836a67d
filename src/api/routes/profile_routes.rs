//! Profile Routes
//!
//! 定义用户资料相关的 API 路由。

use crate::api::handlers::profile_handler::*;
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::app_state::AppState;

/// 创建资料路由器
pub fn create_profile_router() -> Router<AppState> {
    Router::new()
        .route("/profiles/me", get(get_my_profile).put(update_my_profile))
        .route("/profiles/me/completion", get(get_completion))
        .route("/profiles/me/avatar", post(upload_avatar))
        .route("/profiles/potential", get(potential_matches))
        .route("/profiles/:id", get(get_profile))
}
