//! Match Routes

use crate::api::handlers::match_handler::*;
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::app_state::AppState;

/// 创建配对路由器
pub fn create_match_router() -> Router<AppState> {
    Router::new()
        .route("/matches", get(list_matches).post(create_match))
        .route("/matches/favorites", get(list_favorites))
        .route("/matches/:id/accept", post(accept_match))
        .route("/matches/:id/reject", post(reject_match))
}
