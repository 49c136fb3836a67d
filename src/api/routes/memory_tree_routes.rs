//! Memory Tree Routes
//!
//! 同一层的路径参数必须同名，所以对方用户 ID 和树 ID 都写作 `:id`。

use crate::api::handlers::memory_tree_handler::*;
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::app_state::AppState;

/// 创建回忆树路由器
pub fn create_memory_tree_router() -> Router<AppState> {
    Router::new()
        .route("/memory-trees/:id", get(open_tree))
        .route("/memory-trees/:id/branches", post(add_branch))
        .route(
            "/memory-trees/:id/branches/:branch_id/memories",
            post(add_memory),
        )
}
