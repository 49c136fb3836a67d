//! Chat Routes

use crate::api::handlers::chat_handler::*;
use axum::{Router, routing::get};

use crate::api::app_state::AppState;

/// 创建私信路由器
pub fn create_chat_router() -> Router<AppState> {
    Router::new()
        .route("/chat/unread", get(unread_count))
        .route("/chat/conversations", get(list_conversations))
        .route("/chat/:user_id/messages", get(get_thread).post(send_message))
}
