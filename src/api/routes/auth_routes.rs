//! Auth Routes
//!
//! 注册/登录不需要令牌，登出和会话查询自行读取令牌。

use crate::api::handlers::auth_handler::*;
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::app_state::AppState;

/// 创建认证路由器
pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(session))
}
