//! Gate Routes

use crate::api::handlers::gate_handler::*;
use axum::{Router, routing::get};

use crate::api::app_state::AppState;

/// 创建守卫路由器；令牌可选
pub fn create_gate_router() -> Router<AppState> {
    Router::new().route("/gate", get(evaluate_gate))
}
