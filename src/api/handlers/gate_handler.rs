//! Gate API Handler

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::gate_dto::*},
    error::AppError,
    gate::{Fact, GateSnapshot, Route, decide},
    security::middleware::active_claims,
};

/// Decide whether the client may render a route
///
/// GET /api/v1/gate?path=/matches
///
/// 已登出的令牌视为没有会话；令牌无效或认证服务不可用时按会话查询失败处理，
/// 两种情况都重定向到登录页。
pub async fn evaluate_gate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<GateQuery>,
) -> Result<impl IntoResponse, AppError> {
    let route = Route::parse(&query.path);
    debug!("Evaluating gate for {}", route);

    let facts = match active_claims(&state.verifier, state.auth_client.as_ref(), &headers).await {
        Ok(claims) => {
            state
                .gate_resolver
                .snapshot(&route, claims.as_ref().map(|c| c.user_id()))
                .await
        }
        Err(e) => GateSnapshot {
            session: Fact::from_result::<AppError>("session", Err(e)),
            ..Default::default()
        },
    };

    let outcome = decide(&route, &facts);
    if outcome.redirect_target().is_some() {
        state.metrics.record_gate_redirect();
    }

    Ok(Json(GateResponse::new(&route, outcome, facts)))
}
