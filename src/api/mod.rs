//! API 模块
//!
//! 提供 REST API 支持。登录/注册和守卫查询是公开的，其余路由需要 Bearer 令牌。

pub mod app_state;
pub mod dto;
pub mod handlers;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use crate::api::app_state::AppState;
use crate::error::AppError;
use crate::observability::{ObservabilityState, create_observability_router, metrics_middleware};
use crate::security::middleware::{auth_middleware, security_headers_middleware};
use axum::{Router, extract::DefaultBodyLimit, http::HeaderValue, middleware};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// 根据配置构造 CORS；`*` 表示任意来源
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(origins)
}

pub fn create_router(app_state: AppState) -> Router {
    let public = Router::new()
        .merge(routes::auth_routes::create_auth_router())
        .merge(routes::gate_routes::create_gate_router());

    let protected = Router::new()
        .merge(routes::profile_routes::create_profile_router())
        .merge(routes::questionnaire_routes::create_questionnaire_router())
        .merge(routes::match_routes::create_match_router())
        .merge(routes::chat_routes::create_chat_router())
        .merge(routes::memory_tree_routes::create_memory_tree_router())
        .merge(routes::ai_routes::create_ai_router())
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth_middleware,
        ));

    let observability = Arc::new(
        ObservabilityState::new(
            env!("CARGO_PKG_VERSION").to_string(),
            Arc::clone(&app_state.metrics),
        )
        .with_storage(app_state.storage.clone()),
    );

    Router::new()
        .nest("/api/v1", public.merge(protected))
        .merge(create_observability_router(observability))
        .layer(DefaultBodyLimit::max(app_state.config.server.max_request_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            app_state.config.server.request_timeout,
        )))
        .layer(cors_layer(&app_state.config.server.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn_with_state(
            Arc::clone(&app_state.metrics),
            metrics_middleware,
        ))
        // Add security headers middleware to all routes
        .layer(middleware::from_fn(security_headers_middleware))
        .with_state(app_state)
}

pub async fn initialize_api(app_state: AppState) -> Result<Router, AppError> {
    tracing::info!("Initializing API router...");
    Ok(create_router(app_state))
}
