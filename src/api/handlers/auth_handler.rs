//! Auth API Handlers
//!
//! 注册、登录、登出和会话查询，均转发给认证服务。

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::{debug, warn};

use crate::{
    api::{app_state::AppState, dto::auth_dto::*},
    error::AppError,
    security::{ValidatedJson, middleware::extract_credentials},
};

/// Register a new account
///
/// POST /api/v1/auth/signup
pub async fn sign_up(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Signing up {}", request.email);

    let outcome = state
        .auth_client
        .sign_up(&request.email, &request.password, request.name.as_deref())
        .await?;

    // 资料空壳失败不影响注册本身，登录后 /profile 会补建
    let user = &outcome.user;
    let name = request.name.as_deref().or_else(|| user.name());
    let email = user.email.as_deref().or(Some(request.email.as_str()));
    if let Err(e) = state
        .profile_service
        .ensure_profile(&user.id, email, name)
        .await
    {
        warn!("Failed to create profile for {}: {}", user.id, e);
    }

    Ok((StatusCode::CREATED, Json(AuthResponse::from(outcome))))
}

/// Sign in with email and password
///
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Signing in {}", request.email);

    let session = state
        .auth_client
        .sign_in(&request.email, &request.password)
        .await?;

    state
        .profile_service
        .ensure_profile(
            session.user_id(),
            session.user.email.as_deref(),
            session.user.name(),
        )
        .await?;

    Ok(Json(AuthResponse::from(session)))
}

/// Sign out the bearer token
///
/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let credentials = extract_credentials(&headers);
    let Some(token) = credentials.bearer_token else {
        return Err(AppError::Authentication("Missing bearer token".to_string()));
    };
    debug!("Signing out");

    state.auth_client.sign_out(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current session, resolved through the auth service
///
/// GET /api/v1/auth/session
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let credentials = extract_credentials(&headers);
    let user = match credentials.bearer_token {
        Some(token) => state.auth_client.get_user(&token).await?,
        None => None,
    };

    Ok(Json(SessionResponse {
        authenticated: user.is_some(),
        user,
    }))
}
