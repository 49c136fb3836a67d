//! Security Middleware Module
//!
//! Provides Axum middleware for bearer authentication and security headers.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::result::Result as StdResult;

use crate::api::app_state::AppState;
use crate::auth::AuthClient;
use crate::error::AppError;
use crate::security::auth::{Claims, Credentials, JwtVerifier};

/// Extension trait for adding claims to request extensions
pub trait RequestClaimsExt {
    fn claims(&self) -> Option<&Claims>;
    fn set_claims(&mut self, claims: Claims);
}

impl RequestClaimsExt for Request<Body> {
    fn claims(&self) -> Option<&Claims> {
        self.extensions().get::<Claims>()
    }

    fn set_claims(&mut self, claims: Claims) {
        self.extensions_mut().insert(claims);
    }
}

/// Extract credentials from request headers
pub fn extract_credentials(headers: &HeaderMap) -> Credentials {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    Credentials::from_authorization_header(auth_header)
}

/// 当前会话的声明
///
/// 没有令牌或会话已登出时返回 `Ok(None)`；令牌无效或认证服务查询失败时返回错误。
pub async fn active_claims(
    verifier: &JwtVerifier,
    auth_client: &dyn AuthClient,
    headers: &HeaderMap,
) -> StdResult<Option<Claims>, AppError> {
    let credentials = extract_credentials(headers);
    let Some(token) = credentials.bearer_token.as_deref() else {
        return Ok(None);
    };
    let claims = verifier.verify(token)?;
    if auth_client.is_revoked(token).await? {
        return Ok(None);
    }
    Ok(Some(claims))
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> StdResult<Response, AppError> {
    let claims = active_claims(&state.verifier, state.auth_client.as_ref(), req.headers())
        .await?
        .ok_or_else(|| AppError::Authentication("No active session".to_string()))?;

    req.set_claims(claims);
    Ok(next.run(req).await)
}

/// Security headers middleware
pub async fn security_headers_middleware(
    req: Request<Body>,
    next: Next,
) -> StdResult<Response, StatusCode> {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "Permissions-Policy",
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );

    Ok(response)
}
