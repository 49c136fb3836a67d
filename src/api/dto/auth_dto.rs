//! 认证 DTO

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::{AuthUser, Session, SignUpOutcome};

/// 注册请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
}

/// 登录请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// 注册/登录响应；开启邮箱确认时注册没有会话
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: AuthUser,
    pub session: Option<Session>,
}

impl From<SignUpOutcome> for AuthResponse {
    fn from(outcome: SignUpOutcome) -> Self {
        Self {
            user: outcome.user,
            session: outcome.session,
        }
    }
}

impl From<Session> for AuthResponse {
    fn from(session: Session) -> Self {
        Self {
            user: session.user.clone(),
            session: Some(session),
        }
    }
}

/// 当前会话
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<AuthUser>,
}
