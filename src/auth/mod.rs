//! 认证模块
//!
//! 认证服务客户端和会话上下文。

pub mod client;
pub mod session;

pub use client::{AuthClient, AuthUser, GoTrueClient, MemoryAuthClient, Session, SignUpOutcome};
pub use session::{SessionContext, SessionState, SessionSubscription};

use std::sync::Arc;

use crate::config::{BackendConfig, BackendKind};
use crate::error::Result;

/// 根据后端类型创建认证客户端
pub fn create_auth_client(config: &BackendConfig) -> Result<Arc<dyn AuthClient>> {
    Ok(match config.kind {
        BackendKind::Hosted => Arc::new(GoTrueClient::new(config)?),
        BackendKind::Memory => Arc::new(MemoryAuthClient::new(config)),
    })
}
