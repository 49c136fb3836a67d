//! 会话上下文
//!
//! 显式构造的会话状态持有者。状态通过 watch 通道广播，订阅者在
//! `unsubscribe()` 或析构时退订。

use std::sync::Arc;
use tokio::sync::watch;

use crate::auth::client::{AuthClient, Session};
use crate::error::Result;

/// 会话状态
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    /// 尚未确定（恢复中）
    #[default]
    Unknown,
    /// 已登录
    SignedIn(Session),
    /// 未登录
    SignedOut,
}

impl SessionState {
    /// 当前用户 ID；状态未知时返回 None
    pub fn user_id(&self) -> Option<&str> {
        match self {
            SessionState::SignedIn(session) => Some(session.user_id()),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, SessionState::Unknown)
    }
}

/// 会话上下文
pub struct SessionContext {
    client: Arc<dyn AuthClient>,
    state: watch::Sender<SessionState>,
}

impl SessionContext {
    pub fn new(client: Arc<dyn AuthClient>) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self { client, state }
    }

    /// 当前状态快照
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: Some(self.state.subscribe()),
        }
    }

    /// 当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }

    /// 用已保存的令牌恢复会话；令牌无效时进入未登录状态
    pub async fn restore(&self, access_token: Option<&str>) -> Result<SessionState> {
        let next = match access_token {
            None => SessionState::SignedOut,
            Some(token) => match self.client.get_user(token).await {
                Ok(Some(user)) => SessionState::SignedIn(Session {
                    access_token: token.to_string(),
                    refresh_token: None,
                    token_type: "bearer".to_string(),
                    expires_in: None,
                    expires_at: None,
                    user,
                }),
                Ok(None) => SessionState::SignedOut,
                Err(e) => {
                    tracing::warn!("Session restore failed: {}", e);
                    self.state.send_replace(SessionState::SignedOut);
                    return Err(e);
                }
            },
        };
        self.state.send_replace(next.clone());
        Ok(next)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.client.sign_in(email, password).await?;
        tracing::info!("User signed in: {}", session.user_id());
        self.state
            .send_replace(SessionState::SignedIn(session.clone()));
        Ok(session)
    }

    /// 登出；远端失败时本地状态仍然清除
    pub async fn sign_out(&self) -> Result<()> {
        let previous = self.state.send_replace(SessionState::SignedOut);
        if let SessionState::SignedIn(session) = previous {
            self.client.sign_out(&session.access_token).await?;
        }
        Ok(())
    }
}

/// 会话订阅
pub struct SessionSubscription {
    receiver: Option<watch::Receiver<SessionState>>,
}

impl SessionSubscription {
    /// 等待下一次状态变化；上下文已销毁或已退订时返回 None
    pub async fn changed(&mut self) -> Option<SessionState> {
        let receiver = self.receiver.as_mut()?;
        receiver.changed().await.ok()?;
        Some(receiver.borrow_and_update().clone())
    }

    /// 当前状态
    pub fn current(&self) -> Option<SessionState> {
        self.receiver.as_ref().map(|r| r.borrow().clone())
    }

    pub fn unsubscribe(&mut self) {
        self.receiver = None;
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::client::MemoryAuthClient;
    use crate::config::AppConfig;

    async fn context() -> SessionContext {
        let config = AppConfig::development();
        let client = MemoryAuthClient::new(&config.backend);
        client
            .sign_up("ada@example.com", "secret1", Some("Ada"))
            .await
            .unwrap();
        SessionContext::new(Arc::new(client))
    }

    #[tokio::test]
    async fn test_sign_in_notifies_subscribers() {
        let ctx = context().await;
        let mut sub = ctx.subscribe();
        assert_eq!(sub.current(), Some(SessionState::Unknown));

        ctx.sign_in("ada@example.com", "secret1").await.unwrap();
        let state = sub.changed().await.unwrap();
        assert!(state.user_id().is_some());

        ctx.sign_out().await.unwrap();
        assert_eq!(sub.changed().await, Some(SessionState::SignedOut));
    }

    #[tokio::test]
    async fn test_unsubscribe_on_drop_and_explicitly() {
        let ctx = context().await;
        let first = ctx.subscribe();
        let mut second = ctx.subscribe();
        assert_eq!(ctx.subscriber_count(), 2);

        drop(first);
        assert_eq!(ctx.subscriber_count(), 1);

        second.unsubscribe();
        assert!(!second.is_active());
        assert_eq!(ctx.subscriber_count(), 0);
        assert_eq!(second.changed().await, None);
    }

    #[tokio::test]
    async fn test_restore_with_invalid_token_signs_out() {
        let ctx = context().await;
        let state = ctx.restore(Some("garbage")).await.unwrap();
        assert_eq!(state, SessionState::SignedOut);
        assert!(ctx.current().is_known());

        assert_eq!(ctx.restore(None).await.unwrap(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn test_restore_with_valid_token() {
        let ctx = context().await;
        let session = ctx.sign_in("ada@example.com", "secret1").await.unwrap();
        let restored = ctx.restore(Some(&session.access_token)).await.unwrap();
        assert_eq!(restored.user_id(), Some(session.user_id()));
    }
}
