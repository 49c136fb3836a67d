//! 认证服务客户端
//!
//! 托管认证服务（GoTrue 协议）负责注册、登录、登出和令牌签发。
//! 进程内实现用于开发环境和测试，签发的令牌与托管服务格式一致。

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::error::{AppError, Result};
use crate::security::auth::{JwtTokenGenerator, JwtVerifier};

/// 认证用户
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

impl AuthUser {
    /// 注册时填写的姓名
    pub fn name(&self) -> Option<&str> {
        self.user_metadata.get("name").and_then(Value::as_str)
    }
}

/// 登录会话
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

/// 注册结果；开启邮箱确认时没有会话
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<Session>,
}

/// 认证服务 trait
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// 注册新用户
    async fn sign_up(&self, email: &str, password: &str, name: Option<&str>)
    -> Result<SignUpOutcome>;

    /// 邮箱密码登录
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// 登出（吊销令牌）
    async fn sign_out(&self, access_token: &str) -> Result<()>;

    /// 根据令牌获取当前用户；令牌无效时返回 None
    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>>;

    /// 令牌对应的会话是否已结束（登出或被服务端吊销）
    ///
    /// 默认向认证服务查询当前用户。
    async fn is_revoked(&self, access_token: &str) -> Result<bool> {
        Ok(self.get_user(access_token).await?.is_none())
    }
}

/// 托管认证服务客户端
pub struct GoTrueClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoTrueClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout.max(1)))
            .build()?;
        Ok(Self::with_client(client, &config.url, &config.anon_key))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn json_or_error(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            return Ok(body);
        }

        let message = ["error_description", "msg", "message", "error"]
            .iter()
            .find_map(|k| body.get(*k).and_then(Value::as_str))
            .unwrap_or("unknown error")
            .to_string();
        if status.is_client_error() {
            Err(AppError::Authentication(message))
        } else {
            Err(AppError::Upstream(format!("Auth service error ({}): {}", status, message)))
        }
    }
}

#[async_trait]
impl AuthClient for GoTrueClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<SignUpOutcome> {
        let response = self
            .client
            .post(self.endpoint("signup"))
            .header("apikey", &self.api_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "name": name },
            }))
            .send()
            .await?;
        let body = Self::json_or_error(response).await?;

        // 自动确认时返回会话，否则只返回用户
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)?;
            Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            })
        } else {
            let user = body.get("user").cloned().unwrap_or(body);
            Ok(SignUpOutcome {
                user: serde_json::from_value(user)?,
                session: None,
            })
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body = Self::json_or_error(response).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("logout"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::json_or_error(response).await.map(|_| ())
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>> {
        let response = self
            .client
            .get(self.endpoint("user"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Ok(None);
        }
        let body = Self::json_or_error(response).await?;
        Ok(Some(serde_json::from_value(body)?))
    }
}

struct Account {
    password: String,
    user: AuthUser,
}

/// 与 `jsonwebtoken` 默认校验一致的过期宽限
const EXPIRY_LEEWAY_SECS: usize = 60;

/// 进程内认证服务，仅用于开发和测试
pub struct MemoryAuthClient {
    accounts: DashMap<String, Account>,
    /// 已登出的令牌及其过期时间
    revoked: DashMap<String, usize>,
    generator: JwtTokenGenerator,
    verifier: JwtVerifier,
}

impl MemoryAuthClient {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            accounts: DashMap::new(),
            revoked: DashMap::new(),
            generator: JwtTokenGenerator::from_config(config),
            verifier: JwtVerifier::from_config(config),
        }
    }

    fn issue(&self, user: &AuthUser) -> Result<Session> {
        let access_token = self
            .generator
            .generate_token(&user.id, user.email.as_deref())?;
        let expires_in = self.generator.expiry_seconds();
        Ok(Session {
            access_token,
            refresh_token: None,
            token_type: default_token_type(),
            expires_in: Some(expires_in),
            expires_at: Some(chrono::Utc::now().timestamp() + expires_in as i64),
            user: user.clone(),
        })
    }

    /// 过期令牌本身已无法通过校验，不必再记录
    fn prune_revoked(&self) {
        let now = chrono::Utc::now().timestamp().max(0) as usize;
        self.revoked
            .retain(|_, exp| exp.saturating_add(EXPIRY_LEEWAY_SECS) >= now);
    }
}

#[async_trait]
impl AuthClient for MemoryAuthClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<SignUpOutcome> {
        let key = email.trim().to_lowercase();
        if key.is_empty() || password.len() < 6 {
            return Err(AppError::Validation(
                "Email and a password of at least 6 characters are required".to_string(),
            ));
        }
        if self.accounts.contains_key(&key) {
            return Err(AppError::Conflict("User already registered".to_string()));
        }

        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: Some(key.clone()),
            user_metadata: json!({ "name": name }),
        };
        let session = self.issue(&user)?;
        self.accounts.insert(
            key,
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        Ok(SignUpOutcome {
            user,
            session: Some(session),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let key = email.trim().to_lowercase();
        let user = match self.accounts.get(&key) {
            Some(account) if account.password == password => account.user.clone(),
            _ => {
                return Err(AppError::Authentication(
                    "Invalid login credentials".to_string(),
                ));
            }
        };
        self.issue(&user)
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.prune_revoked();
        if let Ok(claims) = self.verifier.verify(access_token) {
            self.revoked.insert(access_token.to_string(), claims.exp);
        }
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>> {
        if self.revoked.contains_key(access_token) {
            return Ok(None);
        }
        let Ok(claims) = self.verifier.verify(access_token) else {
            return Ok(None);
        };
        let user = claims
            .email
            .and_then(|email| self.accounts.get(&email).map(|a| a.user.clone()));
        Ok(user)
    }

    async fn is_revoked(&self, access_token: &str) -> Result<bool> {
        Ok(self.revoked.contains_key(access_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_body() -> Value {
        json!({
            "access_token": "tok",
            "refresh_token": "ref",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": { "id": "u1", "email": "ada@example.com", "user_metadata": {"name": "Ada"} }
        })
    }

    fn client(server: &MockServer) -> GoTrueClient {
        GoTrueClient::with_client(reqwest::Client::new(), &server.uri(), "anon")
    }

    #[tokio::test]
    async fn test_sign_in_uses_password_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon"))
            .and(body_partial_json(json!({"email": "ada@example.com"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        let session = client(&server)
            .sign_in("ada@example.com", "secret")
            .await
            .unwrap();
        assert_eq!(session.user_id(), "u1");
        assert_eq!(session.user.name(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_sign_in_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let err = client(&server).sign_in("a@b.c", "bad").await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(msg) if msg == "Invalid login credentials"));
    }

    #[tokio::test]
    async fn test_sign_up_without_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .and(body_partial_json(json!({"data": {"name": "Ada"}})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "u9", "email": "ada@example.com"})),
            )
            .mount(&server)
            .await;

        let outcome = client(&server)
            .sign_up("ada@example.com", "secret", Some("Ada"))
            .await
            .unwrap();
        assert_eq!(outcome.user.id, "u9");
        assert!(outcome.session.is_none());
    }

    #[tokio::test]
    async fn test_get_user_with_expired_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "expired"})))
            .mount(&server)
            .await;

        assert_eq!(client(&server).get_user("old").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_client_lifecycle() {
        let config = AppConfig::development();
        let auth = MemoryAuthClient::new(&config.backend);

        let outcome = auth
            .sign_up("Ada@Example.com", "secret1", Some("Ada"))
            .await
            .unwrap();
        let token = outcome.session.unwrap().access_token;
        let user = auth.get_user(&token).await.unwrap().unwrap();
        assert_eq!(user.id, outcome.user.id);

        let duplicate = auth.sign_up("ada@example.com", "secret1", None).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        assert!(auth.sign_in("ada@example.com", "wrong").await.is_err());
        let session = auth.sign_in("ada@example.com", "secret1").await.unwrap();
        assert_eq!(session.user.name(), Some("Ada"));

        assert!(!auth.is_revoked(&token).await.unwrap());
        auth.sign_out(&token).await.unwrap();
        assert_eq!(auth.get_user(&token).await.unwrap(), None);
        assert!(auth.is_revoked(&token).await.unwrap());
    }

    #[tokio::test]
    async fn test_sign_out_drops_expired_revocations() {
        let config = AppConfig::development();
        let auth = MemoryAuthClient::new(&config.backend);
        auth.revoked.insert("stale".to_string(), 1);

        let token = auth
            .sign_up("bo@example.com", "secret1", None)
            .await
            .unwrap()
            .session
            .unwrap()
            .access_token;
        auth.sign_out(&token).await.unwrap();

        assert!(!auth.revoked.contains_key("stale"));
        assert!(auth.revoked.contains_key(&token));

        // 无法解析的令牌不记录
        auth.sign_out("not-a-jwt").await.unwrap();
        assert_eq!(auth.revoked.len(), 1);
    }

    #[tokio::test]
    async fn test_gotrue_revocation_checks_current_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", "Bearer live"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "u1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", "Bearer gone"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "session not found"})))
            .mount(&server)
            .await;

        let client = client(&server);
        assert!(!client.is_revoked("live").await.unwrap());
        assert!(client.is_revoked("gone").await.unwrap());
    }
}
