//! Authentication Module
//!
//! Access tokens are issued by the hosted auth service and signed with the
//! project's JWT secret (HS256). The API verifies them locally instead of
//! calling back to the auth service on every request.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::error::{AppError, Result};

/// Credentials for authentication
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    /// Bearer token (if provided)
    pub bearer_token: Option<String>,
}

impl Credentials {
    /// Try to extract credentials from Authorization header
    pub fn from_authorization_header(auth_header: Option<&str>) -> Self {
        let bearer_token = auth_header
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        Self { bearer_token }
    }

    pub fn is_empty(&self) -> bool {
        self.bearer_token.is_none()
    }
}

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (auth user id)
    pub sub: String,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Role granted by the auth service
    #[serde(default)]
    pub role: String,
    /// Token expiration timestamp
    pub exp: usize,
    /// Audience
    pub aud: String,
}

impl Claims {
    /// Create new claims
    pub fn new(sub: &str, email: Option<&str>, audience: &str, expiry_seconds: u64) -> Self {
        Self {
            sub: sub.to_string(),
            email: email.map(str::to_string),
            role: audience.to_string(),
            exp: Utc::now().timestamp() as usize + expiry_seconds as usize,
            aud: audience.to_string(),
        }
    }

    /// Check if claims are expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() as usize > self.exp
    }

    /// Authenticated user id
    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

/// Verifies bearer tokens issued by the auth service
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    audience: String,
}

impl JwtVerifier {
    pub fn new(secret: &str, audience: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            audience: audience.to_string(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.jwt_secret, &config.jwt_audience)
    }

    /// Validate a token and return claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.audience.clone()]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|token_data| token_data.claims)
            .map_err(|e| AppError::Authentication(format!("Invalid JWT token: {}", e)))
    }
}

/// JWT token generation helper
///
/// Used by the in-process auth backend; tokens are interchangeable with the
/// ones the hosted auth service signs.
pub struct JwtTokenGenerator {
    encoding_key: EncodingKey,
    audience: String,
    expiry_seconds: u64,
}

impl JwtTokenGenerator {
    /// Create new token generator
    pub fn new(secret: &str, audience: &str, expiry_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            audience: audience.to_string(),
            expiry_seconds,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.jwt_secret, &config.jwt_audience, 3600)
    }

    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    /// Generate a new JWT token
    pub fn generate_token(&self, sub: &str, email: Option<&str>) -> Result<String> {
        let claims = Claims::new(sub, email, &self.audience, self.expiry_seconds);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Authentication(format!("Failed to generate token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

    #[test]
    fn test_credentials_from_header() {
        let creds = Credentials::from_authorization_header(Some("Bearer abc.def"));
        assert_eq!(creds.bearer_token.as_deref(), Some("abc.def"));

        assert!(Credentials::from_authorization_header(Some("Basic xyz")).is_empty());
        assert!(Credentials::from_authorization_header(Some("Bearer   ")).is_empty());
        assert!(Credentials::from_authorization_header(None).is_empty());
    }

    #[test]
    fn test_generated_token_verifies() {
        let generator = JwtTokenGenerator::new(SECRET, "authenticated", 600);
        let token = generator.generate_token("user-1", Some("a@b.c")).unwrap();

        let claims = JwtVerifier::new(SECRET, "authenticated")
            .verify(&token)
            .unwrap();
        assert_eq!(claims.user_id(), "user-1");
        assert_eq!(claims.email.as_deref(), Some("a@b.c"));
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_wrong_secret_or_audience_is_rejected() {
        let token = JwtTokenGenerator::new(SECRET, "authenticated", 600)
            .generate_token("user-1", None)
            .unwrap();

        let wrong_secret = JwtVerifier::new("another-secret-that-is-long-enough!!", "authenticated");
        assert!(matches!(
            wrong_secret.verify(&token),
            Err(AppError::Authentication(_))
        ));

        let wrong_audience = JwtVerifier::new(SECRET, "anon");
        assert!(wrong_audience.verify(&token).is_err());
    }
}
