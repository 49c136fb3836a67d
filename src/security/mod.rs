//! Security Module
//!
//! Provides security features for the Kindred API:
//! - Bearer token (JWT) verification
//! - Validated JSON request bodies
//! - Security Middleware

pub mod auth;
pub mod middleware;
pub mod validation;

pub use auth::{Claims, Credentials, JwtTokenGenerator, JwtVerifier};
pub use middleware::{active_claims, auth_middleware, security_headers_middleware};
pub use validation::ValidatedJson;
