//! Bearer token validation.
//!
//! The platform does not issue tokens; it only answers "does this bearer
//! token map to (user, role)?". [`Authenticator`] is that seam:
//! [`JwtAuthenticator`] verifies HS256 tokens minted by the auth service,
//! [`StaticAuthenticator`] backs tests with fixed tokens.

use std::collections::HashMap;

use axum::http::HeaderMap;
use common::{Role, UserId};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Identity a validated bearer token maps to.
#[derive(Debug, Clone, Copy)]
pub struct AuthClaims {
    pub user_id: UserId,
    pub role: Role,
}

impl AuthClaims {
    /// Rejects callers whose role differs from the required one.
    pub fn require_role(self, role: Role) -> Result<Self, ApiError> {
        if self.role != role {
            return Err(ApiError::Forbidden(format!(
                "This operation requires the {role} role"
            )));
        }
        Ok(self)
    }
}

/// Trait for validating bearer tokens.
pub trait Authenticator: Send + Sync {
    /// Validates a bearer token and returns the identity it carries.
    fn validate(&self, token: &str) -> Result<AuthClaims, ApiError>;
}

/// Extracts the bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Malformed Authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected a Bearer token".to_string()))
}

/// Wire shape of the auth service's JWT payload.
#[derive(Debug, Serialize, Deserialize)]
struct JwtPayload {
    user_id: uuid::Uuid,
    role: String,
    exp: i64,
}

/// Validates HS256 JWTs issued by the auth service.
#[derive(Clone)]
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    /// Creates a validator over the shared signing secret.
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl Authenticator for JwtAuthenticator {
    fn validate(&self, token: &str) -> Result<AuthClaims, ApiError> {
        let data = jsonwebtoken::decode::<JwtPayload>(token, &self.decoding_key, &self.validation)
            .map_err(|err| ApiError::Unauthorized(format!("Invalid token: {err}")))?;

        let role = data
            .claims
            .role
            .parse::<Role>()
            .map_err(|err| ApiError::Unauthorized(format!("Invalid token: {err}")))?;

        Ok(AuthClaims {
            user_id: UserId::from_uuid(data.claims.user_id),
            role,
        })
    }
}

/// Fixed token-to-identity map for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    tokens: HashMap<String, AuthClaims>,
}

impl StaticAuthenticator {
    /// Creates an empty authenticator that rejects everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for an identity.
    pub fn with_token(mut self, token: impl Into<String>, user_id: UserId, role: Role) -> Self {
        self.tokens
            .insert(token.into(), AuthClaims { user_id, role });
        self
    }
}

impl Authenticator for StaticAuthenticator {
    fn validate(&self, token: &str) -> Result<AuthClaims, ApiError> {
        self.tokens
            .get(token)
            .copied()
            .ok_or_else(|| ApiError::Unauthorized("Invalid token".to_string()))
    }
}
