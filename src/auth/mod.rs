//! Bearer-credential seam.
//!
//! Credential issuance (phone verification, one-time codes) lives outside
//! this service; what the domain core needs is `issue_token` /
//! `validate_token` plus an extractor that turns the bearer header into the
//! cart/order owner identity.

use crate::{errors::ServiceError, AppState};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Token claims: the owner identity plus issue/expiry stamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Clone)]
pub struct AuthService {
    secret: String,
    expiration: Duration,
}

impl AuthService {
    pub fn new(secret: impl Into<String>, expiration: Duration) -> Self {
        Self {
            secret: secret.into(),
            expiration,
        }
    }

    /// Issues a signed token for an already-verified identity.
    pub fn issue_token(&self, identity: &str) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: identity.to_string(),
            iat: now,
            exp: now + self.expiration.as_secs() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("Failed to sign token: {}", e)))
    }

    /// Validates a bearer token and returns its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| ServiceError::Unauthorized(format!("Invalid token: {}", e)))
    }
}

/// Extractor for the authenticated owner of the current request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub identity: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("Missing Authorization header".into()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServiceError::Unauthorized("Expected a bearer token".into()))?;

        let claims = state.auth.validate_token(token)?;
        Ok(AuthenticatedUser {
            identity: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new("test-secret", Duration::from_secs(3600))
    }

    #[test]
    fn issue_and_validate_round_trip() {
        let auth = service();
        let token = auth.issue_token("user-42").expect("token issued");
        let claims = auth.validate_token(&token).expect("token valid");
        assert_eq!(claims.sub, "user-42");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let auth = service();
        let token = auth.issue_token("user-42").expect("token issued");
        let other = AuthService::new("different-secret", Duration::from_secs(3600));
        assert!(matches!(
            other.validate_token(&token),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(matches!(
            service().validate_token("not-a-jwt"),
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
