//! Supabase access token validation

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use zenkofy_types::UserId;

use crate::{AuthConfig, AuthError};

/// Claims carried by a Supabase access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: String,
    /// Audience
    pub aud: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,
    /// Issuer
    #[serde(default)]
    pub iss: Option<String>,
    /// Email of the signed-in user
    #[serde(default)]
    pub email: Option<String>,
    /// Postgres role (`authenticated`)
    #[serde(default)]
    pub role: Option<String>,
}

/// Verified caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Option<String>,
}

/// HS256 token validator
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    /// Create a new token validator
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.audience.as_str()]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }
        validation.leeway = config.leeway_secs;
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Validate a token and return its claims
    pub fn validate(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let data = decode::<AccessClaims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!("Token validation failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        Ok(data.claims)
    }

    /// Validate a token and resolve the caller
    pub fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.validate(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            tracing::debug!(sub = %claims.sub, "Token subject is not a user id");
            AuthError::InvalidToken
        })?;

        Ok(Identity {
            user_id: UserId(user_id),
            email: claims.email,
        })
    }
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}
