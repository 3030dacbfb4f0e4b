//! Authentication and authorization
//!
//! Tokens are issued elsewhere; this module only validates them and turns
//! their claims into the `Actor` the services authorize against.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use app_services::{Actor, Role};
use core_kernel::CompanyId;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User's roles
    pub roles: Vec<String>,
    /// Company a payer acts for
    #[serde(rename = "companyId", default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing permission: {0}")]
    MissingPermission(String),
}

/// Upper bound on token lifetime (ten years)
const MAX_LIFETIME_SECS: i64 = 10 * 365 * 24 * 3600;

/// Role precedence when a token carries several
const ROLE_PRECEDENCE: [Role; 4] = [Role::Admin, Role::EcoOperator, Role::Employee, Role::Business];

impl Claims {
    /// The strongest known role in the token; unknown role names are ignored
    pub fn role(&self) -> Option<Role> {
        let held: Vec<Role> = self.roles.iter().filter_map(|r| r.parse().ok()).collect();
        ROLE_PRECEDENCE.into_iter().find(|role| held.contains(role))
    }

    /// Builds the caller identity the services check permissions against
    pub fn actor(&self) -> Result<Actor, AuthError> {
        let role = self
            .role()
            .ok_or_else(|| AuthError::MissingPermission("no recognised role".to_string()))?;
        Ok(Actor {
            user_id: self.sub.clone(),
            role,
            company_id: self.company_id.map(CompanyId::from_uuid),
        })
    }
}

/// Creates a new JWT token
///
/// # Arguments
///
/// * `user_id` - User identifier
/// * `roles` - User's roles
/// * `company_id` - Company a payer is bound to
/// * `secret` - JWT secret key
/// * `expiration_secs` - Token validity in seconds
pub fn create_token(
    user_id: &str,
    roles: Vec<String>,
    company_id: Option<Uuid>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let lifetime = i64::try_from(expiration_secs).unwrap_or(i64::MAX).min(MAX_LIFETIME_SECS);
    let exp = now + Duration::seconds(lifetime);

    let claims = Claims {
        sub: user_id.to_string(),
        roles,
        company_id,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}
