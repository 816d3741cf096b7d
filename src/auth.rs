use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    access::Principal,
    config::{AppConfig, Env},
    repository::RepositoryState,
};

/// Header accepted as a stand-in session in `Env::Local`.
pub const DEV_USER_HEADER: &str = "x-user-id";
/// Cookie the auth provider's browser client stores the access token in.
pub const SESSION_COOKIE: &str = "sb-access-token";

/// Claims
///
/// The payload expected inside a session JWT issued by the auth provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's UUID, also the `profiles.id` primary key.
    pub sub: Uuid,
    /// Expiration time. Always validated.
    pub exp: usize,
    /// Issued at.
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity backend unavailable: {0}")]
    Backend(#[from] sqlx::Error),
}

/// IdentityResolver
///
/// Turns an inbound request into the caller's principal.
///
/// `Ok(None)` means "no valid session". `Err` means the lookup itself failed; the
/// gate folds both into an anonymous caller.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, parts: &Parts) -> Result<Option<Principal>, IdentityError>;
}

pub type IdentityState = Arc<dyn IdentityResolver>;

/// resolve_principal
///
/// Runs the resolver and collapses a failed lookup into "no principal", logging it.
pub async fn resolve_principal(resolver: &dyn IdentityResolver, parts: &Parts) -> Option<Principal> {
    match resolver.resolve(parts).await {
        Ok(principal) => principal,
        Err(e) => {
            tracing::warn!(error = %e, "identity lookup failed, treating caller as anonymous");
            None
        }
    }
}

/// SessionResolver
///
/// Resolves identity from the auth provider's session JWT, then loads the profile and
/// role memberships from the repository.
///
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header carrying a known user id.
/// 2. Token: `Authorization: Bearer <jwt>`, else the `sb-access-token` cookie.
/// 3. HS256 validation against the configured secret, expiry enforced.
/// 4. Profile and role lookup. Unknown users resolve to no principal.
pub struct SessionResolver {
    repo: RepositoryState,
    env: Env,
    jwt_secret: String,
}

impl SessionResolver {
    pub fn new(repo: RepositoryState, config: &AppConfig) -> Self {
        Self {
            repo,
            env: config.env.clone(),
            jwt_secret: config.jwt_secret.clone(),
        }
    }

    async fn load_principal(&self, user_id: Uuid) -> Result<Option<Principal>, IdentityError> {
        let Some(user) = self.repo.get_user(user_id).await? else {
            return Ok(None);
        };
        let roles = self.repo.get_user_roles(user.id).await?;
        Ok(Some(Principal {
            id: user.id,
            email: user.email,
            roles,
        }))
    }

    fn decode_subject(&self, token: &str) -> Option<Uuid> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());

        let mut validation = Validation::default();
        validation.validate_exp = true;
        // Audience is not checked; provider tokens carry aud="authenticated".
        validation.validate_aud = false;

        match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(data) => Some(data.claims.sub),
            Err(e) => {
                tracing::debug!(error = %e, "rejected session token");
                None
            }
        }
    }
}

#[async_trait]
impl IdentityResolver for SessionResolver {
    async fn resolve(&self, parts: &Parts) -> Result<Option<Principal>, IdentityError> {
        if self.env == Env::Local {
            if let Some(user_id) = dev_user_id(parts) {
                if let Some(principal) = self.load_principal(user_id).await? {
                    return Ok(Some(principal));
                }
            }
        }

        let Some(token) = bearer_token(parts).or_else(|| session_cookie(parts)) else {
            return Ok(None);
        };

        match self.decode_subject(token) {
            Some(user_id) => self.load_principal(user_id).await,
            None => Ok(None),
        }
    }
}

fn dev_user_id(parts: &Parts) -> Option<Uuid> {
    parts
        .headers
        .get(DEV_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn session_cookie(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token)
        .filter(|token| !token.is_empty())
}

/// AuthUser
///
/// Extractor for handlers behind the gate. The gate stores the resolved principal in
/// the request extensions on `Allow`; a missing principal rejects with 401.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthUser)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
