//! Bearer-token authentication and the ownership checks built on it.
//!
//! Tokens are HS256 JWTs carrying the principal id and role. Handlers take a
//! `Principal` argument to require authentication.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::Role;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived from `JWT_SECRET`.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token signing failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Principal, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                debug!("Rejected bearer token: {e}");
                AppError::Unauthorized
            })?;
        Ok(Principal {
            id: data.claims.sub,
            role: data.claims.role,
        })
    }
}

/// The authenticated actor behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owner of a user document, or an administrator.
    pub fn ensure_user_owner(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.id == user_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You can only modify your own profile".to_string(),
            ))
        }
    }

    /// Strictly the employer recorded on a job. No administrative override.
    pub fn ensure_job_employer(&self, employer_id: Uuid) -> Result<(), AppError> {
        if self.id == employer_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only the employer who posted this job can do that".to_string(),
            ))
        }
    }

    /// Editing or deleting the posting itself also admits administrators.
    pub fn ensure_job_manager(&self, employer_id: Uuid) -> Result<(), AppError> {
        if self.is_admin() {
            return Ok(());
        }
        self.ensure_job_employer(employer_id)
    }

    pub fn ensure_can_post_jobs(&self) -> Result<(), AppError> {
        match self.role {
            Role::Employer | Role::Admin => Ok(()),
            Role::Jobseeker => Err(AppError::Forbidden(
                "Only employers can post jobs".to_string(),
            )),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;
        state.tokens.verify(token)
    }
}
