use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tonic::{Request, Status};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::AppUser;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    /// Session id, used for revocation.
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

/// The signed-in identity, injected into request extensions by the auth
/// middleware and passed explicitly to the handlers that need it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Session attached to the request, if any.
    pub fn current<T>(request: &Request<T>) -> Option<Session> {
        request.extensions().get::<Session>().cloned()
    }

    pub fn require<T>(request: &Request<T>) -> Result<Session, Status> {
        Self::current(request).ok_or_else(|| Status::unauthenticated("Authentication required"))
    }
}

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    secret: String,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: impl Into<String>, ttl_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user: &AppUser) -> AppResult<(String, Session)> {
        let now = Utc::now();
        let exp = now + self.ttl;
        let session_id = Uuid::new_v4();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            jti: session_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("JWT error: {}", e)))?;

        Ok((
            token,
            Session {
                user_id: user.id,
                email: user.email.clone(),
                session_id,
                expires_at: exp,
            },
        ))
    }

    /// Decodes a token. Returns `None` for anything invalid or expired.
    pub fn verify(&self, token: &str) -> Option<Session> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .ok()?;
        let claims = data.claims;

        Some(Session {
            user_id: claims.sub.parse().ok()?,
            email: claims.email,
            session_id: claims.jti.parse().ok()?,
            expires_at: Utc.timestamp_opt(claims.exp, 0).single()?,
        })
    }
}
