use std::env;

use crate::auth::SignUpPolicy;
use crate::reports::PhotoPolicy;

const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub allowed_email_domain: String,
    pub min_password_length: usize,
    pub max_image_bytes: usize,
    pub gcs_bucket: Option<String>,
    pub r2: Option<R2Config>,
    pub image_public_base_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct R2Config {
    pub bucket: String,
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenvy::dotenv().ok();

        // R2 is enabled only when every credential is present
        let r2 = match (
            env::var("R2_BUCKET"),
            env::var("R2_ACCOUNT_ID"),
            env::var("R2_ACCESS_KEY_ID"),
            env::var("R2_SECRET_ACCESS_KEY"),
        ) {
            (Ok(bucket), Ok(account_id), Ok(access_key_id), Ok(secret_access_key)) => {
                Some(R2Config {
                    bucket,
                    account_id,
                    access_key_id,
                    secret_access_key,
                })
            }
            _ => None,
        };

        Ok(Config {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "50051".to_string())
                .parse()
                .unwrap_or(50051),
            jwt_secret: env::var("JWT_SECRET")?,
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
            allowed_email_domain: env::var("ALLOWED_EMAIL_DOMAIN")
                .unwrap_or_else(|_| "cuny.edu".to_string()),
            min_password_length: env::var("MIN_PASSWORD_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(6),
            max_image_bytes: env::var("MAX_IMAGE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_IMAGE_BYTES),
            gcs_bucket: env::var("GCS_BUCKET").ok().filter(|s| !s.is_empty()),
            r2,
            image_public_base_url: env::var("IMAGE_PUBLIC_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty()),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn sign_up_policy(&self) -> SignUpPolicy {
        SignUpPolicy::new(&self.allowed_email_domain, self.min_password_length)
    }

    pub fn photo_policy(&self) -> PhotoPolicy {
        PhotoPolicy::new(self.max_image_bytes)
    }
}
