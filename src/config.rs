use anyhow::{bail, Result};
use std::env;

pub const MAX_SESSION_AGE_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub session_max_age_secs: i64,
    pub imagekit_private_key: Option<String>,
    pub imagekit_public_key: Option<String>,
    pub upload_auth_ttl_secs: u64,
    pub cors_allowed_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/video_uploader".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key".to_string()),
            session_max_age_secs: env::var("SESSION_MAX_AGE_SECS")
                .unwrap_or_else(|_| "2592000".to_string()) // 30 days
                .parse()?,
            imagekit_private_key: non_empty_var("IMAGEKIT_PRIVATE_KEY"),
            imagekit_public_key: non_empty_var("IMAGEKIT_PUBLIC_KEY"),
            upload_auth_ttl_secs: env::var("UPLOAD_AUTH_TTL_SECS")
                .unwrap_or_else(|_| "1800".to_string()) // 30 minutes
                .parse()?,
            cors_allowed_origin: non_empty_var("CORS_ALLOWED_ORIGIN"),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.session_max_age_secs <= 0 || self.session_max_age_secs > MAX_SESSION_AGE_SECS {
            bail!("SESSION_MAX_AGE_SECS must be between 1 and {}", MAX_SESSION_AGE_SECS);
        }
        // The CDN rejects upload signatures that expire more than an hour ahead.
        if self.upload_auth_ttl_secs == 0 || self.upload_auth_ttl_secs >= 3600 {
            bail!("UPLOAD_AUTH_TTL_SECS must be between 1 and 3599");
        }
        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
