use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::errors::{AppError, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Auth("Invalid user ID in token".to_string()))
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_max_age_secs: i64,
}

impl JwtService {
    pub fn new(secret: &str, session_max_age_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            session_max_age_secs,
        }
    }

    pub fn session_max_age_secs(&self) -> i64 {
        self.session_max_age_secs
    }

    /// Issues a session token and returns it with its expiry.
    pub fn issue_session(&self, user_id: Uuid, email: &str) -> Result<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = Duration::try_seconds(self.session_max_age_secs)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("Session lifetime overflows the calendar"))
            })?;
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to issue session token: {}", e)))?;

        Ok((token, claims.expires_at()))
    }

    pub fn verify_session(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AppError::Auth(format!("Invalid session: {}", e)))?;

        Ok(token_data.claims)
    }
}
