//! Short-lived credentials that let a browser upload straight to the CDN.
//!
//! The CDN verifies `signature == hex(HMAC-SHA1(private_key, token + expire))`
//! and refuses a token it has already seen, so every call mints a new token.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::Config,
    errors::{AppError, Result},
};

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct AuthenticationParameters {
    pub token: String,
    pub expire: i64,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadAuthResponse {
    pub authentication_parameters: AuthenticationParameters,
    pub public_key: String,
}

#[derive(Debug, Clone)]
pub struct UploadAuthSigner {
    private_key: Option<String>,
    public_key: Option<String>,
    ttl_secs: u64,
}

impl UploadAuthSigner {
    pub fn new(private_key: Option<String>, public_key: Option<String>, ttl_secs: u64) -> Self {
        Self {
            private_key,
            public_key,
            ttl_secs,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.imagekit_private_key.clone(),
            config.imagekit_public_key.clone(),
            config.upload_auth_ttl_secs,
        )
    }

    pub fn issue(&self) -> Result<UploadAuthResponse> {
        let public_key = self
            .public_key
            .clone()
            .ok_or_else(|| AppError::UploadAuth("IMAGEKIT_PUBLIC_KEY is not configured".to_string()))?;

        let token = Uuid::new_v4().to_string();
        let expire = Utc::now().timestamp() + self.ttl_secs as i64;
        let authentication_parameters = self.sign(&token, expire)?;

        Ok(UploadAuthResponse {
            authentication_parameters,
            public_key,
        })
    }

    pub fn sign(&self, token: &str, expire: i64) -> Result<AuthenticationParameters> {
        let private_key = self
            .private_key
            .as_deref()
            .ok_or_else(|| AppError::UploadAuth("IMAGEKIT_PRIVATE_KEY is not configured".to_string()))?;

        let mut mac = HmacSha1::new_from_slice(private_key.as_bytes())
            .map_err(|e| AppError::UploadAuth(format!("Invalid private key: {}", e)))?;
        mac.update(token.as_bytes());
        mac.update(expire.to_string().as_bytes());

        Ok(AuthenticationParameters {
            token: token.to_string(),
            expire,
            signature: hex::encode(mac.finalize().into_bytes()),
        })
    }
}
