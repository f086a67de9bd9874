//! Typed client for the video API plus the stateful pieces of the browser
//! front end: the upload widget, the create-video form and the video list.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;

use crate::{
    models::{AuthResponse, NewVideo, SessionResponse, UserResponse, Video},
    services::upload_auth::UploadAuthResponse,
};

pub mod browser;
pub mod form;
pub mod home;
pub mod upload;

pub use browser::VideoBrowser;
pub use form::{FormError, FormState, FormUploadObserver, Notification, NotificationKind, VideoForm};
pub use home::HomePage;
pub use upload::{
    CdnTransport, CredentialProvider, FileKind, ImageKitTransport, UploadCredentials,
    UploadError, UploadFile, UploadObserver, UploadOptions, UploadResult, UploadWidget,
};

/// The subset of the API the front-end state machines depend on.
#[async_trait]
pub trait VideoApi: Send + Sync {
    async fn get_videos(&self) -> Result<Vec<Video>>;

    async fn create_video(&self, video: &NewVideo) -> Result<Video>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    session_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_token: None,
        }
    }

    pub fn with_session(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/api{}", self.base_url, endpoint));
        match &self.session_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, endpoint: &str) -> Result<T> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("Request to {} failed", endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("{} returned {}: {}", endpoint, status, text);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Invalid response body from {}", endpoint))
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.send(self.request(Method::GET, endpoint), endpoint).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        self.send(self.request(Method::POST, endpoint).json(body), endpoint)
            .await
    }

    pub async fn upload_auth(&self) -> Result<UploadAuthResponse> {
        self.get_json("/auth/imagekit-auth").await
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<UserResponse> {
        let body: serde_json::Value = self
            .post_json("/auth/register", &json!({ "email": email, "password": password }))
            .await?;
        serde_json::from_value(body["user"].clone()).context("Missing user in register response")
    }

    /// Signs in and keeps the issued session for subsequent calls.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthResponse> {
        let auth: AuthResponse = self
            .post_json("/auth/login", &json!({ "email": email, "password": password }))
            .await?;
        self.session_token = Some(auth.token.clone());
        Ok(auth)
    }

    /// Ends the session: clears the server cookie and forgets the token even
    /// if the server cannot be reached.
    pub async fn sign_out(&mut self) -> Result<()> {
        let outcome: Result<serde_json::Value> = self
            .send(self.request(Method::POST, "/auth/logout"), "/auth/logout")
            .await;
        self.session_token = None;
        outcome.map(|_| ())
    }

    pub async fn session(&self) -> Result<SessionResponse> {
        self.get_json("/auth/session").await
    }
}

#[async_trait]
impl VideoApi for ApiClient {
    async fn get_videos(&self) -> Result<Vec<Video>> {
        self.get_json("/video").await
    }

    async fn create_video(&self, video: &NewVideo) -> Result<Video> {
        self.post_json("/video", video).await
    }
}

#[async_trait]
impl CredentialProvider for ApiClient {
    async fn credentials(&self) -> std::result::Result<UploadCredentials, UploadError> {
        let response = self
            .upload_auth()
            .await
            .map_err(|e| UploadError::Credentials(format!("{:#}", e)))?;
        Ok(response.into())
    }
}
