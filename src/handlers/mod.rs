use std::sync::Arc;

use crate::{
    auth::JwtService,
    config::Config,
    database::{UserStore, VideoStore},
    services::{metrics::MetricsService, upload_auth::UploadAuthSigner},
};

pub mod auth;
pub mod docs;
pub mod health;
pub mod metrics;
pub mod upload_auth;
pub mod video;

#[derive(Clone)]
pub struct AppState {
    pub videos: Arc<dyn VideoStore>,
    pub users: Arc<dyn UserStore>,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtService>,
    pub upload_auth: UploadAuthSigner,
    pub metrics: Arc<MetricsService>,
}

impl AppState {
    pub fn new(
        config: Config,
        videos: Arc<dyn VideoStore>,
        users: Arc<dyn UserStore>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            jwt: Arc::new(JwtService::new(&config.jwt_secret, config.session_max_age_secs)),
            upload_auth: UploadAuthSigner::from_config(&config),
            metrics: Arc::new(MetricsService::new()?),
            config: Arc::new(config),
            videos,
            users,
        })
    }
}
