use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    errors::Result,
    models::{NewVideo, User, Video},
};

pub mod memory;
pub mod queries;

pub use memory::MemoryStore;
use queries::{UserQueries, VideoQueries};

/// Persistence for video records. Records are append-only.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// All videos, newest first.
    async fn list_videos(&self) -> Result<Vec<Video>>;

    async fn create_video(&self, video: &NewVideo) -> Result<Video>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl VideoStore for Database {
    async fn list_videos(&self) -> Result<Vec<Video>> {
        VideoQueries::list(&self.pool).await
    }

    async fn create_video(&self, video: &NewVideo) -> Result<Video> {
        VideoQueries::create(&self.pool, video).await
    }
}

#[async_trait]
impl UserStore for Database {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        UserQueries::create_user(&self.pool, email, password_hash).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserQueries::find_by_email(&self.pool, email).await
    }
}
