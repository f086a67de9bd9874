use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{UserStore, VideoStore};
use crate::{
    errors::{AppError, Result},
    models::{NewVideo, User, Video},
};

/// Process-local store used by tests and local demos.
#[derive(Default)]
pub struct MemoryStore {
    videos: RwLock<Vec<Video>>,
    users: RwLock<Vec<User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn list_videos(&self) -> Result<Vec<Video>> {
        let videos = self.videos.read().await;
        // Insertion order is creation order; the stable sort keeps ties newest first.
        let mut listed: Vec<Video> = videos.iter().rev().cloned().collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn create_video(&self, video: &NewVideo) -> Result<Video> {
        let now = Utc::now();
        let created = Video {
            id: Uuid::new_v4(),
            title: video.title.clone(),
            description: video.description.clone(),
            video_url: video.video_url.clone(),
            thumbnail_url: video.thumbnail_url.clone(),
            control: video.control,
            transformation: video.transformation,
            created_at: now,
            updated_at: now,
        };

        self.videos.write().await.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == email) {
            return Err(AppError::Validation(
                "User with this email already exists".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }
}
