use super::VideoApi;
use crate::models::Video;

/// Video list plus the currently playing video, if the player modal is open.
#[derive(Debug, Default)]
pub struct VideoBrowser {
    videos: Vec<Video>,
    loading: bool,
    selected: Option<String>,
    last_error: Option<String>,
}

impl VideoBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Reloads the list. On failure the previous list is kept.
    pub async fn refresh<A: VideoApi + ?Sized>(&mut self, api: &A) {
        self.loading = true;
        match api.get_videos().await {
            Ok(videos) => {
                self.videos = videos;
                self.last_error = None;
            }
            Err(e) => {
                tracing::error!("Error fetching videos: {:#}", e);
                self.last_error = Some("Failed to fetch videos".to_string());
            }
        }
        self.loading = false;
    }

    pub fn select(&mut self, video_url: impl Into<String>) {
        self.selected = Some(video_url.into());
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn close(&mut self) {
        self.selected = None;
    }
}
