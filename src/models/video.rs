use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, Result};

pub const DEFAULT_VIDEO_WIDTH: i32 = 1080;
pub const DEFAULT_VIDEO_HEIGHT: i32 = 1920;
pub const DEFAULT_VIDEO_QUALITY: i32 = 100;

/// Rendering hints stored alongside a video.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Transformation {
    pub height: i32,
    pub width: i32,
    pub quality: i32,
}

impl Default for Transformation {
    fn default() -> Self {
        Self {
            height: DEFAULT_VIDEO_HEIGHT,
            width: DEFAULT_VIDEO_WIDTH,
            quality: DEFAULT_VIDEO_QUALITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub control: bool,
    pub transformation: Transformation,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct VideoRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub control: bool,
    pub height: i32,
    pub width: i32,
    pub quality: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VideoRow> for Video {
    fn from(row: VideoRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            video_url: row.video_url,
            thumbnail_url: row.thumbnail_url,
            control: row.control,
            transformation: Transformation {
                height: row.height,
                width: row.width,
                quality: row.quality,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TransformationRequest {
    pub height: Option<i32>,
    pub width: Option<i32>,
    pub quality: Option<i32>,
}

/// Body of `POST /api/video`. Missing strings deserialize as empty so that
/// validation, not the JSON extractor, decides what is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default, alias = "thumbailUrl")]
    pub thumbnail_url: String,
    pub control: Option<bool>,
    pub transformation: Option<TransformationRequest>,
}

/// A validated video ready to be persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewVideo {
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub control: bool,
    pub transformation: Transformation,
}

impl CreateVideoRequest {
    pub fn validate(self) -> Result<NewVideo> {
        let missing: Vec<&str> = [
            ("title", &self.title),
            ("description", &self.description),
            ("videoUrl", &self.video_url),
            ("thumbnailUrl", &self.thumbnail_url),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let requested = self.transformation.unwrap_or_default();
        let transformation = Transformation {
            height: requested.height.unwrap_or(DEFAULT_VIDEO_HEIGHT),
            width: requested.width.unwrap_or(DEFAULT_VIDEO_WIDTH),
            quality: requested.quality.unwrap_or(DEFAULT_VIDEO_QUALITY),
        };

        if !(1..=100).contains(&transformation.quality) {
            return Err(AppError::Validation(
                "Quality must be between 1 and 100".to_string(),
            ));
        }
        if transformation.height <= 0 || transformation.width <= 0 {
            return Err(AppError::Validation(
                "Transformation dimensions must be positive".to_string(),
            ));
        }

        Ok(NewVideo {
            title: self.title,
            description: self.description,
            video_url: self.video_url,
            thumbnail_url: self.thumbnail_url,
            control: self.control.unwrap_or(true),
            transformation,
        })
    }
}
