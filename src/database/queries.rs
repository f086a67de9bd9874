use sqlx::PgPool;

use crate::errors::{AppError, Result};
use crate::models::*;

pub struct VideoQueries;

impl VideoQueries {
    pub async fn list(pool: &PgPool) -> Result<Vec<Video>> {
        let rows = sqlx::query_as::<_, VideoRow>(
            r#"
            SELECT id, title, description, video_url, thumbnail_url, control,
                   height, width, quality, created_at, updated_at
            FROM videos
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Video::from).collect())
    }

    pub async fn create(pool: &PgPool, video: &NewVideo) -> Result<Video> {
        let row = sqlx::query_as::<_, VideoRow>(
            r#"
            INSERT INTO videos (title, description, video_url, thumbnail_url, control, height, width, quality)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, title, description, video_url, thumbnail_url, control,
                      height, width, quality, created_at, updated_at
            "#,
        )
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.video_url)
        .bind(&video.thumbnail_url)
        .bind(video.control)
        .bind(video.transformation.height)
        .bind(video.transformation.width)
        .bind(video.transformation.quality)
        .fetch_one(pool)
        .await?;

        Ok(row.into())
    }
}

pub struct UserQueries;

impl UserQueries {
    pub async fn create_user(pool: &PgPool, email: &str, password_hash: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Validation("User with this email already exists".to_string())
            }
            other => AppError::Database(other),
        })?;

        Ok(user)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }
}
