use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};

use crate::{
    errors::{AppError, Result},
    handlers::AppState,
    middleware::auth::SessionUser,
    models::{CreateVideoRequest, Video},
};

/// List every video, newest first. An empty store is a normal, successful
/// response.
#[utoipa::path(
    get,
    path = "/api/video",
    tag = "videos",
    responses(
        (status = 200, description = "Videos ordered by creation time, newest first", body = [Video]),
        (status = 500, description = "Failed to fetch videos")
    )
)]
pub async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<Video>>> {
    let videos = state.videos.list_videos().await?;
    Ok(Json(videos))
}

#[utoipa::path(
    post,
    path = "/api/video",
    tag = "videos",
    request_body = CreateVideoRequest,
    responses(
        (status = 200, description = "Created video record", body = Video),
        (status = 400, description = "Missing or invalid fields"),
        (status = 401, description = "No active session"),
        (status = 500, description = "Failed to create video")
    )
)]
pub async fn create_video(
    State(state): State<AppState>,
    session: SessionUser,
    payload: std::result::Result<Json<CreateVideoRequest>, JsonRejection>,
) -> Result<Json<Video>> {
    let Json(request) =
        payload.map_err(|e| AppError::Validation(format!("Invalid request body: {}", e.body_text())))?;

    let new_video = request.validate()?;
    let video = state.videos.create_video(&new_video).await?;

    state.metrics.record_video_created();
    tracing::info!(video_id = %video.id, user_id = %session.id, "Video created");

    Ok(Json(video))
}
