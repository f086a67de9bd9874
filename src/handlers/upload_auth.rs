use axum::{extract::State, response::Json};

use crate::{errors::Result, handlers::AppState, services::upload_auth::UploadAuthResponse};

/// Hands the browser a one-shot credential set for a direct CDN upload.
#[utoipa::path(
    get,
    path = "/api/auth/imagekit-auth",
    tag = "upload",
    responses(
        (status = 200, description = "Upload credentials", body = UploadAuthResponse),
        (status = 500, description = "Authentication for imagekit failed")
    )
)]
pub async fn imagekit_auth(State(state): State<AppState>) -> Result<Json<UploadAuthResponse>> {
    let response = state.upload_auth.issue()?;
    state.metrics.record_upload_credentials();
    Ok(Json(response))
}
