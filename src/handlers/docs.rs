use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use crate::handlers::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::liveness,
        crate::handlers::video::list_videos,
        crate::handlers::video::create_video,
        crate::handlers::upload_auth::imagekit_auth,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::session,
    ),
    components(
        schemas(
            crate::models::Video,
            crate::models::Transformation,
            crate::models::CreateVideoRequest,
            crate::models::TransformationRequest,
            crate::models::CreateUserRequest,
            crate::models::LoginRequest,
            crate::models::AuthResponse,
            crate::models::SessionResponse,
            crate::models::UserResponse,
            crate::services::upload_auth::UploadAuthResponse,
            crate::services::upload_auth::AuthenticationParameters,
        )
    ),
    tags(
        (name = "videos", description = "Video records"),
        (name = "upload", description = "Direct-to-CDN upload credentials"),
        (name = "auth", description = "Credential sign-in and sessions"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "Video Uploader API",
        version = "1.0.0",
        description = "Video sharing backend: session sign-in, CDN upload credentials and video records"
    )
)]
pub struct ApiDoc;

pub fn create_docs_router() -> Router<AppState> {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
