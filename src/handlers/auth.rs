use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::Json,
};
use serde_json::json;

use crate::{
    auth::PasswordService,
    errors::{AppError, Result},
    handlers::AppState,
    middleware::auth::{expired_session_cookie, session_cookie, SessionUser},
    models::{AuthResponse, CreateUserRequest, LoginRequest, SessionResponse, UserResponse},
};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User registered"),
        (status = 400, description = "Invalid input or email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let email = request.email.trim().to_lowercase();

    PasswordService::validate_credentials(&email, &request.password)?;

    if state.users.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Validation("User with this email already exists".to_string()));
    }

    let password_hash = PasswordService::hash_password(&request.password)?;
    let user = state.users.create_user(&email, &password_hash).await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": UserResponse::from(user)
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued, also set as the session_token cookie", body = AuthResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<([(header::HeaderName, String); 1], Json<AuthResponse>)> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let email = request.email.trim().to_lowercase();

    if email.is_empty() || request.password.is_empty() {
        return Err(AppError::Validation("Missing email or password".to_string()));
    }

    let user = state
        .users
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid email or password".to_string()))?;

    if !PasswordService::verify_password(&request.password, &user.password_hash)? {
        return Err(AppError::Auth("Invalid email or password".to_string()));
    }

    let (token, expires_at) = state.jwt.issue_session(user.id, &user.email)?;
    let cookie = session_cookie(&token, state.jwt.session_max_age_secs());

    tracing::info!(user_id = %user.id, "User signed in");

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            token,
            expires_at,
            user: UserResponse::from(user),
        }),
    ))
}

/// Clears the session cookie. Tokens are stateless, so a bearer token held
/// elsewhere stays valid until it expires.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses((status = 200, description = "Session cookie cleared"))
)]
pub async fn logout() -> ([(header::HeaderName, String); 1], Json<serde_json::Value>) {
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Json(json!({ "message": "Signed out" })),
    )
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    tag = "auth",
    responses(
        (status = 200, description = "Active session", body = SessionResponse),
        (status = 401, description = "No active session")
    )
)]
pub async fn session(session: SessionUser) -> Result<Json<SessionResponse>> {
    Ok(Json(SessionResponse {
        user: UserResponse {
            id: session.id,
            email: session.email,
        },
        expires_at: session.expires_at,
    }))
}
