pub mod auth;
pub mod client;
pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use handlers::{auth as auth_handlers, docs, health, metrics, upload_auth, video, AppState};

pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .route("/video", get(video::list_videos).post(video::create_video))
        .route("/auth/imagekit-auth", get(upload_auth::imagekit_auth))
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/logout", post(auth_handlers::logout))
        .route("/auth/session", get(auth_handlers::session));

    let mut app = Router::new()
        .route("/health", get(health::liveness))
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/api", api)
        .merge(docs::create_docs_router())
        .layer(from_fn_with_state(
            state.clone(),
            middleware::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(state.config.cors_allowed_origin.as_deref()) {
        app = app.layer(cors);
    }

    app.with_state(state)
}

fn cors_layer(origin: Option<&str>) -> Option<CorsLayer> {
    let origin = origin?;
    match origin.parse::<HeaderValue>() {
        Ok(origin) => Some(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                .allow_credentials(true),
        ),
        Err(e) => {
            tracing::warn!("Ignoring invalid CORS_ALLOWED_ORIGIN {:?}: {}", origin, e);
            None
        }
    }
}
