mod error;
mod handlers;
mod templates;

use crate::components::preread_job::{JobHandle, PrereadPipeline};
use crate::config::SharedConfig;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Cookie carrying the OAuth `state` between `/login` and `/auth_callback`
pub const STATE_COOKIE: &str = "oauth_state";

/// Cookie holding the form token that `POST /run` and `POST /logout` must echo
pub const CSRF_COOKIE: &str = "csrf_token";

#[derive(Clone)]
pub struct AppState {
    pub config: SharedConfig,
    pub pipeline: PrereadPipeline,
    pub job: JobHandle,
}

impl AppState {
    pub fn new(config: SharedConfig, pipeline: PrereadPipeline, job: JobHandle) -> Self {
        Self {
            config,
            pipeline,
            job,
        }
    }
}

/// Dashboard routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index_handler))
        .route("/login", get(handlers::login_handler))
        .route("/auth_callback", get(handlers::auth_callback_handler))
        .route("/run", post(handlers::run_handler))
        .route("/preview", get(handlers::preview_handler))
        .route("/logout", post(handlers::logout_handler))
        .route("/health", get(handlers::health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
