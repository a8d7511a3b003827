pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post, MethodRouter},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
};

use crate::errors::AppError;
use crate::matching::handlers::handle_match;
use crate::state::AppState;

async fn not_found() -> AppError {
    AppError::NotFound
}

async fn use_post() -> AppError {
    AppError::MethodNotAllowed("POST")
}

async fn use_get() -> AppError {
    AppError::MethodNotAllowed("GET")
}

fn match_route() -> MethodRouter<AppState> {
    post(handle_match).fallback(use_post)
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health::health_handler).fallback(use_get))
        .route("/match", match_route())
        .route("/api/match", match_route())
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        ))
        .layer(cors)
        .with_state(state)
}
