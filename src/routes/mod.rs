mod health;
mod lesson;
mod practice;
mod profile;
mod review;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::middleware::request_id_middleware;
use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let body_limit = state.json_body_limit();

    Router::new()
        .nest("/lesson", lesson::router())
        .nest("/practice", practice::router())
        .nest("/review", review::router())
        .nest("/profile", profile::router())
        .nest("/health", health::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_id_middleware))
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found").into_response()
}
