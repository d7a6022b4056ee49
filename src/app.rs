use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/calendar", get(handlers::get_calendar))
        .route("/api/refresh", post(handlers::post_refresh))
        .route("/api/progress", get(handlers::get_progress))
        .with_state(state)
}
