use crate::errors::AppError;
use crate::models::{CalendarResponse, ProgressResponse, RefreshRequest};
use crate::refresh::{refresh, RefreshOutcome};
use crate::state::AppState;
use crate::ui::render_index;
use axum::{extract::State, response::Html, Json};
use chrono::{Local, NaiveDateTime};
use tracing::info;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.latest().await;
    Html(render_index(
        &state.config,
        snapshot.as_deref(),
        state.is_refreshing(),
    ))
}

pub async fn get_calendar(State(state): State<AppState>) -> Result<Json<CalendarResponse>, AppError> {
    let snapshot = state
        .latest()
        .await
        .ok_or_else(|| AppError::not_found("no refresh has completed yet"))?;
    Ok(Json(snapshot.to_response()))
}

pub async fn get_progress(State(state): State<AppState>) -> Json<ProgressResponse> {
    Json(ProgressResponse {
        percent: state.progress(),
        refreshing: state.is_refreshing(),
    })
}

pub async fn post_refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<CalendarResponse>, AppError> {
    let location = payload
        .location
        .as_deref()
        .map(str::trim)
        .filter(|location| !location.is_empty())
        .unwrap_or(state.config.default_location())
        .to_string();

    let outcome = refresh(&state, &location, local_now()).await?;
    if let RefreshOutcome::NoData(_) = outcome {
        info!(location = %location, "no gigs found for location");
    }
    Ok(Json(outcome.snapshot().to_response()))
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}
