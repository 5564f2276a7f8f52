//! Calendar event handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use cpsu_common::{
    db::models::CalendarEvent,
    db::repository::{CalendarQuery, CalendarWrite},
    errors::Result,
    services::CalendarService,
};

use crate::extract::{IdPath, QueryParams, ValidatedJson};
use crate::AppState;

async fn service(state: &AppState) -> CalendarService {
    CalendarService::new(state.repo().await)
}

pub async fn list_calendars(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<CalendarQuery>,
) -> Result<Json<Vec<CalendarEvent>>> {
    Ok(Json(service(&state).await.list(&query).await?))
}

pub async fn get_calendar(
    State(state): State<AppState>,
    IdPath(calendar_id): IdPath,
) -> Result<Json<CalendarEvent>> {
    Ok(Json(service(&state).await.get(calendar_id).await?))
}

pub async fn create_calendar(
    State(state): State<AppState>,
    ValidatedJson(write): ValidatedJson<CalendarWrite>,
) -> Result<(StatusCode, Json<CalendarEvent>)> {
    let event = service(&state).await.create(&write).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update_calendar(
    State(state): State<AppState>,
    IdPath(calendar_id): IdPath,
    ValidatedJson(write): ValidatedJson<CalendarWrite>,
) -> Result<Json<CalendarEvent>> {
    Ok(Json(service(&state).await.update(calendar_id, &write).await?))
}

pub async fn delete_calendar(
    State(state): State<AppState>,
    IdPath(calendar_id): IdPath,
) -> Result<StatusCode> {
    service(&state).await.delete(calendar_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
