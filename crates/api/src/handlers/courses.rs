//! Course handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use cpsu_common::{
    db::models::Course,
    db::repository::{CourseQuery, CourseWrite},
    errors::Result,
    services::CourseService,
};

use crate::extract::{IdPath, QueryParams, ValidatedJson};
use crate::AppState;

async fn service(state: &AppState) -> CourseService {
    CourseService::new(state.repo().await)
}

pub async fn list_courses(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<CourseQuery>,
) -> Result<Json<Vec<Course>>> {
    Ok(Json(service(&state).await.list(&query).await?))
}

pub async fn get_course(State(state): State<AppState>, IdPath(course_id): IdPath) -> Result<Json<Course>> {
    Ok(Json(service(&state).await.get(course_id).await?))
}

pub async fn create_course(
    State(state): State<AppState>,
    ValidatedJson(write): ValidatedJson<CourseWrite>,
) -> Result<(StatusCode, Json<Course>)> {
    let course = service(&state).await.create(&write).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn update_course(
    State(state): State<AppState>,
    IdPath(course_id): IdPath,
    ValidatedJson(write): ValidatedJson<CourseWrite>,
) -> Result<Json<Course>> {
    Ok(Json(service(&state).await.update(course_id, &write).await?))
}

pub async fn delete_course(State(state): State<AppState>, IdPath(course_id): IdPath) -> Result<StatusCode> {
    service(&state).await.delete(course_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
