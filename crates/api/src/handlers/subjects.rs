//! Subject handlers

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use cpsu_common::{
    db::models::Subject,
    db::repository::{SubjectQuery, SubjectWrite},
    errors::Result,
    services::SubjectService,
};

use crate::extract::{Form, IdPath, JsonBody, QueryParams, ValidatedJson};
use crate::AppState;

async fn service(state: &AppState) -> SubjectService {
    SubjectService::new(state.repo().await)
}

pub async fn list_subjects(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<SubjectQuery>,
) -> Result<Json<Vec<Subject>>> {
    Ok(Json(service(&state).await.list(&query).await?))
}

pub async fn get_subject(State(state): State<AppState>, IdPath(id): IdPath) -> Result<Json<Subject>> {
    Ok(Json(service(&state).await.get(id).await?))
}

pub async fn create_subject(
    State(state): State<AppState>,
    ValidatedJson(write): ValidatedJson<SubjectWrite>,
) -> Result<(StatusCode, Json<Subject>)> {
    let subject = service(&state).await.create(&write).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

/// A JSON array of subjects; rows are validated by the service so the
/// failing index can be reported
pub async fn create_subjects(
    State(state): State<AppState>,
    JsonBody(writes): JsonBody<Vec<SubjectWrite>>,
) -> Result<(StatusCode, Json<Vec<Subject>>)> {
    let subjects = service(&state).await.create_many(&writes).await?;
    Ok((StatusCode::CREATED, Json(subjects)))
}

/// Multipart `subjectfile`: a CSV with a header row, one subject per line
pub async fn import_subjects(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<Subject>>)> {
    let mut form = Form::read(multipart).await?;
    let subjects = service(&state).await.import_csv(form.file("subjectfile")).await?;
    Ok((StatusCode::CREATED, Json(subjects)))
}

pub async fn update_subject(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    ValidatedJson(write): ValidatedJson<SubjectWrite>,
) -> Result<Json<Subject>> {
    Ok(Json(service(&state).await.update(id, &write).await?))
}

pub async fn delete_subject(State(state): State<AppState>, IdPath(id): IdPath) -> Result<StatusCode> {
    service(&state).await.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
