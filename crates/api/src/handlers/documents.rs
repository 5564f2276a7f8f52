//! Roadmap and course-structure handlers

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use cpsu_common::{
    db::models::{CourseStructure, Roadmap},
    db::repository::DocumentQuery,
    errors::Result,
    services::DocumentService,
};

use crate::extract::{Form, IdPath, QueryParams};
use crate::AppState;

async fn service(state: &AppState) -> DocumentService {
    DocumentService::new(state.repo().await, state.storage.clone())
}

pub async fn list_roadmaps(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<DocumentQuery>,
) -> Result<Json<Vec<Roadmap>>> {
    Ok(Json(service(&state).await.list_roadmaps(&query).await?))
}

pub async fn get_roadmap(State(state): State<AppState>, IdPath(roadmap_id): IdPath) -> Result<Json<Roadmap>> {
    Ok(Json(service(&state).await.get_roadmap(roadmap_id).await?))
}

/// Multipart: `course_id` and the `roadmap` file
pub async fn create_roadmap(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Roadmap>)> {
    let mut form = Form::read(multipart).await?;
    let course_id = form.int("course_id")?;
    let file = form.file("roadmap");

    let roadmap = service(&state).await.create_roadmap(course_id, file).await?;
    Ok((StatusCode::CREATED, Json(roadmap)))
}

pub async fn delete_roadmap(State(state): State<AppState>, IdPath(roadmap_id): IdPath) -> Result<StatusCode> {
    service(&state).await.delete_roadmap(roadmap_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_course_structures(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<DocumentQuery>,
) -> Result<Json<Vec<CourseStructure>>> {
    Ok(Json(service(&state).await.list_course_structures(&query).await?))
}

pub async fn get_course_structure(
    State(state): State<AppState>,
    IdPath(course_structure_id): IdPath,
) -> Result<Json<CourseStructure>> {
    Ok(Json(
        service(&state)
            .await
            .get_course_structure(course_structure_id)
            .await?,
    ))
}

/// Multipart: `course_id` and the `course_structure` file
pub async fn create_course_structure(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CourseStructure>)> {
    let mut form = Form::read(multipart).await?;
    let course_id = form.int("course_id")?;
    let file = form.file("course_structure");

    let structure = service(&state)
        .await
        .create_course_structure(course_id, file)
        .await?;
    Ok((StatusCode::CREATED, Json(structure)))
}

pub async fn delete_course_structure(
    State(state): State<AppState>,
    IdPath(course_structure_id): IdPath,
) -> Result<StatusCode> {
    service(&state)
        .await
        .delete_course_structure(course_structure_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
