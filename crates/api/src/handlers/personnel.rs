//! Personnel and research handlers

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use cpsu_common::{
    db::models::{Personnel, Research},
    db::repository::{PersonnelQuery, PersonnelWrite, ResearchQuery},
    errors::{AppError, Result},
    services::{PersonnelService, SyncSummary},
    storage::UploadedFile,
};

use crate::extract::{Form, IdPath, QueryParams};
use crate::AppState;

async fn service(state: &AppState) -> PersonnelService {
    PersonnelService::new(
        state.repo().await,
        state.storage.clone(),
        state.citations.clone(),
        state.config.scopus.sync_limit,
    )
}

/// Personnel fields from a multipart form plus the optional `file_image`
async fn personnel_input(multipart: Multipart) -> Result<(PersonnelWrite, Option<UploadedFile>)> {
    let mut form = Form::read(multipart).await?;

    let write = PersonnelWrite {
        type_personnel: form.text_or_empty("type_personnel").trim().to_string(),
        department_position_id: form.int("department_position_id")?,
        academic_position_id: form.int("academic_position_id")?,
        thai_academic_position: form.text("thai_academic_position"),
        eng_academic_position: form.text("eng_academic_position"),
        thai_name: form.text_or_empty("thai_name").trim().to_string(),
        eng_name: form.text("eng_name"),
        education: form.text("education"),
        related_fields: form.text("related_fields"),
        email: form.text("email"),
        website: form.text("website"),
        file_image: None,
        scopus_id: form.text("scopus_id"),
    };

    Ok((write, form.file("file_image")))
}

pub async fn list_personnel(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PersonnelQuery>,
) -> Result<Json<Vec<Personnel>>> {
    Ok(Json(service(&state).await.list(&query).await?))
}

pub async fn get_personnel(
    State(state): State<AppState>,
    IdPath(personnel_id): IdPath,
) -> Result<Json<Personnel>> {
    Ok(Json(service(&state).await.get(personnel_id).await?))
}

pub async fn create_personnel(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Personnel>)> {
    let (write, image) = personnel_input(multipart).await?;
    let personnel = service(&state).await.create(write, image).await?;
    Ok((StatusCode::CREATED, Json(personnel)))
}

pub async fn update_personnel(
    State(state): State<AppState>,
    IdPath(personnel_id): IdPath,
    multipart: Multipart,
) -> Result<Json<Personnel>> {
    let (write, image) = personnel_input(multipart).await?;
    Ok(Json(service(&state).await.update(personnel_id, write, image).await?))
}

pub async fn delete_personnel(
    State(state): State<AppState>,
    IdPath(personnel_id): IdPath,
) -> Result<StatusCode> {
    service(&state).await.delete(personnel_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn sync_research(
    State(state): State<AppState>,
    IdPath(personnel_id): IdPath,
) -> Result<Json<Vec<Research>>> {
    Ok(Json(service(&state).await.sync_research(personnel_id).await?))
}

/// Runs as its own task so a client that disconnects or times out does not
/// stop the sync between two personnel
pub async fn sync_all_research(State(state): State<AppState>) -> Result<Json<SyncSummary>> {
    let service = service(&state).await;
    let summary = tokio::spawn(async move { service.sync_all().await })
        .await
        .map_err(|e| AppError::Internal {
            message: format!("research sync task failed: {}", e),
        })??;
    Ok(Json(summary))
}

pub async fn list_research(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ResearchQuery>,
) -> Result<Json<Vec<Research>>> {
    Ok(Json(service(&state).await.list_research(&query).await?))
}
