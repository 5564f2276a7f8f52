//! News handlers

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use cpsu_common::{
    db::models::News,
    db::repository::NewsQuery,
    errors::Result,
    services::{NewsInput, NewsService},
};

use crate::extract::{Form, IdPath, QueryParams};
use crate::AppState;

async fn service(state: &AppState) -> NewsService {
    NewsService::new(state.repo().await, state.storage.clone())
}

/// `title`, `content`, `type_id`, `detail_url`, `cover_image` and `images`
async fn news_input(multipart: Multipart) -> Result<NewsInput> {
    let mut form = Form::read(multipart).await?;

    Ok(NewsInput {
        title: form.text_or_empty("title"),
        content: form.text_or_empty("content"),
        type_id: form.int("type_id")?,
        detail_url: form.text("detail_url"),
        cover_image: form.file("cover_image"),
        images: form.files("images"),
    })
}

pub async fn list_news(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<NewsQuery>,
) -> Result<Json<Vec<News>>> {
    Ok(Json(service(&state).await.list(&query).await?))
}

pub async fn get_news(State(state): State<AppState>, IdPath(news_id): IdPath) -> Result<Json<News>> {
    Ok(Json(service(&state).await.get(news_id).await?))
}

pub async fn create_news(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<News>)> {
    let input = news_input(multipart).await?;
    let news = service(&state).await.create(input).await?;
    Ok((StatusCode::CREATED, Json(news)))
}

pub async fn update_news(
    State(state): State<AppState>,
    IdPath(news_id): IdPath,
    multipart: Multipart,
) -> Result<Json<News>> {
    let input = news_input(multipart).await?;
    Ok(Json(service(&state).await.update(news_id, input).await?))
}

pub async fn delete_news(State(state): State<AppState>, IdPath(news_id): IdPath) -> Result<StatusCode> {
    service(&state).await.delete(news_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
