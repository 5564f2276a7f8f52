//! News with its image gallery

use crate::db::aggregate::{FlatRow, HasChildren};
use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct News {
    pub news_id: i32,
    pub title: String,
    pub content: String,
    pub type_id: Option<i32>,
    pub type_name: Option<String>,
    pub detail_url: Option<String>,
    pub cover_image: Option<String>,
    pub images: Vec<NewsImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsImage {
    pub image_id: i32,
    pub news_id: i32,
    pub file_image: String,
}

/// One row of `news LEFT JOIN news_images LEFT JOIN news_types`
#[derive(Debug, Clone, FromQueryResult)]
pub struct NewsRow {
    pub news_id: i32,
    pub title: String,
    pub content: String,
    pub type_id: Option<i32>,
    pub type_name: Option<String>,
    pub detail_url: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub image_id: Option<i32>,
    pub file_image: Option<String>,
}

impl HasChildren for News {
    type Child = NewsImage;

    fn children_mut(&mut self) -> &mut Vec<NewsImage> {
        &mut self.images
    }
}

impl FlatRow for NewsRow {
    type Key = i32;
    type Root = News;

    fn key(&self) -> i32 {
        self.news_id
    }

    fn to_root(&self) -> News {
        News {
            news_id: self.news_id,
            title: self.title.clone(),
            content: self.content.clone(),
            type_id: self.type_id,
            type_name: self.type_name.clone(),
            detail_url: self.detail_url.clone(),
            cover_image: self.cover_image.clone(),
            images: Vec::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn into_child(self) -> Option<NewsImage> {
        let (image_id, file_image) = (self.image_id?, self.file_image?);
        Some(NewsImage {
            image_id,
            news_id: self.news_id,
            file_image,
        })
    }
}
