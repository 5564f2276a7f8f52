use super::{required_id, required_text};
use crate::db::models::News;
use crate::db::repository::{NewsQuery, NewsWrite};
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::storage::{upload, upload_all, BlobStore, UploadCategory, UploadedFile};
use std::sync::Arc;

/// A news create/update request as decoded from a multipart form
#[derive(Debug, Clone, Default)]
pub struct NewsInput {
    pub title: String,
    pub content: String,
    pub type_id: Option<i32>,
    pub detail_url: Option<String>,
    pub cover_image: Option<UploadedFile>,
    pub images: Vec<UploadedFile>,
}

pub struct NewsService {
    repo: Repository,
    storage: Arc<dyn BlobStore>,
}

impl NewsService {
    pub fn new(repo: Repository, storage: Arc<dyn BlobStore>) -> Self {
        Self { repo, storage }
    }

    /// List news. Filtering on a type that does not exist is a not-found.
    pub async fn list(&self, query: &NewsQuery) -> Result<Vec<News>> {
        let news = self.repo.list_news(query).await?;

        if news.is_empty() {
            if let Some(type_id) = query.type_id.filter(|id| *id > 0) {
                if !self.repo.news_type_exists(type_id).await? {
                    return Err(AppError::not_found("news type", type_id));
                }
            }
        }

        Ok(news)
    }

    pub async fn get(&self, news_id: i32) -> Result<News> {
        self.repo.get_news(news_id).await
    }

    pub async fn create(&self, input: NewsInput) -> Result<News> {
        let write = self.prepare(input).await?;
        let news_id = self.repo.create_news(&write).await?;
        self.repo.get_news(news_id).await
    }

    /// Update a news item; the stored images become exactly the uploaded set
    pub async fn update(&self, news_id: i32, input: NewsInput) -> Result<News> {
        let write = self.prepare(input).await?;
        self.repo.update_news(news_id, &write).await?;
        self.repo.get_news(news_id).await
    }

    pub async fn delete(&self, news_id: i32) -> Result<()> {
        self.repo.delete_news(news_id).await
    }

    /// Validate, then upload. Nothing is uploaded for an invalid request and
    /// nothing is written when an upload fails.
    async fn prepare(&self, input: NewsInput) -> Result<NewsWrite> {
        let title = required_text("title", &input.title)?;
        let content = required_text("content", &input.content)?;
        let type_id = match input.type_id {
            Some(id) => Some(required_id("type_id", Some(id))?),
            None => None,
        };

        let images = upload_all(self.storage.as_ref(), UploadCategory::News, &input.images).await?;
        let cover_image = match &input.cover_image {
            Some(file) => Some(upload(self.storage.as_ref(), UploadCategory::News, file).await?),
            None => None,
        };

        Ok(NewsWrite {
            title,
            content,
            type_id,
            detail_url: input.detail_url.filter(|u| !u.trim().is_empty()),
            cover_image,
            images,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::*;
    use crate::storage::MemoryBlobStore;
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    fn file(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: Some("image/jpeg".to_string()),
            bytes: vec![0xFF, 0xD8],
        }
    }

    fn row(image_id: i32, url: &str) -> MockRow {
        let at = Utc.with_ymd_and_hms(2024, 8, 1, 10, 0, 0).unwrap();
        MockRow::from([
            ("news_id", Value::from(1)),
            ("title", text("T")),
            ("content", text("C")),
            ("type_id", Value::from(1)),
            ("type_name", text("ข่าวประชาสัมพันธ์")),
            ("detail_url", null_text()),
            ("cover_image", null_text()),
            ("created_at", Value::from(at)),
            ("updated_at", Value::from(at)),
            ("image_id", Value::from(image_id)),
            ("file_image", text(url)),
        ])
    }

    fn input() -> NewsInput {
        NewsInput {
            title: "T".to_string(),
            content: "C".to_string(),
            type_id: Some(1),
            images: vec![file("u1.jpg"), file("u2.jpg")],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_with_two_images_reads_back_in_order() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![id_row("news_id", 1)]])
            .append_exec_results([affected(1), affected(1)])
            .append_query_results([vec![
                row(1, "memory://images/news/u1.jpg"),
                row(2, "memory://images/news/u2.jpg"),
            ]])
            .into_connection();
        let store = Arc::new(MemoryBlobStore::new("memory://"));
        let service = NewsService::new(Repository::new(conn), store.clone());

        let news = service.create(input()).await.unwrap();

        assert_eq!(news.images.len(), 2);
        assert!(news.images[0].file_image.ends_with("u1.jpg"));
        assert!(news.images[1].file_image.ends_with("u2.jpg"));
        assert_eq!(store.keys(), vec!["images/news/u1.jpg", "images/news/u2.jpg"]);
    }

    #[tokio::test]
    async fn test_blank_title_rejected_before_upload() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let store = Arc::new(MemoryBlobStore::new("memory://"));
        let service = NewsService::new(Repository::new(conn), store.clone());

        let mut request = input();
        request.title = "   ".to_string();
        let err = service.create(request).await.unwrap_err();

        assert!(err.is_client_error());
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_failed_upload_writes_nothing() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = NewsService::new(Repository::new(db.clone()), Arc::new(MemoryBlobStore::failing()));

        let err = service.create(input()).await.unwrap_err();

        assert!(matches!(err, AppError::Storage { .. }));
        drop(service);
        assert_eq!(transaction_log(db), "[]");
    }

    #[tokio::test]
    async fn test_unknown_news_type_filter_is_not_found() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([no_rows(), no_rows()])
            .into_connection();
        let service = NewsService::new(Repository::new(conn), Arc::new(MemoryBlobStore::new("memory://")));

        let query = NewsQuery {
            type_id: Some(9),
            ..Default::default()
        };
        let err = service.list(&query).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_known_type_without_news_is_empty() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([no_rows(), vec![MockRow::from([("type_name", text("กิจกรรม"))])]])
            .into_connection();
        let service = NewsService::new(Repository::new(conn), Arc::new(MemoryBlobStore::new("memory://")));

        let query = NewsQuery {
            type_id: Some(2),
            ..Default::default()
        };
        assert!(service.list(&query).await.unwrap().is_empty());
    }
}
