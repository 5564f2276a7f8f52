use super::required_id;
use crate::db::models::{CourseStructure, Roadmap};
use crate::db::repository::DocumentQuery;
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::storage::{upload, BlobStore, UploadCategory, UploadedFile};
use std::sync::Arc;

/// Roadmaps and course structures: one uploaded document per row
pub struct DocumentService {
    repo: Repository,
    storage: Arc<dyn BlobStore>,
}

impl DocumentService {
    pub fn new(repo: Repository, storage: Arc<dyn BlobStore>) -> Self {
        Self { repo, storage }
    }

    pub async fn list_roadmaps(&self, query: &DocumentQuery) -> Result<Vec<Roadmap>> {
        self.repo.list_roadmaps(query).await
    }

    pub async fn get_roadmap(&self, roadmap_id: i32) -> Result<Roadmap> {
        self.repo.get_roadmap(roadmap_id).await
    }

    pub async fn create_roadmap(&self, course_id: Option<i32>, file: Option<UploadedFile>) -> Result<Roadmap> {
        let (course_id, url) = self
            .store_for_course(course_id, file, "roadmap", UploadCategory::Roadmap)
            .await?;
        let roadmap_id = self.repo.create_roadmap(course_id, &url).await?;
        self.repo.get_roadmap(roadmap_id).await
    }

    pub async fn delete_roadmap(&self, roadmap_id: i32) -> Result<()> {
        self.repo.delete_roadmap(roadmap_id).await
    }

    pub async fn list_course_structures(&self, query: &DocumentQuery) -> Result<Vec<CourseStructure>> {
        self.repo.list_course_structures(query).await
    }

    pub async fn get_course_structure(&self, course_structure_id: i32) -> Result<CourseStructure> {
        self.repo.get_course_structure(course_structure_id).await
    }

    pub async fn create_course_structure(
        &self,
        course_id: Option<i32>,
        file: Option<UploadedFile>,
    ) -> Result<CourseStructure> {
        let (course_id, url) = self
            .store_for_course(
                course_id,
                file,
                "course_structure",
                UploadCategory::CourseStructure,
            )
            .await?;
        let course_structure_id = self.repo.create_course_structure(course_id, &url).await?;
        self.repo.get_course_structure(course_structure_id).await
    }

    pub async fn delete_course_structure(&self, course_structure_id: i32) -> Result<()> {
        self.repo.delete_course_structure(course_structure_id).await
    }

    /// Check the course id and file, confirm the course exists, then upload
    async fn store_for_course(
        &self,
        course_id: Option<i32>,
        file: Option<UploadedFile>,
        file_field: &str,
        category: UploadCategory,
    ) -> Result<(i32, String)> {
        let course_id = required_id("course_id", course_id)?;
        let file = file.ok_or_else(|| AppError::MissingField {
            field: file_field.to_string(),
        })?;

        if !self.repo.course_exists(course_id).await? {
            return Err(AppError::not_found("course", course_id));
        }

        let url = upload(self.storage.as_ref(), category, &file).await?;
        Ok((course_id, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::*;
    use crate::storage::MemoryBlobStore;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    fn pdf() -> UploadedFile {
        UploadedFile {
            file_name: "roadmap 2567.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: b"%PDF".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_create_roadmap_uploads_then_inserts() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![id_row("present", 1)],
                vec![id_row("roadmap_id", 4)],
                vec![MockRow::from([
                    ("roadmap_id", Value::from(4)),
                    ("course_id", Value::from(2)),
                    ("thai_course", text("วิทยาการข้อมูล")),
                    ("roadmap_url", text("memory:/images/course/roadmap_2567.pdf")),
                ])],
            ])
            .into_connection();
        let store = Arc::new(MemoryBlobStore::new("memory://"));
        let service = DocumentService::new(Repository::new(conn), store.clone());

        let roadmap = service.create_roadmap(Some(2), Some(pdf())).await.unwrap();

        assert_eq!(roadmap.roadmap_id, 4);
        assert_eq!(store.keys(), vec!["images/course/roadmap_2567.pdf"]);
    }

    #[tokio::test]
    async fn test_unknown_course_is_not_found_and_nothing_uploaded() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([no_rows()])
            .into_connection();
        let store = Arc::new(MemoryBlobStore::new("memory://"));
        let service = DocumentService::new(Repository::new(conn), store.clone());

        let err = service
            .create_course_structure(Some(99), Some(pdf()))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_and_course_are_rejected() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = DocumentService::new(Repository::new(conn), Arc::new(MemoryBlobStore::new("memory://")));

        let err = service.create_roadmap(Some(1), None).await.unwrap_err();
        assert!(matches!(err, AppError::MissingField { ref field } if field == "roadmap"));

        let err = service.create_roadmap(Some(-1), Some(pdf())).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
