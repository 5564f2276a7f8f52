use super::validate;
use crate::db::models::Course;
use crate::db::repository::{CourseQuery, CourseWrite};
use crate::db::Repository;
use crate::errors::Result;

pub struct CourseService {
    repo: Repository,
}

impl CourseService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn list(&self, query: &CourseQuery) -> Result<Vec<Course>> {
        self.repo.list_courses(query).await
    }

    pub async fn get(&self, course_id: i32) -> Result<Course> {
        self.repo.get_course(course_id).await
    }

    pub async fn create(&self, write: &CourseWrite) -> Result<Course> {
        validate(write)?;
        let course_id = self.repo.create_course(write).await?;
        self.repo.get_course(course_id).await
    }

    pub async fn update(&self, course_id: i32, write: &CourseWrite) -> Result<Course> {
        validate(write)?;
        self.repo.update_course(course_id, write).await?;
        self.repo.get_course(course_id).await
    }

    pub async fn delete(&self, course_id: i32) -> Result<()> {
        self.repo.delete_course(course_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::*;
    use crate::errors::AppError;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    fn course_row(course_id: i32, major_id: i32) -> MockRow {
        MockRow::from([
            ("course_id", Value::from(course_id)),
            ("degree", text("ปริญญาตรี")),
            ("major_id", Value::from(major_id)),
            ("major", text("CS")),
            ("year", Value::from(2565)),
            ("thai_course", text("วิทยาการคอมพิวเตอร์")),
            ("eng_course", text("Computer Science")),
            ("degree_id", null_int()),
            ("thai_degree", null_text()),
            ("eng_degree", null_text()),
            ("admission_req", null_text()),
            ("graduation_req", null_text()),
            ("philosophy", null_text()),
            ("objective", null_text()),
            ("tuition", null_text()),
            ("credits", text("128")),
            ("career_paths_id", null_int()),
            ("career_paths", null_text()),
            ("plo_id", null_int()),
            ("plo", null_text()),
            ("detail_url", null_text()),
        ])
    }

    fn write() -> CourseWrite {
        CourseWrite {
            degree: "ปริญญาตรี".to_string(),
            major: Some("CS".to_string()),
            year: 2565,
            thai_course: "วิทยาการคอมพิวเตอร์".to_string(),
            eng_course: Some("Computer Science".to_string()),
            credits: Some("128".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_with_new_major_links_inserted_row() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                no_rows(),
                vec![id_row("id", 6)],
                vec![id_row("course_id", 30)],
                vec![course_row(30, 6)],
            ])
            .into_connection();
        let service = CourseService::new(Repository::new(conn));

        let course = service.create(&write()).await.unwrap();
        assert_eq!(course.course_id, 30);
        assert_eq!(course.major_id, Some(6));
        assert_eq!(course.major.as_deref(), Some("CS"));
    }

    #[tokio::test]
    async fn test_invalid_course_never_reaches_database() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = CourseService::new(Repository::new(conn));

        let mut invalid = write();
        invalid.degree = String::new();
        let err = service.create(&invalid).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_delete_unknown_course() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([affected(0)])
            .into_connection();
        let service = CourseService::new(Repository::new(conn));

        assert!(service.delete(999).await.unwrap_err().is_not_found());
    }
}
