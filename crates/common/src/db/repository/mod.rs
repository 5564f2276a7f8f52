//! Repository pattern for database operations
//!
//! One `Repository` wraps a per-request connection handle. Entity
//! operations live in sibling modules as further `impl Repository` blocks;
//! multi-statement writes run in a transaction that rolls back on drop
//! unless committed.

mod calendar;
mod course;
mod documents;
mod news;
mod personnel;
mod subject;

pub use calendar::{CalendarQuery, CalendarWrite, CALENDAR_SORT};
pub use course::{CourseQuery, CourseWrite, COURSE_SORT};
pub use documents::{DocumentQuery, COURSE_STRUCTURE_SORT, ROADMAP_SORT};
pub use news::{NewsQuery, NewsWrite, NEWS_SORT};
pub use personnel::{PersonnelQuery, PersonnelWrite, ResearchQuery, PERSONNEL_SORT, RESEARCH_SORT};
pub use subject::{SubjectQuery, SubjectWrite, SUBJECT_SORT};

use crate::errors::{AppError, Result};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, Statement,
    TransactionTrait, Value,
};
use std::sync::Arc;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    conn: Arc<DatabaseConnection>,
}

impl Repository {
    /// Create a new repository over a shared connection handle
    pub fn new(conn: impl Into<Arc<DatabaseConnection>>) -> Self {
        Self { conn: conn.into() }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.conn.as_ref()
    }

    async fn begin(&self) -> Result<DatabaseTransaction> {
        self.conn.begin().await.map_err(Into::into)
    }

    /// `DELETE FROM table WHERE id_column = $1`; zero affected rows is not-found
    async fn delete_by_id(
        &self,
        table: &str,
        id_column: &str,
        resource_type: &str,
        id: i32,
    ) -> Result<()> {
        let result = self
            .conn()
            .execute(stmt(
                &format!("DELETE FROM {} WHERE {} = $1", table, id_column),
                vec![id.into()],
            ))
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(resource_type, id));
        }

        tracing::info!(table, id, "Row deleted");
        Ok(())
    }

    /// Whether a course exists; used to reject uploads for unknown courses
    pub async fn course_exists(&self, course_id: i32) -> Result<bool> {
        let row = self
            .conn()
            .query_one(stmt(
                "SELECT 1 AS present FROM courses WHERE course_id = $1",
                vec![course_id.into()],
            ))
            .await?;
        Ok(row.is_some())
    }
}

fn stmt(sql: &str, values: Vec<Value>) -> Statement {
    Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
}

/// Id from a `RETURNING <column>` row
async fn insert_returning_id<C: ConnectionTrait>(
    conn: &C,
    statement: Statement,
    id_column: &str,
) -> Result<i32> {
    let row = conn.query_one(statement).await?.ok_or_else(|| AppError::Internal {
        message: format!("insert returned no {}", id_column),
    })?;
    Ok(row.try_get::<i32>("", id_column)?)
}

/// Owned optional string as a bind value (NULL when absent)
fn opt_text(value: &Option<String>) -> Value {
    Value::String(value.clone().map(Box::new))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_delete_missing_row_is_not_found() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([affected(0)])
            .into_connection();
        let repo = Repository::new(conn);

        let err = repo
            .delete_by_id("courses", "course_id", "course", 999)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_existing_row() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([affected(1)])
            .into_connection();
        let repo = Repository::new(conn);

        assert!(repo.delete_by_id("courses", "course_id", "course", 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_course_exists() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![id_row("present", 1)], no_rows()])
            .into_connection();
        let repo = Repository::new(conn);

        assert!(repo.course_exists(1).await.unwrap());
        assert!(!repo.course_exists(2).await.unwrap());
    }
}
