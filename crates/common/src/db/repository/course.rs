//! Course persistence. Major, degree names, career paths and PLO are
//! normalized into reference tables and resolved inside the write transaction.

use super::{insert_returning_id, opt_text, stmt, Repository};
use crate::db::lookup::{resolve_optional_reference, CAREER_PATHS, DEGREE_NAMES, MAJORS, PLOS};
use crate::db::models::Course;
use crate::db::query::{empty_as_none, FilteredQuery, SortOrder, SortSpec};
use crate::errors::{AppError, Result};
use sea_orm::{ConnectionTrait, DatabaseTransaction, FromQueryResult, Value};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const COURSE_SORT: SortSpec = SortSpec {
    columns: &[
        ("course_id", "c.course_id"),
        ("degree", "c.degree"),
        ("major", "m.major"),
        ("year", "c.year"),
        ("thai_course", "c.thai_course"),
        ("eng_course", "c.eng_course"),
    ],
    default_column: "year",
    default_order: SortOrder::Desc,
};

const COURSE_SELECT: &str = "\
SELECT c.course_id, c.degree, c.major_id, m.major, c.year, c.thai_course, c.eng_course, \
c.degree_id, dn.thai_degree, dn.eng_degree, c.admission_req, c.graduation_req, \
c.philosophy, c.objective, c.tuition, c.credits, \
c.career_paths_id, cp.career_paths, c.plo_id, p.plo, c.detail_url \
FROM courses c \
LEFT JOIN majors m ON c.major_id = m.major_id \
LEFT JOIN degree_names dn ON c.degree_id = dn.degree_id \
LEFT JOIN career_paths cp ON c.career_paths_id = cp.career_paths_id \
LEFT JOIN plos p ON c.plo_id = p.plo_id";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub degree: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub major: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub year: Option<i32>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<i64>,
}

/// Course create/update body. Reference names are resolved to ids on write.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CourseWrite {
    #[validate(length(min = 1, message = "degree is required"))]
    pub degree: String,
    pub major: Option<String>,
    #[validate(range(min = 1900, max = 3000, message = "year is out of range"))]
    pub year: i32,
    #[validate(length(min = 1, message = "thai_course is required"))]
    pub thai_course: String,
    pub eng_course: Option<String>,
    pub thai_degree: Option<String>,
    pub eng_degree: Option<String>,
    pub admission_req: Option<String>,
    pub graduation_req: Option<String>,
    pub philosophy: Option<String>,
    pub objective: Option<String>,
    pub tuition: Option<String>,
    pub credits: Option<String>,
    pub career_paths: Option<String>,
    pub plo: Option<String>,
    #[validate(url(message = "detail_url must be a URL"))]
    pub detail_url: Option<String>,
}

/// Foreign keys of a course row after reference resolution
struct CourseRefs {
    major_id: Option<i32>,
    degree_id: Option<i32>,
    career_paths_id: Option<i32>,
    plo_id: Option<i32>,
}

async fn resolve_refs(txn: &DatabaseTransaction, write: &CourseWrite) -> Result<CourseRefs> {
    Ok(CourseRefs {
        major_id: resolve_optional_reference(txn, &MAJORS, &[write.major.as_deref()]).await?,
        degree_id: resolve_optional_reference(
            txn,
            &DEGREE_NAMES,
            &[write.thai_degree.as_deref(), write.eng_degree.as_deref()],
        )
        .await?,
        career_paths_id: resolve_optional_reference(
            txn,
            &CAREER_PATHS,
            &[write.career_paths.as_deref()],
        )
        .await?,
        plo_id: resolve_optional_reference(txn, &PLOS, &[write.plo.as_deref()]).await?,
    })
}

/// Bind values in `courses` column order, shared by insert and update
fn course_values(write: &CourseWrite, refs: &CourseRefs) -> Vec<Value> {
    vec![
        write.degree.clone().into(),
        refs.major_id.into(),
        write.year.into(),
        write.thai_course.clone().into(),
        opt_text(&write.eng_course),
        refs.degree_id.into(),
        opt_text(&write.admission_req),
        opt_text(&write.graduation_req),
        opt_text(&write.philosophy),
        opt_text(&write.objective),
        opt_text(&write.tuition),
        opt_text(&write.credits),
        refs.career_paths_id.into(),
        refs.plo_id.into(),
        opt_text(&write.detail_url),
    ]
}

impl Repository {
    pub async fn list_courses(&self, query: &CourseQuery) -> Result<Vec<Course>> {
        let (sort_column, order) = COURSE_SORT.resolve(query.sort.as_deref(), query.order.as_deref())?;

        let statement = FilteredQuery::new(COURSE_SELECT)
            .eq_opt("c.degree", query.degree.clone().filter(|d| !d.is_empty()))
            .eq_opt("m.major", query.major.clone().filter(|m| !m.is_empty()))
            .eq_opt("c.year", query.year.filter(|y| *y > 0))
            .contains(&["c.thai_course", "c.eng_course"], query.search.as_deref())
            .order_by(sort_column, order)
            .limit(query.limit)
            .build();

        Ok(Course::find_by_statement(statement).all(self.conn()).await?)
    }

    pub async fn get_course(&self, course_id: i32) -> Result<Course> {
        let statement = FilteredQuery::new(COURSE_SELECT)
            .eq("c.course_id", course_id)
            .build();

        Course::find_by_statement(statement)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::not_found("course", course_id))
    }

    /// Resolve every reference, then insert the course; all in one transaction
    pub async fn create_course(&self, write: &CourseWrite) -> Result<i32> {
        let txn = self.begin().await?;
        let refs = resolve_refs(&txn, write).await?;

        let course_id = insert_returning_id(
            &txn,
            stmt(
                "INSERT INTO courses (degree, major_id, year, thai_course, eng_course, degree_id, \
                 admission_req, graduation_req, philosophy, objective, tuition, credits, \
                 career_paths_id, plo_id, detail_url) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
                 RETURNING course_id",
                course_values(write, &refs),
            ),
            "course_id",
        )
        .await?;

        txn.commit().await?;

        tracing::info!(course_id, major_id = ?refs.major_id, "Course created");
        Ok(course_id)
    }

    pub async fn update_course(&self, course_id: i32, write: &CourseWrite) -> Result<()> {
        let txn = self.begin().await?;
        let refs = resolve_refs(&txn, write).await?;

        let mut values = course_values(write, &refs);
        values.push(course_id.into());

        let result = txn
            .execute(stmt(
                "UPDATE courses SET degree = $1, major_id = $2, year = $3, thai_course = $4, \
                 eng_course = $5, degree_id = $6, admission_req = $7, graduation_req = $8, \
                 philosophy = $9, objective = $10, tuition = $11, credits = $12, \
                 career_paths_id = $13, plo_id = $14, detail_url = $15 \
                 WHERE course_id = $16",
                values,
            ))
            .await?;

        // Dropping the transaction rolls back any reference rows created above
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("course", course_id));
        }

        txn.commit().await?;

        tracing::info!(course_id, "Course updated");
        Ok(())
    }

    pub async fn delete_course(&self, course_id: i32) -> Result<()> {
        self.delete_by_id("courses", "course_id", "course", course_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use std::sync::Arc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn write() -> CourseWrite {
        CourseWrite {
            degree: "ปริญญาตรี".to_string(),
            major: Some("CS".to_string()),
            year: 2565,
            thai_course: "วิทยาการคอมพิวเตอร์".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_inserts_absent_major() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                // majors lookup misses, insert returns 4
                no_rows(),
                vec![id_row("id", 4)],
                // course insert
                vec![id_row("course_id", 12)],
            ])
            .into_connection();
        let db = Arc::new(db);
        let repo = Repository::new(db.clone());

        assert_eq!(repo.create_course(&write()).await.unwrap(), 12);

        drop(repo);
        let log = transaction_log(db);
        assert!(log.contains("INSERT INTO majors"));
        assert!(log.contains("INSERT INTO courses"));
        assert!(log.contains("Int(Some(4))"));
    }

    #[tokio::test]
    async fn test_create_reuses_existing_major() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![id_row("id", 2)], vec![id_row("course_id", 13)]])
            .into_connection();
        let db = Arc::new(db);
        let repo = Repository::new(db.clone());

        repo.create_course(&write()).await.unwrap();

        drop(repo);
        let log = transaction_log(db);
        assert!(!log.contains("INSERT INTO majors"));
    }

    #[tokio::test]
    async fn test_update_missing_course_is_not_found() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![id_row("id", 2)]])
            .append_exec_results([affected(0)])
            .into_connection();
        let repo = Repository::new(conn);

        let err = repo.update_course(999, &write()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_missing_course_is_not_found() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([affected(0)])
            .into_connection();
        let repo = Repository::new(conn);

        let err = repo.delete_course(999).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Resource not found: course with id 999");
    }

    #[test]
    fn test_course_write_validation() {
        assert!(write().validate().is_ok());

        let mut invalid = write();
        invalid.thai_course = String::new();
        invalid.detail_url = Some("not a url".to_string());
        let errors = invalid.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("thai_course"));
        assert!(fields.contains_key("detail_url"));
    }

    #[test]
    fn test_list_filters_in_fixed_order() {
        let query = CourseQuery {
            year: Some(2565),
            degree: Some("ปริญญาตรี".to_string()),
            search: Some("data".to_string()),
            ..Default::default()
        };
        let (sort_column, order) = COURSE_SORT.resolve(None, Some("asc")).unwrap();
        let statement = FilteredQuery::new(COURSE_SELECT)
            .eq_opt("c.degree", query.degree.clone())
            .eq_opt("c.year", query.year)
            .contains(&["c.thai_course", "c.eng_course"], query.search.as_deref())
            .order_by(sort_column, order)
            .build();

        assert!(statement.sql.ends_with(
            "WHERE c.degree = $1 AND c.year = $2 AND \
             (c.thai_course ILIKE '%' || $3 || '%' ESCAPE '\\' OR c.eng_course ILIKE '%' || $3 || '%' ESCAPE '\\') \
             ORDER BY c.year ASC"
        ));
    }
}
