//! Subject persistence.
//!
//! Description and CLO rows are keyed by the subject code and upserted in
//! the subject's transaction; the subject then points at them by that code.

use super::{insert_returning_id, opt_text, stmt, Repository};
use crate::db::models::Subject;
use crate::db::query::{empty_as_none, FilteredQuery, SortOrder, SortSpec};
use crate::errors::{AppError, Result};
use sea_orm::{ConnectionTrait, FromQueryResult, Value};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const SUBJECT_SORT: SortSpec = SortSpec {
    columns: &[
        ("id", "s.id"),
        ("subject_id", "s.subject_id"),
        ("course_id", "s.course_id"),
        ("plan_type", "s.plan_type"),
        ("semester", "s.semester"),
        ("thai_subject", "s.thai_subject"),
    ],
    default_column: "id",
    default_order: SortOrder::Asc,
};

const SUBJECT_SELECT: &str = "\
SELECT s.id, s.subject_id, s.course_id, c.thai_course, s.plan_type, s.semester, \
s.thai_subject, s.eng_subject, s.credits, s.compulsory_subject, s.condition, \
d.description_thai, d.description_eng, cl.clo \
FROM subjects s \
LEFT JOIN courses c ON s.course_id = c.course_id \
LEFT JOIN description d ON s.description_id = d.description_id \
LEFT JOIN clo cl ON s.clo_id = cl.clo_id";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub subject_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub course_id: Option<i32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub plan_type: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub semester: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SubjectWrite {
    #[validate(length(min = 1, max = 20, message = "subject_id must be 1-20 characters"))]
    pub subject_id: String,
    #[validate(range(min = 1, message = "course_id must be positive"))]
    pub course_id: i32,
    pub plan_type: Option<String>,
    pub semester: Option<String>,
    #[validate(length(min = 1, message = "thai_subject is required"))]
    pub thai_subject: String,
    pub eng_subject: Option<String>,
    pub credits: Option<String>,
    pub compulsory_subject: Option<String>,
    pub condition: Option<String>,
    pub description_thai: Option<String>,
    pub description_eng: Option<String>,
    pub clo: Option<String>,
}

/// Upsert the description and CLO rows; returns their keys for the subject row
async fn upsert_details<C: ConnectionTrait>(
    conn: &C,
    write: &SubjectWrite,
) -> Result<(Option<String>, Option<String>)> {
    let mut description_id = None;
    let mut clo_id = None;

    if write.description_thai.is_some() || write.description_eng.is_some() {
        conn.execute(stmt(
            "INSERT INTO description (description_id, description_thai, description_eng) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (description_id) DO UPDATE \
             SET description_thai = EXCLUDED.description_thai, description_eng = EXCLUDED.description_eng",
            vec![
                write.subject_id.clone().into(),
                opt_text(&write.description_thai),
                opt_text(&write.description_eng),
            ],
        ))
        .await?;
        description_id = Some(write.subject_id.clone());
    }

    if write.clo.is_some() {
        conn.execute(stmt(
            "INSERT INTO clo (clo_id, clo) VALUES ($1, $2) \
             ON CONFLICT (clo_id) DO UPDATE SET clo = EXCLUDED.clo",
            vec![write.subject_id.clone().into(), opt_text(&write.clo)],
        ))
        .await?;
        clo_id = Some(write.subject_id.clone());
    }

    Ok((description_id, clo_id))
}

fn subject_values(write: &SubjectWrite, description_id: Option<String>, clo_id: Option<String>) -> Vec<Value> {
    vec![
        write.subject_id.clone().into(),
        write.course_id.into(),
        opt_text(&write.plan_type),
        opt_text(&write.semester),
        write.thai_subject.clone().into(),
        opt_text(&write.eng_subject),
        opt_text(&write.credits),
        opt_text(&write.compulsory_subject),
        opt_text(&write.condition),
        opt_text(&description_id),
        opt_text(&clo_id),
    ]
}

async fn insert_subject<C: ConnectionTrait>(conn: &C, write: &SubjectWrite) -> Result<i32> {
    let (description_id, clo_id) = upsert_details(conn, write).await?;

    insert_returning_id(
        conn,
        stmt(
            "INSERT INTO subjects (subject_id, course_id, plan_type, semester, thai_subject, \
             eng_subject, credits, compulsory_subject, condition, description_id, clo_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING id",
            subject_values(write, description_id, clo_id),
        ),
        "id",
    )
    .await
}

impl Repository {
    pub async fn list_subjects(&self, query: &SubjectQuery) -> Result<Vec<Subject>> {
        let (sort_column, order) = SUBJECT_SORT.resolve(query.sort.as_deref(), query.order.as_deref())?;

        let statement = FilteredQuery::new(SUBJECT_SELECT)
            .eq_opt("s.subject_id", query.subject_id.clone().filter(|s| !s.is_empty()))
            .eq_opt("s.course_id", query.course_id.filter(|id| *id > 0))
            .eq_opt("s.plan_type", query.plan_type.clone().filter(|p| !p.is_empty()))
            .eq_opt("s.semester", query.semester.clone().filter(|s| !s.is_empty()))
            .contains(&["s.thai_subject", "s.eng_subject"], query.search.as_deref())
            .order_by(sort_column, order)
            .limit(query.limit)
            .build();

        Ok(Subject::find_by_statement(statement).all(self.conn()).await?)
    }

    pub async fn get_subject(&self, id: i32) -> Result<Subject> {
        let statement = FilteredQuery::new(SUBJECT_SELECT).eq("s.id", id).build();

        Subject::find_by_statement(statement)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::not_found("subject", id))
    }

    pub async fn create_subject(&self, write: &SubjectWrite) -> Result<i32> {
        let txn = self.begin().await?;
        let id = insert_subject(&txn, write).await?;
        txn.commit().await?;

        tracing::info!(id, subject_id = %write.subject_id, "Subject created");
        Ok(id)
    }

    /// Insert every subject in one transaction; the first failure rolls back
    /// all and is reported with its zero-based row index
    pub async fn create_subjects(&self, writes: &[SubjectWrite]) -> Result<Vec<i32>> {
        let txn = self.begin().await?;
        let mut ids = Vec::with_capacity(writes.len());

        for (index, write) in writes.iter().enumerate() {
            match insert_subject(&txn, write).await {
                Ok(id) => ids.push(id),
                Err(e) => {
                    tracing::warn!(index, subject_id = %write.subject_id, error = %e, "Subject batch aborted");
                    return Err(AppError::BatchRow {
                        index,
                        source: Box::new(e),
                    });
                }
            }
        }

        txn.commit().await?;

        tracing::info!(count = ids.len(), "Subject batch created");
        Ok(ids)
    }

    pub async fn update_subject(&self, id: i32, write: &SubjectWrite) -> Result<()> {
        let txn = self.begin().await?;
        let (description_id, clo_id) = upsert_details(&txn, write).await?;

        let mut values = subject_values(write, description_id, clo_id);
        values.push(id.into());

        let result = txn
            .execute(stmt(
                "UPDATE subjects SET subject_id = $1, course_id = $2, plan_type = $3, semester = $4, \
                 thai_subject = $5, eng_subject = $6, credits = $7, compulsory_subject = $8, \
                 condition = $9, description_id = $10, clo_id = $11 \
                 WHERE id = $12",
                values,
            ))
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("subject", id));
        }

        txn.commit().await?;

        tracing::info!(id, subject_id = %write.subject_id, "Subject updated");
        Ok(())
    }

    pub async fn delete_subject(&self, id: i32) -> Result<()> {
        self.delete_by_id("subjects", "id", "subject", id).await
    }
}
