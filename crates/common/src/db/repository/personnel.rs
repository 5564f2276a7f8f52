//! Personnel and research persistence.
//!
//! Personnel reads join department and academic positions plus the research
//! table, so one person spans as many rows as they have publications; the
//! rows are folded back with [`try_aggregate`]. The academic position is
//! either given by id or resolved from its Thai/English names.

use super::{insert_returning_id, opt_text, stmt, Repository};
use crate::db::aggregate::{try_aggregate, try_aggregate_one};
use crate::db::lookup::{resolve_optional_reference, ACADEMIC_POSITIONS};
use crate::db::models::{Personnel, PersonnelRow, Publication, Research, ScopusAuthor};
use crate::db::query::{empty_as_none, FilteredQuery, SortOrder, SortSpec};
use crate::errors::{AppError, Result};
use sea_orm::{ConnectionTrait, DatabaseTransaction, FromQueryResult, Value};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const PERSONNEL_SORT: SortSpec = SortSpec {
    columns: &[
        ("personnel_id", "p.personnel_id"),
        ("type_personnel", "p.type_personnel"),
        ("thai_name", "p.thai_name"),
        ("eng_name", "p.eng_name"),
        ("department_position_id", "p.department_position_id"),
        ("academic_position_id", "p.academic_position_id"),
    ],
    default_column: "personnel_id",
    default_order: SortOrder::Asc,
};

pub const RESEARCH_SORT: SortSpec = SortSpec {
    columns: &[
        ("research_id", "r.research_id"),
        ("personnel_id", "r.personnel_id"),
        ("title", "r.title"),
        ("year", "r.year"),
        ("cited", "r.cited"),
        ("created_at", "r.created_at"),
    ],
    default_column: "research_id",
    default_order: SortOrder::Asc,
};

const PERSONNEL_SELECT: &str = "\
SELECT p.personnel_id, p.type_personnel, p.department_position_id, d.department_position_name, \
p.academic_position_id, a.thai_academic_position, a.eng_academic_position, \
p.thai_name, p.eng_name, p.education, p.related_fields, p.email, p.website, p.file_image, p.scopus_id, \
r.research_id AS r_research_id, r.title AS r_title, r.journal AS r_journal, r.year AS r_year, \
r.volume AS r_volume, r.issue AS r_issue, r.pages AS r_pages, r.doi AS r_doi, \
r.cited AS r_cited, r.created_at AS r_created_at \
FROM personnels p \
LEFT JOIN department_position d ON p.department_position_id = d.department_position_id \
LEFT JOIN academic_position a ON p.academic_position_id = a.academic_position_id \
LEFT JOIN research r ON p.personnel_id = r.personnel_id";

const RESEARCH_SELECT: &str = "\
SELECT r.research_id, r.personnel_id, r.title, r.journal, r.year, r.volume, r.issue, \
r.pages, r.doi, r.cited, r.created_at \
FROM research r";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonnelQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub type_personnel: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub department_position_id: Option<i32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub academic_position_id: Option<i32>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResearchQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub personnel_id: Option<i32>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<i64>,
}

/// Personnel create/update values. `file_image` is the stored URL of an
/// uploaded profile image; on update `None` keeps the current one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PersonnelWrite {
    #[validate(length(min = 1, message = "type_personnel is required"))]
    pub type_personnel: String,
    pub department_position_id: Option<i32>,
    pub academic_position_id: Option<i32>,
    pub thai_academic_position: Option<String>,
    pub eng_academic_position: Option<String>,
    #[validate(length(min = 1, message = "thai_name is required"))]
    pub thai_name: String,
    pub eng_name: Option<String>,
    pub education: Option<String>,
    pub related_fields: Option<String>,
    #[validate(email(message = "email is not a valid address"))]
    pub email: Option<String>,
    pub website: Option<String>,
    pub file_image: Option<String>,
    pub scopus_id: Option<String>,
}

/// An explicit id wins; otherwise look up or create the named position
async fn academic_position_id(txn: &DatabaseTransaction, write: &PersonnelWrite) -> Result<Option<i32>> {
    if let Some(id) = write.academic_position_id {
        return Ok(Some(id));
    }

    resolve_optional_reference(
        txn,
        &ACADEMIC_POSITIONS,
        &[
            write.thai_academic_position.as_deref(),
            write.eng_academic_position.as_deref(),
        ],
    )
    .await
}

fn personnel_values(write: &PersonnelWrite, academic_position_id: Option<i32>) -> Vec<Value> {
    vec![
        write.type_personnel.clone().into(),
        write.department_position_id.into(),
        academic_position_id.into(),
        write.thai_name.clone().into(),
        opt_text(&write.eng_name),
        opt_text(&write.education),
        opt_text(&write.related_fields),
        opt_text(&write.email),
        opt_text(&write.website),
        opt_text(&write.file_image),
        opt_text(&write.scopus_id),
    ]
}

impl Repository {
    // =========================================================================
    // Personnel
    // =========================================================================

    /// List personnel with their research. The limit caps people, not rows.
    pub async fn list_personnel(&self, query: &PersonnelQuery) -> Result<Vec<Personnel>> {
        let (sort_column, order) =
            PERSONNEL_SORT.resolve(query.sort.as_deref(), query.order.as_deref())?;

        let statement = FilteredQuery::new(PERSONNEL_SELECT)
            .eq_opt(
                "p.type_personnel",
                query.type_personnel.clone().filter(|t| !t.is_empty()),
            )
            .eq_opt(
                "p.department_position_id",
                query.department_position_id.filter(|id| *id > 0),
            )
            .eq_opt("p.academic_position_id", query.academic_position_id)
            .contains(&["p.thai_name", "p.eng_name"], query.search.as_deref())
            .order_by(sort_column, order)
            .order_by("r.research_id", SortOrder::Asc)
            .build();

        let rows = self.conn().query_all(statement).await?;
        let mut personnel =
            try_aggregate(rows.iter().map(|row| PersonnelRow::from_query_result(row, "")))?;

        if let Some(limit) = query.limit.filter(|l| *l > 0) {
            personnel.truncate(limit as usize);
        }

        Ok(personnel)
    }

    pub async fn get_personnel(&self, personnel_id: i32) -> Result<Personnel> {
        let statement = FilteredQuery::new(PERSONNEL_SELECT)
            .eq("p.personnel_id", personnel_id)
            .order_by("r.research_id", SortOrder::Asc)
            .build();

        let rows = self.conn().query_all(statement).await?;
        try_aggregate_one(rows.iter().map(|row| PersonnelRow::from_query_result(row, "")))?
            .ok_or_else(|| AppError::not_found("personnel", personnel_id))
    }

    pub async fn create_personnel(&self, write: &PersonnelWrite) -> Result<i32> {
        let txn = self.begin().await?;
        let position_id = academic_position_id(&txn, write).await?;

        let personnel_id = insert_returning_id(
            &txn,
            stmt(
                "INSERT INTO personnels (type_personnel, department_position_id, academic_position_id, \
                 thai_name, eng_name, education, related_fields, email, website, file_image, scopus_id) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING personnel_id",
                personnel_values(write, position_id),
            ),
            "personnel_id",
        )
        .await?;

        txn.commit().await?;

        tracing::info!(personnel_id, academic_position_id = ?position_id, "Personnel created");
        Ok(personnel_id)
    }

    pub async fn update_personnel(&self, personnel_id: i32, write: &PersonnelWrite) -> Result<()> {
        let txn = self.begin().await?;
        let position_id = academic_position_id(&txn, write).await?;

        let mut values = personnel_values(write, position_id);
        values.push(personnel_id.into());

        let result = txn
            .execute(stmt(
                "UPDATE personnels SET type_personnel = $1, department_position_id = $2, \
                 academic_position_id = $3, thai_name = $4, eng_name = $5, education = $6, \
                 related_fields = $7, email = $8, website = $9, \
                 file_image = COALESCE($10, file_image), scopus_id = $11 \
                 WHERE personnel_id = $12",
                values,
            ))
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("personnel", personnel_id));
        }

        txn.commit().await?;

        tracing::info!(personnel_id, "Personnel updated");
        Ok(())
    }

    /// Delete a person; their research rows cascade
    pub async fn delete_personnel(&self, personnel_id: i32) -> Result<()> {
        self.delete_by_id("personnels", "personnel_id", "personnel", personnel_id)
            .await
    }

    /// Stored Scopus author id; a missing person is not-found, a blank id is `None`
    pub async fn scopus_id(&self, personnel_id: i32) -> Result<Option<String>> {
        let row = self
            .conn()
            .query_one(stmt(
                "SELECT scopus_id FROM personnels WHERE personnel_id = $1",
                vec![personnel_id.into()],
            ))
            .await?
            .ok_or_else(|| AppError::not_found("personnel", personnel_id))?;

        let scopus_id: Option<String> = row.try_get("", "scopus_id")?;
        Ok(scopus_id.filter(|id| !id.trim().is_empty()))
    }

    /// Everyone with a non-blank Scopus author id, by personnel id
    pub async fn scopus_authors(&self) -> Result<Vec<ScopusAuthor>> {
        let statement = stmt(
            "SELECT personnel_id, scopus_id FROM personnels \
             WHERE scopus_id IS NOT NULL AND btrim(scopus_id) <> '' \
             ORDER BY personnel_id ASC",
            Vec::new(),
        );
        Ok(ScopusAuthor::find_by_statement(statement).all(self.conn()).await?)
    }

    // =========================================================================
    // Research
    // =========================================================================

    /// Replace a person's research set with `publications` in one transaction.
    /// Returns the number of rows written.
    pub async fn replace_research(&self, personnel_id: i32, publications: &[Publication]) -> Result<usize> {
        let txn = self.begin().await?;

        txn.execute(stmt(
            "DELETE FROM research WHERE personnel_id = $1",
            vec![personnel_id.into()],
        ))
        .await?;

        for publication in publications {
            txn.execute(stmt(
                "INSERT INTO research (personnel_id, title, journal, year, volume, issue, pages, doi, cited, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())",
                vec![
                    personnel_id.into(),
                    publication.title.clone().into(),
                    opt_text(&publication.journal),
                    publication.year.into(),
                    opt_text(&publication.volume),
                    opt_text(&publication.issue),
                    opt_text(&publication.pages),
                    opt_text(&publication.doi),
                    publication.cited.into(),
                ],
            ))
            .await?;
        }

        txn.commit().await?;

        tracing::info!(personnel_id, records = publications.len(), "Research replaced");
        Ok(publications.len())
    }

    pub async fn list_research(&self, query: &ResearchQuery) -> Result<Vec<Research>> {
        let (sort_column, order) =
            RESEARCH_SORT.resolve(query.sort.as_deref(), query.order.as_deref())?;

        let statement = FilteredQuery::new(RESEARCH_SELECT)
            .eq_opt("r.personnel_id", query.personnel_id.filter(|id| *id > 0))
            .contains(&["r.title", "r.journal"], query.search.as_deref())
            .order_by(sort_column, order)
            .limit(query.limit)
            .build();

        Ok(Research::find_by_statement(statement).all(self.conn()).await?)
    }
}
