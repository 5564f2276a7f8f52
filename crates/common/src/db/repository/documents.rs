//! Roadmap and course-structure documents: an uploaded file URL attached
//! to a course, listed with the course's Thai name.

use super::{insert_returning_id, stmt, Repository};
use crate::db::models::{CourseStructure, Roadmap};
use crate::db::query::{empty_as_none, FilteredQuery, SortOrder, SortSpec};
use crate::errors::{AppError, Result};
use sea_orm::FromQueryResult;
use serde::Deserialize;

pub const ROADMAP_SORT: SortSpec = SortSpec {
    columns: &[
        ("roadmap_id", "r.roadmap_id"),
        ("course_id", "r.course_id"),
        ("thai_course", "c.thai_course"),
    ],
    default_column: "roadmap_id",
    default_order: SortOrder::Asc,
};

pub const COURSE_STRUCTURE_SORT: SortSpec = SortSpec {
    columns: &[
        ("course_structure_id", "cs.course_structure_id"),
        ("course_id", "cs.course_id"),
        ("thai_course", "c.thai_course"),
    ],
    default_column: "course_structure_id",
    default_order: SortOrder::Desc,
};

const ROADMAP_SELECT: &str = "\
SELECT r.roadmap_id, r.course_id, c.thai_course, r.roadmap_url \
FROM roadmap r \
LEFT JOIN courses c ON r.course_id = c.course_id";

const COURSE_STRUCTURE_SELECT: &str = "\
SELECT cs.course_structure_id, cs.course_id, c.thai_course, cs.course_structure_url \
FROM course_structure cs \
LEFT JOIN courses c ON cs.course_id = c.course_id";

/// List filters shared by roadmaps and course structures
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub course_id: Option<i32>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<i64>,
}

impl Repository {
    // =========================================================================
    // Roadmaps
    // =========================================================================

    pub async fn list_roadmaps(&self, query: &DocumentQuery) -> Result<Vec<Roadmap>> {
        let (sort_column, order) = ROADMAP_SORT.resolve(query.sort.as_deref(), query.order.as_deref())?;

        let statement = FilteredQuery::new(ROADMAP_SELECT)
            .eq_opt("r.course_id", query.course_id.filter(|id| *id > 0))
            .order_by(sort_column, order)
            .limit(query.limit)
            .build();

        Ok(Roadmap::find_by_statement(statement).all(self.conn()).await?)
    }

    pub async fn get_roadmap(&self, roadmap_id: i32) -> Result<Roadmap> {
        let statement = FilteredQuery::new(ROADMAP_SELECT)
            .eq("r.roadmap_id", roadmap_id)
            .build();

        Roadmap::find_by_statement(statement)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::not_found("roadmap", roadmap_id))
    }

    pub async fn create_roadmap(&self, course_id: i32, roadmap_url: &str) -> Result<i32> {
        let roadmap_id = insert_returning_id(
            self.conn(),
            stmt(
                "INSERT INTO roadmap (course_id, roadmap_url) VALUES ($1, $2) RETURNING roadmap_id",
                vec![course_id.into(), roadmap_url.into()],
            ),
            "roadmap_id",
        )
        .await?;

        tracing::info!(roadmap_id, course_id, "Roadmap created");
        Ok(roadmap_id)
    }

    pub async fn delete_roadmap(&self, roadmap_id: i32) -> Result<()> {
        self.delete_by_id("roadmap", "roadmap_id", "roadmap", roadmap_id).await
    }

    // =========================================================================
    // Course structures
    // =========================================================================

    pub async fn list_course_structures(&self, query: &DocumentQuery) -> Result<Vec<CourseStructure>> {
        let (sort_column, order) =
            COURSE_STRUCTURE_SORT.resolve(query.sort.as_deref(), query.order.as_deref())?;

        let statement = FilteredQuery::new(COURSE_STRUCTURE_SELECT)
            .eq_opt("cs.course_id", query.course_id.filter(|id| *id > 0))
            .contains(&["c.thai_course"], query.search.as_deref())
            .order_by(sort_column, order)
            .limit(query.limit)
            .build();

        Ok(CourseStructure::find_by_statement(statement).all(self.conn()).await?)
    }

    pub async fn get_course_structure(&self, course_structure_id: i32) -> Result<CourseStructure> {
        let statement = FilteredQuery::new(COURSE_STRUCTURE_SELECT)
            .eq("cs.course_structure_id", course_structure_id)
            .build();

        CourseStructure::find_by_statement(statement)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::not_found("course structure", course_structure_id))
    }

    pub async fn create_course_structure(&self, course_id: i32, url: &str) -> Result<i32> {
        let course_structure_id = insert_returning_id(
            self.conn(),
            stmt(
                "INSERT INTO course_structure (course_id, course_structure_url) \
                 VALUES ($1, $2) RETURNING course_structure_id",
                vec![course_id.into(), url.into()],
            ),
            "course_structure_id",
        )
        .await?;

        tracing::info!(course_structure_id, course_id, "Course structure created");
        Ok(course_structure_id)
    }

    pub async fn delete_course_structure(&self, course_structure_id: i32) -> Result<()> {
        self.delete_by_id(
            "course_structure",
            "course_structure_id",
            "course structure",
            course_structure_id,
        )
        .await
    }
}
