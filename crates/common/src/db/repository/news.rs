//! News persistence: list/get via one LEFT JOIN folded into aggregates,
//! writes that replace the image gallery wholesale.

use super::{insert_returning_id, opt_text, stmt, Repository};
use crate::db::aggregate::{try_aggregate, try_aggregate_one};
use crate::db::models::{News, NewsRow};
use crate::db::query::{empty_as_none, FilteredQuery, SortOrder, SortSpec};
use crate::errors::{AppError, Result};
use sea_orm::{ConnectionTrait, FromQueryResult, Value};
use serde::Deserialize;

pub const NEWS_SORT: SortSpec = SortSpec {
    columns: &[
        ("news_id", "n.news_id"),
        ("title", "n.title"),
        ("type_id", "n.type_id"),
        ("created_at", "n.created_at"),
        ("updated_at", "n.updated_at"),
    ],
    default_column: "created_at",
    default_order: SortOrder::Desc,
};

const NEWS_SELECT: &str = "\
SELECT n.news_id, n.title, n.content, n.type_id, nt.type_name, n.detail_url, n.cover_image, \
n.created_at, n.updated_at, ni.image_id, ni.file_image \
FROM news n \
LEFT JOIN news_types nt ON n.type_id = nt.type_id \
LEFT JOIN news_images ni ON n.news_id = ni.news_id";

/// List filters for news
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub type_id: Option<i32>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<i64>,
}

/// Column values of a news write; `images` are stored URLs in display order
#[derive(Debug, Clone, Default)]
pub struct NewsWrite {
    pub title: String,
    pub content: String,
    pub type_id: Option<i32>,
    pub detail_url: Option<String>,
    pub cover_image: Option<String>,
    pub images: Vec<String>,
}

impl Repository {
    /// List news with their images. The limit caps news items, not joined rows.
    pub async fn list_news(&self, query: &NewsQuery) -> Result<Vec<News>> {
        let (sort_column, order) = NEWS_SORT.resolve(query.sort.as_deref(), query.order.as_deref())?;

        let statement = FilteredQuery::new(NEWS_SELECT)
            .eq_opt("n.type_id", query.type_id.filter(|id| *id > 0))
            .contains(&["n.title", "n.content"], query.search.as_deref())
            .order_by(sort_column, order)
            .order_by("ni.image_id", SortOrder::Asc)
            .build();

        let rows = self.conn().query_all(statement).await?;
        let mut news = try_aggregate(rows.iter().map(|row| NewsRow::from_query_result(row, "")))?;

        if let Some(limit) = query.limit.filter(|l| *l > 0) {
            news.truncate(limit as usize);
        }

        Ok(news)
    }

    /// Get one news item with its images
    pub async fn get_news(&self, news_id: i32) -> Result<News> {
        let statement = FilteredQuery::new(NEWS_SELECT)
            .eq("n.news_id", news_id)
            .order_by("ni.image_id", SortOrder::Asc)
            .build();

        let rows = self.conn().query_all(statement).await?;
        try_aggregate_one(rows.iter().map(|row| NewsRow::from_query_result(row, "")))?
            .ok_or_else(|| AppError::not_found("news", news_id))
    }

    /// Insert a news row and its images in one transaction
    pub async fn create_news(&self, write: &NewsWrite) -> Result<i32> {
        let txn = self.begin().await?;

        let news_id = insert_returning_id(
            &txn,
            stmt(
                "INSERT INTO news (title, content, type_id, detail_url, cover_image) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING news_id",
                vec![
                    write.title.clone().into(),
                    write.content.clone().into(),
                    write.type_id.into(),
                    opt_text(&write.detail_url),
                    opt_text(&write.cover_image),
                ],
            ),
            "news_id",
        )
        .await?;

        insert_images(&txn, news_id, &write.images).await?;
        txn.commit().await?;

        tracing::info!(news_id, images = write.images.len(), "News created");
        Ok(news_id)
    }

    /// Update the news row and replace its images.
    /// A missing cover image keeps the stored one.
    pub async fn update_news(&self, news_id: i32, write: &NewsWrite) -> Result<()> {
        let txn = self.begin().await?;

        let result = txn
            .execute(stmt(
                "UPDATE news SET title = $1, content = $2, type_id = $3, detail_url = $4, \
                 cover_image = COALESCE($5, cover_image), updated_at = NOW() \
                 WHERE news_id = $6",
                vec![
                    write.title.clone().into(),
                    write.content.clone().into(),
                    write.type_id.into(),
                    opt_text(&write.detail_url),
                    opt_text(&write.cover_image),
                    news_id.into(),
                ],
            ))
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("news", news_id));
        }

        txn.execute(stmt(
            "DELETE FROM news_images WHERE news_id = $1",
            vec![news_id.into()],
        ))
        .await?;
        insert_images(&txn, news_id, &write.images).await?;

        txn.commit().await?;

        tracing::info!(news_id, images = write.images.len(), "News updated");
        Ok(())
    }

    pub async fn news_type_exists(&self, type_id: i32) -> Result<bool> {
        let row = self
            .conn()
            .query_one(stmt(
                "SELECT type_name FROM news_types WHERE type_id = $1",
                vec![type_id.into()],
            ))
            .await?;
        Ok(row.is_some())
    }

    /// Delete a news item; its images go with it through the foreign key
    pub async fn delete_news(&self, news_id: i32) -> Result<()> {
        self.delete_by_id("news", "news_id", "news", news_id).await
    }
}

async fn insert_images<C: ConnectionTrait>(conn: &C, news_id: i32, images: &[String]) -> Result<()> {
    for url in images {
        conn.execute(stmt(
            "INSERT INTO news_images (news_id, file_image) VALUES ($1, $2)",
            vec![news_id.into(), Value::from(url.clone())],
        ))
        .await?;
    }
    Ok(())
}
