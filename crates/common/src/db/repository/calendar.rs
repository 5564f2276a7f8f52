//! Calendar events, stored through the SeaORM entity

use super::Repository;
use crate::db::models::{CalendarActiveModel, CalendarEntity, CalendarEvent};
use crate::db::query::{empty_as_none, FilteredQuery, SortOrder, SortSpec};
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, DbErr, EntityTrait, FromQueryResult, Set};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub const CALENDAR_SORT: SortSpec = SortSpec {
    columns: &[
        ("calendar_id", "calendar_id"),
        ("title", "title"),
        ("start_date", "start_date"),
        ("end_date", "end_date"),
    ],
    default_column: "start_date",
    default_order: SortOrder::Asc,
};

const CALENDAR_SELECT: &str =
    "SELECT calendar_id, title, detail, start_date, end_date FROM calendar_events";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarQuery {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_event_range", skip_on_field_errors = false))]
pub struct CalendarWrite {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub title: String,
    pub detail: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

fn validate_event_range(event: &CalendarWrite) -> std::result::Result<(), ValidationError> {
    if event.end_date < event.start_date {
        let mut error = ValidationError::new("end_before_start");
        error.message = Some("end_date must not be before start_date".into());
        return Err(error);
    }
    Ok(())
}

impl Repository {
    pub async fn list_calendars(&self, query: &CalendarQuery) -> Result<Vec<CalendarEvent>> {
        let (sort_column, order) =
            CALENDAR_SORT.resolve(query.sort.as_deref(), query.order.as_deref())?;

        let statement = FilteredQuery::new(CALENDAR_SELECT)
            .contains(&["title", "detail"], query.search.as_deref())
            .order_by(sort_column, order)
            .order_by("calendar_id", SortOrder::Asc)
            .limit(query.limit)
            .build();

        Ok(CalendarEvent::find_by_statement(statement).all(self.conn()).await?)
    }

    pub async fn get_calendar(&self, calendar_id: i32) -> Result<CalendarEvent> {
        CalendarEntity::find_by_id(calendar_id)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::not_found("calendar event", calendar_id))
    }

    pub async fn create_calendar(&self, write: &CalendarWrite) -> Result<CalendarEvent> {
        let event = CalendarActiveModel {
            calendar_id: NotSet,
            title: Set(write.title.clone()),
            detail: Set(write.detail.clone()),
            start_date: Set(write.start_date),
            end_date: Set(write.end_date),
        }
        .insert(self.conn())
        .await?;

        tracing::info!(calendar_id = event.calendar_id, "Calendar event created");
        Ok(event)
    }

    pub async fn update_calendar(&self, calendar_id: i32, write: &CalendarWrite) -> Result<CalendarEvent> {
        let updated = CalendarActiveModel {
            calendar_id: sea_orm::ActiveValue::Unchanged(calendar_id),
            title: Set(write.title.clone()),
            detail: Set(write.detail.clone()),
            start_date: Set(write.start_date),
            end_date: Set(write.end_date),
        }
        .update(self.conn())
        .await;

        match updated {
            Ok(event) => {
                tracing::info!(calendar_id, "Calendar event updated");
                Ok(event)
            }
            Err(DbErr::RecordNotUpdated) => Err(AppError::not_found("calendar event", calendar_id)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete_calendar(&self, calendar_id: i32) -> Result<()> {
        let result = CalendarEntity::delete_by_id(calendar_id).exec(self.conn()).await?;

        if result.rows_affected == 0 {
            return Err(AppError::not_found("calendar event", calendar_id));
        }

        tracing::info!(calendar_id, "Calendar event deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use std::sync::Arc;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn event(calendar_id: i32) -> CalendarEvent {
        CalendarEvent {
            calendar_id,
            title: "สอบกลางภาค".to_string(),
            detail: None,
            start_date: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2025, 3, 7, 17, 0, 0).unwrap(),
        }
    }

    fn write() -> CalendarWrite {
        let model = event(0);
        CalendarWrite {
            title: model.title,
            detail: model.detail,
            start_date: model.start_date,
            end_date: model.end_date,
        }
    }

    #[tokio::test]
    async fn test_blank_sort_and_bogus_order_use_defaults() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(1), event(2)]])
            .into_connection();
        let db = Arc::new(db);
        let repo = Repository::new(db.clone());

        let query = CalendarQuery {
            sort: Some(String::new()),
            order: Some("bogus".to_string()),
            ..Default::default()
        };
        let events = repo.list_calendars(&query).await.unwrap();
        assert_eq!(events.len(), 2);

        drop(repo);
        let log = transaction_log(db);
        assert!(log.contains("ORDER BY start_date ASC, calendar_id ASC"));
    }

    #[tokio::test]
    async fn test_create_returns_stored_event() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(5)]])
            .into_connection();
        let repo = Repository::new(conn);

        let created = repo.create_calendar(&write()).await.unwrap();
        assert_eq!(created.calendar_id, 5);
    }

    #[tokio::test]
    async fn test_update_missing_event_is_not_found() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<CalendarEvent>::new()])
            .into_connection();
        let repo = Repository::new(conn);

        let err = repo.update_calendar(404, &write()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_missing_event_is_not_found() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([affected(0)])
            .into_connection();
        let repo = Repository::new(conn);

        assert!(repo.delete_calendar(404).await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        assert!(write().validate().is_ok());

        let mut reversed = write();
        std::mem::swap(&mut reversed.start_date, &mut reversed.end_date);
        assert!(reversed.validate().is_err());
    }
}
