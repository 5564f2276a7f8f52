use super::validate;
use crate::db::models::CalendarEvent;
use crate::db::repository::{CalendarQuery, CalendarWrite};
use crate::db::Repository;
use crate::errors::Result;

pub struct CalendarService {
    repo: Repository,
}

impl CalendarService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn list(&self, query: &CalendarQuery) -> Result<Vec<CalendarEvent>> {
        self.repo.list_calendars(query).await
    }

    pub async fn get(&self, calendar_id: i32) -> Result<CalendarEvent> {
        self.repo.get_calendar(calendar_id).await
    }

    pub async fn create(&self, write: &CalendarWrite) -> Result<CalendarEvent> {
        validate(write)?;
        self.repo.create_calendar(write).await
    }

    pub async fn update(&self, calendar_id: i32, write: &CalendarWrite) -> Result<CalendarEvent> {
        validate(write)?;
        self.repo.update_calendar(calendar_id, write).await
    }

    pub async fn delete(&self, calendar_id: i32) -> Result<()> {
        self.repo.delete_calendar(calendar_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_reversed_range_rejected_before_insert() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = CalendarService::new(Repository::new(conn));

        let write = CalendarWrite {
            title: "ปิดภาคเรียน".to_string(),
            detail: None,
            start_date: Utc.with_ymd_and_hms(2025, 5, 10, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
        };

        let err = service.create(&write).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
