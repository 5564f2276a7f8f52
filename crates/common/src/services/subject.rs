use super::validate;
use crate::db::models::Subject;
use crate::db::repository::{SubjectQuery, SubjectWrite};
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::storage::UploadedFile;
use validator::Validate;

/// Cells per CSV row: the subject code, then course id, plan type, semester,
/// thai and english names, credits, compulsory flag, condition, thai and
/// english descriptions and the CLO
const CSV_COLUMNS: usize = 12;

fn row_error(index: usize, source: AppError) -> AppError {
    AppError::BatchRow {
        index,
        source: Box::new(source),
    }
}

/// Decode a subject CSV. The first line is a header and is skipped; rows are
/// indexed from zero after it. Blank optional cells are absent.
pub fn parse_subject_csv(data: &[u8]) -> Result<Vec<SubjectWrite>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut writes = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            row_error(
                index,
                AppError::InvalidFormat {
                    message: e.to_string(),
                },
            )
        })?;

        if record.len() != CSV_COLUMNS {
            return Err(row_error(
                index,
                AppError::InvalidFormat {
                    message: format!("expected {} columns, found {}", CSV_COLUMNS, record.len()),
                },
            ));
        }

        let text = |i: usize| record.get(i).unwrap_or_default().to_string();
        let optional = |i: usize| Some(text(i)).filter(|v| !v.is_empty());

        let course_id = text(1).parse::<i32>().map_err(|_| {
            row_error(
                index,
                AppError::invalid_field("course_id", "course_id must be an integer"),
            )
        })?;

        writes.push(SubjectWrite {
            subject_id: text(0),
            course_id,
            plan_type: optional(2),
            semester: optional(3),
            thai_subject: text(4),
            eng_subject: optional(5),
            credits: optional(6),
            compulsory_subject: optional(7),
            condition: optional(8),
            description_thai: optional(9),
            description_eng: optional(10),
            clo: optional(11),
        });
    }

    Ok(writes)
}

pub struct SubjectService {
    repo: Repository,
}

impl SubjectService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn list(&self, query: &SubjectQuery) -> Result<Vec<Subject>> {
        self.repo.list_subjects(query).await
    }

    pub async fn get(&self, id: i32) -> Result<Subject> {
        self.repo.get_subject(id).await
    }

    pub async fn create(&self, write: &SubjectWrite) -> Result<Subject> {
        validate(write)?;
        let id = self.repo.create_subject(write).await?;
        self.repo.get_subject(id).await
    }

    /// Create a batch of subjects. Every row is validated before any insert;
    /// the first invalid row is reported by its zero-based index.
    pub async fn create_many(&self, writes: &[SubjectWrite]) -> Result<Vec<Subject>> {
        if writes.is_empty() {
            return Err(AppError::invalid_field("subjects", "batch is empty"));
        }

        for (index, write) in writes.iter().enumerate() {
            write.validate().map_err(|errors| row_error(index, errors.into()))?;
        }

        let ids = self.repo.create_subjects(writes).await?;

        let mut subjects = Vec::with_capacity(ids.len());
        for id in ids {
            subjects.push(self.repo.get_subject(id).await?);
        }
        Ok(subjects)
    }

    /// Create subjects from an uploaded `subjectfile` CSV, all or nothing
    pub async fn import_csv(&self, file: Option<UploadedFile>) -> Result<Vec<Subject>> {
        let file = file.ok_or_else(|| AppError::MissingField {
            field: "subjectfile".to_string(),
        })?;
        let writes = parse_subject_csv(&file.bytes)?;

        tracing::info!(file_name = %file.file_name, rows = writes.len(), "Importing subjects");
        self.create_many(&writes).await
    }

    pub async fn update(&self, id: i32, write: &SubjectWrite) -> Result<Subject> {
        validate(write)?;
        self.repo.update_subject(id, write).await?;
        self.repo.get_subject(id).await
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        self.repo.delete_subject(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::collections::BTreeMap;

    fn write(code: &str, thai_subject: &str) -> SubjectWrite {
        SubjectWrite {
            subject_id: code.to_string(),
            course_id: 1,
            thai_subject: thai_subject.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_batch_reports_first_invalid_row() {
        // Nothing queued: validation must fail before any statement runs
        let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = SubjectService::new(Repository::new(conn));

        let batch = vec![
            write("517101", "การเขียนโปรแกรม"),
            write("517102", ""),
            write("", "ฐานข้อมูล"),
        ];
        let err = service.create_many(&batch).await.unwrap_err();

        assert!(err.to_string().starts_with("row 1: "));
        match err {
            AppError::BatchRow { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, AppError::Validation { ref field, .. }
                    if field.as_deref() == Some("thai_subject")));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = SubjectService::new(Repository::new(conn));

        assert!(service.create_many(&[]).await.unwrap_err().is_client_error());
    }

    fn subject_row(id: i32, code: &str) -> MockRow {
        BTreeMap::from([
            ("id", id.into()),
            ("subject_id", text(code)),
            ("course_id", 1.into()),
            ("thai_course", text("วิทยาการคอมพิวเตอร์")),
            ("plan_type", null_text()),
            ("semester", null_text()),
            ("thai_subject", text("วิชา")),
            ("eng_subject", null_text()),
            ("credits", null_text()),
            ("compulsory_subject", null_text()),
            ("condition", null_text()),
            ("description_thai", null_text()),
            ("description_eng", null_text()),
            ("clo", null_text()),
        ])
    }

    const HEADER: &str = "subject_id,course_id,plan_type,semester,thai_subject,eng_subject,\
credits,compulsory_subject,condition,description_thai,description_eng,clo\n";

    #[test]
    fn test_csv_maps_columns_after_header() {
        let data = format!(
            "{}517111, 3 ,แผน ก,1,การเขียนโปรแกรม,Programming,3(2-2-5),บังคับ,,คำอธิบาย,,CLO1\n",
            HEADER
        );
        let writes = parse_subject_csv(data.as_bytes()).unwrap();

        assert_eq!(writes.len(), 1);
        let row = &writes[0];
        assert_eq!(row.subject_id, "517111");
        assert_eq!(row.course_id, 3);
        assert_eq!(row.plan_type.as_deref(), Some("แผน ก"));
        assert_eq!(row.thai_subject, "การเขียนโปรแกรม");
        assert_eq!(row.credits.as_deref(), Some("3(2-2-5)"));
        assert_eq!(row.condition, None);
        assert_eq!(row.description_thai.as_deref(), Some("คำอธิบาย"));
        assert_eq!(row.description_eng, None);
        assert_eq!(row.clo.as_deref(), Some("CLO1"));
    }

    #[test]
    fn test_csv_reports_bad_row_index() {
        let data = format!(
            "{}517111,3,,,ก,,,,,,,\n517112,three,,,ข,,,,,,,\n",
            HEADER
        );
        let err = parse_subject_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::BatchRow { index: 1, .. }));
        assert!(err.is_client_error());

        let short = format!("{}517111,3,ก\n", HEADER);
        let err = parse_subject_csv(short.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("expected 12 columns, found 3"));
    }

    #[tokio::test]
    async fn test_import_without_file_or_rows() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = SubjectService::new(Repository::new(conn));

        let missing = service.import_csv(None).await.unwrap_err();
        assert!(matches!(missing, AppError::MissingField { ref field } if field == "subjectfile"));

        let header_only = UploadedFile {
            file_name: "subjects.csv".to_string(),
            content_type: Some("text/csv".to_string()),
            bytes: HEADER.as_bytes().to_vec(),
        };
        let empty = service.import_csv(Some(header_only)).await.unwrap_err();
        assert!(matches!(empty, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_import_creates_rows_in_order() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![id_row("id", 7)], vec![id_row("id", 8)]])
            .append_query_results([vec![subject_row(7, "517111")], vec![subject_row(8, "517112")]])
            .into_connection();
        let service = SubjectService::new(Repository::new(conn));

        let file = UploadedFile {
            file_name: "subjects.csv".to_string(),
            content_type: Some("text/csv".to_string()),
            bytes: format!("{}517111,1,,,ก,,,,,,,\n517112,1,,,ข,,,,,,,\n", HEADER).into_bytes(),
        };
        let subjects = service.import_csv(Some(file)).await.unwrap();

        let codes: Vec<_> = subjects.iter().map(|s| s.subject_id.as_str()).collect();
        assert_eq!(codes, vec!["517111", "517112"]);
    }
}
