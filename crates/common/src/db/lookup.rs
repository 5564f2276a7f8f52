//! Reference lookup-or-create.
//!
//! Normalization tables (majors, degree names, career paths, PLOs,
//! academic positions) map a natural key to a surrogate id. Writers of a
//! parent row resolve each reference inside the parent's transaction:
//! look the key up, insert it when absent, use the id as a foreign key.
//! Every table carries a unique constraint over its natural key, and the
//! insert is `ON CONFLICT DO NOTHING`, so a concurrent writer that inserted
//! the same key first makes this call fall back to a second lookup.

use crate::errors::{AppError, Result};
use crate::metrics;
use sea_orm::{ConnectionTrait, DbBackend, Statement, Value};

/// A normalization table and its natural-key columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceTable {
    pub table: &'static str,
    pub id_column: &'static str,
    pub key_columns: &'static [&'static str],
}

pub const MAJORS: ReferenceTable = ReferenceTable {
    table: "majors",
    id_column: "major_id",
    key_columns: &["major"],
};

pub const DEGREE_NAMES: ReferenceTable = ReferenceTable {
    table: "degree_names",
    id_column: "degree_id",
    key_columns: &["thai_degree", "eng_degree"],
};

pub const CAREER_PATHS: ReferenceTable = ReferenceTable {
    table: "career_paths",
    id_column: "career_paths_id",
    key_columns: &["career_paths"],
};

pub const PLOS: ReferenceTable = ReferenceTable {
    table: "plos",
    id_column: "plo_id",
    key_columns: &["plo"],
};

pub const ACADEMIC_POSITIONS: ReferenceTable = ReferenceTable {
    table: "academic_position",
    id_column: "academic_position_id",
    key_columns: &["thai_academic_position", "eng_academic_position"],
};

impl ReferenceTable {
    /// `col = $n` for present values, `col IS NULL` for absent ones
    fn lookup_statement(&self, values: &[Option<&str>]) -> Statement {
        let mut params: Vec<Value> = Vec::new();
        let predicates: Vec<String> = self
            .key_columns
            .iter()
            .zip(values)
            .map(|(column, value)| match value {
                Some(v) => {
                    params.push(Value::from(v.to_string()));
                    format!("{} = ${}", column, params.len())
                }
                None => format!("{} IS NULL", column),
            })
            .collect();

        let sql = format!(
            "SELECT {} AS id FROM {} WHERE {} LIMIT 1",
            self.id_column,
            self.table,
            predicates.join(" AND ")
        );

        Statement::from_sql_and_values(DbBackend::Postgres, sql, params)
    }

    fn insert_statement(&self, values: &[Option<&str>]) -> Statement {
        let placeholders: Vec<String> = (1..=self.key_columns.len())
            .map(|i| format!("${}", i))
            .collect();
        let columns = self.key_columns.join(", ");

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO NOTHING RETURNING {} AS id",
            self.table,
            columns,
            placeholders.join(", "),
            columns,
            self.id_column
        );

        let params: Vec<Value> = values
            .iter()
            .map(|v| Value::String(v.map(|s| Box::new(s.to_string()))))
            .collect();

        Statement::from_sql_and_values(DbBackend::Postgres, sql, params)
    }
}

async fn find<C: ConnectionTrait>(
    conn: &C,
    table: &ReferenceTable,
    values: &[Option<&str>],
) -> Result<Option<i32>> {
    match conn.query_one(table.lookup_statement(values)).await? {
        Some(row) => Ok(Some(row.try_get::<i32>("", "id")?)),
        None => Ok(None),
    }
}

/// Return the id for `values` in `table`, inserting a row when absent.
///
/// `conn` is normally the caller's open transaction; any error aborts it.
pub async fn resolve_reference_id<C: ConnectionTrait>(
    conn: &C,
    table: &ReferenceTable,
    values: &[Option<&str>],
) -> Result<i32> {
    if values.len() != table.key_columns.len() {
        return Err(AppError::Internal {
            message: format!(
                "{} expects {} key values, got {}",
                table.table,
                table.key_columns.len(),
                values.len()
            ),
        });
    }

    if let Some(id) = find(conn, table, values).await? {
        return Ok(id);
    }

    if let Some(row) = conn.query_one(table.insert_statement(values)).await? {
        let id = row.try_get::<i32>("", "id")?;
        metrics::record_reference_created(table.table);
        tracing::debug!(table = table.table, id, "Reference row created");
        return Ok(id);
    }

    // Lost the insert race: the key exists now
    find(conn, table, values)
        .await?
        .ok_or_else(|| AppError::Internal {
            message: format!("{} row disappeared after conflicting insert", table.table),
        })
}

/// Resolve an optional reference. Blank values count as absent; when every
/// value is absent there is nothing to reference and no query is issued.
pub async fn resolve_optional_reference<C: ConnectionTrait>(
    conn: &C,
    table: &ReferenceTable,
    values: &[Option<&str>],
) -> Result<Option<i32>> {
    let normalized: Vec<Option<&str>> = values
        .iter()
        .map(|v| v.map(str::trim).filter(|s| !s.is_empty()))
        .collect();

    if normalized.iter().all(Option::is_none) {
        return Ok(None);
    }

    resolve_reference_id(conn, table, &normalized).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::collections::BTreeMap;

    fn id_row(id: i32) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("id", Value::from(id))])
    }

    fn no_rows() -> Vec<BTreeMap<&'static str, Value>> {
        Vec::new()
    }

    #[test]
    fn test_lookup_sql_handles_nulls() {
        let stmt = ACADEMIC_POSITIONS.lookup_statement(&[Some("ผศ."), None]);
        assert_eq!(
            stmt.sql,
            "SELECT academic_position_id AS id FROM academic_position \
             WHERE thai_academic_position = $1 AND eng_academic_position IS NULL LIMIT 1"
        );
        assert_eq!(stmt.values.unwrap().0.len(), 1);
    }

    #[test]
    fn test_insert_sql_is_conflict_aware() {
        let stmt = DEGREE_NAMES.insert_statement(&[Some("วท.บ."), Some("B.Sc.")]);
        assert_eq!(
            stmt.sql,
            "INSERT INTO degree_names (thai_degree, eng_degree) VALUES ($1, $2) \
             ON CONFLICT (thai_degree, eng_degree) DO NOTHING RETURNING degree_id AS id"
        );
    }

    #[tokio::test]
    async fn test_existing_key_returns_id_without_insert() {
        // Only the lookup result is queued; an insert attempt would fail
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![id_row(4)]])
            .into_connection();

        let id = resolve_reference_id(&conn, &MAJORS, &[Some("CS")]).await.unwrap();
        assert_eq!(id, 4);
    }

    #[tokio::test]
    async fn test_repeated_calls_are_idempotent() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![id_row(4)], vec![id_row(4)]])
            .into_connection();

        let first = resolve_reference_id(&conn, &MAJORS, &[Some("CS")]).await.unwrap();
        let second = resolve_reference_id(&conn, &MAJORS, &[Some("CS")]).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_absent_key_inserts_and_resolves_back() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([no_rows(), vec![id_row(9)], vec![id_row(9)]])
            .into_connection();

        let created = resolve_reference_id(&conn, &MAJORS, &[Some("CS")]).await.unwrap();
        assert_eq!(created, 9);

        let again = resolve_reference_id(&conn, &MAJORS, &[Some("CS")]).await.unwrap();
        assert_eq!(again, created);
    }

    #[tokio::test]
    async fn test_conflicting_insert_falls_back_to_lookup() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([no_rows(), no_rows(), vec![id_row(12)]])
            .into_connection();

        let id = resolve_reference_id(&conn, &PLOS, &[Some("PLO1")]).await.unwrap();
        assert_eq!(id, 12);
    }

    #[tokio::test]
    async fn test_wrong_arity_is_internal_error() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let err = resolve_reference_id(&conn, &DEGREE_NAMES, &[Some("B.Sc.")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_optional_reference_skips_blank_values() {
        // No results queued: any query would error
        let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let id = resolve_optional_reference(&conn, &ACADEMIC_POSITIONS, &[Some("  "), None])
            .await
            .unwrap();
        assert!(id.is_none());
    }

    #[tokio::test]
    async fn test_optional_reference_resolves_partial_key() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![id_row(2)]])
            .into_connection();
        let id = resolve_optional_reference(&conn, &ACADEMIC_POSITIONS, &[None, Some("Lecturer")])
            .await
            .unwrap();
        assert_eq!(id, Some(2));
    }

    #[tokio::test]
    async fn test_database_error_propagates() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([sea_orm::DbErr::Custom("connection reset".into())])
            .into_connection();
        let err = resolve_reference_id(&conn, &CAREER_PATHS, &[Some("Engineer")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
