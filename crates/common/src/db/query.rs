//! Filtered list queries.
//!
//! Filters become `AND`-joined predicates with positional parameters in the
//! order the caller appends them; values are never interpolated. Sort
//! columns come from a per-entity allow-list and the direction is
//! normalized to `ASC` or `DESC`.

use crate::errors::{AppError, Result};
use sea_orm::{DbBackend, Statement, Value};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Query-string field where a blank value (`?limit=`) means absent
pub fn empty_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map(Some).map_err(de::Error::custom),
        _ => Ok(None),
    }
}

/// Escape LIKE wildcards so the term matches literally under `ESCAPE '\'`
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Case-insensitive parse; anything other than asc/desc yields `default`
    pub fn normalize(input: Option<&str>, default: SortOrder) -> SortOrder {
        match input.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
            Some("ASC") => SortOrder::Asc,
            Some("DESC") => SortOrder::Desc,
            _ => default,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Sortable columns of one entity: `(request name, qualified column)`
#[derive(Debug, Clone, Copy)]
pub struct SortSpec {
    pub columns: &'static [(&'static str, &'static str)],
    pub default_column: &'static str,
    pub default_order: SortOrder,
}

impl SortSpec {
    /// Resolve the requested sort into a qualified column and direction.
    ///
    /// An empty sort selects the default column. A name outside the
    /// allow-list is rejected.
    pub fn resolve(&self, sort: Option<&str>, order: Option<&str>) -> Result<(&'static str, SortOrder)> {
        let name = sort
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.default_column);

        let column = self
            .columns
            .iter()
            .find(|(param, _)| *param == name)
            .map(|(_, column)| *column)
            .ok_or_else(|| AppError::Validation {
                message: format!(
                    "cannot sort by '{}'; expected one of: {}",
                    name,
                    self.columns.iter().map(|(p, _)| *p).collect::<Vec<_>>().join(", ")
                ),
                field: Some("sort".to_string()),
            })?;

        Ok((column, SortOrder::normalize(order, self.default_order)))
    }
}

/// Builder for `base [WHERE ...] [ORDER BY ...] [LIMIT n]`
#[derive(Debug, Clone)]
pub struct FilteredQuery {
    base: String,
    conditions: Vec<String>,
    values: Vec<Value>,
    order: Vec<String>,
    limit: Option<u64>,
}

impl FilteredQuery {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            conditions: Vec::new(),
            values: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    fn bind(&mut self, value: Value) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    /// `column = $n`
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        let placeholder = self.bind(value.into());
        self.conditions.push(format!("{} = {}", column, placeholder));
        self
    }

    /// `column = $n` when a value is present
    pub fn eq_opt<V: Into<Value>>(self, column: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    /// Case-insensitive substring match over one or more columns, sharing a
    /// single parameter. Blank terms add nothing; `%`, `_` and `\` in the
    /// term match literally.
    pub fn contains(mut self, columns: &[&str], term: Option<&str>) -> Self {
        let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        if columns.is_empty() {
            return self;
        }

        let placeholder = self.bind(Value::from(escape_like(term)));
        let alternatives: Vec<String> = columns
            .iter()
            .map(|c| format!("{} ILIKE '%' || {} || '%' ESCAPE '\\'", c, placeholder))
            .collect();

        let condition = match alternatives.len() {
            1 => alternatives.join(""),
            _ => format!("({})", alternatives.join(" OR ")),
        };
        self.conditions.push(condition);
        self
    }

    /// Append a sort key; call repeatedly for tie-breakers
    pub fn order_by(mut self, column: &str, order: SortOrder) -> Self {
        self.order.push(format!("{} {}", column, order.as_sql()));
        self
    }

    /// Literal row cap; non-positive or absent means unbounded
    pub fn limit(mut self, limit: Option<i64>) -> Self {
        self.limit = limit.filter(|l| *l > 0).map(|l| l as u64);
        self
    }

    pub fn sql(&self) -> String {
        let mut sql = self.base.trim_end().to_string();

        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }

        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }

    pub fn build(self) -> Statement {
        let sql = self.sql();
        Statement::from_sql_and_values(DbBackend::Postgres, sql, self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALENDAR: SortSpec = SortSpec {
        columns: &[
            ("calendar_id", "calendar_id"),
            ("start_date", "start_date"),
            ("title", "title"),
        ],
        default_column: "start_date",
        default_order: SortOrder::Asc,
    };

    #[test]
    fn test_order_normalization() {
        assert_eq!(SortOrder::normalize(Some("asc"), SortOrder::Desc), SortOrder::Asc);
        assert_eq!(SortOrder::normalize(Some("DeSc"), SortOrder::Asc), SortOrder::Desc);
        assert_eq!(SortOrder::normalize(Some("bogus"), SortOrder::Asc), SortOrder::Asc);
        assert_eq!(SortOrder::normalize(Some(""), SortOrder::Desc), SortOrder::Desc);
        assert_eq!(SortOrder::normalize(None, SortOrder::Desc), SortOrder::Desc);
    }

    #[test]
    fn test_empty_sort_and_bogus_order_use_defaults() {
        let (column, order) = CALENDAR.resolve(Some(""), Some("bogus")).unwrap();
        assert_eq!(column, "start_date");
        assert_eq!(order, SortOrder::Asc);
    }

    #[test]
    fn test_unknown_sort_column_rejected() {
        let err = CALENDAR
            .resolve(Some("title; DROP TABLE calendar_events"), None)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_no_filters_omits_where() {
        let sql = FilteredQuery::new("SELECT * FROM courses c")
            .eq_opt::<String>("c.degree", None)
            .contains(&["c.thai_course"], Some("   "))
            .order_by("c.year", SortOrder::Desc)
            .sql();
        assert_eq!(sql, "SELECT * FROM courses c ORDER BY c.year DESC");
    }

    #[test]
    fn test_filters_bind_in_append_order() {
        let query = FilteredQuery::new("SELECT * FROM subjects s")
            .eq_opt("s.subject_id", Some("517111".to_string()))
            .eq_opt("s.course_id", Some(3))
            .eq_opt::<String>("s.plan_type", None)
            .eq_opt("s.semester", Some("1".to_string()))
            .order_by("s.id", SortOrder::Asc)
            .limit(Some(10));

        assert_eq!(
            query.sql(),
            "SELECT * FROM subjects s WHERE s.subject_id = $1 AND s.course_id = $2 \
             AND s.semester = $3 ORDER BY s.id ASC LIMIT 10"
        );

        let stmt = query.build();
        let values = stmt.values.unwrap().0;
        assert_eq!(values.len(), 3);
        assert_eq!(values[1], Value::from(3));
    }

    #[test]
    fn test_search_shares_one_parameter() {
        let sql = FilteredQuery::new("SELECT * FROM news n")
            .eq("n.type_id", 2)
            .contains(&["n.title", "n.content"], Some("open house"))
            .sql();
        assert_eq!(
            sql,
            "SELECT * FROM news n WHERE n.type_id = $1 AND \
             (n.title ILIKE '%' || $2 || '%' ESCAPE '\\' OR n.content ILIKE '%' || $2 || '%' ESCAPE '\\')"
        );
    }

    #[test]
    fn test_search_wildcards_match_literally() {
        let stmt = FilteredQuery::new("SELECT * FROM subjects s")
            .contains(&["s.thai_subject"], Some(" 100%_off\\x "))
            .build();
        let values = stmt.values.unwrap().0;
        assert_eq!(values[0], Value::from("100\\%\\_off\\\\x".to_string()));
    }

    #[derive(Debug, Deserialize)]
    struct Params {
        #[serde(default, deserialize_with = "empty_as_none")]
        limit: Option<i64>,
        #[serde(default, deserialize_with = "empty_as_none")]
        course_id: Option<i32>,
    }

    #[test]
    fn test_blank_numeric_params_are_absent() {
        let params: Params = serde_json::from_value(serde_json::json!({"limit": "", "course_id": " 7 "})).unwrap();
        assert_eq!(params.limit, None);
        assert_eq!(params.course_id, Some(7));

        let missing: Params = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(missing.limit, None);

        let bad = serde_json::from_value::<Params>(serde_json::json!({"limit": "ten"}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_non_positive_limit_is_unbounded() {
        let zero = FilteredQuery::new("SELECT 1").limit(Some(0)).sql();
        let negative = FilteredQuery::new("SELECT 1").limit(Some(-5)).sql();
        assert_eq!(zero, "SELECT 1");
        assert_eq!(negative, "SELECT 1");
    }

    #[test]
    fn test_tie_breaker_order() {
        let sql = FilteredQuery::new("SELECT 1")
            .order_by("n.created_at", SortOrder::Desc)
            .order_by("ni.image_id", SortOrder::Asc)
            .sql();
        assert_eq!(sql, "SELECT 1 ORDER BY n.created_at DESC, ni.image_id ASC");
    }
}
