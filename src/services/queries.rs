//! Parameterized query helpers over the database pool.
//!
//! Rows come back as column-name → JSON value maps so callers need no
//! compile-time row types. Engine errors are surfaced as-is, never
//! classified here.

use serde_json::{Map, Number, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row, TypeInfo};

use crate::error::{Result, ServerError};
use crate::services::AppState;

/// One positional statement parameter.
#[derive(Debug, Clone)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(Value),
}

impl From<bool> for SqlParam {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for SqlParam {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for SqlParam {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Value> for SqlParam {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Thin query facade borrowed from [`AppState`] per call.
pub struct Queries<'a> {
    state: &'a AppState,
}

impl<'a> Queries<'a> {
    pub(crate) fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Run a mutating statement (INSERT, UPDATE, DELETE) and return the
    /// engine's affected-row count.
    pub async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        let pool = self.state.db().await?;
        let result = bind_params(sqlx::query(sql), params).execute(&pool).await?;
        Ok(result.rows_affected())
    }

    /// First matching row, or `None` when the query matches nothing.
    pub async fn fetch_one(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Option<Map<String, Value>>> {
        let pool = self.state.db().await?;
        let row = bind_params(sqlx::query(sql), params)
            .fetch_optional(&pool)
            .await?;
        row.as_ref().map(row_to_map).transpose()
    }

    /// Every matching row, in result-set order.
    pub async fn fetch_all(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Map<String, Value>>> {
        let pool = self.state.db().await?;
        let rows = bind_params(sqlx::query(sql), params).fetch_all(&pool).await?;
        rows.iter().map(row_to_map).collect()
    }

    /// One column value from the first row, or `None` when no rows match.
    pub async fn fetch_scalar(
        &self,
        sql: &str,
        params: &[SqlParam],
        column_index: usize,
    ) -> Result<Option<Value>> {
        let pool = self.state.db().await?;
        let row = bind_params(sqlx::query(sql), params)
            .fetch_optional(&pool)
            .await?;
        row.as_ref()
            .map(|row| column_to_value(row, column_index))
            .transpose()
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Null => query.bind(Option::<String>::None),
            SqlParam::Bool(v) => query.bind(*v),
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.as_str()),
            SqlParam::Json(v) => query.bind(v),
        };
    }
    query
}

fn row_to_map(row: &PgRow) -> Result<Map<String, Value>> {
    let mut record = Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        record.insert(column.name().to_string(), column_to_value(row, index)?);
    }
    Ok(record)
}

/// Decode one column to JSON by its Postgres type name. Unknown types are
/// read as text; a type the driver cannot decode surfaces the engine error.
fn column_to_value(row: &PgRow, index: usize) -> Result<Value> {
    let column = row.columns().get(index).ok_or_else(|| {
        ServerError::Internal(format!("column index {index} out of range"))
    })?;

    let value = match column.type_info().name() {
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::Bool),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)?
            .map(|v| Value::Number(v.into())),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)?
            .map(|v| Value::Number(v.into())),
        "INT8" => row
            .try_get::<Option<i64>, _>(index)?
            .map(|v| Value::Number(v.into())),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)?
            .and_then(|v| Number::from_f64(v.into()))
            .map(Value::Number),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(index)?
            .and_then(Number::from_f64)
            .map(Value::Number),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(index)?
            .map(|v| Value::String(v.to_string())),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(index)?,
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)?
            .map(|v| Value::String(v.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)?
            .map(|v| Value::String(v.to_string())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)?
            .map(|v| Value::String(v.to_string())),
        _ => row.try_get::<Option<String>, _>(index)?.map(Value::String),
    };

    Ok(value.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_convert_from_native_types() {
        assert!(matches!(SqlParam::from(true), SqlParam::Bool(true)));
        assert!(matches!(SqlParam::from(42i32), SqlParam::Int(42)));
        assert!(matches!(SqlParam::from(42i64), SqlParam::Int(42)));
        assert!(matches!(SqlParam::from(1.5f64), SqlParam::Float(_)));
        assert!(matches!(SqlParam::from("name"), SqlParam::Text(_)));
        assert!(matches!(
            SqlParam::from(json!({"city": "Lima"})),
            SqlParam::Json(_)
        ));
    }

    #[test]
    fn text_param_keeps_its_content() {
        match SqlParam::from("software engineer") {
            SqlParam::Text(text) => assert_eq!(text, "software engineer"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
