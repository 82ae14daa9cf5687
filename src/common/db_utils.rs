// src/common/db_utils.rs
//
// Helpers para escribir contra un esquema que puede estar "atrasado":
// antes de tocar una columna se consulta si existe.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{query::Query, sqlite::SqliteArguments, Executor, Sqlite, SqliteConnection};

use crate::common::error::AppError;

/// Formato de timestamp usado en todas las columnas TEXT de fechas.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("regex de identificador"));

/// Valida un nombre de tabla/columna que se va a interpolar en SQL.
pub fn ensure_ident(name: &str) -> Result<&str, AppError> {
    if IDENT_RE.is_match(name) {
        Ok(name)
    } else {
        Err(AppError::InvalidIdentifier(name.to_string()))
    }
}

/// Valida una lista "a, b" de columnas (índices compuestos).
pub fn ensure_ident_list(columns: &str) -> Result<String, AppError> {
    let parts = columns
        .split(',')
        .map(|c| ensure_ident(c.trim()).map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(", "))
}

/// Valor dinámico para INSERT/UPDATE con columnas filtradas.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
}

impl SqlValue {
    pub fn bind_to<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            SqlValue::Null => query.bind(Option::<String>::None),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Integer(i) => query.bind(*i),
            SqlValue::Real(f) => query.bind(*f),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        value.map(SqlValue::Text).unwrap_or(SqlValue::Null)
    }
}

impl From<Option<&str>> for SqlValue {
    fn from(value: Option<&str>) -> Self {
        value.map(SqlValue::from).unwrap_or(SqlValue::Null)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(value: Option<i64>) -> Self {
        value.map(SqlValue::Integer).unwrap_or(SqlValue::Null)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Integer(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<Option<f64>> for SqlValue {
    fn from(value: Option<f64>) -> Self {
        value.map(SqlValue::Real).unwrap_or(SqlValue::Null)
    }
}

/// Columnas actuales de `table` (vacío si la tabla no existe).
pub async fn table_columns<'e, E>(executor: E, table: &str) -> Result<HashSet<String>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let names = sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?1)")
        .bind(table)
        .fetch_all(executor)
        .await?;
    Ok(names.into_iter().collect())
}

pub async fn has_column<'e, E>(executor: E, table: &str, column: &str) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    Ok(table_columns(executor, table).await?.contains(column))
}

fn filter_fields<'a>(
    columns: &HashSet<String>,
    fields: &'a [(&'a str, SqlValue)],
) -> Vec<&'a (&'a str, SqlValue)> {
    fields.iter().filter(|(name, _)| columns.contains(*name)).collect()
}

/// INSERT escribiendo solo las columnas que existen. Devuelve el rowid nuevo,
/// o `None` si ninguna columna coincide.
pub async fn insert_filtered(
    conn: &mut SqliteConnection,
    table: &str,
    fields: &[(&str, SqlValue)],
) -> Result<Option<i64>, AppError> {
    let table = ensure_ident(table)?;
    let columns = table_columns(&mut *conn, table).await?;
    let present = filter_fields(&columns, fields);
    if present.is_empty() {
        return Ok(None);
    }

    let names = present.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", ");
    let placeholders = vec!["?"; present.len()].join(", ");
    let sql = format!("INSERT INTO {} ({}) VALUES ({})", table, names, placeholders);

    let mut query = sqlx::query(&sql);
    for (_, value) in &present {
        query = value.bind_to(query);
    }
    let result = query.execute(&mut *conn).await?;

    Ok(Some(result.last_insert_rowid()))
}

/// UPDATE por `id` escribiendo solo las columnas que existen.
pub async fn update_filtered(
    conn: &mut SqliteConnection,
    table: &str,
    fields: &[(&str, SqlValue)],
    id: i64,
) -> Result<u64, AppError> {
    let table = ensure_ident(table)?;
    let columns = table_columns(&mut *conn, table).await?;
    let present = filter_fields(&columns, fields);
    if present.is_empty() {
        return Ok(0);
    }

    let sets = present.iter().map(|(n, _)| format!("{} = ?", n)).collect::<Vec<_>>().join(", ");
    let sql = format!("UPDATE {} SET {} WHERE id = ?", table, sets);

    let mut query = sqlx::query(&sql);
    for (_, value) in &present {
        query = value.bind_to(query);
    }
    let result = query.bind(id).execute(&mut *conn).await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_reject_injection() {
        assert!(ensure_ident("clientes").is_ok());
        assert!(ensure_ident("pos_updated_at").is_ok());
        assert!(ensure_ident("clientes; DROP TABLE usuarios").is_err());
        assert!(ensure_ident("1abc").is_err());
        assert!(ensure_ident("").is_err());
    }

    #[test]
    fn identifier_lists_are_normalized() {
        assert_eq!(ensure_ident_list("tecnico_id,ts").unwrap(), "tecnico_id, ts");
        assert!(ensure_ident_list("tecnico_id, ts)").is_err());
    }

    #[test]
    fn optional_values_become_null() {
        assert_eq!(SqlValue::from(None::<String>), SqlValue::Null);
        assert_eq!(SqlValue::from(true), SqlValue::Integer(1));
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".into()));
    }
}
