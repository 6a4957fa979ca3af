//! SQL text for dynamically named tables.
//!
//! User-supplied table and column names only ever reach a statement through
//! [`Ident`], which renders them as quoted PostgreSQL identifiers.

use std::fmt;

use crate::catalog::{ColumnType, ColumnTypes};
use crate::error::ServiceError;

/// PostgreSQL truncates identifiers beyond `NAMEDATALEN - 1` bytes.
pub const MAX_IDENTIFIER_BYTES: usize = 63;

/// A validated identifier, displayed in quoted form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident(String);

impl Ident {
    pub fn new(name: &str) -> Result<Self, ServiceError> {
        if name.is_empty() {
            return Err(ServiceError::validation("Identifier must not be empty"));
        }
        if name.contains('\0') {
            return Err(ServiceError::validation(format!(
                "Identifier {:?} contains a NUL character",
                name
            )));
        }
        if name.len() > MAX_IDENTIFIER_BYTES {
            return Err(ServiceError::validation(format!(
                "Identifier \"{}\" exceeds {} bytes",
                name, MAX_IDENTIFIER_BYTES
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn parse_all(names: &[String]) -> Result<Vec<Self>, ServiceError> {
        names.iter().map(|name| Self::new(name)).collect()
    }

    /// Unquoted name as stored in the catalog.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.replace('"', "\"\""))
    }
}

fn column_list(columns: &[Ident]) -> String {
    columns
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn create_table_statement(
    table: &Ident,
    columns: &[Ident],
    types: &ColumnTypes,
    primary_key: &Ident,
) -> String {
    let column_defs = columns
        .iter()
        .map(|c| format!("{} {}", c, types.get(c.name()).as_sql()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({}))",
        table, column_defs, primary_key
    )
}

fn placeholder(index: usize, column_type: ColumnType) -> String {
    match column_type {
        ColumnType::Text => format!("${}", index),
        typed => format!("CAST(${} AS {})", index, typed.as_sql()),
    }
}

/// Multi-row insert that skips rows conflicting on the primary key.
/// Parameters are numbered row-major, `columns.len()` per row.
pub fn insert_statement(
    table: &Ident,
    columns: &[Ident],
    types: &ColumnTypes,
    row_count: usize,
) -> String {
    let width = columns.len();
    let tuples = (0..row_count)
        .map(|row| {
            let values = columns
                .iter()
                .enumerate()
                .map(|(i, c)| placeholder(row * width + i + 1, types.get(c.name())))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", values)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES {} ON CONFLICT DO NOTHING",
        table,
        column_list(columns),
        tuples
    )
}

/// Rows as JSON text in storage order.
pub fn select_rows_statement(table: &Ident, limit: Option<usize>) -> String {
    let mut sql = format!("SELECT row_to_json(t)::text AS row_json FROM {} AS t", table);
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    sql
}

pub fn count_statement(table: &Ident) -> String {
    format!("SELECT COUNT(*) AS count FROM {}", table)
}

/// Column names of a table in definition order; binds the unquoted name as `$1`.
pub const TABLE_COLUMNS_STATEMENT: &str = "SELECT column_name::text AS column_name \
     FROM information_schema.columns \
     WHERE table_schema = current_schema() AND table_name = $1 \
     ORDER BY ordinal_position";
