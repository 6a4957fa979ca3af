use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};

use crate::catalog::FileEntry;
use crate::schema::file_metadata;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = file_metadata)]
#[diesel(primary_key(id))]
pub struct FileMetadata {
    pub id: i32,
    pub file_name: String,
    pub table_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub key_column: String,
    pub details: Option<serde_json::Value>,
}

#[derive(Insertable)]
#[diesel(table_name = file_metadata)]
pub struct NewFileMetadata<'a> {
    pub file_name: &'a str,
    pub table_name: &'a str,
    pub key_column: &'a str,
    pub details: Option<&'a serde_json::Value>,
}

/// One row of a generated table, serialized by `row_to_json`.
#[derive(QueryableByName, Debug)]
pub struct JsonRow {
    #[diesel(sql_type = Text)]
    pub row_json: String,
}

#[derive(QueryableByName, Debug)]
pub struct CountRow {
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}

#[derive(QueryableByName, Debug)]
pub struct ColumnNameRow {
    #[diesel(sql_type = Text)]
    pub column_name: String,
}

impl From<FileMetadata> for FileEntry {
    fn from(row: FileMetadata) -> Self {
        FileEntry {
            id: row.id,
            file_name: row.file_name,
            table_name: row.table_name,
            uploaded_at: row.uploaded_at,
            primary_key: row.key_column,
            details: row.details,
        }
    }
}
