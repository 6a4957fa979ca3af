use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::catalog::{FileEntry, Row};
use crate::error::ServiceError;
use crate::ingest::IngestReport;
use crate::upload::ParsedSheet;

const MISSING_FIELDS: &str = "Missing required fields or wrong types";

/// Validated body of a save-data request.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveDataRequest {
    pub table_name: String,
    pub columns: Vec<String>,
    pub primary_key: String,
    pub data: Vec<Row>,
    pub file_name: Option<String>,
}

fn required_string(body: &Value, field: &str) -> Result<String, ServiceError> {
    match body.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(ServiceError::validation(MISSING_FIELDS)),
    }
}

impl SaveDataRequest {
    pub fn from_json(body: Value) -> Result<Self, ServiceError> {
        let table_name = required_string(&body, "tableName")?;
        let primary_key = required_string(&body, "primaryKey")?;

        let (Some(Value::Array(columns)), Some(Value::Array(data))) =
            (body.get("columns"), body.get("data"))
        else {
            return Err(ServiceError::validation(MISSING_FIELDS));
        };

        let columns = columns
            .iter()
            .map(|c| match c {
                Value::String(s) => Ok(s.clone()),
                other => Err(ServiceError::validation(format!(
                    "Column names must be strings, got {}",
                    other
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let data = data
            .iter()
            .enumerate()
            .map(|(i, row)| match row {
                Value::Object(map) => Ok(map.clone()),
                _ => Err(ServiceError::validation(format!(
                    "Row {} is not an object",
                    i
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let file_name = match body.get("fileName") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };

        Ok(Self {
            table_name,
            columns,
            primary_key,
            data,
            file_name,
        })
    }

    /// Registry file name, defaulting to the table name.
    pub fn registered_file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(&self.table_name)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDataResponse {
    pub success: bool,
    pub rows_submitted: usize,
    pub rows_accepted: usize,
}

impl From<&IngestReport> for SaveDataResponse {
    fn from(report: &IngestReport) -> Self {
        Self {
            success: true,
            rows_submitted: report.rows_submitted,
            rows_accepted: report.rows_accepted,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub name: String,
    pub table_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub primary_key: String,
    pub details: Option<Value>,
    pub reports: Vec<Value>,
}

impl From<FileEntry> for FileSummary {
    fn from(entry: FileEntry) -> Self {
        Self {
            name: entry.file_name,
            table_name: entry.table_name,
            uploaded_at: entry.uploaded_at,
            primary_key: entry.primary_key,
            details: entry.details,
            reports: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FileList {
    pub files: Vec<FileSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub columns: Vec<String>,
    pub preview: Vec<Row>,
    pub all_data: Vec<Row>,
}

impl From<ParsedSheet> for UploadResponse {
    fn from(sheet: ParsedSheet) -> Self {
        Self {
            preview: sheet.preview().to_vec(),
            columns: sheet.columns,
            all_data: sheet.rows,
        }
    }
}
