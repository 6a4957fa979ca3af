//! Parsing of uploaded spreadsheets into rows for column selection.
//!
//! Every cell is reported as the text it displays, with empty cells as
//! `null`, so the client decides which columns to keep before anything is
//! typed. The first row is the header.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::Timelike;
use serde_json::Value;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use tracing::info;

use crate::catalog::Row;
use crate::error::ServiceError;

/// Rows echoed back as a preview.
pub const PREVIEW_ROWS: usize = 5;

/// Maximum accepted upload size.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSheet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ParsedSheet {
    pub fn preview(&self) -> &[Row] {
        &self.rows[..self.rows.len().min(PREVIEW_ROWS)]
    }
}

pub fn parse_upload(file_name: &str, bytes: Vec<u8>) -> Result<ParsedSheet, ServiceError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let sheet = if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        parse_workbook(bytes)?
    } else {
        parse_csv(&bytes)?
    };

    if sheet.rows.is_empty() {
        return Err(ServiceError::Upload {
            message: "No data found in file".to_string(),
        });
    }

    info!(
        "Parsed {} rows and {} columns from {}",
        sheet.rows.len(),
        sheet.columns.len(),
        file_name
    );
    Ok(sheet)
}

fn parse_workbook(bytes: Vec<u8>) -> Result<ParsedSheet, ServiceError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ServiceError::Upload {
            message: "Workbook has no sheets".to_string(),
        })??;

    let mut rows = range.rows();
    let header: Vec<Option<String>> = match rows.next() {
        Some(cells) => cells.iter().map(cell_text).collect(),
        None => Vec::new(),
    };
    let columns = header_names(header);

    let rows = rows
        .map(|cells| {
            columns
                .iter()
                .zip(cells.iter().map(cell_text))
                .map(|(c, v)| (c.clone(), v.map(Value::String).unwrap_or(Value::Null)))
                .collect::<Row>()
        })
        .filter(|row| !is_blank(row))
        .collect();

    Ok(ParsedSheet { columns, rows })
}

fn parse_csv(bytes: &[u8]) -> Result<ParsedSheet, ServiceError> {
    let upload_error = |e: csv::Error| ServiceError::Upload {
        message: format!("Failed to read CSV: {}", e),
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let header = reader
        .headers()
        .map_err(upload_error)?
        .iter()
        .map(|h| (!h.is_empty()).then(|| h.to_string()))
        .collect();
    let columns = header_names(header);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(upload_error)?;
        let row: Row = columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let value = match record.get(i) {
                    Some(field) if !field.is_empty() => Value::String(field.to_string()),
                    _ => Value::Null,
                };
                (c.clone(), value)
            })
            .collect();
        if !is_blank(&row) {
            rows.push(row);
        }
    }

    Ok(ParsedSheet { columns, rows })
}

/// Displayed text of a cell; `None` for empty cells.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::DateTime(dt) => Some(
            dt.as_datetime()
                .map(|d| {
                    if d.num_seconds_from_midnight() == 0 && d.nanosecond() == 0 {
                        d.date().to_string()
                    } else {
                        d.to_string()
                    }
                })
                .unwrap_or_else(|| cell.to_string()),
        ),
        other => Some(other.to_string()),
    }
}

/// Blank headers become `__EMPTY`, repeated names get a `_<n>` suffix.
fn header_names(header: Vec<Option<String>>) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .into_iter()
        .map(|name| {
            let base = name.unwrap_or_else(|| "__EMPTY".to_string());
            let mut candidate = base.clone();
            let mut suffix = 0;
            while !seen.insert(candidate.clone()) {
                suffix += 1;
                candidate = format!("{}_{}", base, suffix);
            }
            candidate
        })
        .collect()
}

fn is_blank(row: &Row) -> bool {
    row.values().all(Value::is_null)
}
