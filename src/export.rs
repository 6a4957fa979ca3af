//! CSV and XLSX serialization of a table's rows.

use rust_xlsxwriter::Workbook;
use serde_json::{Number, Value};

use crate::catalog::{ExportFormat, Row};
use crate::error::ServiceError;

pub const SHEET_NAME: &str = "Sheet1";

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

pub fn to_csv(columns: &[String], rows: &[Row]) -> Result<Vec<u8>, ServiceError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns)?;

    for row in rows {
        writer.write_record(columns.iter().map(|c| cell_text(row.get(c))))?;
    }

    writer.into_inner().map_err(|e| ServiceError::Export {
        message: format!("Failed to flush CSV output: {}", e),
    })
}

/// The number as `f64` when that value prints back to the same decimal text.
/// Wider NUMERIC values are kept as strings so no digit is lost.
fn exact_f64(n: &Number) -> Option<f64> {
    let text = n.to_string();
    n.as_f64()
        .filter(|f| f.is_finite() && f.to_string() == text)
}

pub fn to_xlsx(columns: &[String], rows: &[Row]) -> Result<Vec<u8>, ServiceError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, name) in columns.iter().enumerate() {
        worksheet.write_string(0, col as u16, name)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let row_index = (i + 1) as u32;
        for (col, name) in columns.iter().enumerate() {
            let col = col as u16;
            match row.get(name) {
                None | Some(Value::Null) => {}
                Some(Value::Number(n)) => match exact_f64(n) {
                    Some(number) => {
                        worksheet.write_number(row_index, col, number)?;
                    }
                    None => {
                        worksheet.write_string(row_index, col, &n.to_string())?;
                    }
                },
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(row_index, col, *b)?;
                }
                Some(other) => {
                    worksheet.write_string(row_index, col, &cell_text(Some(other)))?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn serialize(
    format: ExportFormat,
    columns: &[String],
    rows: &[Row],
) -> Result<Vec<u8>, ServiceError> {
    match format {
        ExportFormat::Csv => to_csv(columns, rows),
        ExportFormat::Xlsx => to_xlsx(columns, rows),
    }
}
