//! Column type inference over a fixed-size prefix of the uploaded rows.
//!
//! The policy is deliberately simple and must stay stable, since tables
//! created from earlier uploads were typed by it: look at no more than
//! [`SAMPLE_ROWS`] rows per column and let the first number or boolean seen
//! decide the type. Anything else leaves the column as TEXT.

use serde_json::Value;
use tracing::debug;

use crate::catalog::{ColumnType, ColumnTypes, Row};

/// Number of leading rows inspected per column.
pub const SAMPLE_ROWS: usize = 10;

/// Classify a single value. `None` means the value carries no type signal.
fn type_signal(value: Option<&Value>) -> Option<ColumnType> {
    match value? {
        Value::Number(_) => Some(ColumnType::Numeric),
        Value::Bool(_) => Some(ColumnType::Boolean),
        _ => None,
    }
}

/// Infer one type per column from the first [`SAMPLE_ROWS`] rows.
pub fn infer_types(rows: &[Row], columns: &[String]) -> ColumnTypes {
    let sample = &rows[..rows.len().min(SAMPLE_ROWS)];
    let mut types = ColumnTypes::default();

    for column in columns {
        let column_type = sample
            .iter()
            .find_map(|row| type_signal(row.get(column)))
            .unwrap_or(ColumnType::Text);

        debug!(column = %column, column_type = %column_type, "Inferred column type");
        types.push(column.clone(), column_type);
    }

    types
}
