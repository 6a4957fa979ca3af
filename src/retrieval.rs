use serde::Serialize;
use tracing::info;

use crate::catalog::{ExportFormat, Row};
use crate::database::DatabaseManager;
use crate::error::ServiceError;
use crate::export;
use crate::sql::{count_statement, select_rows_statement, Ident};

/// Rows returned by a preview.
pub const PREVIEW_ROWS: usize = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub preview: Vec<Row>,
    pub row_count: i64,
    pub col_count: usize,
}

/// Sample, count and column probe are separate reads and may observe
/// different states under concurrent ingestion.
pub async fn preview(database: &DatabaseManager, table: &Ident) -> Result<Preview, ServiceError> {
    let rows = database
        .load_json_rows(&select_rows_statement(table, Some(PREVIEW_ROWS)))
        .await?;
    let row_count = database.count_rows(&count_statement(table)).await?;
    let probe = database
        .load_json_rows(&select_rows_statement(table, Some(1)))
        .await?;
    let col_count = probe.first().map(|row| row.len()).unwrap_or(0);

    info!(
        "Preview of {}: {} rows sampled, {} total, {} columns",
        table,
        rows.len(),
        row_count,
        col_count
    );

    Ok(Preview {
        preview: rows,
        row_count,
        col_count,
    })
}

/// Every row of the table in storage order, serialized to `format`.
pub async fn export_all(
    database: &DatabaseManager,
    table: &Ident,
    format: ExportFormat,
) -> Result<Vec<u8>, ServiceError> {
    let rows = database
        .load_json_rows(&select_rows_statement(table, None))
        .await?;

    let mut columns = database.table_columns(table.name()).await?;
    if columns.is_empty() {
        columns = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
    }

    info!("Exporting {} rows of {} as {}", rows.len(), table, format);
    export::serialize(format, &columns, &rows)
}
