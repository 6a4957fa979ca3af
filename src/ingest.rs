//! Batched insert-or-ignore ingestion into a generated table.

use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use tracing::{debug, error};

use crate::catalog::{ColumnType, ColumnTypes, Row};
use crate::database::DatabaseManager;
use crate::error::ServiceError;
use crate::sql::{insert_statement, Ident};

/// Rows per insert statement.
pub const BATCH_SIZE: usize = 100;

/// Destination for batch inserts. Returns the number of rows actually stored.
pub trait BatchSink {
    fn insert_batch(
        &self,
        sql: &str,
        binds: Vec<Option<String>>,
    ) -> impl Future<Output = Result<usize, ServiceError>> + Send;
}

impl BatchSink for DatabaseManager {
    async fn insert_batch(
        &self,
        sql: &str,
        binds: Vec<Option<String>>,
    ) -> Result<usize, ServiceError> {
        self.execute_with_text_binds(sql, binds).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub index: usize,
    pub attempted: usize,
    pub accepted: usize,
}

impl BatchOutcome {
    /// Rows dropped because their primary key already existed.
    pub fn skipped(&self) -> usize {
        self.attempted.saturating_sub(self.accepted)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub batches: Vec<BatchOutcome>,
    pub rows_submitted: usize,
    pub rows_accepted: usize,
}

/// Text form of a value as bound to the insert, or `None` for NULL.
pub fn coerce_value(value: Option<&Value>, column_type: ColumnType) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() && column_type.nulls_empty_values() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(nested) => Some(nested.to_string()),
    }
}

/// Row-major parameter list matching [`insert_statement`].
pub fn batch_binds(batch: &[Row], columns: &[Ident], types: &ColumnTypes) -> Vec<Option<String>> {
    let mut binds = Vec::with_capacity(batch.len() * columns.len());
    for row in batch {
        for column in columns {
            binds.push(coerce_value(row.get(column.name()), types.get(column.name())));
        }
    }
    binds
}

/// Writes `rows` in sequential batches of [`BATCH_SIZE`]. Earlier batches stay
/// committed when a later one fails; the error reports how many rows landed.
pub async fn ingest<S: BatchSink>(
    sink: &S,
    table: &Ident,
    columns: &[Ident],
    rows: &[Row],
    types: &ColumnTypes,
) -> Result<IngestReport, ServiceError> {
    let mut report = IngestReport {
        rows_submitted: rows.len(),
        ..Default::default()
    };

    for (index, batch) in rows.chunks(BATCH_SIZE).enumerate() {
        let sql = insert_statement(table, columns, types, batch.len());
        let binds = batch_binds(batch, columns, types);

        let accepted = match sink.insert_batch(&sql, binds).await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(
                    "Batch {} into {} failed after {} rows accepted: {}",
                    index, table, report.rows_accepted, e
                );
                return Err(ServiceError::BatchFailed {
                    batch_index: index,
                    rows_accepted: report.rows_accepted,
                    message: e.to_string(),
                });
            }
        };

        let outcome = BatchOutcome {
            index,
            attempted: batch.len(),
            accepted,
        };
        debug!(
            "Batch {} into {}: {} attempted, {} accepted, {} skipped",
            index,
            table,
            outcome.attempted,
            outcome.accepted,
            outcome.skipped()
        );

        report.rows_accepted += accepted;
        report.batches.push(outcome);
    }

    Ok(report)
}
