use std::time::Instant;
use tracing::info;

use crate::catalog::{ExportFormat, FileDetails, FileEntry};
use crate::database::DatabaseManager;
use crate::domain::SaveDataRequest;
use crate::error::ServiceError;
use crate::inference::infer_types;
use crate::ingest::{ingest, IngestReport};
use crate::retrieval::{self, Preview};
use crate::sql::{create_table_statement, Ident};

/// A serialized table ready to be sent as an attachment.
#[derive(Debug)]
pub struct ExportedFile {
    pub attachment_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

pub struct IngestEngine {
    database: DatabaseManager,
}

impl IngestEngine {
    pub fn new(database: DatabaseManager) -> Self {
        Self { database }
    }

    /// Infers column types, creates the table if absent, registers the file
    /// and writes the rows. `client` is only used for logging.
    pub async fn save_data(
        &self,
        request: &SaveDataRequest,
        client: Option<&str>,
    ) -> Result<IngestReport, ServiceError> {
        let table = Ident::new(&request.table_name)?;
        let columns = Ident::parse_all(&request.columns)?;
        let primary_key = Ident::new(&request.primary_key)?;

        let types = infer_types(&request.data, &request.columns);
        let create_sql = create_table_statement(&table, &columns, &types, &primary_key);

        self.database
            .execute_statement(&create_sql)
            .await
            .map_err(|e| match e {
                ServiceError::Database(err) => ServiceError::SchemaConflict {
                    table_name: request.table_name.clone(),
                    message: err.to_string(),
                },
                other => other,
            })?;
        info!("Table {} ensured", table);

        let details = serde_json::to_value(FileDetails {
            columns: request.columns.clone(),
        })?;
        self.database
            .register_file(
                request.registered_file_name(),
                table.name(),
                primary_key.name(),
                &details,
            )
            .await?;

        let start = Instant::now();
        let report = ingest(&self.database, &table, &columns, &request.data, &types).await?;

        if !request.data.is_empty() {
            info!(
                rows = report.rows_submitted,
                accepted = report.rows_accepted,
                table = %table.name(),
                client = client.unwrap_or("unknown"),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Inserted rows"
            );
        }

        Ok(report)
    }

    pub async fn list_files(&self) -> Result<Vec<FileEntry>, ServiceError> {
        self.database.list_files().await
    }

    pub async fn preview(&self, table_name: &str) -> Result<Preview, ServiceError> {
        let table = Ident::new(table_name)?;
        self.database
            .find_by_table_name(table.name())
            .await?
            .ok_or_else(|| ServiceError::TableNotFound {
                table_name: table_name.to_string(),
            })?;

        retrieval::preview(&self.database, &table).await
    }

    pub async fn export(
        &self,
        file_name: &str,
        format: ExportFormat,
    ) -> Result<ExportedFile, ServiceError> {
        let entry = self
            .database
            .find_by_file_name(file_name)
            .await?
            .ok_or_else(|| ServiceError::FileNotFound {
                file_name: file_name.to_string(),
            })?;
        let table = Ident::new(&entry.table_name)?;

        let bytes = retrieval::export_all(&self.database, &table, format).await?;

        Ok(ExportedFile {
            attachment_name: format!("{}.{}", file_name, format),
            format,
            bytes,
        })
    }

    pub async fn health_check(&self) -> Result<(), ServiceError> {
        self.database.execute_statement("SELECT 1").await?;
        Ok(())
    }
}
