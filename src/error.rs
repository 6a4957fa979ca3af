use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{message}")]
    Validation { message: String },

    #[error("Invalid format: {format}")]
    UnsupportedFormat { format: String },

    #[error("File not found: {file_name}")]
    FileNotFound { file_name: String },

    #[error("Table not found: {table_name}")]
    TableNotFound { table_name: String },

    #[error("Failed to create table \"{table_name}\": {message}")]
    SchemaConflict { table_name: String, message: String },

    #[error("Batch {batch_index} failed after {rows_accepted} rows were accepted: {message}")]
    BatchFailed {
        batch_index: usize,
        rows_accepted: usize,
        message: String,
    },

    #[error("Upload error: {message}")]
    Upload { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {message}")]
    Pool { message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation { .. }
            | ServiceError::UnsupportedFormat { .. }
            | ServiceError::Upload { .. } => StatusCode::BAD_REQUEST,
            ServiceError::FileNotFound { .. } | ServiceError::TableNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<diesel_async::pooled_connection::deadpool::PoolError> for ServiceError {
    fn from(err: diesel_async::pooled_connection::deadpool::PoolError) -> Self {
        ServiceError::Pool {
            message: format!("Failed to get database connection: {}", err),
        }
    }
}

impl From<csv::Error> for ServiceError {
    fn from(err: csv::Error) -> Self {
        ServiceError::Export {
            message: format!("CSV error: {}", err),
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for ServiceError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ServiceError::Export {
            message: format!("XLSX error: {}", err),
        }
    }
}

impl From<calamine::Error> for ServiceError {
    fn from(err: calamine::Error) -> Self {
        ServiceError::Upload {
            message: format!("Failed to read workbook: {}", err),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body = match &self {
            ServiceError::BatchFailed {
                batch_index,
                rows_accepted,
                ..
            } => serde_json::json!({
                "error": self.to_string(),
                "failedBatch": batch_index,
                "rowsAccepted": rows_accepted,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
