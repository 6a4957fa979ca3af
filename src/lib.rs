pub mod catalog;
pub mod config;
pub mod database;
pub mod domain;
pub mod engine;
pub mod error;
pub mod export;
pub mod http_server;
pub mod inference;
pub mod ingest;
pub mod models;
pub mod retrieval;
pub mod schema;
pub mod sql;
pub mod upload;

pub use database::DatabaseManager;
pub use engine::IngestEngine;
pub use error::ServiceError;
