use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel::sql_types::{Nullable, Text};
use diesel_async::{
    pooled_connection::{
        deadpool::{Object, Pool},
        AsyncDieselConnectionManager,
    },
    AsyncPgConnection, RunQueryDsl,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::catalog::{FileEntry, Row};
use crate::error::ServiceError;
use crate::models::*;
use crate::schema::file_metadata;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const ADD_TABLE_NAME_UNIQUE: &str =
    "ALTER TABLE file_metadata ADD CONSTRAINT file_metadata_table_name_key UNIQUE (table_name)";

/// Storage handle shared by every request. Cloning shares the pool.
#[derive(Clone)]
pub struct DatabaseManager {
    pool: Pool<AsyncPgConnection>,
    acquire_timeout: Duration,
}

impl DatabaseManager {
    /// Builds the pool without opening any connection.
    pub fn new(
        database_url: &str,
        pool_size: usize,
        acquire_timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(config)
            .max_size(pool_size)
            .build()
            .map_err(|e| ServiceError::ConfigError {
                message: format!("Failed to create database pool: {}", e),
            })?;

        Ok(Self {
            pool,
            acquire_timeout,
        })
    }

    /// Builds the pool and prepares the registry table.
    pub async fn connect(
        database_url: &str,
        pool_size: usize,
        acquire_timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let manager = Self::new(database_url, pool_size, acquire_timeout)?;
        manager.run_migrations(database_url).await?;
        manager.ensure_table_name_unique().await?;
        Ok(manager)
    }

    pub async fn run_migrations(&self, database_url: &str) -> Result<(), ServiceError> {
        use diesel::Connection;
        use diesel::PgConnection;

        // diesel_migrations only drives synchronous connections
        let database_url = database_url.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), ServiceError> {
            let mut connection =
                PgConnection::establish(&database_url).map_err(|e| ServiceError::ConfigError {
                    message: format!("Failed to establish connection for migrations: {}", e),
                })?;

            let applied = connection
                .run_pending_migrations(MIGRATIONS)
                .map_err(|e| ServiceError::ConfigError {
                    message: format!("Failed to run migrations: {}", e),
                })?;

            for version in applied {
                info!("Applied migration {}", version);
            }
            Ok(())
        })
        .await
        .map_err(|e| ServiceError::ConfigError {
            message: format!("Migration task failed: {}", e),
        })?
    }

    /// Adds the table-name uniqueness constraint, tolerating an existing one.
    pub async fn ensure_table_name_unique(&self) -> Result<(), ServiceError> {
        let mut conn = self.connection().await?;

        match diesel::sql_query(ADD_TABLE_NAME_UNIQUE)
            .execute(&mut conn)
            .await
        {
            Ok(_) => info!("Unique constraint added to file_metadata.table_name"),
            Err(diesel::result::Error::DatabaseError(_, ref err))
                if err.message().contains("already exists") =>
            {
                info!("Unique constraint already exists on file_metadata.table_name")
            }
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, err)) => {
                warn!(
                    "file_metadata holds duplicate table names, uniqueness not enforced: {}",
                    err.message()
                )
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    pub async fn connection(&self) -> Result<Object<AsyncPgConnection>, ServiceError> {
        tokio::time::timeout(self.acquire_timeout, self.pool.get())
            .await
            .map_err(|_| ServiceError::Pool {
                message: format!(
                    "Timed out after {:?} waiting for a database connection",
                    self.acquire_timeout
                ),
            })?
            .map_err(ServiceError::from)
    }

    /// Returns `true` when a new entry was written, `false` when the table
    /// name was already registered.
    pub async fn register_file(
        &self,
        file_name: &str,
        table_name: &str,
        primary_key: &str,
        details: &serde_json::Value,
    ) -> Result<bool, ServiceError> {
        let mut conn = self.connection().await?;

        let entry = NewFileMetadata {
            file_name,
            table_name,
            key_column: primary_key,
            details: Some(details),
        };

        let inserted = diesel::insert_into(file_metadata::table)
            .values(&entry)
            .on_conflict(file_metadata::table_name)
            .do_nothing()
            .execute(&mut conn)
            .await?;

        if inserted > 0 {
            info!("Registered file {} as table {}", file_name, table_name);
        } else {
            debug!("Table {} already registered, keeping existing entry", table_name);
        }

        Ok(inserted > 0)
    }

    pub async fn list_files(&self) -> Result<Vec<FileEntry>, ServiceError> {
        let mut conn = self.connection().await?;

        let rows = file_metadata::table
            .order((file_metadata::uploaded_at.desc(), file_metadata::id.desc()))
            .select(FileMetadata::as_select())
            .load(&mut conn)
            .await?;

        Ok(rows.into_iter().map(FileEntry::from).collect())
    }

    /// Most recent entry carrying this file name.
    pub async fn find_by_file_name(
        &self,
        file_name: &str,
    ) -> Result<Option<FileEntry>, ServiceError> {
        let mut conn = self.connection().await?;

        let row = file_metadata::table
            .filter(file_metadata::file_name.eq(file_name))
            .order((file_metadata::uploaded_at.desc(), file_metadata::id.desc()))
            .select(FileMetadata::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(row.map(FileEntry::from))
    }

    pub async fn find_by_table_name(
        &self,
        table_name: &str,
    ) -> Result<Option<FileEntry>, ServiceError> {
        let mut conn = self.connection().await?;

        let row = file_metadata::table
            .filter(file_metadata::table_name.eq(table_name))
            .select(FileMetadata::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(row.map(FileEntry::from))
    }

    pub async fn execute_statement(&self, sql: &str) -> Result<usize, ServiceError> {
        let mut conn = self.connection().await?;
        debug!(sql = %sql, "Executing statement");
        Ok(diesel::sql_query(sql).execute(&mut conn).await?)
    }

    /// Runs a parameterised statement with every parameter bound as
    /// nullable text; returns the number of rows affected.
    pub async fn execute_with_text_binds(
        &self,
        sql: &str,
        binds: Vec<Option<String>>,
    ) -> Result<usize, ServiceError> {
        let mut conn = self.connection().await?;

        let mut query = diesel::sql_query(sql).into_boxed::<Pg>();
        for value in binds {
            query = query.bind::<Nullable<Text>, _>(value);
        }

        Ok(query.execute(&mut conn).await?)
    }

    pub async fn load_json_rows(&self, sql: &str) -> Result<Vec<Row>, ServiceError> {
        let mut conn = self.connection().await?;
        debug!(sql = %sql, "Loading rows");

        let rows = diesel::sql_query(sql).load::<JsonRow>(&mut conn).await?;

        rows.into_iter()
            .map(|r| serde_json::from_str::<Row>(&r.row_json).map_err(ServiceError::from))
            .collect()
    }

    pub async fn count_rows(&self, sql: &str) -> Result<i64, ServiceError> {
        let mut conn = self.connection().await?;
        let row = diesel::sql_query(sql).get_result::<CountRow>(&mut conn).await?;
        Ok(row.count)
    }

    /// Column names of a table in the current schema, in definition order.
    pub async fn table_columns(&self, table_name: &str) -> Result<Vec<String>, ServiceError> {
        let mut conn = self.connection().await?;

        let rows = diesel::sql_query(crate::sql::TABLE_COLUMNS_STATEMENT)
            .bind::<Text, _>(table_name.to_string())
            .load::<ColumnNameRow>(&mut conn)
            .await?;

        Ok(rows.into_iter().map(|r| r.column_name).collect())
    }
}
