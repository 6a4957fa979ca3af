use std::time::Duration;

use crate::error::ServiceError;
use crate::upload::MAX_UPLOAD_BYTES;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pool_size: usize,
    pub pool_timeout: Duration,
    pub max_body_bytes: usize,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| ServiceError::ConfigError {
            message: "DATABASE_URL environment variable is required".to_string(),
        })?;

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 4000)?,
            pool_size: parse_or(&lookup, "DB_POOL_SIZE", 10)?,
            pool_timeout: Duration::from_secs(parse_or(&lookup, "DB_POOL_TIMEOUT_SECS", 30)?),
            max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", MAX_UPLOAD_BYTES)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Database URL with any password replaced, for logging.
    pub fn redacted_database_url(&self) -> String {
        let url = &self.database_url;
        let (Some(scheme_end), Some(at)) = (url.find("://"), url.rfind('@')) else {
            return url.clone();
        };
        let credentials_start = scheme_end + 3;
        if at <= credentials_start {
            return url.clone();
        }
        match url[credentials_start..at].find(':') {
            Some(colon) => format!(
                "{}***{}",
                &url[..credentials_start + colon + 1],
                &url[at..]
            ),
            None => url.clone(),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ServiceError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.parse().map_err(|e| ServiceError::ConfigError {
            message: format!("Invalid {} '{}': {}", key, raw, e),
        }),
        None => Ok(default),
    }
}
