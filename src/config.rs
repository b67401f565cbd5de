use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
    /// Server-side statement_timeout and client-side deadline per store call.
    pub statement_timeout_ms: u64,
}

impl DbConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub backend: StorageBackend,
    pub db: DbConfig,
    /// Lets update_fields target soft-deleted rows.
    pub update_deleted_rows: bool,
    pub host: String,
    pub port: u16,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key}={v:?}: {e}")),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = match std::env::var("STORAGE_BACKEND").as_deref() {
            Ok("memory") => StorageBackend::Memory,
            Ok("postgres") | Err(_) => StorageBackend::Postgres,
            Ok(other) => anyhow::bail!("unknown STORAGE_BACKEND {other:?}"),
        };
        let url = match backend {
            StorageBackend::Postgres => {
                std::env::var("DATABASE_URL").context("DATABASE_URL is required for postgres")?
            }
            StorageBackend::Memory => String::new(),
        };
        let db = DbConfig {
            url,
            max_connections: env_or("DB_MAX_CONNECTIONS", 10)?,
            acquire_timeout_ms: env_or("DB_ACQUIRE_TIMEOUT_MS", 3_000)?,
            statement_timeout_ms: env_or("DB_STATEMENT_TIMEOUT_MS", 5_000)?,
        };
        Ok(Self {
            backend,
            db,
            update_deleted_rows: env_or("UPDATE_DELETED_ROWS", false)?,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080)?,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            db: DbConfig {
                url: String::new(),
                max_connections: 10,
                acquire_timeout_ms: 3_000,
                statement_timeout_ms: 5_000,
            },
            update_deleted_rows: false,
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}
