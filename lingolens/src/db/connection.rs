use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

pub struct Database {
    pub(crate) db: Arc<libsql::Database>,
    pub(crate) busy_timeout_ms: u64,
    is_remote: bool,
}

impl Database {
    pub async fn new(config: &DatabaseConfig, embedding_dims: usize) -> Result<Self> {
        let busy_timeout_ms = std::env::var("DATABASE_BUSY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5000);

        let is_remote =
            config.url.starts_with("libsql://") || config.url.starts_with("https://");

        let db = if is_remote {
            if let Some(ref local_path) = config.local_path {
                Builder::new_remote_replica(
                    local_path,
                    config.url.clone(),
                    config.auth_token.clone().unwrap_or_default(),
                )
                .build()
                .await?
            } else {
                Builder::new_remote(
                    config.url.clone(),
                    config.auth_token.clone().unwrap_or_default(),
                )
                .build()
                .await?
            }
        } else if config.url == ":memory:" {
            Builder::new_local(":memory:").build().await?
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            Builder::new_local(path).build().await?
        };

        let database = Self {
            db: Arc::new(db),
            busy_timeout_ms,
            is_remote,
        };
        database.configure_database().await?;
        database.init_schema(embedding_dims).await?;

        Ok(database)
    }

    pub fn connect(&self) -> Result<Connection> {
        Ok(self.db.connect()?)
    }

    async fn configure_database(&self) -> Result<()> {
        let conn = self.connect()?;

        let busy_timeout_sql = format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms);
        if let Err(error) = conn.execute_batch(&busy_timeout_sql).await {
            tracing::warn!(
                busy_timeout_ms = self.busy_timeout_ms,
                error = %error,
                "Failed to set SQLite busy_timeout"
            );
        }

        if let Err(error) = conn.execute_batch("PRAGMA journal_mode = WAL").await {
            tracing::warn!(error = %error, "Failed to set SQLite journal_mode");
        }

        Ok(())
    }

    async fn init_schema(&self, embedding_dims: usize) -> Result<()> {
        let conn = self.connect()?;
        schema::init_schema(&conn, embedding_dims).await?;
        Ok(())
    }

    /// No-op for local databases; remote replicas propagate sync failures so
    /// callers (the health report) can surface them.
    pub async fn sync(&self) -> Result<()> {
        if !self.is_remote {
            return Ok(());
        }
        let sync = self.db.sync().await?;
        tracing::info!("Database synced: {:?}", sync);
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            busy_timeout_ms: self.busy_timeout_ms,
            is_remote: self.is_remote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config(url: &str) -> DatabaseConfig {
        DatabaseConfig {
            url: url.to_string(),
            auth_token: None,
            local_path: None,
        }
    }

    #[tokio::test]
    async fn test_local_database_sync_is_a_successful_noop() {
        let db = Database::new(&local_config(":memory:"), 4).await.unwrap();
        db.sync().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_url_prefix_is_stripped_for_local_builds() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let url = format!("file:{}", path.display());

        let db = Database::new(&local_config(&url), 4).await.unwrap();
        db.connect().unwrap();
        assert!(path.exists());
    }
}
