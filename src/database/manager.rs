use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::store::StoreError;

/// Connection pool owner for the Postgres backend
///
/// Built once at startup from `DatabaseConfig` and handed to the store; no
/// process-wide pool cache.
#[derive(Clone)]
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let base = config.url.as_deref().ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
        let connection_string = Self::build_connection_string(base, config.database_name.as_deref())?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&connection_string)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        info!("Created database pool (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Validate the URL and optionally swap the database name in its path
    fn build_connection_string(base: &str, database_name: Option<&str>) -> Result<String, StoreError> {
        let mut url = url::Url::parse(base).map_err(|e| StoreError::InvalidDatabaseUrl(e.to_string()))?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(StoreError::InvalidDatabaseUrl(format!("unsupported scheme '{}'", url.scheme())));
        }
        if let Some(name) = database_name {
            if !Self::is_valid_db_name(name) {
                return Err(StoreError::InvalidDatabaseUrl(format!("invalid database name '{}'", name)));
            }
            url.set_path(&format!("/{}", name));
        }
        Ok(url.into())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_valid_db_name(name: &str) -> bool {
        !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}
