use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::crud::{DEFAULT_PAGE_SIZE, PAGE_SIZES};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Which `DocumentStore` implementation backs the resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    Postgres,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Backend::Memory),
            "postgres" | "postgresql" | "pg" => Ok(Backend::Postgres),
            other => Err(format!("unknown backend '{}' (expected memory or postgres)", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub url: Option<String>,
    /// Replaces the database name in `url` when set
    pub database_name: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub page_sizes: Vec<u64>,
    pub default_page_size: u64,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

impl AppConfig {
    /// Read the process environment; each call builds a fresh config
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build from any variable source, keyed like the process environment
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let environment = match var("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(var)
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        // Server overrides
        if let Some(v) = var("CRUD_API_HOST") {
            self.server.host = v;
        }
        if let Some(port) = var("CRUD_API_PORT")
            .or_else(|| var("PORT"))
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Some(v) = var("DATABASE_BACKEND") {
            match v.parse() {
                Ok(backend) => self.database.backend = backend,
                Err(e) => tracing::warn!("Ignoring DATABASE_BACKEND: {}", e),
            }
        }
        if let Some(v) = var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = var("DATABASE_NAME") {
            self.database.database_name = Some(v);
        }
        if let Some(v) = var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(v) = var("API_PAGE_SIZES") {
            let sizes: Vec<u64> = v.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if !sizes.is_empty() {
                self.api.page_sizes = sizes;
            }
        }
        if let Some(v) = var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Some(v) = var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Some(v) = var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        self
    }

    fn api_defaults(enable_request_logging: bool, max_request_size_bytes: usize) -> ApiConfig {
        ApiConfig {
            page_sizes: PAGE_SIZES.to_vec(),
            default_page_size: DEFAULT_PAGE_SIZE,
            enable_request_logging,
            max_request_size_bytes,
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { host: "0.0.0.0".to_string(), port: 3000 },
            database: DatabaseConfig {
                backend: Backend::Memory,
                url: None,
                database_name: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: Self::api_defaults(true, 10 * 1024 * 1024), // 10MB
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { host: "0.0.0.0".to_string(), port: 3000 },
            database: DatabaseConfig {
                backend: Backend::Postgres,
                url: None,
                database_name: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: Self::api_defaults(true, 5 * 1024 * 1024), // 5MB
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { host: "0.0.0.0".to_string(), port: 3000 },
            database: DatabaseConfig {
                backend: Backend::Postgres,
                url: None,
                database_name: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: Self::api_defaults(false, 2 * 1024 * 1024), // 2MB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.database.backend, Backend::Memory);
        assert_eq!(config.api.default_page_size, 15);
        assert!(config.api.enable_request_logging);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.database.backend, Backend::Postgres);
        assert_eq!(config.database.max_connections, 50);
        assert!(!config.api.enable_request_logging);
        assert_eq!(config.api.page_sizes, vec![1, 5, 10, 15, 20, 30, 50]);
    }

    #[test]
    fn test_overrides_read_per_call() {
        let vars = HashMap::from([
            ("APP_ENV", "staging"),
            ("CRUD_API_PORT", "4321"),
            ("API_PAGE_SIZES", "5, 10,x"),
        ]);
        let config = AppConfig::from_vars(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.environment, Environment::Staging);
        assert_eq!(config.server.port, 4321);
        assert_eq!(config.api.page_sizes, vec![5, 10]);

        let other = AppConfig::from_vars(|key| (key == "PORT").then(|| "4322".to_string()));
        assert_eq!(other.environment, Environment::Development);
        assert_eq!(other.server.port, 4322);
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("Postgres".parse::<Backend>(), Ok(Backend::Postgres));
        assert_eq!("memory".parse::<Backend>(), Ok(Backend::Memory));
        assert!("mongo".parse::<Backend>().is_err());
    }
}
