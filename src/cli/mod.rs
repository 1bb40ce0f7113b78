use anyhow::Context;
use clap::Parser;
use std::sync::Arc;

use crate::config::{AppConfig, Backend};
use crate::database::{DatabaseManager, DocumentStore, MemoryStore, PgDocumentStore, SchemaRegistry};
use crate::{demo, handlers};

#[derive(Parser, Debug)]
#[command(name = "rest-crud")]
#[command(about = "Generic REST CRUD server over a document store")]
#[command(version)]
pub struct Cli {
    #[arg(long, help = "Port to listen on (overrides CRUD_API_PORT / PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Address to bind (overrides CRUD_API_HOST)")]
    pub host: Option<String>,

    #[arg(long, help = "Storage backend: memory or postgres (overrides DATABASE_BACKEND)")]
    pub backend: Option<Backend>,

    #[arg(long, help = "Postgres connection URL (overrides DATABASE_URL)")]
    pub database_url: Option<String>,
}

impl Cli {
    /// Apply command-line overrides on top of the environment config
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(backend) = self.backend {
            config.database.backend = backend;
        }
        if let Some(url) = &self.database_url {
            config.database.url = Some(url.clone());
        }
        config
    }
}

/// Open the configured store with the given schemas
pub async fn open_store(config: &AppConfig, registry: SchemaRegistry) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.database.backend {
        Backend::Memory => {
            tracing::info!("Using in-memory document store");
            Ok(Arc::new(MemoryStore::new(registry)))
        }
        Backend::Postgres => {
            let manager = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to Postgres")?;
            let store = PgDocumentStore::new(registry, manager)
                .await
                .context("failed to prepare documents table")?;
            tracing::info!("Using Postgres document store");
            Ok(Arc::new(store))
        }
    }
}

/// Serve the demo resources until the process is stopped
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.apply(AppConfig::from_env());
    tracing::info!("Starting rest-crud in {:?} mode", config.environment);

    let store = open_store(&config, demo::registry()).await?;
    let resources = demo::resources(store.clone(), &config.api).context("invalid demo resource configuration")?;
    let app = handlers::app(store, resources, &config.api);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("rest-crud listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
