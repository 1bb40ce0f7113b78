use clap::Parser;
use rest_crud::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, DATABASE_BACKEND, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Err(e) = rest_crud::cli::run(cli).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
