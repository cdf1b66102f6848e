use library_catalog::config::Config;
use library_catalog::database::Sqlite;
use library_catalog::http::{AppState, HttpServer, HttpServerConfig};
use library_catalog::service::CatalogService;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let store = Sqlite::new(config.database_url()).await?;
    let catalog = CatalogService::new(Arc::new(store));
    let state = AppState::new(catalog)?;
    let server_config = HttpServerConfig::new(config.server_port());
    let http_server = HttpServer::new(state, server_config).await?;
    http_server.run().await
}
