use anyhow::Result;
use clap::Parser;
use fleetmon_server::app;
use fleetmon_server::config::ServerConfig;
use fleetmon_server::state::AppState;
use fleetmon_storage::MetricStore;
use std::path::PathBuf;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fleetmon-server", version, about = "fleetmon metrics collector")]
struct Cli {
    /// Path to the server configuration file
    #[arg(default_value = "config/server.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::load(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(config.log_directive().parse()?),
        )
        .init();

    fleetmon_common::id::init(1, 1);

    let db_url = config.connection_url();
    let store = MetricStore::new(&db_url).await?;
    let addr = config.listen_addr();
    let state = AppState::new(store, config);

    let http_listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "fleetmon-server listening");

    axum::serve(http_listener, app::build_http_app(state))
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("Shutting down gracefully");
        })
        .await?;

    Ok(())
}
