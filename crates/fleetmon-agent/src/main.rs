use anyhow::Result;
use clap::Parser;
use fleetmon_agent::{AgentConfig, DeliveryClient, MetricsAssembler, Scheduler};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fleetmon-agent", version, about = "fleetmon host monitoring agent")]
struct Cli {
    /// Path to the agent configuration file
    #[arg(short, long, default_value = "config/agent.toml")]
    config: PathBuf,

    /// Collect locally and print the results instead of delivering them
    #[arg(long)]
    test: bool,

    /// Number of collections in test mode
    #[arg(long, default_value_t = 3)]
    iterations: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fleetmon=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = AgentConfig::load(&cli.config)?;
    tracing::info!(
        agent_id = %config.agent_id,
        agent_name = %config.agent_name,
        targets = config.network_targets.len(),
        "fleetmon-agent starting"
    );

    let assembler = MetricsAssembler::from_config(&config);
    let delivery = DeliveryClient::from_config(&config)?;
    let mut scheduler = Scheduler::new(assembler, delivery, config.collection_interval());

    if cli.test {
        let mut stdout = std::io::stdout().lock();
        scheduler.run_local(cli.iterations, &mut stdout).await?;
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutting down gracefully");
                on_signal.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "Unable to listen for shutdown signal"),
        }
    });

    scheduler.run(cancel).await;
    Ok(())
}
