//! Ballot server binary
//!
//! Opens the ballot in `BALLOT_DATA_DIR` if one exists, otherwise creates
//! it from `BALLOT_PROPOSALS` (comma-separated names) and `BALLOT_OWNER`.

use anyhow::Context;
use ballot_core::{BallotLedger, Config, Error, VoterId};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Ballot Server");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(config = %serde_json::to_string(&config)?, "Configuration loaded");

    // Open existing ballot, or create one from the environment
    let ledger = match BallotLedger::open(config.clone()).await {
        Ok(ledger) => ledger,
        Err(Error::InvalidConfiguration(_)) => {
            let owner = VoterId::new(
                std::env::var("BALLOT_OWNER").context("BALLOT_OWNER is required to create a ballot")?,
            );
            let proposals: Vec<String> = std::env::var("BALLOT_PROPOSALS")
                .context("BALLOT_PROPOSALS is required to create a ballot")?
                .split(',')
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect();

            BallotLedger::create(config, owner, proposals).await?
        }
        Err(e) => return Err(e.into()),
    };

    let proposals = ledger.proposals().await?;
    tracing::info!(proposals = proposals.len(), "Ballot ready");

    // TODO: expose metrics_listen_addr as a Prometheus scrape endpoint
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down ballot server");
    ledger.shutdown().await?;
    Ok(())
}
