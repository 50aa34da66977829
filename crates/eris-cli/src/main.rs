mod config;

use std::sync::Arc;

use tracing::info;

use eris_archive::Archive;
use eris_discord::DiscordClient;
use eris_migrate::Orchestrator;
use eris_migrate::progress::TracingReporter;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eris_cli=info,eris_migrate=info,eris_archive=info,eris_discord=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = Config::load(&args)?;
    info!("Migrating archive {}", config.archive_dir.display());

    let destination = Arc::new(DiscordClient::with_api_base(
        config.api_base.clone(),
        config.token.clone(),
        config.guild_id.clone(),
    ));
    let archive = Archive::new(config.archive_dir.clone());

    let mut orchestrator = Orchestrator::new(
        destination,
        archive,
        config.options.clone(),
        Arc::new(TracingReporter),
    );
    orchestrator.run().await?;

    Ok(())
}
