//! gsbd - chat room server built on gsb-ng.

use gsb_ng::commands::builtin::{self, Lobby};
use gsb_ng::config::{Config, validate};
use gsb_ng::network::{ConnectionOptions, Gateway};
use gsb_ng::state::Hub;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (GSBD_LOG_FORMAT=json for structured output)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("GSBD_LOG_FORMAT").is_ok_and(|format| format == "json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    info!(
        server = %config.server.name,
        listen = %config.listen.address,
        "Starting gsbd"
    );

    let hub = Arc::new(Hub::with_banned(config.security.banned_addrs()));
    let registry = Arc::new(builtin::registry(&config.parser)?);
    info!(commands = registry.all_commands().len(), "Command registry built");

    let gateway = Gateway::bind(
        config.listen.address,
        Arc::clone(&hub),
        registry,
        Arc::new(Lobby),
        ConnectionOptions::from_config(&config),
    )
    .await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(gateway.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!(clients = hub.len(), "Shutdown requested");
    let _ = shutdown_tx.send(true);

    server.await??;

    // Let connection tasks close their sessions and flush
    let deadline = Instant::now() + SHUTDOWN_GRACE;
    while !hub.is_empty() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    info!(uptime_secs = hub.uptime().num_seconds(), "Server stopped");
    Ok(())
}
