//! Eventview sample host entry point.

use std::error::Error;

use eventview_host::config::{HostConfig, LogFormat};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    let config = HostConfig::from_env()?;

    // Initialize tracing subscriber.
    let builder = tracing_subscriber::fmt().with_env_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }

    tracing::info!(?config, "Starting Eventview sample host");

    let summary = eventview_host::run(&config)?;
    for (account_id, balance) in &summary.balances {
        tracing::info!(%account_id, balance, "final balance");
    }

    Ok(())
}
