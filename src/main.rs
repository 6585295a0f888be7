use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

mod auth;
mod config;
mod error;
mod guard;
mod orchestrator;
mod outputs;
mod seal;
mod store;

use auth::TokenExchanger;
use guard::{mask, AuditLog, RateLimiter};
use orchestrator::{Orchestrator, Outcome};
use store::SecretStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = config::Config::load()?;
    config.validate()?;

    // Initialize logging with the configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    tracing::info!(run_id = %config.run_id, "Credrelay starting");

    let client = Client::builder()
        .timeout(Duration::from_secs(config.http_timeout))
        .build()
        .context("Failed to create HTTP client")?;

    let exchanger = TokenExchanger::new(client.clone(), config.token_url.clone());
    let store = SecretStore::new(
        client,
        config.store_url.clone(),
        config.store_token.clone().unwrap_or_default(),
        config.repository.clone().unwrap_or_default(),
    );
    let limiter = RateLimiter::new(config.min_refresh_interval);
    let audit = AuditLog::new(
        config.repository.clone().unwrap_or_default(),
        config.actor.clone(),
        config.run_id.clone(),
    );

    let mut orchestrator = Orchestrator::new(
        exchanger,
        store,
        limiter,
        audit,
        config.buffer_minutes,
    );

    let outcome = match orchestrator.run(config.supplied_credential()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // Exchange and rate-limit failures must fail the run
            // loudly; a stale access token cannot continue silently.
            anyhow::bail!("{}", mask(&e.to_string()));
        }
    };

    match &outcome {
        Outcome::Skipped { reason } => tracing::info!("Run skipped: {}", reason),
        Outcome::Valid(_) => tracing::info!("Credential valid, no refresh performed"),
        Outcome::Refreshed { persisted, .. } => {
            tracing::info!(persisted, "Credential refreshed")
        }
    }

    // Best-effort output surfaces; failures are logged, never fatal
    if let Some(path) = &config.outputs_file {
        if let Err(e) = outputs::write_outputs(path, &outcome) {
            tracing::warn!("{}", mask(&format!("Failed to write outputs: {e:#}")));
        }
    }
    if let Some(path) = &config.summary_file {
        if let Err(e) = outputs::write_summary(path, &outcome) {
            tracing::warn!("{}", mask(&format!("Failed to write summary: {e:#}")));
        }
    }

    Ok(())
}
