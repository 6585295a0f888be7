// Configuration loading
// CLI arguments with environment fallbacks, priority CLI > ENV > defaults

use anyhow::Result;
use clap::Parser;
use std::fmt;
use std::path::PathBuf;

use crate::auth::parse_expiry;
use crate::orchestrator::SuppliedCredential;

/// Default provider token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://console.anthropic.com/v1/oauth/token";
/// Default secret store API base.
pub const DEFAULT_STORE_URL: &str = "https://api.github.com";

/// Credrelay - CI credential refresh
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Current access token
    #[arg(long, env = "AGENT_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Current refresh token
    #[arg(long, env = "AGENT_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Access token expiry as epoch seconds
    #[arg(long, env = "AGENT_TOKEN_EXPIRES_AT")]
    pub expires_at: Option<String>,

    /// Authorization token for the secret store
    #[arg(long, env = "SECRETS_ADMIN_TOKEN", hide_env_values = true)]
    pub store_token: Option<String>,

    /// Repository identifier (owner/name)
    #[arg(long, env = "CI_REPOSITORY")]
    pub repository: Option<String>,

    /// Provider token endpoint
    #[arg(long, env = "TOKEN_ENDPOINT_URL", default_value = DEFAULT_TOKEN_URL)]
    pub token_url: String,

    /// Secret store API base URL
    #[arg(long, env = "SECRET_STORE_URL", default_value = DEFAULT_STORE_URL)]
    pub store_url: String,

    /// Expiry safety buffer in minutes
    #[arg(long, env = "TOKEN_EXPIRY_BUFFER_MINUTES", default_value = "5")]
    pub buffer_minutes: u64,

    /// Minimum seconds between refresh attempts
    #[arg(long, env = "MIN_REFRESH_INTERVAL_SECS", default_value = "60")]
    pub min_refresh_interval: u64,

    /// Actor recorded in audit output
    #[arg(long, env = "CI_ACTOR", default_value = "automation")]
    pub actor: String,

    /// Run identifier recorded in audit output (random when absent)
    #[arg(long, env = "CI_RUN_ID")]
    pub run_id: Option<String>,

    /// Machine-readable outputs file (key=value lines)
    #[arg(long, env = "CI_OUTPUT")]
    pub outputs_file: Option<PathBuf>,

    /// Human-readable summary file
    #[arg(long, env = "CI_STEP_SUMMARY")]
    pub summary_file: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Clone)]
pub struct Config {
    // Credential material (absent means SKIPPED)
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<u64>,

    // Secret store
    pub store_token: Option<String>,
    pub repository: Option<String>,
    pub store_url: String,

    // Provider
    pub token_url: String,

    // Policy
    pub buffer_minutes: u64,
    pub min_refresh_interval: u64,

    // Audit identity
    pub actor: String,
    pub run_id: String,

    // Outputs
    pub outputs_file: Option<PathBuf>,
    pub summary_file: Option<PathBuf>,

    // Plumbing
    pub http_timeout: u64,
    pub log_level: String,
}

// Token fields are elided so a config dump can never leak them.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .field("store_token", &self.store_token.as_ref().map(|_| "[REDACTED]"))
            .field("repository", &self.repository)
            .field("store_url", &self.store_url)
            .field("token_url", &self.token_url)
            .field("buffer_minutes", &self.buffer_minutes)
            .field("min_refresh_interval", &self.min_refresh_interval)
            .field("actor", &self.actor)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from CLI arguments and environment.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Ok(Self::from_args(CliArgs::parse()))
    }

    pub fn from_args(args: CliArgs) -> Self {
        Config {
            access_token: args.access_token.filter(|s| !s.is_empty()),
            refresh_token: args.refresh_token.filter(|s| !s.is_empty()),
            expires_at: args.expires_at.as_deref().and_then(parse_expiry),
            store_token: args.store_token.filter(|s| !s.is_empty()),
            repository: args.repository.filter(|s| !s.is_empty()),
            store_url: args.store_url,
            token_url: args.token_url,
            buffer_minutes: args.buffer_minutes,
            min_refresh_interval: args.min_refresh_interval,
            actor: args.actor,
            run_id: args
                .run_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            outputs_file: args.outputs_file,
            summary_file: args.summary_file,
            http_timeout: args.http_timeout,
            log_level: args.log_level,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(repository) = &self.repository {
            let mut parts = repository.splitn(2, '/');
            let owner = parts.next().unwrap_or_default();
            let name = parts.next().unwrap_or_default();
            if owner.is_empty() || name.is_empty() {
                anyhow::bail!("CI_REPOSITORY must be owner/name, got: {}", repository);
            }
        }

        if self.refresh_token.is_some() {
            if self.store_token.is_none() {
                anyhow::bail!("SECRETS_ADMIN_TOKEN is required when a credential is configured");
            }
            if self.repository.is_none() {
                anyhow::bail!("CI_REPOSITORY is required when a credential is configured");
            }
        }

        if self.token_url.is_empty() || self.store_url.is_empty() {
            anyhow::bail!("TOKEN_ENDPOINT_URL and SECRET_STORE_URL must not be empty");
        }

        Ok(())
    }

    /// The credential handed to the orchestrator, if one was supplied.
    pub fn supplied_credential(&self) -> Option<SuppliedCredential> {
        let access_token = self.access_token.clone()?;
        let refresh_token = self.refresh_token.clone()?;
        Some(SuppliedCredential {
            access_token,
            refresh_token,
            expires_at: self.expires_at,
        })
    }
}
