// Token exchange against the provider endpoint

use reqwest::Client;

use super::expiry::epoch_seconds;
use super::types::{CredentialTriple, ExchangeErrorBody, ExchangeRequest, ExchangeResponse};
use crate::error::{RefreshError, Result};

/// Default lifetime assumed when the provider omits an expiry.
/// An access token with unknown expiry is still usable short-term.
const DEFAULT_LIFETIME_SECS: u64 = 3600;

/// Exchanges a refresh token for a new credential triple.
///
/// Single POST to a fixed endpoint, no retries; retry and rate policy
/// belong to the orchestrator.
pub struct TokenExchanger {
    client: Client,
    token_url: String,
}

impl TokenExchanger {
    pub fn new(client: Client, token_url: String) -> Self {
        Self { client, token_url }
    }

    /// Perform the refresh exchange.
    ///
    /// If the provider omits a new refresh token the submitted one is
    /// reused (rotation is optional on the provider side). A missing
    /// expiry is replaced with now + 3600s rather than failing.
    ///
    /// Error messages carry the HTTP status and the provider's error
    /// code only, never the refresh token.
    pub async fn exchange(&self, refresh_token: &str) -> Result<CredentialTriple> {
        tracing::info!("Exchanging refresh token for a new credential...");

        let request = ExchangeRequest {
            grant_type: "refresh_token",
            refresh_token,
        };

        let response = self
            .client
            .post(&self.token_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RefreshError::ExchangeTransport(transport_kind(&e).to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ExchangeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("provider rejected the exchange")
                        .to_string()
                });
            return Err(RefreshError::Exchange {
                status: status.as_u16(),
                message,
            });
        }

        let data: ExchangeResponse = response.json().await.map_err(|_| RefreshError::Exchange {
            status: status.as_u16(),
            message: "malformed exchange response body".to_string(),
        })?;

        if data.access_token.is_empty() {
            return Err(RefreshError::Exchange {
                status: status.as_u16(),
                message: "exchange response missing access_token".to_string(),
            });
        }

        let expires_at = data
            .expires_at
            .unwrap_or_else(|| epoch_seconds() + DEFAULT_LIFETIME_SECS);

        tracing::info!(expires_at, "Token exchange succeeded");

        Ok(CredentialTriple {
            access_token: data.access_token,
            refresh_token: data
                .refresh_token
                .unwrap_or_else(|| refresh_token.to_string()),
            expires_at,
        })
    }
}

/// Classify a reqwest error without echoing its display string, which
/// can embed request details.
fn transport_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}
