// Secret store client
// Fetches the store's sealing key and writes renewed credential fields

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::CredentialTriple;
use crate::error::{RefreshError, Result};
use crate::seal::seal_for_store;

/// Secret names for the three persisted credential fields.
pub const ACCESS_TOKEN_SECRET: &str = "AGENT_ACCESS_TOKEN";
pub const REFRESH_TOKEN_SECRET: &str = "AGENT_REFRESH_TOKEN";
pub const EXPIRES_AT_SECRET: &str = "AGENT_TOKEN_EXPIRES_AT";

/// The store's current sealing key.
///
/// Fetched once per propagation attempt and never cached across runs;
/// the store may rotate it at any time.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreKey {
    pub key: String,
    pub key_id: String,
}

#[derive(Serialize)]
struct SecretUpdateBody<'a> {
    encrypted_value: &'a str,
    key_id: &'a str,
}

/// Client for the repository-scoped secret store.
pub struct SecretStore {
    client: Client,
    base_url: String,
    auth_token: String,
    repository: String,
}

impl SecretStore {
    pub fn new(client: Client, base_url: String, auth_token: String, repository: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
            repository,
        }
    }

    /// Fetch the store's current public key and key identifier.
    ///
    /// A failure here aborts propagation before any write is attempted.
    pub async fn fetch_public_key(&self) -> Result<StoreKey> {
        let url = format!(
            "{}/repos/{}/actions/secrets/public-key",
            self.base_url, self.repository
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.auth_token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|_| RefreshError::KeyFetch {
                reason: "store unreachable".to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::KeyFetch {
                reason: status_reason(status),
            });
        }

        response.json().await.map_err(|_| RefreshError::KeyFetch {
            reason: "malformed key response body".to_string(),
        })
    }

    /// Submit one sealed value as a named secret update.
    pub async fn put_secret(
        &self,
        name: &'static str,
        encrypted_value: &str,
        key_id: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/repos/{}/actions/secrets/{}",
            self.base_url, self.repository, name
        );

        let body = SecretUpdateBody {
            encrypted_value,
            key_id,
        };

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.auth_token)
            .header("Accept", "application/vnd.github+json")
            .json(&body)
            .send()
            .await
            .map_err(|_| RefreshError::SecretUpdate {
                field: name,
                reason: "store unreachable".to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::SecretUpdate {
                field: name,
                reason: status_reason(status),
            });
        }

        tracing::debug!(secret = name, "Secret field updated");
        Ok(())
    }

    /// Propagate a renewed credential triple into the store.
    ///
    /// Fetches the sealing key, then seals and writes the three fields
    /// sequentially. The three updates are not atomic: a failure at
    /// field k leaves fields before it already updated. The store does
    /// not support multi-key transactions, so no rollback is attempted.
    pub async fn propagate(&self, triple: &CredentialTriple) -> Result<()> {
        let key = self.fetch_public_key().await?;
        tracing::debug!(key_id = %key.key_id, "Fetched store sealing key");

        let expiry_string = triple.expires_at.to_string();
        let fields: [(&'static str, &str); 3] = [
            (ACCESS_TOKEN_SECRET, &triple.access_token),
            (REFRESH_TOKEN_SECRET, &triple.refresh_token),
            (EXPIRES_AT_SECRET, &expiry_string),
        ];

        for (name, plaintext) in fields {
            let sealed = seal_for_store(&key.key, plaintext).map_err(|e| match e {
                RefreshError::Seal(reason) => RefreshError::SecretUpdate {
                    field: name,
                    reason,
                },
                other => other,
            })?;
            self.put_secret(name, &sealed, &key.key_id).await?;
        }

        tracing::info!(
            repository = %self.repository,
            "Credential propagated to secret store (3 fields, tokens redacted)"
        );
        Ok(())
    }
}

fn status_reason(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}
