// Refresh orchestration
// Composes expiry evaluation, token exchange and secret propagation
// into one linear run

use crate::auth::{is_expired, CredentialTriple, TokenExchanger};
use crate::error::{RefreshError, Result};
use crate::guard::{
    mask, masked_prefix, AuditLog, Operation, RateLimiter, REFRESH_TOKEN_PREFIX,
};
use crate::store::{
    SecretStore, ACCESS_TOKEN_SECRET, EXPIRES_AT_SECRET, REFRESH_TOKEN_SECRET,
};

/// Credential material supplied by the invoking environment.
///
/// `expires_at` is `None` when the expiry was missing or unparseable,
/// which is treated as already expired.
#[derive(Debug, Clone)]
pub struct SuppliedCredential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<u64>,
}

/// Machine-readable result of one orchestration run.
#[derive(Debug)]
pub enum Outcome {
    /// No usable credential configured; nothing to do.
    Skipped { reason: &'static str },
    /// The supplied credential is still valid; returned unchanged.
    Valid(CredentialTriple),
    /// A new credential was obtained. `persisted` is false when secret
    /// store propagation failed; the triple is still usable for the
    /// remainder of the current run.
    Refreshed {
        triple: CredentialTriple,
        persisted: bool,
    },
}

impl Outcome {
    /// The triple the caller should use for the rest of the run.
    pub fn credential(&self) -> Option<&CredentialTriple> {
        match self {
            Outcome::Skipped { .. } => None,
            Outcome::Valid(triple) => Some(triple),
            Outcome::Refreshed { triple, .. } => Some(triple),
        }
    }

    pub fn refreshed(&self) -> bool {
        matches!(self, Outcome::Refreshed { .. })
    }
}

/// Top-level refresh routine.
///
/// One linear pass per process invocation: no retries, no loops. An
/// exchange failure is fatal for the run; a propagation failure only
/// downgrades the outcome.
pub struct Orchestrator {
    exchanger: TokenExchanger,
    store: SecretStore,
    limiter: RateLimiter,
    audit: AuditLog,
    buffer_minutes: u64,
}

impl Orchestrator {
    pub fn new(
        exchanger: TokenExchanger,
        store: SecretStore,
        limiter: RateLimiter,
        audit: AuditLog,
        buffer_minutes: u64,
    ) -> Self {
        Self {
            exchanger,
            store,
            limiter,
            audit,
            buffer_minutes,
        }
    }

    pub async fn run(&mut self, supplied: Option<SuppliedCredential>) -> Result<Outcome> {
        let Some(supplied) = supplied else {
            tracing::info!("No credential configured, skipping refresh");
            return Ok(Outcome::Skipped {
                reason: "no credential configured",
            });
        };

        if !supplied.refresh_token.starts_with(REFRESH_TOKEN_PREFIX) {
            self.audit.record(
                Operation::ValidationFailure,
                false,
                Some("refresh token does not match the expected shape"),
            );
            tracing::warn!("Refresh token has an unexpected shape, skipping refresh");
            return Ok(Outcome::Skipped {
                reason: "refresh token has an unexpected shape",
            });
        }

        // Missing or unparseable expiry fails safe toward renewal
        let expired = supplied
            .expires_at
            .map_or(true, |at| is_expired(at, self.buffer_minutes));

        if !expired {
            let expires_at = supplied.expires_at.unwrap_or_default();
            tracing::info!(expires_at, "Credential still valid, no refresh needed");
            return Ok(Outcome::Valid(CredentialTriple {
                access_token: supplied.access_token,
                refresh_token: supplied.refresh_token,
                expires_at,
            }));
        }

        if !self.limiter.can_refresh() {
            let wait_secs = self.limiter.min_interval_secs();
            self.audit
                .record(Operation::Refresh, false, Some("refresh rate limited"));
            return Err(RefreshError::RateLimited { wait_secs });
        }

        let triple = match self.exchanger.exchange(&supplied.refresh_token).await {
            Ok(triple) => {
                self.audit.record(Operation::Refresh, true, None);
                triple
            }
            Err(e) => {
                let detail = mask(&e.to_string());
                self.audit.record(Operation::Refresh, false, Some(&detail));
                tracing::error!("{}", detail);
                return Err(e);
            }
        };

        match self.store.propagate(&triple).await {
            Ok(()) => {
                self.audit.record(Operation::UpdateSecrets, true, None);
                tracing::info!(
                    expires_at = triple.expires_at,
                    "Credential refreshed and persisted"
                );
                Ok(Outcome::Refreshed {
                    triple,
                    persisted: true,
                })
            }
            Err(e) => {
                let detail = mask(&e.to_string());
                self.audit
                    .record(Operation::UpdateSecrets, false, Some(&detail));
                tracing::warn!("{}", detail);
                self.log_manual_update_instructions(&triple);
                Ok(Outcome::Refreshed {
                    triple,
                    persisted: false,
                })
            }
        }
    }

    /// Tell the operator how to persist the renewed credential by hand.
    /// Only masked token prefixes appear here.
    fn log_manual_update_instructions(&self, triple: &CredentialTriple) {
        tracing::warn!(
            "Secret store was not updated; the renewed credential is only valid for this run. \
             Update the repository secrets manually: {} (token starting {}), {} (token starting {}), {}={}",
            ACCESS_TOKEN_SECRET,
            masked_prefix(&triple.access_token),
            REFRESH_TOKEN_SECRET,
            masked_prefix(&triple.refresh_token),
            EXPIRES_AT_SECRET,
            triple.expires_at,
        );
    }
}
