// Credential types

use serde::{Deserialize, Serialize};
use std::fmt;

/// A renewable credential pair plus its absolute expiry.
///
/// Held only in process memory for the duration of one run. `expires_at`
/// is epoch seconds, never milliseconds.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialTriple {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: u64,
}

// Token fields are redacted so a stray {:?} in a log line or panic
// message cannot leak them.
impl fmt::Debug for CredentialTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialTriple")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token exchange request body
#[derive(Serialize)]
pub struct ExchangeRequest<'a> {
    pub grant_type: &'static str,
    pub refresh_token: &'a str,
}

/// Token exchange response body
#[derive(Deserialize)]
pub struct ExchangeResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<u64>,
}

/// Error body optionally returned by the provider on a failed exchange
#[derive(Deserialize)]
pub struct ExchangeErrorBody {
    pub error: Option<String>,
}

/// Parse an externally supplied expiry string as epoch seconds.
///
/// Returns `None` for anything non-numeric; the orchestrator treats a
/// missing expiry as already expired.
pub fn parse_expiry(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}
