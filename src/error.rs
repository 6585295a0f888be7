// Error handling module
// Defines the refresh error taxonomy

use thiserror::Error;

/// Errors that can occur during a credential refresh run.
///
/// Display strings never contain token material or ciphertext; failures
/// carry only HTTP statuses, field names and provider error codes.
#[derive(Error, Debug)]
pub enum RefreshError {
    /// Provider rejected the token exchange
    #[error("Token exchange failed: {status} - {message}")]
    Exchange { status: u16, message: String },

    /// Token exchange request never produced a response
    #[error("Token exchange transport error: {0}")]
    ExchangeTransport(String),

    /// Secret store public key could not be fetched
    #[error("Secret store key fetch failed: {reason}")]
    KeyFetch { reason: String },

    /// A single secret field update was rejected by the store
    #[error("Secret update failed for {field}: {reason}")]
    SecretUpdate {
        field: &'static str,
        reason: String,
    },

    /// Sealing a value under the store's public key failed
    #[error("Sealing failed: {0}")]
    Seal(String),

    /// Refresh attempted again before the minimum interval elapsed
    #[error("Refresh rate limited, retry in {wait_secs}s")]
    RateLimited { wait_secs: u64 },
}

/// Result type alias for refresh operations
pub type Result<T> = std::result::Result<T, RefreshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RefreshError::Exchange {
            status: 400,
            message: "invalid_grant".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Token exchange failed: 400 - invalid_grant"
        );

        let err = RefreshError::KeyFetch {
            reason: "503 Service Unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Secret store key fetch failed: 503 Service Unavailable"
        );

        let err = RefreshError::SecretUpdate {
            field: "AGENT_REFRESH_TOKEN",
            reason: "422 Unprocessable Entity".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Secret update failed for AGENT_REFRESH_TOKEN: 422 Unprocessable Entity"
        );
    }

    #[test]
    fn test_rate_limited_message() {
        let err = RefreshError::RateLimited { wait_secs: 60 };
        assert_eq!(err.to_string(), "Refresh rate limited, retry in 60s");
    }

    #[test]
    fn test_transport_message_carries_kind_only() {
        let err = RefreshError::ExchangeTransport("connection_failed".to_string());
        assert_eq!(
            err.to_string(),
            "Token exchange transport error: connection_failed"
        );
    }
}
