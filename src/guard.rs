// Redaction and audit layer
// Masks credential material, rate-limits refresh attempts and emits
// structured audit records

use std::io::Write;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::auth::epoch_seconds;

/// Fixed prefix of provider access tokens.
pub const ACCESS_TOKEN_PREFIX: &str = "sk-ant-oat";
/// Fixed prefix of provider refresh tokens.
pub const REFRESH_TOKEN_PREFIX: &str = "sk-ant-ort";

/// Minimum interval between permitted refresh attempts.
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 60;

static ACCESS_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sk-ant-oat[A-Za-z0-9]{2}-[A-Za-z0-9_\-]+").unwrap());
static REFRESH_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sk-ant-ort[A-Za-z0-9]{2}-[A-Za-z0-9_\-]+").unwrap());
static JSON_ACCESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""access_token"\s*:\s*"[^"]*""#).unwrap());
static JSON_REFRESH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""refresh_token"\s*:\s*"[^"]*""#).unwrap());

/// Replace credential-shaped substrings with fixed redaction markers.
///
/// Every string the core hands to the logging surface goes through
/// here. Idempotent: the markers themselves never match the patterns.
pub fn mask(input: &str) -> String {
    let masked = ACCESS_TOKEN_RE.replace_all(input, "[REDACTED_ACCESS_TOKEN]");
    let masked = REFRESH_TOKEN_RE.replace_all(&masked, "[REDACTED_REFRESH_TOKEN]");
    let masked = JSON_ACCESS_RE.replace_all(&masked, r#""access_token": "[REDACTED]""#);
    let masked = JSON_REFRESH_RE.replace_all(&masked, r#""refresh_token": "[REDACTED]""#);
    masked.into_owned()
}

/// A loggable hint for manual-update instructions: the fixed token
/// prefix only, never any of the secret tail.
pub fn masked_prefix(token: &str) -> String {
    for prefix in [ACCESS_TOKEN_PREFIX, REFRESH_TOKEN_PREFIX] {
        if token.starts_with(prefix) {
            return format!("{prefix}...");
        }
    }
    "[REDACTED]".to_string()
}

/// Advisory backpressure against refresh storms.
///
/// In-process only, resets on restart; not a security control. Held by
/// value and passed by handle so tests can inject a fresh instance.
pub struct RateLimiter {
    min_interval_secs: u64,
    last_refresh: Option<u64>,
}

impl RateLimiter {
    pub fn new(min_interval_secs: u64) -> Self {
        Self {
            min_interval_secs,
            last_refresh: None,
        }
    }

    pub fn min_interval_secs(&self) -> u64 {
        self.min_interval_secs
    }

    /// Gate a refresh attempt against the wall clock.
    pub fn can_refresh(&mut self) -> bool {
        self.can_refresh_at(epoch_seconds())
    }

    /// Clock-injected gate. Returns false without touching state while
    /// inside the minimum interval; otherwise stamps `now` and permits.
    pub fn can_refresh_at(&mut self, now: u64) -> bool {
        if let Some(last) = self.last_refresh {
            if now.saturating_sub(last) < self.min_interval_secs {
                return false;
            }
        }
        self.last_refresh = Some(now);
        true
    }
}

#[allow(dead_code)]
impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(MIN_REFRESH_INTERVAL_SECS)
    }
}

/// Audited operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Refresh,
    UpdateSecrets,
    ValidationFailure,
}

/// One append-only audit event.
#[derive(Debug, Serialize)]
pub struct AuditRecord {
    pub operation: Operation,
    pub timestamp: String,
    pub repository: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub actor: String,
    pub run_id: String,
}

/// Emits one structured audit line per renewal/propagation attempt.
pub struct AuditLog {
    repository: String,
    actor: String,
    run_id: String,
}

impl AuditLog {
    pub fn new(repository: String, actor: String, run_id: String) -> Self {
        Self {
            repository,
            actor,
            run_id,
        }
    }

    /// Emit an audit record as a single tagged JSON line on stdout.
    ///
    /// Error text is masked before it enters the record. Never fails
    /// the caller: serialization or sink errors are swallowed.
    pub fn record(&self, operation: Operation, success: bool, error: Option<&str>) {
        let record = AuditRecord {
            operation,
            timestamp: chrono::Utc::now().to_rfc3339(),
            repository: self.repository.clone(),
            success,
            error: error.map(mask),
            actor: self.actor.clone(),
            run_id: self.run_id.clone(),
        };

        if let Ok(line) = serde_json::to_string(&record) {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "[AUDIT] {line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mask_completeness() {
        let input = "access sk-ant-oat01-AbC_123-xyz and refresh sk-ant-ort01-ZzTop_9";
        let masked = mask(input);

        assert!(!masked.contains("sk-ant-oat01-AbC_123-xyz"));
        assert!(!masked.contains("sk-ant-ort01-ZzTop_9"));
        assert!(masked.contains("[REDACTED_ACCESS_TOKEN]"));
        assert!(masked.contains("[REDACTED_REFRESH_TOKEN]"));
    }

    #[test]
    fn test_mask_json_fragments() {
        let input = r#"{"access_token": "anything at all", "refresh_token":"x"}"#;
        let masked = mask(input);

        assert!(!masked.contains("anything at all"));
        assert!(masked.contains(r#""access_token": "[REDACTED]""#));
        assert!(masked.contains(r#""refresh_token": "[REDACTED]""#));
    }

    #[test]
    fn test_mask_idempotence_fixed_cases() {
        for input in [
            "sk-ant-oat01-secret",
            r#"{"refresh_token": "sk-ant-ort01-secret"}"#,
            "no secrets here",
            "",
        ] {
            let once = mask(input);
            assert_eq!(mask(&once), once);
        }
    }

    #[test]
    fn test_mask_leaves_plain_text_alone() {
        let input = "Token exchange failed: 400 - invalid_grant";
        assert_eq!(mask(input), input);
    }

    proptest! {
        #[test]
        fn prop_mask_idempotent(input in ".{0,200}") {
            let once = mask(&input);
            prop_assert_eq!(mask(&once), once);
        }

        #[test]
        fn prop_mask_removes_embedded_tokens(tail in "[A-Za-z0-9_\\-]{8,40}", context in "[a-z ]{0,40}") {
            let input = format!("{context}sk-ant-oat01-{tail} sk-ant-ort01-{tail}");
            let masked = mask(&input);
            let access = format!("sk-ant-oat01-{tail}");
            let refresh = format!("sk-ant-ort01-{tail}");
            prop_assert!(!masked.contains(&access));
            prop_assert!(!masked.contains(&refresh));
        }
    }

    #[test]
    fn test_masked_prefix() {
        assert_eq!(masked_prefix("sk-ant-oat01-secret"), "sk-ant-oat...");
        assert_eq!(masked_prefix("sk-ant-ort01-secret"), "sk-ant-ort...");
        assert_eq!(masked_prefix("something-else"), "[REDACTED]");
    }

    #[test]
    fn test_rate_limiter_blocks_within_interval() {
        let mut limiter = RateLimiter::new(60);

        assert!(limiter.can_refresh_at(1000));
        assert!(!limiter.can_refresh_at(1030));
        // A denied call must not restart the interval
        assert!(limiter.can_refresh_at(1060));
    }

    #[test]
    fn test_rate_limiter_first_call_always_permits() {
        let mut limiter = RateLimiter::new(60);
        assert!(limiter.can_refresh_at(0));
    }

    #[test]
    fn test_rate_limiter_denied_call_leaves_state_untouched() {
        let mut limiter = RateLimiter::new(60);
        assert!(limiter.can_refresh_at(1000));
        assert!(!limiter.can_refresh_at(1059));
        assert!(!limiter.can_refresh_at(1059));
        assert!(limiter.can_refresh_at(1061));
    }

    #[test]
    fn test_audit_record_serialization() {
        let record = AuditRecord {
            operation: Operation::UpdateSecrets,
            timestamp: "2026-08-30T12:00:00+00:00".to_string(),
            repository: "acme/widgets".to_string(),
            success: false,
            error: Some(mask("update failed for sk-ant-oat01-secret")),
            actor: "automation".to_string(),
            run_id: "run-1".to_string(),
        };

        let line = serde_json::to_string(&record).unwrap();
        assert!(line.contains(r#""operation":"update_secrets""#));
        assert!(line.contains(r#""success":false"#));
        assert!(line.contains("[REDACTED_ACCESS_TOKEN]"));
        assert!(!line.contains("sk-ant-oat01-secret"));
    }

    #[test]
    fn test_audit_record_omits_absent_error() {
        let record = AuditRecord {
            operation: Operation::Refresh,
            timestamp: "2026-08-30T12:00:00+00:00".to_string(),
            repository: "acme/widgets".to_string(),
            success: true,
            error: None,
            actor: "automation".to_string(),
            run_id: "run-1".to_string(),
        };

        let line = serde_json::to_string(&record).unwrap();
        assert!(!line.contains("error"));
        assert!(line.contains(r#""operation":"refresh""#));
    }

    #[test]
    fn test_audit_log_never_panics() {
        let log = AuditLog::new(
            "acme/widgets".to_string(),
            "automation".to_string(),
            "run-1".to_string(),
        );
        log.record(Operation::ValidationFailure, false, Some("bad shape"));
        log.record(Operation::Refresh, true, None);
    }
}
