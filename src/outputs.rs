// Produced outputs
// Machine-readable key=value lines and a masked human summary

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::guard::mask;
use crate::orchestrator::Outcome;
use crate::store::{ACCESS_TOKEN_SECRET, EXPIRES_AT_SECRET, REFRESH_TOKEN_SECRET};

/// Append the machine-readable outputs for this run.
///
/// Only the refreshed flag and the new expiry are exposed, never the
/// tokens.
pub fn write_outputs(path: &Path, outcome: &Outcome) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open outputs file: {}", path.display()))?;

    writeln!(file, "refreshed={}", outcome.refreshed())?;
    if let Some(triple) = outcome.credential() {
        writeln!(file, "expires_at={}", triple.expires_at)?;
    }

    Ok(())
}

/// Append the human-readable summary block. Every line passes through
/// the masking layer before it is written.
pub fn write_summary(path: &Path, outcome: &Outcome) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open summary file: {}", path.display()))?;

    let body = summary_text(outcome);
    writeln!(file, "{}", mask(&body))?;
    Ok(())
}

fn summary_text(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Skipped { reason } => {
            format!("## Credential refresh\n\nSkipped: {reason}.")
        }
        Outcome::Valid(triple) => format!(
            "## Credential refresh\n\nCredential still valid (expires at {}); nothing to do.",
            triple.expires_at
        ),
        Outcome::Refreshed {
            triple,
            persisted: true,
        } => format!(
            "## Credential refresh\n\nCredential renewed and persisted to the secret store.\nNew expiry: {}.",
            triple.expires_at
        ),
        Outcome::Refreshed {
            triple,
            persisted: false,
        } => format!(
            "## Credential refresh\n\nCredential renewed but NOT persisted: the secret store \
             update failed.\nThis run can proceed, but future runs will reuse the old \
             credential.\nUpdate these repository secrets manually before the next run:\n\
             - {ACCESS_TOKEN_SECRET}\n- {REFRESH_TOKEN_SECRET}\n- {EXPIRES_AT_SECRET} = {}",
            triple.expires_at
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialTriple;
    use std::path::PathBuf;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("credrelay-{tag}-{}", uuid::Uuid::new_v4()))
    }

    fn refreshed_outcome(persisted: bool) -> Outcome {
        Outcome::Refreshed {
            triple: CredentialTriple {
                access_token: "sk-ant-oat01-new-secret".to_string(),
                refresh_token: "sk-ant-ort01-new-secret".to_string(),
                expires_at: 1_700_003_600,
            },
            persisted,
        }
    }

    #[test]
    fn test_outputs_contain_flag_and_expiry_only() {
        let path = temp_path("outputs");
        write_outputs(&path, &refreshed_outcome(true)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(content.contains("refreshed=true"));
        assert!(content.contains("expires_at=1700003600"));
        assert!(!content.contains("sk-ant-"));
    }

    #[test]
    fn test_outputs_for_skipped_run() {
        let path = temp_path("outputs-skip");
        write_outputs(&path, &Outcome::Skipped { reason: "no credential configured" }).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(content.contains("refreshed=false"));
        assert!(!content.contains("expires_at"));
    }

    #[test]
    fn test_outputs_append() {
        let path = temp_path("outputs-append");
        write_outputs(&path, &refreshed_outcome(true)).unwrap();
        write_outputs(&path, &refreshed_outcome(true)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(content.matches("refreshed=true").count(), 2);
    }

    #[test]
    fn test_summary_degraded_lists_secret_names_without_tokens() {
        let path = temp_path("summary");
        write_summary(&path, &refreshed_outcome(false)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(content.contains("NOT persisted"));
        assert!(content.contains(ACCESS_TOKEN_SECRET));
        assert!(content.contains(REFRESH_TOKEN_SECRET));
        assert!(content.contains("1700003600"));
        assert!(!content.contains("new-secret"));
    }

    #[test]
    fn test_summary_masks_injected_token_material() {
        // Even if a token ends up in the outcome text path, the mask
        // layer scrubs it on the way out.
        let text = summary_text(&refreshed_outcome(false));
        assert!(!mask(&text).contains("sk-ant-oat01-new-secret"));
    }
}
