// ABOUTME: Direct CLI deployment strategy invoking the vercel tool as a subprocess.
// ABOUTME: Extracts the deployment URL from command output; a missing URL is non-fatal.

use std::time::Duration;

use super::{DeployOutcome, DeployState, DeployTarget, DeploymentRecord};
use crate::process::{ExecError, Runner};

const CLI_DEPLOYMENT_ID: &str = "cli-deployment";

/// Deploy by invoking the provider CLI directly, bounded by the overall
/// deployment timeout. On success the deployment URL is scavenged from
/// stdout; the provider prints it but offers no structured output.
pub async fn deploy(
    runner: &Runner,
    target: DeployTarget,
    timeout: Duration,
) -> (Option<DeploymentRecord>, DeployOutcome) {
    let mut argv = vec!["vercel", "deploy", "--yes"];
    if target == DeployTarget::Production {
        argv.push("--prod");
    }

    let result = match runner.execute_unchecked(&argv, Some(timeout)).await {
        Ok(result) => result,
        Err(ExecError::Timeout { .. }) => {
            tracing::error!("provider CLI timed out");
            return (None, DeployOutcome::Timeout);
        }
        Err(e) => {
            tracing::error!("provider CLI failed to run: {e}");
            return (None, DeployOutcome::CliError);
        }
    };

    if !result.success() {
        tracing::error!("provider CLI exited {}: {}", result.exit_code, result.stderr.trim());
        return (None, DeployOutcome::CliError);
    }

    match extract_url(&result.stdout) {
        Some(url) => {
            let record = DeploymentRecord {
                id: CLI_DEPLOYMENT_ID.to_string(),
                url: Some(url),
                target,
                state: DeployState::Ready,
                created_at: None,
            };
            (Some(record), DeployOutcome::Ready)
        }
        None => {
            tracing::warn!("provider CLI succeeded but printed no recognizable deployment URL");
            (None, DeployOutcome::CliSuccessNoUrl)
        }
    }
}

/// Scan CLI output for a deployment URL.
pub fn extract_url(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("https://") && line.contains(".vercel.app"))
        .map(String::from)
}
