// ABOUTME: Deployment provider abstraction - remote API polling and direct CLI strategies.
// ABOUTME: Defines the status vocabulary and the fallback controller between strategies.

pub mod api;
pub mod cli;
mod error;

pub use error::ProviderError;

use std::fmt;

use serde::Serialize;

use crate::config::RunConfig;
use crate::output::Output;
use crate::process::Runner;

/// Deployment environment distinguished by the provider. Production is default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployTarget {
    Production,
    Preview,
}

impl DeployTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployTarget::Production => "production",
            DeployTarget::Preview => "preview",
        }
    }
}

impl fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-side deployment state as reported by polling.
///
/// `Unknown` passes through states the API may grow; anything unrecognized
/// is treated as transient so polling keeps observing it until timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployState {
    Queued,
    Initializing,
    Building,
    Ready,
    Error,
    Canceled,
    Unknown(String),
}

impl DeployState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "QUEUED" => DeployState::Queued,
            "INITIALIZING" => DeployState::Initializing,
            "BUILDING" => DeployState::Building,
            "READY" => DeployState::Ready,
            "ERROR" => DeployState::Error,
            "CANCELED" => DeployState::Canceled,
            other => DeployState::Unknown(other.to_string()),
        }
    }

    /// Terminal states stop the poll loop.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeployState::Ready | DeployState::Error | DeployState::Canceled
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeployState::Queued => "QUEUED",
            DeployState::Initializing => "INITIALIZING",
            DeployState::Building => "BUILDING",
            DeployState::Ready => "READY",
            DeployState::Error => "ERROR",
            DeployState::Canceled => "CANCELED",
            DeployState::Unknown(s) => s,
        }
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot of one provider deployment, one per poll.
#[derive(Debug, Clone)]
pub struct DeploymentRecord {
    pub id: String,
    pub url: Option<String>,
    pub target: DeployTarget,
    pub state: DeployState,
    /// Provider creation timestamp in epoch milliseconds.
    pub created_at: Option<i64>,
}

/// Run-level deployment outcome produced by either strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Deployment reached READY.
    Ready,
    /// Deployment ended in a terminal failure state (ERROR or CANCELED).
    Failed(DeployState),
    /// The bounded poll window expired.
    Timeout,
    /// Polling was abandoned after too many consecutive errors.
    Abandoned,
    /// CLI deploy succeeded but no recognizable URL was printed. Non-fatal,
    /// but not READY either: there is nothing to health-check.
    CliSuccessNoUrl,
    /// CLI deploy exited non-zero.
    CliError,
    /// The deployment phase itself raised before producing an outcome.
    Error,
    /// Dry-run mode: nothing was deployed.
    DryRun,
    /// Deployment phase never ran.
    Skipped,
}

impl DeployOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, DeployOutcome::Ready)
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeployOutcome::Ready => "READY",
            DeployOutcome::Failed(state) => state.as_str(),
            DeployOutcome::Timeout => "TIMEOUT",
            DeployOutcome::Abandoned => "ERROR",
            DeployOutcome::CliSuccessNoUrl => "CLI_SUCCESS_NO_URL",
            DeployOutcome::CliError => "CLI_ERROR",
            DeployOutcome::Error => "ERROR",
            DeployOutcome::DryRun => "DRY_RUN",
            DeployOutcome::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for DeployOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fallback controller between the two deployment strategies.
///
/// Fallback enabled means the CLI strategy is the operative mode and runs
/// directly; only with fallback disabled does API polling run, and its
/// failure is surfaced as-is. This mirrors the tool's established behavior
/// rather than a try-then-fallback sequence.
pub async fn deploy(
    runner: &Runner,
    config: &RunConfig,
    output: &Output,
) -> Result<(Option<DeploymentRecord>, DeployOutcome), ProviderError> {
    if config.fallback_to_cli {
        output.progress("Deploying via provider CLI...");
        Ok(cli::deploy(runner, config.target, config.deploy_timeout).await)
    } else {
        output.progress("Waiting for provider deployment via API...");
        let api = api::VercelApi::from_env(config)?;
        Ok(api
            .wait_for_deployment(&config.target_branch, config.target, config.deploy_timeout, output)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_vocabulary_round_trips() {
        for raw in ["QUEUED", "INITIALIZING", "BUILDING", "READY", "ERROR", "CANCELED"] {
            assert_eq!(DeployState::parse(raw).as_str(), raw);
        }
    }

    #[test]
    fn unknown_states_pass_through() {
        let state = DeployState::parse("PROVISIONING");
        assert_eq!(state, DeployState::Unknown("PROVISIONING".to_string()));
        assert!(!state.is_terminal());
    }

    #[test]
    fn terminal_states_stop_polling() {
        assert!(DeployState::Ready.is_terminal());
        assert!(DeployState::Error.is_terminal());
        assert!(DeployState::Canceled.is_terminal());
        assert!(!DeployState::Queued.is_terminal());
        assert!(!DeployState::Initializing.is_terminal());
        assert!(!DeployState::Building.is_terminal());
    }

    #[test]
    fn only_ready_counts_as_success() {
        assert!(DeployOutcome::Ready.is_ready());
        assert!(!DeployOutcome::CliSuccessNoUrl.is_ready());
        assert!(!DeployOutcome::Timeout.is_ready());
        assert!(!DeployOutcome::DryRun.is_ready());
        assert!(!DeployOutcome::Failed(DeployState::Canceled).is_ready());
    }

    #[test]
    fn outcome_report_strings() {
        assert_eq!(DeployOutcome::Ready.as_str(), "READY");
        assert_eq!(DeployOutcome::Failed(DeployState::Canceled).as_str(), "CANCELED");
        assert_eq!(DeployOutcome::Timeout.as_str(), "TIMEOUT");
        assert_eq!(DeployOutcome::DryRun.as_str(), "DRY_RUN");
        assert_eq!(DeployOutcome::CliSuccessNoUrl.as_str(), "CLI_SUCCESS_NO_URL");
    }

    #[test]
    fn production_is_default_target_string() {
        assert_eq!(DeployTarget::Production.as_str(), "production");
        assert_eq!(DeployTarget::Preview.as_str(), "preview");
    }
}
