// ABOUTME: Orchestration controller sequencing repo setup, commit, push, deploy, and verify.
// ABOUTME: Captures pre-run state for rollback and always writes a report, even on failure.

use crate::config::{INCLUDE_PATHS, RunConfig};
use crate::error::{Error, Result};
use crate::health::{self, HealthProbe};
use crate::output::Output;
use crate::process::Runner;
use crate::provider::{self, DeployOutcome, DeploymentRecord};
use crate::repo::{Repo, SetupState};
use crate::report::RunReport;

/// Mutable progress of one run, accumulated so the report can reflect
/// whatever was learned before termination.
struct RunState {
    setup: Option<SetupState>,
    deployment: Option<DeploymentRecord>,
    outcome: DeployOutcome,
    health: Option<Vec<HealthProbe>>,
    rolled_back: bool,
}

impl RunState {
    fn new() -> Self {
        Self {
            setup: None,
            deployment: None,
            outcome: DeployOutcome::Skipped,
            health: None,
            rolled_back: false,
        }
    }
}

/// Run the full push-and-deploy sequence.
///
/// Returns the final deployment outcome; only a READY outcome maps to
/// process exit 0. Once the fatal preconditions pass, a report is written
/// no matter how the run ends, including on interrupt.
pub async fn orchestrate(config: &RunConfig, output: &Output) -> Result<DeployOutcome> {
    let cwd = std::env::current_dir()?;
    let repo = Repo::new(&cwd, config.max_retries, config.retry_delay);

    // Fatal preconditions, checked before any mutation.
    repo.ensure_repository().await?;
    if repo.rebase_in_progress() {
        return Err(Error::Repo(crate::repo::RepoError::RebaseInProgress));
    }

    let mut state = RunState::new();

    let result = tokio::select! {
        res = run_phases(&repo, config, output, &mut state) => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupt received, abandoning run");
            Err(Error::Interrupted)
        }
    };

    // REPORTED is reached from every state. A report-write failure is
    // logged but never masks the run's own result.
    let report = build_report(&repo, config, &state).await;
    match report.write(&cwd) {
        Ok(path) => output.progress(&format!("Report written to {}", path.display())),
        Err(e) => tracing::error!("failed to write report: {e}"),
    }

    result.map(|_| state.outcome)
}

async fn run_phases(
    repo: &Repo,
    config: &RunConfig,
    output: &Output,
    state: &mut RunState,
) -> Result<()> {
    // REPO_VERIFIED -> BRANCH_READY
    let setup = repo.setup(config).await?;
    output.progress(&format!(
        "Repository ready on '{}' (pre-run commit {})",
        config.target_branch, setup.original_sha
    ));
    let remote = setup.remote.clone();
    state.setup = Some(setup);

    // BRANCH_READY -> STAGED -> COMMITTED
    if config.dry_run {
        output.progress("[dry-run] would stage included paths:");
        for path in INCLUDE_PATHS {
            output.progress(&format!("  - {path}"));
        }
        output.progress(&format!(
            "[dry-run] would commit with message:\n{}",
            config.message
        ));
    } else {
        match repo.commit(&config.message).await? {
            Some(sha) => output.progress(&format!("Committed {sha}")),
            None => output.progress("No changes to commit, proceeding with push"),
        }
    }

    // COMMITTED -> PUSHED. A push failure is fatal: deployment is never
    // attempted on a commit the remote does not have.
    if config.skip_push || !config.push_to_remote {
        output.progress("Skipping push per configuration");
    } else if config.dry_run {
        output.progress(&format!(
            "[dry-run] would push to {remote} {}",
            config.target_branch
        ));
    } else {
        repo.push(&config.target_branch, &remote).await?;
        output.progress(&format!("Pushed {} to {remote}", config.target_branch));
    }

    // PUSHED -> DEPLOYING
    if config.dry_run {
        state.outcome = DeployOutcome::DryRun;
        output.progress("[dry-run] deployment skipped");
        return Ok(());
    }

    let runner = Runner::new(&std::env::current_dir()?);
    let (record, outcome) = match provider::deploy(&runner, config, output).await {
        Ok(pair) => pair,
        Err(e) => {
            state.outcome = DeployOutcome::Error;
            maybe_rollback(repo, config, state, output).await;
            return Err(e.into());
        }
    };
    state.deployment = record;
    state.outcome = outcome;

    // {READY | DEPLOY_FAILED} -> [HEALTH_CHECKED] | [ROLLED_BACK]
    if state.outcome.is_ready() {
        match state.deployment.as_ref().and_then(|d| d.url.clone()) {
            Some(url) => {
                output.progress(&format!("Deployment ready: {url}"));
                state.health = Some(health::verify(&url, config, output).await);
            }
            None => {
                tracing::warn!("deployment ready but no URL known, skipping health checks");
            }
        }
    } else {
        output.error(&format!("Deployment failed: {}", state.outcome));
        maybe_rollback(repo, config, state, output).await;
    }

    Ok(())
}

/// Roll back to the pre-run commit, if enabled and if that commit was
/// captured. A rollback failure is logged; it never masks the deployment
/// failure that triggered it.
async fn maybe_rollback(repo: &Repo, config: &RunConfig, state: &mut RunState, output: &Output) {
    if !config.enable_rollback {
        return;
    }
    let Some(setup) = &state.setup else {
        return;
    };

    output.progress(&format!(
        "Rolling back to pre-run commit {}...",
        setup.original_sha
    ));
    match repo.rollback(&setup.original_sha, &setup.remote).await {
        Ok(()) => {
            state.rolled_back = true;
            output.progress("Rollback complete");
        }
        Err(e) => tracing::error!("rollback failed: {e}"),
    }
}

/// Collect report data, tolerating failures of the individual reads so a
/// broken repository state cannot suppress reporting.
async fn build_report(repo: &Repo, config: &RunConfig, state: &RunState) -> RunReport {
    let (actor_name, actor_email) = repo.actor().await;
    let commit_sha = repo.head_sha().await.unwrap_or_else(|_| "unknown".to_string());
    let commit_title = repo.commit_title().await.unwrap_or_default();
    let diff_summary = repo.diff_summary().await;

    RunReport {
        actor_name,
        actor_email,
        branch: config.target_branch.clone(),
        commit_sha,
        commit_title,
        diff_summary,
        deployment: state.deployment.clone(),
        outcome: state.outcome.clone(),
        health: state.health.clone(),
        rolled_back: state.rolled_back,
    }
}

/// List configured remotes, for the `--list-remotes` utility mode.
pub async fn list_remotes(output: &Output) -> Result<()> {
    let repo = current_repo()?;
    repo.ensure_repository().await?;

    output.progress("Available remote repositories:");
    for (name, url) in repo.list_remotes().await? {
        println!("  {name}: {url}");
    }
    Ok(())
}

/// List local and remote branches, for the `--list-branches` utility mode.
pub async fn list_branches(output: &Output) -> Result<()> {
    let repo = current_repo()?;
    repo.ensure_repository().await?;

    output.progress("Local branches:");
    for branch in repo.list_branches(false).await? {
        println!("  {branch}");
    }
    output.progress("Remote branches:");
    for branch in repo.list_branches(true).await? {
        println!("  {branch}");
    }
    Ok(())
}

fn current_repo() -> Result<Repo> {
    let cwd = std::env::current_dir()?;
    let config = RunConfig::template();
    Ok(Repo::new(&cwd, config.max_retries, config.retry_delay))
}
