// ABOUTME: Repository state manager wrapping git primitives.
// ABOUTME: Branch discovery/creation/switching, include-list staging, commit, push, rollback.

mod error;

pub use error::RepoError;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{FORCE_ADD_PATHS, INCLUDE_PATHS, RunConfig};
use crate::process::Runner;

/// Repository state captured before any mutation this run.
/// `original_sha` is the only commit rollback is ever allowed to target.
#[derive(Debug, Clone)]
pub struct SetupState {
    pub original_branch: String,
    pub original_sha: String,
    /// Effective remote name after target-repo resolution.
    pub remote: String,
}

/// Wraps git operations on one working repository.
pub struct Repo {
    runner: Runner,
    root: PathBuf,
    max_retries: u32,
    retry_delay: Duration,
}

impl Repo {
    pub fn new(root: &Path, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            runner: Runner::new(root),
            root: root.to_path_buf(),
            max_retries,
            retry_delay,
        }
    }

    async fn git(&self, args: &[&str]) -> Result<String, RepoError> {
        let mut argv = vec!["git"];
        argv.extend_from_slice(args);
        let result = self.runner.execute(&argv, None).await?;
        Ok(result.stdout.trim().to_string())
    }

    async fn git_retry(&self, args: &[&str]) -> Result<String, RepoError> {
        let mut argv = vec!["git"];
        argv.extend_from_slice(args);
        let result = self
            .runner
            .execute_with_retry(&argv, self.max_retries, self.retry_delay)
            .await?;
        Ok(result.stdout.trim().to_string())
    }

    async fn git_unchecked(&self, args: &[&str]) -> Result<(i32, String), RepoError> {
        let mut argv = vec!["git"];
        argv.extend_from_slice(args);
        let result = self.runner.execute_unchecked(&argv, None).await?;
        Ok((result.exit_code, result.stdout.trim().to_string()))
    }

    /// Fails with a non-retryable error when the working directory is not a repository.
    pub async fn ensure_repository(&self) -> Result<(), RepoError> {
        match self.git_unchecked(&["rev-parse", "--is-inside-work-tree"]).await {
            Ok((0, out)) if out == "true" => Ok(()),
            _ => Err(RepoError::NotARepository),
        }
    }

    /// A rebase leaves marker directories under .git; deploying over one is fatal.
    pub fn rebase_in_progress(&self) -> bool {
        self.root.join(".git/rebase-apply").exists() || self.root.join(".git/rebase-merge").exists()
    }

    /// Active branch name, or the sentinel "HEAD" when detached.
    pub async fn current_branch(&self) -> Result<String, RepoError> {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    pub async fn head_sha(&self) -> Result<String, RepoError> {
        self.git(&["rev-parse", "HEAD"]).await
    }

    pub async fn commit_title(&self) -> Result<String, RepoError> {
        self.git(&["log", "-1", "--pretty=%s"]).await
    }

    /// Committer identity, falling back to the environment when unconfigured.
    pub async fn actor(&self) -> (String, String) {
        let name = match self.git_unchecked(&["config", "user.name"]).await {
            Ok((0, out)) if !out.is_empty() => out,
            _ => std::env::var("GIT_USER_NAME").unwrap_or_else(|_| "unknown".to_string()),
        };
        let email = match self.git_unchecked(&["config", "user.email"]).await {
            Ok((0, out)) if !out.is_empty() => out,
            _ => std::env::var("GIT_USER_EMAIL").unwrap_or_else(|_| "unknown@example.com".to_string()),
        };
        (name, email)
    }

    /// Human-readable size of the last commit, or a placeholder on the first commit.
    pub async fn diff_summary(&self) -> String {
        let count = match self.git_unchecked(&["rev-list", "--count", "HEAD"]).await {
            Ok((0, out)) => out.parse::<u64>().unwrap_or(0),
            _ => 0,
        };
        if count <= 1 {
            return "(first commit or no prior commit)".to_string();
        }
        match self
            .git_unchecked(&["--no-pager", "diff", "--shortstat", "HEAD~1..HEAD"])
            .await
        {
            Ok((0, out)) => out,
            _ => String::new(),
        }
    }

    /// Stage every include-list path that exists on disk. Paths outside
    /// the policy are never staged, even if modified.
    pub async fn stage_included(&self) -> Result<(), RepoError> {
        for &path in INCLUDE_PATHS {
            if !self.root.join(path).exists() {
                continue;
            }
            if FORCE_ADD_PATHS.contains(&path) {
                self.git_retry(&["add", "-f", path]).await?;
            } else {
                self.git_retry(&["add", path]).await?;
            }
        }
        Ok(())
    }

    pub async fn has_staged_changes(&self) -> Result<bool, RepoError> {
        let (_, out) = self
            .git_unchecked(&["diff", "--cached", "--name-only"])
            .await?;
        Ok(!out.is_empty())
    }

    /// Stage the include list and commit. Returns `Ok(None)` when nothing
    /// ends up staged - an empty commit is a no-op, not an error.
    pub async fn commit(&self, message: &str) -> Result<Option<String>, RepoError> {
        self.stage_included().await?;

        if !self.has_staged_changes().await? {
            return Ok(None);
        }

        self.git_retry(&["commit", "-m", message]).await?;
        Ok(Some(self.head_sha().await?))
    }

    pub async fn branch_exists(&self, name: &str) -> Result<bool, RepoError> {
        let (code, _) = self.git_unchecked(&["rev-parse", "--verify", name]).await?;
        Ok(code == 0)
    }

    pub async fn remote_branch_exists(&self, remote: &str, name: &str) -> Result<bool, RepoError> {
        let (code, out) = self
            .git_unchecked(&["ls-remote", "--heads", remote, name])
            .await?;
        Ok(code == 0 && out.contains(name))
    }

    /// Create a branch from `source` (or the current branch). No-op if it exists.
    pub async fn create_branch(&self, name: &str, source: Option<&str>) -> Result<(), RepoError> {
        if self.branch_exists(name).await? {
            tracing::debug!("branch '{name}' already exists");
            return Ok(());
        }
        match source {
            Some(src) => self.git_retry(&["checkout", "-b", name, src]).await?,
            None => self.git_retry(&["checkout", "-b", name]).await?,
        };
        Ok(())
    }

    /// Switch to a branch: no-op if current, checkout if local, create a
    /// tracking branch if it only exists on the remote, error otherwise.
    pub async fn switch_to_branch(&self, name: &str, remote: &str) -> Result<(), RepoError> {
        if self.current_branch().await? == name {
            tracing::debug!("already on branch '{name}'");
            return Ok(());
        }

        if self.branch_exists(name).await? {
            self.git_retry(&["checkout", name]).await?;
        } else if self.remote_branch_exists(remote, name).await? {
            let upstream = format!("{remote}/{name}");
            self.git_retry(&["checkout", "-b", name, upstream.as_str()])
                .await?;
        } else {
            return Err(RepoError::BranchNotFound(name.to_string()));
        }
        Ok(())
    }

    /// Push `branch` with upstream tracking, switching (and creating) first if needed.
    pub async fn push(&self, branch: &str, remote: &str) -> Result<(), RepoError> {
        if self.current_branch().await? != branch {
            if self.branch_exists(branch).await? {
                self.git_retry(&["checkout", branch]).await?;
            } else {
                self.git_retry(&["checkout", "-b", branch]).await?;
            }
        }
        self.git_retry(&["push", "-u", remote, branch]).await?;
        Ok(())
    }

    /// Hard-reset to the pre-run commit and force-push the current branch.
    pub async fn rollback(&self, previous_sha: &str, remote: &str) -> Result<(), RepoError> {
        self.git_retry(&["reset", "--hard", previous_sha]).await?;
        let branch = self.current_branch().await?;
        self.git_retry(&["push", "--force", remote, branch.as_str()])
            .await?;
        Ok(())
    }

    pub async fn fetch(&self, remote: &str) -> Result<(), RepoError> {
        self.git_retry(&["fetch", remote]).await?;
        Ok(())
    }

    pub async fn get_remote_url(&self, name: &str) -> Option<String> {
        match self.git_unchecked(&["remote", "get-url", name]).await {
            Ok((0, out)) if !out.is_empty() => Some(out),
            _ => None,
        }
    }

    pub async fn list_remotes(&self) -> Result<Vec<(String, String)>, RepoError> {
        let out = self.git(&["remote", "-v"]).await?;
        let mut remotes = Vec::new();
        for line in out.lines() {
            let mut parts = line.split_whitespace();
            if let (Some(name), Some(url)) = (parts.next(), parts.next())
                && !remotes.iter().any(|(n, _): &(String, String)| n == name)
            {
                remotes.push((name.to_string(), url.to_string()));
            }
        }
        Ok(remotes)
    }

    /// Add a remote, updating its URL if it already exists with a different one.
    pub async fn add_remote(&self, name: &str, url: &str) -> Result<(), RepoError> {
        match self.get_remote_url(name).await {
            Some(existing) if existing == url => {
                tracing::debug!("remote '{name}' already points at {url}");
            }
            Some(existing) => {
                tracing::info!("updating remote '{name}' from {existing} to {url}");
                self.git_retry(&["remote", "set-url", name, url]).await?;
            }
            None => {
                self.git_retry(&["remote", "add", name, url]).await?;
            }
        }
        Ok(())
    }

    pub async fn list_branches(&self, remote: bool) -> Result<Vec<String>, RepoError> {
        let out = if remote {
            self.git(&["branch", "-r"]).await?
        } else {
            self.git(&["branch"]).await?
        };
        let mut branches = Vec::new();
        for line in out.lines() {
            let name = line.trim().trim_start_matches("* ");
            let short = name.rsplit('/').next().unwrap_or(name);
            if !short.is_empty() && short != "HEAD" && !branches.contains(&short.to_string()) {
                branches.push(short.to_string());
            }
        }
        Ok(branches)
    }

    /// Resolve the target remote and branch per configuration, capturing the
    /// pre-run state. Restores the original branch on failure before
    /// propagating the error.
    pub async fn setup(&self, config: &RunConfig) -> Result<SetupState, RepoError> {
        let original_branch = self.current_branch().await?;
        let original_sha = self.head_sha().await?;

        match self.setup_inner(config, &original_branch).await {
            Ok(remote) => Ok(SetupState {
                original_branch,
                original_sha,
                remote,
            }),
            Err(e) => {
                if let Err(restore) = self.git_retry(&["checkout", original_branch.as_str()]).await {
                    tracing::warn!("failed to restore branch '{original_branch}': {restore}");
                }
                Err(e)
            }
        }
    }

    async fn setup_inner(
        &self,
        config: &RunConfig,
        original_branch: &str,
    ) -> Result<String, RepoError> {
        let mut remote = config.remote_name.clone();

        if let Some(target_repo) = &config.target_repo {
            if target_repo.starts_with("http://")
                || target_repo.starts_with("https://")
                || target_repo.starts_with("git@")
            {
                self.add_remote(&remote, target_repo).await?;
            } else {
                let remotes = self.list_remotes().await?;
                if !remotes.iter().any(|(name, _)| name == target_repo) {
                    return Err(RepoError::RemoteNotFound(target_repo.clone()));
                }
                remote = target_repo.clone();
            }
        }

        if config.switch_branch && config.target_branch != original_branch {
            let exists_locally = self.branch_exists(&config.target_branch).await?;
            let exists_remotely = !exists_locally
                && self
                    .remote_branch_exists(&remote, &config.target_branch)
                    .await?;

            if !exists_locally && !exists_remotely {
                if config.create_branch {
                    let source = config.source_branch.as_deref().or(Some(original_branch));
                    self.create_branch(&config.target_branch, source).await?;
                } else {
                    return Err(RepoError::BranchNotFound(config.target_branch.clone()));
                }
            } else {
                self.switch_to_branch(&config.target_branch, &remote).await?;
            }
        }

        if config.push_to_remote && !config.skip_push && !config.dry_run {
            self.fetch(&remote).await?;
        }

        Ok(remote)
    }
}
