// ABOUTME: Error types for repository state management.
// ABOUTME: Git preconditions are non-retryable; wrapped command failures may retry.

use crate::process::ExecError;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The working directory is not inside a git repository.
    #[error("not inside a git repository")]
    NotARepository,

    /// A rebase is mid-flight; deploying over it is never safe.
    #[error("rebase in progress, resolve it before deploying")]
    RebaseInProgress,

    /// Branch exists neither locally nor on the remote.
    #[error("branch '{0}' does not exist locally or remotely")]
    BranchNotFound(String),

    /// Named remote is not configured.
    #[error("remote '{0}' does not exist")]
    RemoteNotFound(String),

    /// An underlying git invocation failed.
    #[error("git command failed: {0}")]
    Command(#[from] ExecError),
}

impl RepoError {
    pub fn is_retryable(&self) -> bool {
        match self {
            RepoError::Command(e) => e.is_retryable(),
            _ => false,
        }
    }
}
