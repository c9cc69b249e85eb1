// ABOUTME: Application-wide error types for shipout.
// ABOUTME: Uses thiserror for ergonomic error handling and maps errors to exit codes.

use thiserror::Error;

use crate::process::ExecError;
use crate::provider::ProviderError;
use crate::repo::RepoError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("deployment interrupted")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Map an error to the process exit code.
    ///
    /// `0` is only ever produced by a READY deployment, not by an error.
    /// Distinct codes exist for the two fatal preconditions so callers
    /// can tell them apart from a generic failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Repo(RepoError::NotARepository) => 2,
            Error::Repo(RepoError::RebaseInProgress) => 3,
            Error::Interrupted => 130,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
