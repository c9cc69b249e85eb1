// ABOUTME: External command execution with timeout and bounded retry.
// ABOUTME: Classifies failures into Timeout, NotFound, and NonZeroExit.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::Command;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Immutable result of one external command invocation.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Classified command execution failures.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("command timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },

    #[error("command not found: {0}")]
    NotFound(String),

    #[error("command failed with exit code {code}: {command}\nstderr: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("failed to execute {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExecError {
    /// A missing binary never fixes itself; everything else may be transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ExecError::NotFound(_))
    }
}

/// Runs external commands from a fixed working directory.
#[derive(Debug, Clone)]
pub struct Runner {
    cwd: PathBuf,
}

impl Runner {
    pub fn new(cwd: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
        }
    }

    /// Execute a command, treating a non-zero exit code as an error.
    pub async fn execute(
        &self,
        argv: &[&str],
        timeout: Option<Duration>,
    ) -> Result<CommandResult, ExecError> {
        let result = self.execute_unchecked(argv, timeout).await?;
        if result.success() {
            Ok(result)
        } else {
            Err(ExecError::NonZeroExit {
                command: argv.join(" "),
                code: result.exit_code,
                stderr: result.stderr,
            })
        }
    }

    /// Execute a command; a non-zero exit code is returned, not raised.
    pub async fn execute_unchecked(
        &self,
        argv: &[&str],
        timeout: Option<Duration>,
    ) -> Result<CommandResult, ExecError> {
        let command = argv.join(" ");
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let start = Instant::now();

        let mut cmd = Command::new(argv[0]);
        cmd.args(&argv[1..])
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExecError::NotFound(argv[0].to_string()));
            }
            Ok(Err(e)) => return Err(ExecError::Io { command, source: e }),
            Err(_) => return Err(ExecError::Timeout { command, timeout }),
        };

        Ok(CommandResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            elapsed: start.elapsed(),
        })
    }

    /// Execute with a fixed-delay retry loop.
    ///
    /// This is deliberately not exponential: command retries use a flat
    /// delay, network calls elsewhere scale their backoff by attempt.
    pub async fn execute_with_retry(
        &self,
        argv: &[&str],
        max_retries: u32,
        delay: Duration,
    ) -> Result<CommandResult, ExecError> {
        let mut last_error = None;

        for attempt in 1..=max_retries.max(1) {
            match self.execute(argv, None).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_retryable() || attempt == max_retries.max(1) {
                        return Err(e);
                    }
                    tracing::warn!(
                        "attempt {attempt}/{max_retries} failed, retrying in {delay:?}: {e}"
                    );
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        // Loop always returns before falling through; kept for totality.
        Err(last_error.unwrap_or(ExecError::NotFound(argv[0].to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> Runner {
        Runner::new(Path::new("."))
    }

    #[tokio::test]
    async fn execute_captures_stdout_and_exit_code() {
        let result = runner().execute(&["echo", "hello"], None).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout.trim(), "hello");
        assert!(result.success());
    }

    #[tokio::test]
    async fn non_zero_exit_is_classified() {
        let err = runner().execute(&["false"], None).await.unwrap_err();
        match err {
            ExecError::NonZeroExit { code, .. } => assert_eq!(code, 1),
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unchecked_returns_non_zero_result() {
        let result = runner().execute_unchecked(&["false"], None).await.unwrap();
        assert_eq!(result.exit_code, 1);
        assert!(!result.success());
    }

    #[tokio::test]
    async fn missing_binary_is_not_found() {
        let err = runner()
            .execute(&["shipout-definitely-not-a-binary"], None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::NotFound(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn timeout_is_classified() {
        let err = runner()
            .execute(&["sleep", "5"], Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn retry_gives_up_on_not_found() {
        let start = Instant::now();
        let err = runner()
            .execute_with_retry(
                &["shipout-definitely-not-a-binary"],
                3,
                Duration::from_secs(2),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::NotFound(_)));
        // Non-retryable failures must not sleep through the retry budget.
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn retry_exhaustion_raises_last_failure() {
        let err = runner()
            .execute_with_retry(&["false"], 2, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::NonZeroExit { .. }));
    }
}
