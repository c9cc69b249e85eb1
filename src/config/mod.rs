// ABOUTME: Per-run configuration for shipout.
// ABOUTME: Holds the include-list staging policy and all retry/timeout tuning.

use std::time::Duration;

use crate::cli::Cli;
use crate::provider::DeployTarget;

/// Paths staged for deployment. Anything outside this list is never
/// shipped, however modified - the deployment surface is an allow-list.
pub const INCLUDE_PATHS: &[&str] = &[
    "src",
    "app",
    "public",
    "scripts",
    ".github",
    "supabase",
    "infra",
    "terraform",
    "tests",
    "test",
    "__tests__",
    "components",
    "hooks",
    "lib",
    "utils",
    "types",
    "middleware.ts",
    "next.config.mjs",
    "tailwind.config.ts",
    "tsconfig.json",
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "next.config.ts",
    "next.config.js",
    "vercel.json",
    "Dockerfile",
    "docker-compose.yml",
    ".vercel/project.json",
];

/// Paths that need `git add -f` because they are usually ignored.
/// The project-link metadata must travel with the commit.
pub const FORCE_ADD_PATHS: &[&str] = &[".vercel/project.json"];

pub const DEFAULT_COMMIT_MESSAGE: &str = "chore(deploy): push to main for production release\n\n\
     Context: automated push & deploy via shipout.";

/// Immutable per-run settings, created once from CLI input.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub health_timeout: Duration,
    pub deploy_timeout: Duration,
    pub fallback_to_cli: bool,
    pub enable_rollback: bool,
    pub target_repo: Option<String>,
    pub target_branch: String,
    pub source_branch: Option<String>,
    pub create_branch: bool,
    pub switch_branch: bool,
    pub push_to_remote: bool,
    pub remote_name: String,
    pub skip_push: bool,
    pub dry_run: bool,
    pub target: DeployTarget,
    pub message: String,
}

impl RunConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            max_retries: cli.max_retries,
            retry_delay: Duration::from_secs(cli.retry_delay),
            health_timeout: Duration::from_secs(cli.health_check_timeout),
            deploy_timeout: Duration::from_secs(cli.deployment_timeout * 60),
            fallback_to_cli: cli.fallback_to_cli || cli.provider_cli,
            enable_rollback: !cli.no_rollback,
            target_repo: cli.target_repo.clone(),
            target_branch: cli.branch.clone(),
            source_branch: cli.source_branch.clone(),
            create_branch: cli.create_branch,
            switch_branch: !cli.no_switch_branch,
            push_to_remote: !cli.no_push,
            remote_name: cli.remote_name.clone(),
            skip_push: cli.skip_push,
            dry_run: cli.dry_run,
            target: if cli.preview {
                DeployTarget::Preview
            } else {
                DeployTarget::Production
            },
            message: cli
                .message
                .clone()
                .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string()),
        }
    }

    /// Defaults for tests and documentation examples.
    pub fn template() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            health_timeout: Duration::from_secs(30),
            deploy_timeout: Duration::from_secs(20 * 60),
            fallback_to_cli: false,
            enable_rollback: true,
            target_repo: None,
            target_branch: "main".to_string(),
            source_branch: None,
            create_branch: false,
            switch_branch: true,
            push_to_remote: true,
            remote_name: "origin".to_string(),
            skip_push: false,
            dry_run: false,
            target: DeployTarget::Production,
            message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_from_cli() {
        let cli = Cli::parse_from(["shipout"]);
        let config = RunConfig::from_cli(&cli);

        assert_eq!(config.target_branch, "main");
        assert_eq!(config.remote_name, "origin");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(5));
        assert_eq!(config.deploy_timeout, Duration::from_secs(1200));
        assert_eq!(config.target, DeployTarget::Production);
        assert!(config.enable_rollback);
        assert!(config.push_to_remote);
        assert!(!config.fallback_to_cli);
        assert!(!config.dry_run);
    }

    #[test]
    fn provider_cli_flag_enables_fallback_mode() {
        let cli = Cli::parse_from(["shipout", "--provider-cli"]);
        let config = RunConfig::from_cli(&cli);
        assert!(config.fallback_to_cli);
    }

    #[test]
    fn preview_flag_selects_preview_target() {
        let cli = Cli::parse_from(["shipout", "--preview"]);
        let config = RunConfig::from_cli(&cli);
        assert_eq!(config.target, DeployTarget::Preview);
    }

    #[test]
    fn no_rollback_disables_rollback() {
        let cli = Cli::parse_from(["shipout", "--no-rollback"]);
        let config = RunConfig::from_cli(&cli);
        assert!(!config.enable_rollback);
    }

    #[test]
    fn include_list_carries_project_link_metadata() {
        assert!(INCLUDE_PATHS.contains(&".vercel/project.json"));
        for p in FORCE_ADD_PATHS {
            assert!(INCLUDE_PATHS.contains(p), "{p} must be in the include list");
        }
    }

    #[test]
    fn custom_message_overrides_default() {
        let cli = Cli::parse_from(["shipout", "-m", "feat: ship it"]);
        let config = RunConfig::from_cli(&cli);
        assert_eq!(config.message, "feat: ship it");
    }
}
