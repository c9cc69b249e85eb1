// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: One single-purpose command; flags cover branch management, retry tuning, and modes.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "shipout")]
#[command(about = "Push a git-backed project and deploy it through Vercel")]
#[command(version)]
pub struct Cli {
    /// Target branch to push and deploy
    #[arg(long, default_value = "main")]
    pub branch: String,

    /// Commit message (Conventional Commits)
    #[arg(short, long)]
    pub message: Option<String>,

    /// Target repository URL or remote name
    #[arg(long)]
    pub target_repo: Option<String>,

    /// Source branch when creating a new branch
    #[arg(long)]
    pub source_branch: Option<String>,

    /// Create the target branch if it does not exist
    #[arg(long)]
    pub create_branch: bool,

    /// Do not switch to the target branch
    #[arg(long)]
    pub no_switch_branch: bool,

    /// Do not push to the remote repository
    #[arg(long)]
    pub no_push: bool,

    /// Remote repository name
    #[arg(long, default_value = "origin")]
    pub remote_name: String,

    /// Deploy via the provider CLI instead of polling the API
    #[arg(long)]
    pub fallback_to_cli: bool,

    /// Alias for --fallback-to-cli
    #[arg(long, conflicts_with = "fallback_to_cli")]
    pub provider_cli: bool,

    /// Deploy/poll the preview target instead of production
    #[arg(long)]
    pub preview: bool,

    /// Maximum retry attempts for commands and API calls
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Delay between retries in seconds
    #[arg(long, default_value_t = 5)]
    pub retry_delay: u64,

    /// Per-request health check timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub health_check_timeout: u64,

    /// Overall deployment wait timeout in minutes
    #[arg(long, default_value_t = 20)]
    pub deployment_timeout: u64,

    /// Disable automatic rollback on deployment failure
    #[arg(long)]
    pub no_rollback: bool,

    /// Skip git push (advanced)
    #[arg(long)]
    pub skip_push: bool,

    /// Do not push/deploy; log intended actions only
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Minimal output for CI
    #[arg(long, conflicts_with = "json")]
    pub quiet: bool,

    /// JSON lines output for scripting
    #[arg(long)]
    pub json: bool,

    /// List configured remotes and exit
    #[arg(long)]
    pub list_remotes: bool,

    /// List local and remote branches and exit
    #[arg(long)]
    pub list_branches: bool,
}
