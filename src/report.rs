// ABOUTME: Run report model, plain-text rendering, and timestamped file writing.
// ABOUTME: One report artifact per run; the Exit line mirrors the process exit code.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};

use crate::health::HealthProbe;
use crate::provider::{DeployOutcome, DeploymentRecord};

pub const REPORTS_DIR: &str = "reports";

/// Everything learned during one run, written exactly once at the end.
#[derive(Debug)]
pub struct RunReport {
    pub actor_name: String,
    pub actor_email: String,
    pub branch: String,
    pub commit_sha: String,
    pub commit_title: String,
    pub diff_summary: String,
    pub deployment: Option<DeploymentRecord>,
    pub outcome: DeployOutcome,
    pub health: Option<Vec<HealthProbe>>,
    pub rolled_back: bool,
}

impl RunReport {
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push(format!("Timestamp: {}", Utc::now().to_rfc3339()));
        lines.push(format!("Actor: {} <{}>", self.actor_name, self.actor_email));
        lines.push(format!("Branch: {}", self.branch));
        lines.push(format!("Commit: {}", self.commit_sha));
        lines.push(format!("Title: {}", self.commit_title));
        lines.push(String::new());

        if !self.diff_summary.is_empty() {
            lines.push("Diff summary:".to_string());
            lines.push(self.diff_summary.trim().to_string());
            lines.push(String::new());
        }

        lines.push("Deployment:".to_string());
        if let Some(dep) = &self.deployment {
            lines.push(format!("  id: {}", dep.id));
            lines.push(format!("  url: {}", dep.url.as_deref().unwrap_or("")));
            lines.push(format!("  target: {}", dep.target));
            lines.push(format!("  state: {}", self.outcome));
            lines.push(format!(
                "  createdAt: {}",
                dep.created_at.map_or(String::new(), |ms| ms.to_string())
            ));
        } else {
            lines.push(format!("  state: {}", self.outcome));
        }
        lines.push(String::new());

        if self.rolled_back {
            lines.push("Rollback: performed (restored pre-run commit)".to_string());
            lines.push(String::new());
        }

        if let Some(health) = &self.health {
            lines.push("Health checks:".to_string());
            for probe in health {
                lines.push(format!(
                    "  GET {} -> {} in {:.2}s",
                    probe.path,
                    probe.status,
                    probe.latency.as_secs_f64()
                ));
            }
            lines.push(String::new());
        }

        lines.push(format!(
            "Exit: {}",
            if self.outcome.is_ready() { "0" } else { "1" }
        ));

        lines.join("\n")
    }

    /// Write the report to a timestamped file under `reports/`.
    /// Each run produces a new artifact; nothing is ever updated in place.
    pub fn write(&self, base_dir: &Path) -> io::Result<PathBuf> {
        let reports_dir = base_dir.join(REPORTS_DIR);
        std::fs::create_dir_all(&reports_dir)?;

        let slug = Local::now().format("%Y%m%d_%H%M%S");
        let path = reports_dir.join(format!("deploy_{slug}.txt"));
        std::fs::write(&path, self.render())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{DeployState, DeployTarget};
    use std::time::Duration;

    fn report(outcome: DeployOutcome) -> RunReport {
        RunReport {
            actor_name: "dev".to_string(),
            actor_email: "dev@example.com".to_string(),
            branch: "main".to_string(),
            commit_sha: "abc123".to_string(),
            commit_title: "feat: ship".to_string(),
            diff_summary: "2 files changed".to_string(),
            deployment: None,
            outcome,
            health: None,
            rolled_back: false,
        }
    }

    #[test]
    fn ready_report_exits_zero() {
        let mut r = report(DeployOutcome::Ready);
        r.deployment = Some(DeploymentRecord {
            id: "dpl_1".to_string(),
            url: Some("https://my-app.vercel.app".to_string()),
            target: DeployTarget::Production,
            state: DeployState::Ready,
            created_at: Some(1700000000000),
        });

        let text = r.render();
        assert!(text.contains("Actor: dev <dev@example.com>"));
        assert!(text.contains("id: dpl_1"));
        assert!(text.contains("url: https://my-app.vercel.app"));
        assert!(text.contains("target: production"));
        assert!(text.contains("state: READY"));
        assert!(text.contains("createdAt: 1700000000000"));
        assert!(text.ends_with("Exit: 0"));
    }

    #[test]
    fn failed_report_exits_one() {
        let text = report(DeployOutcome::Timeout).render();
        assert!(text.contains("state: TIMEOUT"));
        assert!(text.ends_with("Exit: 1"));
    }

    #[test]
    fn dry_run_report_state() {
        let text = report(DeployOutcome::DryRun).render();
        assert!(text.contains("state: DRY_RUN"));
        assert!(text.ends_with("Exit: 1"));
    }

    #[test]
    fn health_section_lists_every_probe_in_order() {
        let mut r = report(DeployOutcome::Ready);
        r.health = Some(vec![
            HealthProbe {
                path: "/".to_string(),
                status: 200,
                latency: Duration::from_millis(120),
            },
            HealthProbe {
                path: "/api/health".to_string(),
                status: 0,
                latency: Duration::ZERO,
            },
        ]);

        let text = r.render();
        let home = text.find("GET / ->").unwrap();
        let api = text.find("GET /api/health -> 0").unwrap();
        assert!(home < api, "probes must appear in configured order");
    }

    #[test]
    fn rollback_is_recorded() {
        let mut r = report(DeployOutcome::Failed(DeployState::Error));
        r.rolled_back = true;
        let text = r.render();
        assert!(text.contains("Rollback: performed"));
        assert!(text.contains("state: ERROR"));
    }

    #[test]
    fn write_creates_timestamped_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = report(DeployOutcome::Ready).write(dir.path()).unwrap();

        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("deploy_"));
        assert!(name.ends_with(".txt"));
        assert_eq!(path.parent().unwrap(), dir.path().join(REPORTS_DIR));
    }
}
