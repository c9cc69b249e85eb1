// ABOUTME: Integration tests for the shipout CLI binary.
// ABOUTME: Validates --help, precondition exit codes, and the dry-run report artifact.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn shipout_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("shipout"))
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git should be runnable");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn init_repo(dir: &Path) {
    git(dir, &["init", "-q"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    std::fs::write(dir.join("package.json"), "{}\n").unwrap();
    git(dir, &["add", "package.json"]);
    git(dir, &["commit", "-q", "-m", "chore: init"]);
    git(dir, &["branch", "-M", "main"]);
}

#[test]
fn help_shows_deployment_flags() {
    shipout_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--branch"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--fallback-to-cli"))
        .stdout(predicate::str::contains("--no-rollback"));
}

#[test]
fn not_a_repository_exits_2() {
    let dir = tempfile::tempdir().unwrap();

    shipout_cmd()
        .current_dir(dir.path())
        .args(["--dry-run", "--no-push"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not inside a git repository"));
}

#[test]
fn rebase_in_progress_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    std::fs::create_dir_all(dir.path().join(".git/rebase-merge")).unwrap();

    shipout_cmd()
        .current_dir(dir.path())
        .args(["--dry-run", "--no-push"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("rebase in progress"));
}

#[test]
fn dry_run_writes_report_and_mutates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());

    // A working-tree change inside the include policy that a real run would commit.
    std::fs::write(dir.path().join("package.json"), "{\"name\":\"x\"}\n").unwrap();
    let sha_before = git(dir.path(), &["rev-parse", "HEAD"]);

    shipout_cmd()
        .current_dir(dir.path())
        .args(["--dry-run", "--no-push"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("would stage included paths"))
        .stdout(predicate::str::contains("  - package.json"))
        .stdout(predicate::str::contains("  - .vercel/project.json"))
        .stderr(predicate::str::contains("DRY_RUN"));

    // Git state untouched: no commit, nothing staged.
    assert_eq!(git(dir.path(), &["rev-parse", "HEAD"]), sha_before);
    assert_eq!(git(dir.path(), &["diff", "--cached", "--name-only"]), "");

    // Exactly one report artifact with the dry-run state and exit line.
    let reports: Vec<_> = std::fs::read_dir(dir.path().join("reports"))
        .expect("reports directory should exist")
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(reports.len(), 1);
    let content = std::fs::read_to_string(&reports[0]).unwrap();
    assert!(content.contains("state: DRY_RUN"));
    assert!(content.contains("Actor: Test User <test@example.com>"));
    assert!(content.trim_end().ends_with("Exit: 1"));
}

#[test]
fn list_remotes_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    git(dir.path(), &["remote", "add", "origin", "https://example.com/app.git"]);

    shipout_cmd()
        .current_dir(dir.path())
        .arg("--list-remotes")
        .assert()
        .success()
        .stdout(predicate::str::contains("origin: https://example.com/app.git"));
}

#[test]
fn list_branches_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());

    shipout_cmd()
        .current_dir(dir.path())
        .arg("--list-branches")
        .assert()
        .success()
        .stdout(predicate::str::contains("main"));
}

#[test]
fn conflicting_output_modes_are_rejected() {
    shipout_cmd()
        .args(["--quiet", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
