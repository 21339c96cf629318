use std::path::Path;

use anyhow::{Context, Result};
use bench_exec::{CommandRunner, CommandSpec};

pub(crate) fn base_git_command(repo_root: &Path) -> CommandSpec {
    CommandSpec::new("git")
        .current_dir(repo_root)
        .env("GIT_TERMINAL_PROMPT", "0")
}

pub(crate) fn git_command(repo_root: &Path, args: &[&str]) -> CommandSpec {
    base_git_command(repo_root).args(args.iter().copied())
}

pub(crate) fn run_git_command(
    runner: &dyn CommandRunner,
    repo_root: &Path,
    args: &[&str],
    app_name: &str,
) -> Result<()> {
    runner
        .run_checked(&git_command(repo_root, args))
        .with_context(|| format!("app '{}' git {} failed", app_name, args.join(" ")))?;
    Ok(())
}

fn query_git(
    runner: &dyn CommandRunner,
    repo_root: &Path,
    args: &[&str],
    app_name: &str,
) -> Result<String> {
    let output = runner
        .capture_checked(&git_command(repo_root, args))
        .with_context(|| format!("app '{}' git {} failed", app_name, args.join(" ")))?;
    Ok(output.stdout_trimmed().to_string())
}

pub fn list_remotes(runner: &dyn CommandRunner, repo_root: &Path, app_name: &str) -> Result<Vec<String>> {
    let raw = query_git(runner, repo_root, &["remote"], app_name)?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect())
}

/// `upstream` when present, otherwise the first listed remote.
pub fn select_remote(remotes: &[String]) -> Option<&str> {
    if remotes.iter().any(|remote| remote == "upstream") {
        return Some("upstream");
    }
    remotes.first().map(String::as_str)
}

pub fn preferred_remote(
    runner: &dyn CommandRunner,
    repo_root: &Path,
    app_name: &str,
) -> Result<Option<String>> {
    let remotes = list_remotes(runner, repo_root, app_name)?;
    Ok(select_remote(&remotes).map(ToString::to_string))
}

pub fn current_branch(runner: &dyn CommandRunner, repo_root: &Path, app_name: &str) -> Result<String> {
    let branch = query_git(runner, repo_root, &["rev-parse", "--abbrev-ref", "HEAD"], app_name)?;
    if branch.is_empty() {
        anyhow::bail!("app '{app_name}' git rev-parse returned no branch");
    }
    Ok(branch)
}

pub fn head_commit(runner: &dyn CommandRunner, repo_root: &Path, app_name: &str) -> Result<String> {
    query_git(runner, repo_root, &["rev-parse", "HEAD"], app_name)
}

pub fn has_local_changes(
    runner: &dyn CommandRunner,
    repo_root: &Path,
    app_name: &str,
) -> Result<bool> {
    let status = query_git(runner, repo_root, &["status", "--porcelain"], app_name)?;
    Ok(!status.is_empty())
}

/// Updates `<remote>/<branch>` without touching the working tree. Returns
/// `false` when the fetch fails, which callers treat as "remote unknown".
pub fn fetch_remote_branch(
    runner: &dyn CommandRunner,
    repo_root: &Path,
    remote: &str,
    branch: &str,
    shallow: bool,
) -> Result<bool> {
    let mut args = vec!["fetch"];
    if shallow {
        args.push("--depth=1");
    }
    args.extend(["--no-tags", remote, branch]);
    let spec = git_command(repo_root, &args);
    let output = runner
        .capture(&spec)
        .with_context(|| format!("failed fetching {remote}/{branch}"))?;
    if !output.is_success() {
        tracing::warn!("`{}` failed: {}", spec.log_line(), output.stderr.trim());
    }
    Ok(output.is_success())
}

/// Contents of `path` on `<remote>/<branch>`, or `None` when the ref or file
/// does not exist there.
pub fn show_file_at(
    runner: &dyn CommandRunner,
    repo_root: &Path,
    remote: &str,
    branch: &str,
    path: &str,
) -> Result<Option<String>> {
    let object = format!("{remote}/{branch}:{path}");
    let output = runner
        .capture(&git_command(repo_root, &["show", &object]))
        .with_context(|| format!("failed reading {object}"))?;
    if output.is_success() {
        return Ok(Some(output.stdout));
    }
    tracing::debug!("git show {object} failed: {}", output.stderr.trim());
    Ok(None)
}

/// Parses `git version 2.39.2` into `(2, 39)`.
pub fn parse_git_version(raw: &str) -> Option<(u64, u64)> {
    let version = raw.split_whitespace().nth(2)?;
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts
        .next()
        .map(|minor| {
            minor
                .chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
        })
        .and_then(|minor| minor.parse().ok())
        .unwrap_or(0);
    Some((major, minor))
}

/// Shallow fetches need git newer than 1.9.
pub fn git_supports_shallow_clone(runner: &dyn CommandRunner) -> Result<bool> {
    let output = runner
        .capture_checked(&CommandSpec::new("git").arg("--version"))
        .context("failed querying git version")?;
    Ok(parse_git_version(output.stdout_trimmed()).is_some_and(|version| version > (1, 9)))
}
