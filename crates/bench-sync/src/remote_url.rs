use anyhow::Result;
use bench_core::{read_apps, BenchError, OrchestrationContext};

use crate::run_git_command;

/// `https://github.com/frappe/erpnext.git` → `erpnext`.
pub fn app_name_from_git_url(git_url: &str) -> Option<String> {
    let last = git_url
        .trim()
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

/// Points the `upstream` remote of the matching installed application at
/// `git_url`.
pub fn set_remote_url(ctx: &OrchestrationContext<'_>, git_url: &str) -> Result<String> {
    let app_name = app_name_from_git_url(git_url)
        .ok_or_else(|| BenchError::InvalidRemote(format!("cannot derive an app name from '{git_url}'")))?;

    let app = read_apps(&ctx.layout)?
        .into_iter()
        .find(|app| app.name == app_name)
        .ok_or_else(|| BenchError::InvalidRemote(format!("No app named {app_name}")))?;

    if app.is_git_repo() {
        run_git_command(
            ctx.runner(),
            &app.path,
            &["remote", "set-url", "upstream", git_url],
            &app.name,
        )?;
    } else {
        tracing::warn!("app '{}' is not a git repository, remote left unchanged", app.name);
    }
    Ok(app_name)
}
