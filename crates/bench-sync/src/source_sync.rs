use anyhow::Result;
use bench_core::{
    add_excluded_app, read_excluded_apps, Application, BenchError, OrchestrationContext,
};
use bench_exec::CommandSpec;

use crate::{
    current_branch, git_supports_shallow_clone, has_local_changes, head_commit,
    preferred_remote, run_git_command, AppSyncResult, SyncStatus,
};

/// Refuses to run when a checked application sits on a forbidden branch.
pub fn validate_branches(ctx: &OrchestrationContext<'_>, apps: &[Application]) -> Result<()> {
    let runner = ctx.runner();
    for app in apps {
        if !ctx.policy.branch_checked_apps.contains(&app.name) || !app.is_git_repo() {
            continue;
        }
        let branch = current_branch(runner, &app.path, &app.name)?;
        if ctx.policy.forbidden_branches.contains(&branch) {
            return Err(BenchError::InvalidBranch {
                app: app.name.clone(),
                reason: format!(
                    "branch '{branch}' is no longer maintained; switch to a versioned branch \
                     (for example `git checkout version-15`) before updating"
                ),
            }
            .into());
        }
    }
    Ok(())
}

/// Without a reset, every application that will be pulled must have a clean
/// working tree.
pub fn ensure_no_local_changes(ctx: &OrchestrationContext<'_>, apps: &[Application]) -> Result<()> {
    let excluded = read_excluded_apps(&ctx.layout)?;
    for app in apps {
        if excluded.contains(&app.name) || !app.is_git_repo() {
            continue;
        }
        if has_local_changes(ctx.runner(), &app.path, &app.name)? {
            return Err(BenchError::LocalChanges(app.name.clone()).into());
        }
    }
    Ok(())
}

/// Checks that abort a sync before anything is pulled: branch policy, and
/// local changes unless the sync resets.
pub fn preflight_sync(ctx: &OrchestrationContext<'_>, apps: &[Application], reset: bool) -> Result<()> {
    validate_branches(ctx, apps)?;
    if !reset {
        ensure_no_local_changes(ctx, apps)?;
    }
    Ok(())
}

/// Pulls every application after [`preflight_sync`]. A failing application
/// is recorded and its siblings still sync.
pub fn pull_all(
    ctx: &OrchestrationContext<'_>,
    apps: &[Application],
    reset: bool,
) -> Result<Vec<AppSyncResult>> {
    preflight_sync(ctx, apps, reset)?;
    pull_apps(ctx, apps, reset)
}

/// Pulls without the preflight checks, for callers that already ran them.
pub fn pull_apps(
    ctx: &OrchestrationContext<'_>,
    apps: &[Application],
    reset: bool,
) -> Result<Vec<AppSyncResult>> {
    let excluded = read_excluded_apps(&ctx.layout)?;
    let mut results = Vec::with_capacity(apps.len());
    for app in apps {
        if excluded.contains(&app.name) {
            tracing::info!("skipping pull for app {}, it is excluded", app.name);
            results.push(AppSyncResult::skipped(&app.name, "excluded"));
            continue;
        }
        if !app.is_git_repo() {
            results.push(AppSyncResult::skipped(&app.name, "not a git repository"));
            continue;
        }

        let remote = match preferred_remote(ctx.runner(), &app.path, &app.name) {
            Ok(Some(remote)) => remote,
            Ok(None) => {
                if !ctx.dry_run {
                    add_excluded_app(&ctx.layout, &app.name)?;
                }
                tracing::warn!(
                    "skipping pull for app {}, it has no remote; added to excluded apps",
                    app.name
                );
                results.push(AppSyncResult::skipped(&app.name, "no remote"));
                continue;
            }
            Err(err) => {
                results.push(failed_result(app, None, None, &err));
                continue;
            }
        };

        results.push(pull_app(ctx, app, &remote, reset));
    }
    Ok(results)
}

pub fn pull_app(
    ctx: &OrchestrationContext<'_>,
    app: &Application,
    remote: &str,
    reset: bool,
) -> AppSyncResult {
    let mut branch = None;
    let outcome = (|| -> Result<(SyncStatus, String)> {
        let runner = ctx.runner();
        let shallow_clone = ctx.config.shallow_clone();

        if (!shallow_clone || !reset) && app.is_shallow() {
            let suffix = if reset { "" } else { " to safely pull remote changes" };
            tracing::info!("unshallowing {}{suffix}", app.name);
            run_git_command(runner, &app.path, &["fetch", remote, "--unshallow"], &app.name)?;
        }

        let current = current_branch(runner, &app.path, &app.name)?;
        branch = Some(current.clone());
        let before = head_commit(runner, &app.path, &app.name)?;

        tracing::info!("pulling {}", app.name);
        if reset {
            let tracking = format!("{remote}/{current}");
            if shallow_clone && git_supports_shallow_clone(runner)? {
                run_git_command(
                    runner,
                    &app.path,
                    &["fetch", "--depth=1", "--no-tags", remote, current.as_str()],
                    &app.name,
                )?;
                run_git_command(runner, &app.path, &["reset", "--hard", tracking.as_str()], &app.name)?;
                run_git_command(runner, &app.path, &["reflog", "expire", "--all"], &app.name)?;
                run_git_command(runner, &app.path, &["gc", "--prune=all"], &app.name)?;
            } else {
                run_git_command(runner, &app.path, &["fetch", "--all"], &app.name)?;
                run_git_command(runner, &app.path, &["reset", "--hard", tracking.as_str()], &app.name)?;
            }
        } else {
            let mut args = vec!["pull"];
            if ctx.config.flag(bench_core::keys::REBASE_ON_PULL) {
                args.push("--rebase");
            }
            args.push(remote);
            args.push(current.as_str());
            run_git_command(runner, &app.path, &args, &app.name)?;
        }

        let purge = CommandSpec::new("find")
            .args([".", "-name", "*.pyc", "-delete"])
            .current_dir(&app.path);
        runner.run(&purge)?;

        let after = head_commit(runner, &app.path, &app.name)?;
        let status = if before == after && !before.is_empty() {
            SyncStatus::UpToDate
        } else {
            SyncStatus::Updated
        };
        Ok((status, after))
    })();

    match outcome {
        Ok((status, commit)) => AppSyncResult {
            app: app.name.clone(),
            status,
            remote: Some(remote.to_string()),
            branch,
            commit: Some(commit).filter(|commit| !commit.is_empty()),
            error: None,
        },
        Err(err) => failed_result(app, Some(remote), branch, &err),
    }
}

fn failed_result(
    app: &Application,
    remote: Option<&str>,
    branch: Option<String>,
    err: &anyhow::Error,
) -> AppSyncResult {
    tracing::warn!("sync failed for app '{}': {err:#}", app.name);
    AppSyncResult {
        app: app.name.clone(),
        status: SyncStatus::Failed,
        remote: remote.map(ToString::to_string),
        branch,
        commit: None,
        error: Some(format!("{err:#}")),
    }
}
