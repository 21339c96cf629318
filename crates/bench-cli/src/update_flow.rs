use std::collections::BTreeMap;

use anyhow::{Context, Result};
use bench_core::{
    find_bench_error, keys, read_apps, read_sites, record_installed_versions, select_apps,
    BackupFailurePolicy, BenchError, InstalledVersion, OrchestrationContext,
};
use bench_installer::{
    backup_all, build_assets, compile_python, migrate_all, post_upgrade, reconcile,
    restart_supervisor, restart_systemd, ReconcileOptions, ReconcileReport, Reconfigure,
};
use bench_sync::{failed_apps, preflight_sync, pull_apps, AppSyncResult};
use bench_version::{detect_upgrade, read_app_version, validate_upgrade_feasible, VersionTransition};

use crate::maintenance::with_maintenance_window;
use crate::prompt::Operator;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum UpgradeState {
    Idle,
    PreflightChecked,
    MaintenanceEntered,
    SourceSynced,
    DependenciesReconciled,
    SitesMigrated,
    AssetsBuilt,
    PostUpgradeReconfigured,
    MaintenanceExited,
    Done,
    Failed,
}

/// Operator controls for one update run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct UpdateOptions {
    pub pull: bool,
    pub patch: bool,
    pub build: bool,
    pub requirements: bool,
    pub backup: bool,
    pub compile: bool,
    pub force: bool,
    pub reset: bool,
    pub restart_supervisor: bool,
    pub restart_systemd: bool,
    pub apps: Vec<String>,
    pub no_pause: bool,
    pub assume_yes: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            pull: false,
            patch: false,
            build: false,
            requirements: false,
            backup: true,
            compile: true,
            force: false,
            reset: false,
            restart_supervisor: false,
            restart_systemd: false,
            apps: Vec::new(),
            no_pause: false,
            assume_yes: false,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Stages {
    pub pull: bool,
    pub patch: bool,
    pub build: bool,
    pub requirements: bool,
}

impl UpdateOptions {
    /// With no stage selected every stage runs.
    pub(crate) fn stages(&self) -> Stages {
        if !(self.pull || self.patch || self.build || self.requirements) {
            return Stages {
                pull: true,
                patch: true,
                build: true,
                requirements: true,
            };
        }
        Stages {
            pull: self.pull,
            patch: self.patch,
            build: self.build,
            requirements: self.requirements,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct UpdateOutcome {
    pub transition: Option<VersionTransition>,
    pub synced: Vec<AppSyncResult>,
    pub reconciled: Option<ReconcileReport>,
    pub migrated_sites: usize,
    pub states: Vec<UpgradeState>,
    pub warnings: Vec<String>,
}

impl UpdateOutcome {
    fn enter(&mut self, state: UpgradeState) {
        tracing::info!("update state {state:?}");
        self.states.push(state);
    }
}

pub(crate) struct UpdateServices<'s> {
    pub operator: &'s dyn Operator,
    pub reconfigure: &'s dyn Reconfigure,
}

/// Runs the whole update. Preflight failures leave the installation untouched;
/// once maintenance mode is entered it is released on every exit path except
/// a held migration failure.
pub(crate) fn run_update(
    ctx: &OrchestrationContext<'_>,
    options: &UpdateOptions,
    services: &UpdateServices<'_>,
) -> Result<UpdateOutcome> {
    let mut outcome = UpdateOutcome::default();
    outcome.enter(UpgradeState::Idle);
    let result = run_update_stages(ctx, options, services, &mut outcome);
    match result {
        Ok(()) => {
            outcome.enter(UpgradeState::Done);
            Ok(outcome)
        }
        Err(err) => {
            outcome.enter(UpgradeState::Failed);
            tracing::debug!("update failed after states {:?}", outcome.states);
            Err(err)
        }
    }
}

fn run_update_stages(
    ctx: &OrchestrationContext<'_>,
    options: &UpdateOptions,
    services: &UpdateServices<'_>,
    outcome: &mut UpdateOutcome,
) -> Result<()> {
    let operator = services.operator;
    if ctx.config.is_release_bench() {
        operator.notify("fail", "Release bench detected, cannot update!");
        return Err(BenchError::ReleaseBench.into());
    }

    let stages = options.stages();
    let installed = read_apps(&ctx.layout)?;
    let apps = if stages.pull && !options.apps.is_empty() {
        select_apps(&installed, &options.apps)?
    } else {
        installed.clone()
    };

    if stages.pull {
        preflight_sync(ctx, &apps, options.reset)?;
    }

    let transition = detect_upgrade(ctx)?;
    if transition.is_major {
        if options.force {
            tracing::warn!(
                "force flag used for a major version change ({transition}); this will take \
                 significant time to migrate and might break custom apps"
            );
        } else {
            let prompt = format!(
                "This update will cause a major version change from {transition}. It will take \
                 significant time to migrate and might break custom apps. Do you want to continue?"
            );
            if !options.assume_yes && !operator.confirm(&prompt)? {
                return Err(BenchError::Aborted("major version update declined".to_string()).into());
            }
        }
    }

    if !options.reset && ctx.config.shallow_clone() {
        let reason = "shallow_clone is set in your bench config. Without --reset your \
                      repositories will be unshallowed. Cancel and run `bench update --reset` to \
                      keep them shallow, after considering what `git reset --hard` does to your \
                      apps. Set shallow_clone to false in common_site_config.json to silence this.";
        if options.no_pause {
            tracing::warn!("{reason}");
        } else {
            operator.pause(ctx.policy.shallow_clone_pause_secs, reason)?;
        }
    }

    let upgrade_steps = transition.is_major || options.force;
    if upgrade_steps {
        validate_upgrade_feasible(ctx.runner(), &transition)?;
    }
    outcome.transition = Some(transition.clone());
    outcome.enter(UpgradeState::PreflightChecked);

    with_maintenance_window(ctx, || {
        outcome.enter(UpgradeState::MaintenanceEntered);

        if options.backup {
            operator.notify("step", "Backing up sites...");
            let sites = read_sites(&ctx.layout)?;
            if let Err(err) = backup_all(ctx, &sites) {
                match ctx.policy.backup_failure {
                    BackupFailurePolicy::Abort => return Err(err),
                    BackupFailurePolicy::Continue => {
                        let warning = format!("site backup failed, continuing: {err:#}");
                        tracing::warn!("{warning}");
                        outcome.warnings.push(warning);
                    }
                }
            }
        }

        if stages.pull {
            operator.notify("step", "Updating apps source...");
            outcome.synced = pull_apps(ctx, &apps, options.reset)?;
            let failed = failed_apps(&outcome.synced);
            if !failed.is_empty() {
                return Err(BenchError::SourceSync(format!(
                    "could not update {}",
                    failed.join(", ")
                ))
                .into());
            }
            outcome.enter(UpgradeState::SourceSynced);
        }

        if stages.requirements {
            operator.notify("step", "Setting up requirements...");
            let report = reconcile(ctx, &installed, ReconcileOptions::default())?;
            outcome.warnings.extend(report.warnings.iter().cloned());
            outcome.reconciled = Some(report);
            outcome.enter(UpgradeState::DependenciesReconciled);

            if stages.pull {
                advance_installed_versions(ctx, &outcome.synced)?;
            }
        }

        if stages.patch {
            operator.notify("step", "Patching sites...");
            let sites = read_sites(&ctx.layout)?;
            outcome.migrated_sites = migrate_all(ctx, &sites)?;
            outcome.enter(UpgradeState::SitesMigrated);
        }

        if stages.build {
            operator.notify("step", "Building assets...");
            build_assets(ctx, None)?;
            outcome.enter(UpgradeState::AssetsBuilt);
        }

        if upgrade_steps {
            let report = post_upgrade(ctx, &transition, services.reconfigure)?;
            if !report.skipped.is_empty() {
                let skipped: Vec<&str> = report.skipped.iter().map(|target| target.as_str()).collect();
                let warning = format!(
                    "configuration not regenerated for {}; set setup_command in config/upgrade.toml \
                     or run the frappe-bench setup commands manually",
                    skipped.join(", ")
                );
                operator.notify("warn", &warning);
                outcome.warnings.push(warning);
            }
            if let Some(hint) = report.reload_hint {
                operator.notify("warn", hint);
            }
            outcome.enter(UpgradeState::PostUpgradeReconfigured);
        }

        if stages.pull && options.compile {
            operator.notify("step", "Compiling Python files...");
            if !compile_python(ctx)? {
                outcome.warnings.push("byte-compiling app sources failed".to_string());
            }
        }

        if options.restart_supervisor || ctx.config.flag(keys::RESTART_SUPERVISOR_ON_UPDATE) {
            restart_supervisor(ctx, false)?;
        }
        if options.restart_systemd || ctx.config.flag(keys::RESTART_SYSTEMD_ON_UPDATE) {
            restart_systemd(ctx, false)?;
        }
        Ok(())
    })
    .map_err(|err| annotate_failure(err, outcome))?;

    outcome.enter(UpgradeState::MaintenanceExited);
    Ok(())
}

fn annotate_failure(err: anyhow::Error, outcome: &UpdateOutcome) -> anyhow::Error {
    if matches!(find_bench_error(&err), Some(BenchError::Patch { .. })) {
        let last = outcome.states.last().copied().unwrap_or(UpgradeState::Idle);
        return err.context(format!("update stopped after {last:?}"));
    }
    err
}

/// Advances the installed-version marker of every application whose pull and
/// dependency reconciliation both succeeded in this run.
fn advance_installed_versions(ctx: &OrchestrationContext<'_>, synced: &[AppSyncResult]) -> Result<()> {
    if ctx.dry_run {
        return Ok(());
    }
    let installed = read_apps(&ctx.layout)?;
    let mut updates = BTreeMap::new();
    for result in synced.iter().filter(|result| result.is_synced()) {
        let Some(app) = installed.iter().find(|app| app.name == result.app) else {
            continue;
        };
        updates.insert(
            app.name.clone(),
            InstalledVersion {
                version: read_app_version(app)?,
                branch: result.branch.clone(),
                commit: result.commit.clone(),
            },
        );
    }
    record_installed_versions(&ctx.layout, &updates).context("failed recording installed versions")
}
