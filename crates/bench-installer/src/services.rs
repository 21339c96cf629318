use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bench_core::{keys, BenchError, OrchestrationContext};
use bench_exec::CommandSpec;
use bench_version::VersionTransition;

pub const RELOAD_HINT: &str = "As you have setup your bench for production, you will have to reload \
configuration for nginx and supervisor. To complete the migration, please run the following \
commands:\nsudo service nginx restart\nsudo supervisorctl reload";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigTarget {
    Redis,
    Supervisor,
    Systemd,
    Nginx,
}

impl ConfigTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Redis => "redis",
            Self::Supervisor => "supervisor",
            Self::Systemd => "systemd",
            Self::Nginx => "nginx",
        }
    }
}

/// Regenerates process-supervision and proxy configuration. Template
/// rendering lives outside this tool. Returns `false` when the target was
/// skipped because no regeneration capability is available.
pub trait Reconfigure {
    fn regenerate(&self, ctx: &OrchestrationContext<'_>, target: ConfigTarget) -> Result<bool>;
}

/// Runs `<setup_command> setup <target>` through the external frappe-bench
/// executable named in the upgrade policy. Without one, targets are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandReconfigure;

impl Reconfigure for CommandReconfigure {
    fn regenerate(&self, ctx: &OrchestrationContext<'_>, target: ConfigTarget) -> Result<bool> {
        let Some(program) = ctx.policy.setup_command.as_deref() else {
            tracing::warn!(
                "setup_command is not set in config/upgrade.toml, skipping {} configuration",
                target.as_str()
            );
            return Ok(false);
        };

        let located = ctx.runner().locate(program).ok_or_else(|| {
            BenchError::Environment(format!("setup command '{program}' was not found"))
        })?;
        if is_current_executable(&located) {
            return Err(BenchError::Configuration(format!(
                "setup_command '{program}' resolves to this tool; point it at the frappe-bench \
                 executable"
            ))
            .into());
        }

        let mut spec = CommandSpec::new(program)
            .args(["setup", target.as_str()])
            .current_dir(ctx.layout.root());
        if target != ConfigTarget::Redis {
            spec = spec.arg("--yes");
        }
        ctx.runner()
            .run_checked(&spec)
            .with_context(|| format!("failed regenerating {} config", target.as_str()))?;
        Ok(true)
    }
}

/// Whether `path` is the executable of the running process.
pub fn is_current_executable(path: &Path) -> bool {
    let Ok(current) = std::env::current_exe() else {
        return false;
    };
    let canonical = |path: &Path| fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    canonical(path) == canonical(&current)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostUpgradeReport {
    pub regenerated: Vec<ConfigTarget>,
    pub skipped: Vec<ConfigTarget>,
    pub reload_hint: Option<&'static str>,
}

/// After a major or forced upgrade, regenerates configuration for the
/// process manager the installation restarts on update.
pub fn post_upgrade(
    ctx: &OrchestrationContext<'_>,
    transition: &VersionTransition,
    reconfigure: &dyn Reconfigure,
) -> Result<PostUpgradeReport> {
    if let Some(to) = &transition.to {
        tracing::info!("bench was upgraded to version {to}");
    }

    let mut targets = Vec::new();
    if ctx.config.flag(keys::RESTART_SUPERVISOR_ON_UPDATE) {
        targets.extend([ConfigTarget::Redis, ConfigTarget::Supervisor, ConfigTarget::Nginx]);
    } else if ctx.config.flag(keys::RESTART_SYSTEMD_ON_UPDATE) {
        targets.extend([ConfigTarget::Redis, ConfigTarget::Systemd, ConfigTarget::Nginx]);
    }

    let mut report = PostUpgradeReport::default();
    for target in targets {
        if reconfigure.regenerate(ctx, target)? {
            report.regenerated.push(target);
        } else {
            report.skipped.push(target);
        }
    }

    report.reload_hint = (!report.regenerated.is_empty()).then_some(RELOAD_HINT);
    Ok(report)
}

/// Chooses the supervisor group to restart from `supervisorctl status`
/// output. Older installations used a single `-processes` group or the bare
/// `frappe` group.
pub fn supervisor_group(bench_name: &str, status: &str, web_workers: bool) -> Vec<String> {
    let web = format!("{bench_name}-web:");
    let workers = format!("{bench_name}-workers:");
    let processes = format!("{bench_name}-processes:");

    if web_workers && status.contains(&web) {
        vec![web]
    } else if status.contains(&workers) {
        vec![workers, web]
    } else if status.contains(&processes) {
        vec![processes]
    } else {
        vec!["frappe:".to_string()]
    }
}

pub fn restart_supervisor(ctx: &OrchestrationContext<'_>, web_workers: bool) -> Result<()> {
    let runner = ctx.runner();
    if let Some(custom) = ctx.config.str_value(keys::SUPERVISOR_RESTART_CMD) {
        runner
            .run_checked(&CommandSpec::shell(custom).current_dir(ctx.layout.root()))
            .context("supervisor restart command failed")?;
        return Ok(());
    }

    if runner.locate("supervisorctl").is_none() {
        return Err(BenchError::Environment("supervisorctl is not installed".to_string()).into());
    }
    let status = runner
        .capture(
            &CommandSpec::new("supervisorctl")
                .arg("status")
                .current_dir(ctx.layout.root()),
        )
        .context("failed querying supervisor status")?;
    let groups = supervisor_group(&ctx.layout.bench_name(), &status.stdout, web_workers);

    runner
        .run_checked(
            &CommandSpec::new("supervisorctl")
                .arg("restart")
                .args(groups)
                .current_dir(ctx.layout.root()),
        )
        .context("supervisor restart failed")?;
    Ok(())
}

/// Stops then starts every unit the installation's systemd target requires.
pub fn restart_systemd(ctx: &OrchestrationContext<'_>, web_workers: bool) -> Result<()> {
    let name = ctx.layout.bench_name();
    let target = if web_workers {
        format!("{name}-web.target")
    } else {
        format!("{name}.target")
    };
    for action in ["stop", "start"] {
        let script = format!(
            "sudo systemctl {action} -- $(systemctl show -p Requires {target} | cut -d= -f2)"
        );
        ctx.runner()
            .run_checked(&CommandSpec::shell(script).current_dir(ctx.layout.root()))
            .with_context(|| format!("systemctl {action} failed for {target}"))?;
    }
    Ok(())
}
