use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bench_core::{
    find_benches, find_parent_bench, keys, parse_app_list, parse_config_value, read_apps,
    read_sites, BenchError, BenchLayout, OrchestrationContext,
};
use bench_exec::{CommandRunner, DryRunRunner, SystemRunner};
use bench_installer::{
    backup_all, build_assets, migrate_all, reconcile, restart_supervisor, restart_systemd,
    CommandReconfigure, ReconcileOptions,
};
use bench_sync::{resolve_app_tag, set_remote_url, GithubOrgLookup, SyncStatus};

use crate::completion::write_completions_script;
use crate::logs::init_logging;
use crate::prompt::TerminalOperator;
use crate::render::{OutputStyle, TerminalRenderer};
use crate::update_flow::{run_update, UpdateOptions, UpdateOutcome, UpdateServices};
use crate::{Cli, Commands, ConfigCommands, UpdateArgs};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Completions { shell } => {
            let mut stdout = std::io::stdout();
            return write_completions_script(*shell, &mut stdout);
        }
        Commands::Find { directory } => {
            let _guard = init_logging(cli.verbose, None)?;
            let directory = match directory {
                Some(directory) => directory.clone(),
                None => std::env::current_dir().context("failed reading current directory")?,
            };
            for bench in find_benches(&directory)? {
                println!("{}", bench.display());
            }
            return Ok(());
        }
        _ => {}
    }

    let root = resolve_bench_root(cli.bench.as_deref())?;
    let layout = BenchLayout::new(root);
    let _guard = init_logging(cli.verbose, Some(&layout.logs_dir()))?;
    tracing::debug!("using installation {}", layout.root().display());

    let renderer = TerminalRenderer::current();
    let system = SystemRunner::new().with_color(renderer.style() == OutputStyle::Rich);
    let runner: Box<dyn CommandRunner> = if cli.dry_run {
        Box::new(DryRunRunner::new(system))
    } else {
        Box::new(system)
    };
    let ctx = OrchestrationContext::load(layout, runner.as_ref())?.with_dry_run(cli.dry_run);

    run_bench_command(&ctx, renderer, cli.command)
}

fn run_bench_command(
    ctx: &OrchestrationContext<'_>,
    renderer: TerminalRenderer,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Update(args) => {
            let options = update_options(&args);
            let operator = TerminalOperator::new(renderer);
            let reconfigure = CommandReconfigure;
            let services = UpdateServices {
                operator: &operator,
                reconfigure: &reconfigure,
            };
            let outcome = run_update(ctx, &options, &services)?;
            renderer.print_section("Update summary");
            renderer.print_lines(&format_update_summary(&outcome));
            renderer.print_status("done", "Bench updated");
        }
        Commands::Migrate => {
            let sites = read_sites(&ctx.layout)?;
            let migrated = migrate_all(ctx, &sites)?;
            renderer.print_status("ok", &format!("migrated {migrated} site(s)"));
        }
        Commands::Backup => {
            let sites = read_sites(&ctx.layout)?;
            backup_all(ctx, &sites)?;
            renderer.print_status("ok", &format!("backed up {} site(s)", sites.len()));
        }
        Commands::Build { app } => {
            build_assets(ctx, app.as_deref())?;
            renderer.print_status("ok", "assets built");
        }
        Commands::Requirements { dev } => {
            let apps = read_apps(&ctx.layout)?;
            let options = ReconcileOptions {
                dev,
                skip_node: false,
            };
            let report = reconcile(ctx, &apps, options)?;
            for warning in &report.warnings {
                renderer.print_status("warn", warning);
            }
            renderer.print_status("ok", "requirements updated");
        }
        Commands::Restart {
            supervisor,
            systemd,
            web_workers,
        } => {
            if restart_with_systemd(ctx, supervisor, systemd) {
                restart_systemd(ctx, web_workers)?;
            } else {
                restart_supervisor(ctx, web_workers)?;
            }
        }
        Commands::Config { command } => run_config_command(ctx, command)?,
        Commands::SetUrl { git_url } => {
            let app = set_remote_url(ctx, &git_url)?;
            renderer.print_status("ok", &format!("{app}: upstream set to {git_url}"));
        }
        Commands::Resolve { tag } => {
            let lookup = GithubOrgLookup::new()?;
            let resolved = resolve_app_tag(&tag, &lookup)?;
            match resolved.tag {
                Some(tag) => println!("{}/{}@{tag}", resolved.org, resolved.repo),
                None => println!("{}/{}", resolved.org, resolved.repo),
            }
        }
        Commands::Find { .. } | Commands::Completions { .. } => {}
    }
    Ok(())
}

fn run_config_command(ctx: &OrchestrationContext<'_>, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Get { key } => match ctx.config.get(&key) {
            Some(serde_json::Value::String(value)) => println!("{value}"),
            Some(value) => println!("{value}"),
            None => {
                return Err(BenchError::Configuration(format!("key '{key}' is not set")).into())
            }
        },
        ConfigCommands::Set { key, value } => {
            if ctx.dry_run {
                tracing::info!("dry-run: {key} left unchanged");
                return Ok(());
            }
            ctx.config_store().set(&key, parse_config_value(&value))?;
        }
    }
    Ok(())
}

/// `--bench`, else the nearest parent installation of the working directory,
/// stopping at the home directory.
pub(crate) fn resolve_bench_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed reading current directory")?;
    let home = std::env::var_os("HOME").map(PathBuf::from);
    find_parent_bench(&cwd, home.as_deref())
        .ok_or_else(|| BenchError::NotABench(cwd.display().to_string()).into())
}

pub(crate) fn update_options(args: &UpdateArgs) -> UpdateOptions {
    let apps = match &args.apps {
        Some(raw) if args.pull => parse_app_list(raw),
        _ => Vec::new(),
    };
    UpdateOptions {
        pull: args.pull,
        patch: args.patch,
        build: args.build,
        requirements: args.requirements,
        backup: !args.no_backup,
        compile: !args.no_compile,
        force: args.force,
        reset: args.reset,
        restart_supervisor: args.restart_supervisor,
        restart_systemd: args.restart_systemd,
        apps,
        no_pause: args.no_pause,
        assume_yes: args.yes,
    }
}

/// Without an explicit choice the configured restart preference decides,
/// falling back to supervisor.
pub(crate) fn restart_with_systemd(
    ctx: &OrchestrationContext<'_>,
    supervisor: bool,
    systemd: bool,
) -> bool {
    if supervisor || systemd {
        return systemd;
    }
    ctx.config.flag(keys::RESTART_SYSTEMD_ON_UPDATE)
        && !ctx.config.flag(keys::RESTART_SUPERVISOR_ON_UPDATE)
}

pub(crate) fn format_update_summary(outcome: &UpdateOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(transition) = &outcome.transition {
        lines.push(format!("core version: {transition}"));
    }
    for result in &outcome.synced {
        let status = match &result.status {
            SyncStatus::Updated => "updated".to_string(),
            SyncStatus::UpToDate => "up to date".to_string(),
            SyncStatus::Skipped { reason } => format!("skipped ({reason})"),
            SyncStatus::Failed => "failed".to_string(),
        };
        lines.push(format!("{}: {status}", result.app));
    }
    if let Some(backend) = outcome.reconciled.as_ref().and_then(|report| report.node_backend) {
        lines.push(format!("node packages: {}", backend.as_str()));
    }
    lines.push(format!("sites migrated: {}", outcome.migrated_sites));
    for warning in &outcome.warnings {
        lines.push(format!("warning: {warning}"));
    }
    lines
}
