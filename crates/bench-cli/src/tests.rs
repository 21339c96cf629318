use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use bench_core::{
    exit_code_for, find_bench_error, read_installed_versions, BackupFailurePolicy, BenchConfig,
    BenchError, BenchLayout, ConfigStore, MigrationFailurePolicy, OrchestrationContext,
};
use bench_exec::{CommandOutput, RecordingRunner};
use bench_installer::{build_assets, post_upgrade, CommandReconfigure, ConfigTarget, Reconfigure};
use clap::{CommandFactory, Parser};
use serde_json::{json, Value};

use super::*;
use crate::completion::write_completions_script;
use crate::dispatch::{format_update_summary, restart_with_systemd, update_options};
use crate::logs::filter_directive;
use crate::maintenance::{set_maintenance, with_maintenance_window};
use crate::prompt::{countdown, parse_confirmation, Operator};
use crate::render::{output_style_for, render_section_header, render_status_line, OutputStyle};
use crate::update_flow::{run_update, UpdateOptions, UpdateServices, UpgradeState};

static TEST_BENCH_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn update_parses_stage_flags_and_app_list() {
    let cli = Cli::try_parse_from([
        "bench", "update", "--pull", "--no-backup", "--apps", "erpnext, hrms", "-y",
    ])
    .expect("must parse update");

    let Commands::Update(args) = cli.command else {
        panic!("expected update command");
    };
    let options = update_options(&args);
    assert!(options.pull);
    assert!(!options.backup);
    assert!(options.compile);
    assert!(options.assume_yes);
    assert_eq!(options.apps, vec!["erpnext".to_string(), "hrms".to_string()]);
}

#[test]
fn update_ignores_app_list_without_pull() {
    let cli = Cli::try_parse_from(["bench", "update", "--patch", "--apps", "erpnext"])
        .expect("must parse update");
    let Commands::Update(args) = cli.command else {
        panic!("expected update command");
    };

    let options = update_options(&args);

    assert!(options.apps.is_empty());
    assert!(options.backup);
}

#[test]
fn global_flags_parse_after_subcommand() {
    let cli = Cli::try_parse_from(["bench", "migrate", "--bench", "/srv/bench", "-vv", "--dry-run"])
        .expect("must parse global flags");

    assert_eq!(cli.bench, Some(PathBuf::from("/srv/bench")));
    assert_eq!(cli.verbose, 2);
    assert!(cli.dry_run);
    assert!(matches!(cli.command, Commands::Migrate));
}

#[test]
fn restart_rejects_both_process_managers() {
    let result = Cli::try_parse_from(["bench", "restart", "--supervisor", "--systemd"]);
    assert!(result.is_err());
}

#[test]
fn no_stage_selected_runs_every_stage() {
    let stages = UpdateOptions::default().stages();
    assert!(stages.pull && stages.patch && stages.build && stages.requirements);

    let only_patch = UpdateOptions {
        patch: true,
        ..UpdateOptions::default()
    }
    .stages();
    assert!(only_patch.patch);
    assert!(!only_patch.pull && !only_patch.build && !only_patch.requirements);
}

#[test]
fn release_bench_refuses_update_without_side_effects() {
    let root = scaffold_bench(&["frappe"], &["a.local"], json!({"release_bench": 1}));
    let layout = BenchLayout::new(&root);
    let before = fs::read_to_string(layout.common_site_config_path()).expect("must read config");
    let runner = git_runner();
    let ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");
    let operator = ScriptedOperator::answering(true);

    let err = run(&ctx, &UpdateOptions::default(), &operator).expect_err("release bench must fail");

    assert_eq!(find_bench_error(&err), Some(&BenchError::ReleaseBench));
    assert_eq!(exit_code_for(&err), 1);
    assert!(runner.calls().is_empty());
    let after = fs::read_to_string(layout.common_site_config_path()).expect("must read config");
    assert_eq!(before, after);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn pull_and_patch_without_backup_touches_only_selected_stages() {
    let root = scaffold_bench(&["frappe"], &["a.local", "b.local"], json!({}));
    let layout = BenchLayout::new(&root);
    let runner = git_runner();
    let ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");
    let operator = ScriptedOperator::answering(true);
    let options = UpdateOptions {
        pull: true,
        patch: true,
        backup: false,
        ..UpdateOptions::default()
    };

    let outcome = run(&ctx, &options, &operator).expect("update must succeed");

    assert_eq!(runner.count_matching("git pull"), 1);
    assert_eq!(runner.count_matching("pip"), 0);
    assert_eq!(runner.count_matching("npm"), 0);
    assert_eq!(runner.count_matching("yarn"), 0);
    assert_eq!(runner.count_matching("--site a.local migrate"), 1);
    assert_eq!(runner.count_matching("--site b.local migrate"), 1);
    assert_eq!(runner.count_matching("frappe build"), 0);
    assert_eq!(runner.count_matching("--site a.local backup"), 0);
    assert_eq!(outcome.migrated_sites, 2);
    assert_eq!(
        outcome.states,
        vec![
            UpgradeState::Idle,
            UpgradeState::PreflightChecked,
            UpgradeState::MaintenanceEntered,
            UpgradeState::SourceSynced,
            UpgradeState::SitesMigrated,
            UpgradeState::MaintenanceExited,
            UpgradeState::Done,
        ]
    );

    let config = ConfigStore::for_bench(&layout).load().expect("must load config");
    assert!(!config.maintenance_mode());
    assert!(!config.pause_scheduler());
    assert_eq!(config.get("maintenance_mode"), Some(&json!(0)));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn default_update_backs_up_before_pulling_and_builds_last() {
    let root = scaffold_bench(&["frappe"], &["a.local"], json!({}));
    let layout = BenchLayout::new(&root);
    let runner = git_runner();
    let ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");
    let operator = ScriptedOperator::answering(true);

    run(&ctx, &UpdateOptions::default(), &operator).expect("update must succeed");

    let lines = runner.lines();
    let position = |needle: &str| {
        lines
            .iter()
            .position(|line| line.contains(needle))
            .unwrap_or_else(|| panic!("missing command containing '{needle}'"))
    };
    assert!(position("--site a.local backup") < position("git pull"));
    assert!(position("git pull") < position("pip install"));
    assert!(position("pip install") < position("--site a.local migrate"));
    assert!(position("--site a.local migrate") < position("frappe build"));
    assert!(position("frappe build") < position("compileall"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn successful_sync_and_reconcile_advance_installed_markers() {
    let root = scaffold_bench(&["frappe"], &[], json!({}));
    let layout = BenchLayout::new(&root);
    write_version(&layout, "frappe", "14.2.0");
    let runner = git_runner().respond("git rev-parse HEAD", CommandOutput::with_stdout("abc123\n"));
    let ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");
    let operator = ScriptedOperator::answering(true);
    let options = UpdateOptions {
        pull: true,
        requirements: true,
        ..UpdateOptions::default()
    };

    run(&ctx, &options, &operator).expect("update must succeed");

    let markers = read_installed_versions(&layout).expect("must read markers");
    let frappe = markers.get("frappe").expect("must record frappe");
    assert_eq!(frappe.version.as_deref(), Some("14.2.0"));
    assert_eq!(frappe.branch.as_deref(), Some("develop"));
    assert_eq!(frappe.commit.as_deref(), Some("abc123"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn failed_migration_releases_maintenance_by_default() {
    let root = scaffold_bench(&["frappe"], &["a.local", "b.local"], json!({}));
    let layout = BenchLayout::new(&root);
    let runner = git_runner().respond("--site b.local migrate", CommandOutput::failure(2, "patch failed"));
    let ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");
    let operator = ScriptedOperator::answering(true);

    let err = run(&ctx, &patch_only(), &operator).expect_err("migration must fail");

    assert!(matches!(find_bench_error(&err), Some(BenchError::Patch { .. })));
    assert_eq!(exit_code_for(&err), 2);
    let config = ConfigStore::for_bench(&layout).load().expect("must load config");
    assert!(!config.maintenance_mode());
    assert!(!config.pause_scheduler());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn failed_migration_holds_maintenance_when_configured() {
    let root = scaffold_bench(&["frappe"], &["a.local"], json!({}));
    let layout = BenchLayout::new(&root);
    let runner = git_runner().respond("--site a.local migrate", CommandOutput::failure(1, "patch failed"));
    let mut ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");
    ctx.policy.migration_failure = MigrationFailurePolicy::Hold;
    let operator = ScriptedOperator::answering(true);

    let err = run(&ctx, &patch_only(), &operator).expect_err("migration must fail");

    assert!(matches!(find_bench_error(&err), Some(BenchError::Patch { .. })));
    let config = ConfigStore::for_bench(&layout).load().expect("must load config");
    assert!(config.maintenance_mode());
    assert!(config.pause_scheduler());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn failed_app_sync_aborts_before_migration_and_releases_maintenance() {
    let root = scaffold_bench(&["frappe", "erpnext"], &["a.local"], json!({}));
    let layout = BenchLayout::new(&root);
    let runner = git_runner().respond("git pull upstream develop", CommandOutput::failure(1, "conflict"));
    let ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");
    let operator = ScriptedOperator::answering(true);
    let options = UpdateOptions {
        pull: true,
        patch: true,
        backup: false,
        ..UpdateOptions::default()
    };

    let err = run(&ctx, &options, &operator).expect_err("sync failure must abort");

    assert!(matches!(find_bench_error(&err), Some(BenchError::SourceSync(_))));
    assert!(format!("{err:#}").contains("frappe"));
    assert_eq!(runner.count_matching("git pull"), 2);
    assert_eq!(runner.count_matching("migrate"), 0);
    let config = ConfigStore::for_bench(&layout).load().expect("must load config");
    assert!(!config.maintenance_mode());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn local_changes_abort_before_maintenance() {
    let root = scaffold_bench(&["frappe"], &["a.local"], json!({}));
    let layout = BenchLayout::new(&root);
    let runner = git_runner().respond("git status --porcelain", CommandOutput::with_stdout(" M hooks.py\n"));
    let ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");
    let operator = ScriptedOperator::answering(true);

    let err = run(&ctx, &UpdateOptions::default(), &operator).expect_err("dirty tree must abort");

    assert!(matches!(find_bench_error(&err), Some(BenchError::LocalChanges(app)) if app == "frappe"));
    assert_eq!(runner.count_matching("git pull"), 0);
    let config = ConfigStore::for_bench(&layout).load().expect("must load config");
    assert_eq!(config.get("maintenance_mode"), None);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn declined_major_upgrade_aborts_without_mutation() {
    let root = scaffold_bench(&["frappe"], &["a.local"], json!({}));
    let layout = BenchLayout::new(&root);
    write_version(&layout, "frappe", "13.4.0");
    let runner = major_upgrade_runner();
    let ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");
    let operator = ScriptedOperator::answering(false);

    let err = run(&ctx, &UpdateOptions::default(), &operator).expect_err("decline must abort");

    assert!(matches!(find_bench_error(&err), Some(BenchError::Aborted(_))));
    assert_eq!(operator.prompts.borrow().len(), 1);
    assert!(operator.prompts.borrow()[0].contains("13.4.0 -> 14.0.0"));
    assert_eq!(runner.count_matching("git pull"), 0);
    assert_eq!(runner.count_matching("backup"), 0);
    let config = ConfigStore::for_bench(&layout).load().expect("must load config");
    assert_eq!(config.get("maintenance_mode"), None);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn forced_major_upgrade_skips_prompt_and_regenerates_configuration() {
    let root = scaffold_bench(
        &["frappe"],
        &[],
        json!({"restart_supervisor_on_update": 1, "supervisor_restart_cmd": "true"}),
    );
    let layout = BenchLayout::new(&root);
    write_version(&layout, "frappe", "13.4.0");
    let runner = major_upgrade_runner();
    let ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");
    let operator = ScriptedOperator::answering(false);
    let reconfigure = FakeReconfigure::default();
    let options = UpdateOptions {
        force: true,
        backup: false,
        ..UpdateOptions::default()
    };

    let outcome = run_update(
        &ctx,
        &options,
        &UpdateServices {
            operator: &operator,
            reconfigure: &reconfigure,
        },
    )
    .expect("forced update must succeed");

    assert!(operator.prompts.borrow().is_empty());
    assert!(outcome.transition.as_ref().is_some_and(|transition| transition.is_major));
    assert_eq!(
        *reconfigure.targets.borrow(),
        vec![ConfigTarget::Redis, ConfigTarget::Supervisor, ConfigTarget::Nginx]
    );
    assert!(outcome.states.contains(&UpgradeState::PostUpgradeReconfigured));
    assert_eq!(runner.count_matching("sh -c true"), 1);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn platform_commands_never_reinvoke_this_cli() {
    let root = scaffold_bench(
        &["frappe"],
        &[],
        json!({"restart_supervisor_on_update": 1, "supervisor_restart_cmd": "true"}),
    );
    let layout = BenchLayout::new(&root);
    let runner = RecordingRunner::new();
    let mut ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");
    ctx.policy.setup_command = Some("/home/frappe/.local/bin/bench".to_string());

    build_assets(&ctx, None).expect("must build");
    build_assets(&ctx, Some("erpnext")).expect("must build app");
    let transition = bench_version::compare_versions("14.0.0", "15.0.0");
    post_upgrade(&ctx, &transition, &CommandReconfigure).expect("must reconfigure");

    let calls = runner.calls();
    assert_eq!(calls.len(), 5);
    for call in &calls {
        assert_ne!(call.program, "bench");
        let argv = std::iter::once(call.program.clone()).chain(call.args.iter().cloned());
        assert!(
            Cli::try_parse_from(argv).is_err(),
            "`{}` must not be a command of this tool",
            call.display_line()
        );
    }
    assert_eq!(calls[0].program, layout.env_python().display().to_string());
    assert_eq!(calls[0].cwd.as_deref(), Some(layout.sites_dir().as_path()));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn major_upgrade_without_setup_command_warns_and_completes() {
    let root = scaffold_bench(&["frappe"], &[], json!({"restart_systemd_on_update": 1}));
    let layout = BenchLayout::new(&root);
    write_version(&layout, "frappe", "13.4.0");
    let runner = major_upgrade_runner();
    let ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");
    let operator = ScriptedOperator::answering(true);
    let options = UpdateOptions {
        patch: true,
        backup: false,
        ..UpdateOptions::default()
    };

    let outcome = run_update(
        &ctx,
        &options,
        &UpdateServices {
            operator: &operator,
            reconfigure: &CommandReconfigure,
        },
    )
    .expect("update must complete without a setup command");

    assert!(outcome.states.contains(&UpgradeState::PostUpgradeReconfigured));
    assert!(outcome
        .warnings
        .iter()
        .any(|warning| warning.contains("redis, systemd, nginx")));
    assert_eq!(runner.count_matching(" setup "), 0);
    let config = ConfigStore::for_bench(&layout).load().expect("must load config");
    assert!(!config.maintenance_mode());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn shallow_clone_pause_honours_no_pause() {
    let root = scaffold_bench(&["frappe"], &[], json!({"shallow_clone": 1}));
    let layout = BenchLayout::new(&root);
    let runner = git_runner();
    let ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");

    let operator = ScriptedOperator::answering(true);
    run(&ctx, &patch_only(), &operator).expect("update must succeed");
    assert_eq!(*operator.pauses.borrow(), vec![10]);

    let operator = ScriptedOperator::answering(true);
    let options = UpdateOptions {
        no_pause: true,
        ..patch_only()
    };
    run(&ctx, &options, &operator).expect("update must succeed");
    assert!(operator.pauses.borrow().is_empty());

    let operator = ScriptedOperator::answering(true);
    let options = UpdateOptions {
        reset: true,
        ..patch_only()
    };
    run(&ctx, &options, &operator).expect("update must succeed");
    assert!(operator.pauses.borrow().is_empty());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn backup_failure_aborts_or_continues_by_policy() {
    let root = scaffold_bench(&["frappe"], &["a.local"], json!({}));
    let layout = BenchLayout::new(&root);
    let runner = git_runner().respond("--site a.local backup", CommandOutput::failure(3, "disk full"));
    let mut ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");
    let options = UpdateOptions {
        patch: true,
        ..UpdateOptions::default()
    };

    let operator = ScriptedOperator::answering(true);
    let err = run(&ctx, &options, &operator).expect_err("backup failure must abort");
    assert_eq!(exit_code_for(&err), 3);
    assert_eq!(runner.count_matching("migrate"), 0);
    let config = ConfigStore::for_bench(&layout).load().expect("must load config");
    assert!(!config.maintenance_mode());

    ctx.policy.backup_failure = BackupFailurePolicy::Continue;
    let outcome = run(&ctx, &options, &operator).expect("update must continue");
    assert_eq!(outcome.migrated_sites, 1);
    assert!(outcome.warnings.iter().any(|warning| warning.contains("backup")));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn configured_restart_runs_after_update() {
    let root = scaffold_bench(&["frappe"], &[], json!({"restart_systemd_on_update": true}));
    let layout = BenchLayout::new(&root);
    let runner = git_runner();
    let ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");
    let operator = ScriptedOperator::answering(true);

    run(&ctx, &patch_only(), &operator).expect("update must succeed");

    assert_eq!(runner.count_matching("systemctl stop"), 1);
    assert_eq!(runner.count_matching("systemctl start"), 1);
    assert_eq!(runner.count_matching("supervisorctl"), 0);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn maintenance_window_clears_flags_after_body_error() {
    let root = scaffold_bench(&["frappe"], &[], json!({"keep": "me"}));
    let layout = BenchLayout::new(&root);
    let runner = RecordingRunner::new();
    let ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");

    let result: Result<()> = with_maintenance_window(&ctx, || {
        let config = ConfigStore::for_bench(&layout).load()?;
        assert!(config.maintenance_mode());
        assert!(config.pause_scheduler());
        Err(BenchError::Environment("boom".to_string()).into())
    });

    assert!(result.is_err());
    let config = ConfigStore::for_bench(&layout).load().expect("must load config");
    assert!(!config.maintenance_mode());
    assert!(!config.pause_scheduler());
    assert_eq!(config.get("keep"), Some(&json!("me")));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn dry_run_leaves_maintenance_flags_untouched() {
    let root = scaffold_bench(&["frappe"], &[], json!({}));
    let layout = BenchLayout::new(&root);
    let runner = RecordingRunner::new();
    let ctx = OrchestrationContext::load(layout.clone(), &runner)
        .expect("must load context")
        .with_dry_run(true);

    set_maintenance(&ctx, true).expect("dry-run must succeed");

    let config = ConfigStore::for_bench(&layout).load().expect("must load config");
    assert_eq!(config.get("maintenance_mode"), None);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn restart_choice_follows_flags_then_config() {
    let runner = RecordingRunner::new();
    let layout = BenchLayout::new("/srv/bench");
    let mut values = serde_json::Map::new();
    values.insert("restart_systemd_on_update".to_string(), json!(1));
    let ctx = OrchestrationContext::new(
        layout,
        BenchConfig::from_map(values),
        Default::default(),
        &runner,
    );

    assert!(restart_with_systemd(&ctx, false, false));
    assert!(!restart_with_systemd(&ctx, true, false));
    assert!(restart_with_systemd(&ctx, false, true));
}

#[test]
fn update_summary_lists_transition_and_sites() {
    let root = scaffold_bench(&["frappe"], &["a.local"], json!({}));
    let layout = BenchLayout::new(&root);
    let runner = git_runner();
    let ctx = OrchestrationContext::load(layout.clone(), &runner).expect("must load context");
    let operator = ScriptedOperator::answering(true);
    let options = UpdateOptions {
        pull: true,
        patch: true,
        ..UpdateOptions::default()
    };

    let outcome = run(&ctx, &options, &operator).expect("update must succeed");
    let lines = format_update_summary(&outcome);

    assert_eq!(lines[0], "core version: unknown -> unknown");
    assert!(lines.contains(&"frappe: updated".to_string()));
    assert!(lines.contains(&"sites migrated: 1".to_string()));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn confirmation_accepts_only_yes() {
    assert!(parse_confirmation("y\n"));
    assert!(parse_confirmation(" YES "));
    assert!(!parse_confirmation(""));
    assert!(!parse_confirmation("no"));
    assert!(!parse_confirmation("yep"));
}

#[test]
fn countdown_ticks_until_total_elapses() {
    let mut ticks = Vec::new();
    countdown(Duration::from_millis(250), |elapsed| ticks.push(elapsed));
    assert!(ticks.len() >= 2);
    assert_eq!(ticks.last().copied(), Some(Duration::from_millis(250)));
    assert!(ticks.windows(2).all(|pair| pair[0] <= pair[1]));

    let mut zero = Vec::new();
    countdown(Duration::ZERO, |elapsed| zero.push(elapsed));
    assert_eq!(zero, vec![Duration::ZERO]);
}

#[test]
fn status_lines_render_plain_and_rich() {
    assert_eq!(render_status_line(OutputStyle::Plain, "ok", "done"), "[ok] done");
    assert_eq!(render_section_header(OutputStyle::Plain, "Update summary"), "Update summary...");

    let rich = render_status_line(OutputStyle::Rich, "fail", "boom");
    assert!(rich.contains("[fail]"));
    assert!(rich.contains('\u{1b}'));
}

#[test]
fn output_style_respects_terminal_and_no_color() {
    assert_eq!(output_style_for(true, false), OutputStyle::Rich);
    assert_eq!(output_style_for(true, true), OutputStyle::Plain);
    assert_eq!(output_style_for(false, false), OutputStyle::Plain);
}

#[test]
fn verbosity_maps_to_filter_directive() {
    assert_eq!(filter_directive(0), "warn");
    assert_eq!(filter_directive(1), "info");
    assert_eq!(filter_directive(5), "debug");
}

#[test]
fn completions_are_generated_for_each_shell() {
    for shell in [
        CliCompletionShell::Bash,
        CliCompletionShell::Zsh,
        CliCompletionShell::Fish,
        CliCompletionShell::Powershell,
    ] {
        let mut output = Vec::new();
        write_completions_script(shell, &mut output).expect("must write completions");
        let script = String::from_utf8(output).expect("completions must be utf8");
        assert!(script.contains("bench"), "{shell:?} completions must name the binary");
    }
}

struct ScriptedOperator {
    answer: bool,
    prompts: RefCell<Vec<String>>,
    pauses: RefCell<Vec<u64>>,
}

impl ScriptedOperator {
    fn answering(answer: bool) -> Self {
        Self {
            answer,
            prompts: RefCell::new(Vec::new()),
            pauses: RefCell::new(Vec::new()),
        }
    }
}

impl Operator for ScriptedOperator {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.answer)
    }

    fn pause(&self, seconds: u64, _reason: &str) -> Result<()> {
        self.pauses.borrow_mut().push(seconds);
        Ok(())
    }

    fn notify(&self, _status: &str, _message: &str) {}
}

#[derive(Default)]
struct FakeReconfigure {
    targets: RefCell<Vec<ConfigTarget>>,
}

impl Reconfigure for FakeReconfigure {
    fn regenerate(&self, _ctx: &OrchestrationContext<'_>, target: ConfigTarget) -> Result<bool> {
        self.targets.borrow_mut().push(target);
        Ok(true)
    }
}

fn run(
    ctx: &OrchestrationContext<'_>,
    options: &UpdateOptions,
    operator: &ScriptedOperator,
) -> Result<crate::update_flow::UpdateOutcome> {
    let reconfigure = FakeReconfigure::default();
    run_update(
        ctx,
        options,
        &UpdateServices {
            operator,
            reconfigure: &reconfigure,
        },
    )
}

fn patch_only() -> UpdateOptions {
    UpdateOptions {
        patch: true,
        backup: false,
        ..UpdateOptions::default()
    }
}

fn git_runner() -> RecordingRunner {
    RecordingRunner::new()
        .respond("git remote", CommandOutput::with_stdout("upstream\n"))
        .respond("git rev-parse --abbrev-ref HEAD", CommandOutput::with_stdout("develop\n"))
}

fn major_upgrade_runner() -> RecordingRunner {
    git_runner().respond(
        "git show upstream/develop:frappe/__init__.py",
        CommandOutput::with_stdout("__version__ = \"14.0.0\"\n"),
    )
}

fn write_version(layout: &BenchLayout, app: &str, version: &str) {
    let module = layout.app_dir(app).join(app);
    fs::create_dir_all(&module).expect("must create module dir");
    fs::write(module.join("__init__.py"), format!("__version__ = \"{version}\"\n"))
        .expect("must write version");
}

fn scaffold_bench(apps: &[&str], sites: &[&str], config: Value) -> PathBuf {
    let root = test_bench_root();
    for folder in ["apps", "sites", "config/pids", "logs", "env/bin"] {
        fs::create_dir_all(root.join(folder)).expect("must create bench folder");
    }
    fs::write(root.join("env").join("bin").join("python"), "").expect("must create python");
    for app in apps {
        fs::create_dir_all(root.join("apps").join(app).join(".git")).expect("must create app repo");
    }
    fs::write(root.join("sites").join("apps.txt"), apps.join("\n")).expect("must write apps.txt");
    fs::write(
        root.join("sites").join("common_site_config.json"),
        serde_json::to_string_pretty(&config).expect("must serialize config"),
    )
    .expect("must write common config");
    for site in sites {
        let site_dir = root.join("sites").join(site);
        fs::create_dir_all(&site_dir).expect("must create site");
        fs::write(site_dir.join("site_config.json"), "{}").expect("must write site config");
    }
    root
}

fn test_bench_root() -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let counter = TEST_BENCH_ROOT_COUNTER.fetch_add(1, Ordering::SeqCst);
    path.push(format!(
        "bench-cli-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        counter
    ));
    path
}
