use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

mod completion;
mod dispatch;
mod logs;
mod maintenance;
mod prompt;
mod render;
mod update_flow;

#[derive(Parser, Debug)]
#[command(name = "bench")]
#[command(about = "Update and maintain a multi-app bench installation", long_about = None)]
struct Cli {
    /// Installation root. Defaults to the nearest parent bench directory.
    #[arg(long, global = true, env = "BENCH_PATH")]
    bench: Option<PathBuf>,
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Echo commands without running them and leave configuration untouched.
    #[arg(long, global = true)]
    dry_run: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pull, reconcile, migrate and rebuild under a maintenance window.
    Update(UpdateArgs),
    Migrate,
    Backup,
    Build {
        #[arg(long)]
        app: Option<String>,
    },
    Requirements {
        #[arg(long)]
        dev: bool,
    },
    Restart {
        #[arg(long, conflicts_with = "systemd")]
        supervisor: bool,
        #[arg(long)]
        systemd: bool,
        #[arg(long)]
        web_workers: bool,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Point an installed app's `upstream` remote at a new URL.
    SetUrl { git_url: String },
    /// Resolve `org/repo@tag` to its organisation, repository and tag.
    Resolve { tag: String },
    /// List bench installations below a directory.
    Find { directory: Option<PathBuf> },
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    Get { key: String },
    Set { key: String, value: String },
}

#[derive(Args, Debug, Default, Clone)]
struct UpdateArgs {
    #[arg(long)]
    pull: bool,
    #[arg(long)]
    patch: bool,
    #[arg(long)]
    build: bool,
    #[arg(long)]
    requirements: bool,
    /// Back up every site before updating (default).
    #[arg(long, overrides_with = "no_backup")]
    backup: bool,
    #[arg(long)]
    no_backup: bool,
    #[arg(long)]
    no_compile: bool,
    #[arg(long)]
    force: bool,
    #[arg(long)]
    reset: bool,
    #[arg(long)]
    restart_supervisor: bool,
    #[arg(long)]
    restart_systemd: bool,
    /// Comma or space separated apps to pull. Only applies with --pull.
    #[arg(long)]
    apps: Option<String>,
    /// Skip the shallow-clone warning pause.
    #[arg(long)]
    no_pause: bool,
    /// Answer yes to the major-version confirmation.
    #[arg(long, short = 'y')]
    yes: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = dispatch::run_cli(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(bench_core::exit_code_for(&err));
    }
}

#[cfg(test)]
mod tests;
