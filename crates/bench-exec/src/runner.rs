use std::path::PathBuf;
use std::process::{Command, Stdio};

use anstyle::{AnsiColor, Style};
use anyhow::{Context, Result};

use crate::CommandSpec;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            ..Self::default()
        }
    }

    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Raised by the strict execution path when a command exits non-zero.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("command `{command}` exited with {}", display_code(.code))]
pub struct CommandFailure {
    pub command: String,
    pub code: Option<i32>,
    pub stderr: String,
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

pub trait CommandRunner {
    /// Echoes the command, then runs it attached to the terminal. A non-zero
    /// exit is logged and returned, never raised.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Runs a query command with stdout and stderr captured. Nothing is echoed.
    fn capture(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Resolves an executable on the search path.
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    /// Like [`CommandRunner::run`], but a non-zero exit becomes a
    /// [`CommandFailure`].
    fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let output = self.run(spec)?;
        if output.is_success() {
            return Ok(output);
        }
        Err(CommandFailure {
            command: spec.log_line(),
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        }
        .into())
    }

    /// Like [`CommandRunner::capture`], but a non-zero exit becomes a
    /// [`CommandFailure`].
    fn capture_checked(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let output = self.capture(spec)?;
        if output.is_success() {
            return Ok(output);
        }
        Err(CommandFailure {
            command: spec.log_line(),
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        }
        .into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    color: bool,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub(crate) fn echo(&self, spec: &CommandSpec) {
        let line = format!("$ {}", spec.display_line());
        if self.color {
            let style = Style::new().fg_color(Some(AnsiColor::BrightBlack.into()));
            println!("{style}{line}{style:#}");
        } else {
            println!("{line}");
        }
    }

    fn build(spec: &CommandSpec) -> Command {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args).envs(&spec.env);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }
        command
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.echo(spec);
        let log_line = spec.log_line();
        tracing::debug!("{log_line}");

        let status = Self::build(spec)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("failed launching `{log_line}`"))?;

        let code = status.code();
        if !status.success() {
            tracing::warn!("{log_line} executed with {}", display_code(&code));
        }
        Ok(CommandOutput {
            code,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn capture(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let log_line = spec.log_line();
        tracing::debug!("{log_line}");

        let output = Self::build(spec)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed launching `{log_line}`"))?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
