use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;

use crate::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};

/// Records every command instead of executing it. Responses are scripted by
/// substring match against the rendered command line; the first matching
/// rule wins and unmatched commands succeed with empty output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    responses: Vec<(String, CommandOutput)>,
    tools: Option<BTreeSet<String>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, pattern: &str, output: CommandOutput) -> Self {
        self.responses.push((pattern.to_string(), output));
        self
    }

    /// Restricts [`CommandRunner::locate`] to the given executables. Without
    /// this every executable is reported present.
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        lock_calls(&self.calls).clone()
    }

    pub fn lines(&self) -> Vec<String> {
        lock_calls(&self.calls)
            .iter()
            .map(CommandSpec::display_line)
            .collect()
    }

    pub fn count_matching(&self, pattern: &str) -> usize {
        lock_calls(&self.calls)
            .iter()
            .filter(|spec| spec.display_line().contains(pattern))
            .count()
    }

    fn record(&self, spec: &CommandSpec) -> CommandOutput {
        lock_calls(&self.calls).push(spec.clone());
        let line = spec.display_line();
        self.responses
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(CommandOutput::success)
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        Ok(self.record(spec))
    }

    fn capture(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        Ok(self.record(spec))
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        match &self.tools {
            Some(tools) if !tools.contains(program) => None,
            _ => Some(PathBuf::from("/usr/bin").join(program)),
        }
    }
}

/// Echoes and records commands that would change the installation, while
/// still executing read-only queries so that planning output stays accurate.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    inner: SystemRunner,
    skipped: Mutex<Vec<CommandSpec>>,
}

impl DryRunRunner {
    pub fn new(inner: SystemRunner) -> Self {
        Self {
            inner,
            skipped: Mutex::new(Vec::new()),
        }
    }

    pub fn skipped(&self) -> Vec<CommandSpec> {
        lock_calls(&self.skipped).clone()
    }
}

impl CommandRunner for DryRunRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.inner.echo(spec);
        tracing::debug!("dry-run: skipped {}", spec.log_line());
        lock_calls(&self.skipped).push(spec.clone());
        Ok(CommandOutput::success())
    }

    fn capture(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.inner.capture(spec)
    }
}

fn lock_calls(calls: &Mutex<Vec<CommandSpec>>) -> MutexGuard<'_, Vec<CommandSpec>> {
    calls
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
