use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A fully described external command: program, arguments, working directory
/// and environment overrides layered on top of the parent environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    /// Runs `script` through `sh -c`, for commands that rely on shell
    /// substitution or operator-supplied command strings.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// The command as an operator would type it.
    pub fn display_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(quote_for_display(&self.program));
        parts.extend(self.args.iter().map(|arg| quote_for_display(arg)));
        parts.join(" ")
    }

    /// The command prefixed with its working directory, used for log records.
    pub fn log_line(&self) -> String {
        match &self.cwd {
            Some(cwd) if cwd != Path::new(".") => {
                format!("cd {} && {}", cwd.display(), self.display_line())
            }
            _ => self.display_line(),
        }
    }
}

fn quote_for_display(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    let needs_quotes = value
        .chars()
        .any(|ch| ch.is_whitespace() || matches!(ch, '\'' | '"' | '$' | '`' | '\\' | '|' | '&' | ';'));
    if !needs_quotes {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\\''"))
}
