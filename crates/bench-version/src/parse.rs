use std::fs;
use std::io;

use anyhow::{Context, Result};
use bench_core::Application;
use semver::{Prerelease, Version};

/// Parses version strings as applications actually write them: an optional
/// leading `v`, `x` wildcards (`13.x.x-develop`), and fewer or more than three
/// numeric components. Wildcards read as `0`; components past the third are
/// ignored. An unusable prerelease tag is dropped rather than rejected.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    if trimmed.is_empty() {
        return None;
    }

    let (core, pre) = match trimmed.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (trimmed, None),
    };
    let core = core.split('+').next().unwrap_or(core);

    let mut numbers = [0_u64; 3];
    let mut seen = 0;
    for (index, part) in core.split('.').enumerate() {
        let value = match part {
            "x" | "X" | "*" => 0,
            digits => digits.parse::<u64>().ok()?,
        };
        if index < numbers.len() {
            numbers[index] = value;
        }
        seen += 1;
    }
    if seen == 0 {
        return None;
    }

    let mut version = Version::new(numbers[0], numbers[1], numbers[2]);
    if let Some(pre) = pre {
        version.pre = Prerelease::new(pre).unwrap_or(Prerelease::EMPTY);
    }
    Some(version)
}

/// Value of a top-level `name = "..."` assignment in python source.
pub fn read_python_assignment(source: &str, name: &str) -> Option<String> {
    source.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix(name)?;
        let value = rest.trim_start().strip_prefix('=')?.trim();
        let quote = value.chars().next().filter(|ch| *ch == '"' || *ch == '\'')?;
        let inner = &value[1..];
        let end = inner.find(quote)?;
        Some(inner[..end].to_string())
    })
}

/// `__version__` from the application's python module, when present.
pub fn read_app_version(app: &Application) -> Result<Option<String>> {
    read_assignment_from(&app.init_py_path(), "__version__")
}

/// `develop_version` from the application's hooks, when present.
pub fn read_develop_version(app: &Application) -> Result<Option<String>> {
    read_assignment_from(&app.hooks_py_path(), "develop_version")
}

fn read_assignment_from(path: &std::path::Path, name: &str) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(source) => Ok(read_python_assignment(&source, name)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("failed reading {}", path.display())),
    }
}
