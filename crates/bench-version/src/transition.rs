use std::fmt;

use anyhow::Result;
use bench_core::{Application, BenchError, OrchestrationContext};
use bench_exec::CommandRunner;
use bench_sync::{current_branch, fetch_remote_branch, preferred_remote, show_file_at};
use semver::Version;

use crate::{parse_lenient, read_app_version, read_python_assignment};

/// Installed versus available version of the core application. Computed on
/// every run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTransition {
    pub is_major: bool,
    pub from: Option<Version>,
    pub to: Option<Version>,
}

impl VersionTransition {
    pub fn unknown() -> Self {
        Self {
            is_major: false,
            from: None,
            to: None,
        }
    }

    pub fn to_major(&self) -> Option<u64> {
        self.to.as_ref().map(|version| version.major)
    }
}

impl fmt::Display for VersionTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |version: &Option<Version>| {
            version
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "unknown".to_string())
        };
        write!(f, "{} -> {}", show(&self.from), show(&self.to))
    }
}

/// A transition is major when the available major version is greater than
/// the installed one. Unparsable input on either side is never major.
pub fn compare_versions(from: &str, to: &str) -> VersionTransition {
    let from = parse_lenient(from);
    let to = parse_lenient(to);
    let is_major = match (&from, &to) {
        (Some(from), Some(to)) => to.major > from.major,
        _ => false,
    };
    VersionTransition { is_major, from, to }
}

/// Compares the core application's checked-out version with the version on
/// its tracked remote branch. Anything that prevents reading either side is
/// logged and reported as a non-major transition.
pub fn detect_upgrade(ctx: &OrchestrationContext<'_>) -> Result<VersionTransition> {
    let core = Application::new(&ctx.layout, ctx.policy.core_app.as_str());
    if !core.is_git_repo() {
        tracing::warn!(
            "core app '{}' is not a git checkout, skipping version check",
            core.name
        );
        return Ok(VersionTransition::unknown());
    }

    let Some(local) = read_app_version(&core)? else {
        tracing::warn!("could not read the installed version of '{}'", core.name);
        return Ok(VersionTransition::unknown());
    };

    let upstream = match upstream_app_version(ctx.runner(), &core) {
        Ok(Some(upstream)) => upstream,
        Ok(None) => {
            tracing::warn!("could not read the upstream version of '{}'", core.name);
            return Ok(VersionTransition {
                is_major: false,
                from: parse_lenient(&local),
                to: None,
            });
        }
        Err(err) => {
            tracing::warn!("version check for '{}' failed: {err:#}", core.name);
            return Ok(VersionTransition {
                is_major: false,
                from: parse_lenient(&local),
                to: None,
            });
        }
    };

    let transition = compare_versions(&local, &upstream);
    if transition.from.is_none() || transition.to.is_none() {
        tracing::warn!(
            "unparsable versions for '{}' ({local} -> {upstream}), treating update as minor",
            core.name
        );
    }
    tracing::info!("core app '{}' version {transition}", core.name);
    Ok(transition)
}

/// Fetches the tracked branch and reads `__version__` from the fetched tree.
pub fn upstream_app_version(runner: &dyn CommandRunner, app: &Application) -> Result<Option<String>> {
    let Some(remote) = preferred_remote(runner, &app.path, &app.name)? else {
        return Ok(None);
    };
    let branch = current_branch(runner, &app.path, &app.name)?;

    if !fetch_remote_branch(runner, &app.path, &remote, &branch, app.is_shallow())? {
        return Ok(None);
    }

    let init_path = format!("{}/__init__.py", app.name);
    let source = show_file_at(runner, &app.path, &remote, &branch, &init_path)?;
    Ok(source.and_then(|source| read_python_assignment(&source, "__version__")))
}

/// Refuses a transition into a major version that needs a front-end toolchain
/// when neither `npm` nor `node` is installed.
pub fn validate_upgrade_feasible(
    runner: &dyn CommandRunner,
    transition: &VersionTransition,
) -> Result<()> {
    let Some(to_major) = transition.to_major() else {
        return Ok(());
    };
    if to_major < 6 {
        return Ok(());
    }
    let has_npm = runner.locate("npm").is_some();
    let has_node = runner.locate("node").is_some() || runner.locate("nodejs").is_some();
    if !has_npm && !has_node {
        return Err(BenchError::Environment(format!(
            "version {to_major} needs nodejs and npm; install them and run the update again"
        ))
        .into());
    }
    Ok(())
}
