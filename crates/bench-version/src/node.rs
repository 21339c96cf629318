use std::cmp::Ordering;

use anyhow::Result;
use bench_core::Application;
use semver::Version;

use crate::{parse_lenient, read_app_version, read_develop_version};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeBackend {
    /// One merged manifest at the installation root, installed with `npm`.
    Npm,
    /// Per-application installs with `yarn`.
    Yarn,
}

impl NodeBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
        }
    }
}

/// Versions at or above `threshold` use yarn. Only the numeric components
/// are compared, so `11.0.0-develop` counts as `11.0.0`. A version that
/// cannot be parsed selects yarn.
pub fn select_node_backend(version: &str, threshold: &str) -> NodeBackend {
    let (Some(version), Some(threshold)) = (parse_lenient(version), parse_lenient(threshold)) else {
        tracing::warn!("cannot compare '{version}' with '{threshold}', using yarn");
        return NodeBackend::Yarn;
    };
    match numeric(&version).cmp(&numeric(&threshold)) {
        Ordering::Less => NodeBackend::Npm,
        Ordering::Equal | Ordering::Greater => NodeBackend::Yarn,
    }
}

fn numeric(version: &Version) -> (u64, u64, u64) {
    (version.major, version.minor, version.patch)
}

/// The version that decides the node backend: the core application's
/// `develop_version` hook, or its `__version__` when no hook is set.
pub fn core_node_version(core: &Application) -> Result<Option<String>> {
    if let Some(develop) = read_develop_version(core)? {
        return Ok(Some(develop));
    }
    read_app_version(core)
}
