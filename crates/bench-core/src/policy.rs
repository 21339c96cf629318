use std::fs;
use std::io;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{BenchError, BenchLayout};

/// What happens to maintenance mode when a site migration fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationFailurePolicy {
    /// Clear the maintenance flags like on any other exit path.
    #[default]
    Release,
    /// Leave the flags set so the installation stays offline until an
    /// operator intervenes.
    Hold,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupFailurePolicy {
    #[default]
    Abort,
    Continue,
}

/// Tool-side settings kept in `config/upgrade.toml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradePolicy {
    pub migration_failure: MigrationFailurePolicy,
    pub backup_failure: BackupFailurePolicy,
    pub shallow_clone_pause_secs: u64,
    pub node_modern_threshold: String,
    pub core_app: String,
    pub branch_checked_apps: Vec<String>,
    pub forbidden_branches: Vec<String>,
    /// External frappe-bench executable that regenerates redis, supervisor,
    /// systemd and nginx configuration (`<setup_command> setup <target>`).
    /// Unset means post-upgrade reconfiguration is reported but skipped.
    pub setup_command: Option<String>,
}

impl Default for UpgradePolicy {
    fn default() -> Self {
        Self {
            migration_failure: MigrationFailurePolicy::default(),
            backup_failure: BackupFailurePolicy::default(),
            shallow_clone_pause_secs: 10,
            node_modern_threshold: "11.0.0".to_string(),
            core_app: "frappe".to_string(),
            branch_checked_apps: vec!["frappe".to_string(), "erpnext".to_string()],
            forbidden_branches: vec!["master".to_string()],
            setup_command: None,
        }
    }
}

impl UpgradePolicy {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let policy: Self = toml::from_str(input)
            .map_err(|err| BenchError::Configuration(format!("invalid upgrade policy: {err}")))?;
        if policy.core_app.trim().is_empty() {
            return Err(BenchError::Configuration(
                "invalid upgrade policy: core_app must not be empty".to_string(),
            )
            .into());
        }
        if policy
            .setup_command
            .as_deref()
            .is_some_and(|command| command.trim().is_empty())
        {
            return Err(BenchError::Configuration(
                "invalid upgrade policy: setup_command must not be empty".to_string(),
            )
            .into());
        }
        Ok(policy)
    }

    pub fn load(layout: &BenchLayout) -> Result<Self> {
        let path = layout.upgrade_policy_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed reading upgrade policy {}", path.display()));
            }
        };
        Self::from_toml_str(&raw)
            .with_context(|| format!("failed loading upgrade policy {}", path.display()))
    }
}
