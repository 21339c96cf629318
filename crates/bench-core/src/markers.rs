use std::collections::BTreeMap;
use std::fs;
use std::io;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::fs_ops::{atomic_write, to_json_document};
use crate::BenchLayout;

/// What an application was last successfully upgraded to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

pub fn read_installed_versions(layout: &BenchLayout) -> Result<BTreeMap<String, InstalledVersion>> {
    let path = layout.installed_versions_path();
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed reading {}", path.display()));
        }
    };
    serde_json::from_str(&raw).with_context(|| format!("failed parsing {}", path.display()))
}

/// Advances the markers for `updates`, leaving other applications untouched.
pub fn record_installed_versions(
    layout: &BenchLayout,
    updates: &BTreeMap<String, InstalledVersion>,
) -> Result<()> {
    if updates.is_empty() {
        return Ok(());
    }
    let mut markers = read_installed_versions(layout)?;
    for (app, installed) in updates {
        markers.insert(app.clone(), installed.clone());
    }
    let document = to_json_document(&markers)?;
    atomic_write(&layout.installed_versions_path(), &document)
}
