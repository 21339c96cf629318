use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::fs_ops::atomic_write;
use crate::{BenchError, BenchLayout};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub name: String,
    pub path: PathBuf,
}

impl Application {
    pub fn new(layout: &BenchLayout, name: impl Into<String>) -> Self {
        let name = name.into();
        let path = layout.app_dir(&name);
        Self { name, path }
    }

    pub fn is_git_repo(&self) -> bool {
        self.path.join(".git").exists()
    }

    pub fn is_shallow(&self) -> bool {
        self.path.join(".git").join("shallow").exists()
    }

    pub fn package_json_path(&self) -> PathBuf {
        self.path.join("package.json")
    }

    pub fn dev_requirements_path(&self) -> PathBuf {
        self.path.join("dev-requirements.txt")
    }

    /// The python module that carries `__version__`, `<app>/<app>/__init__.py`.
    pub fn init_py_path(&self) -> PathBuf {
        self.path.join(&self.name).join("__init__.py")
    }

    pub fn hooks_py_path(&self) -> PathBuf {
        self.path.join(&self.name).join("hooks.py")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub name: String,
    pub path: PathBuf,
}

/// Installed applications in `sites/apps.txt` order.
pub fn read_apps(layout: &BenchLayout) -> Result<Vec<Application>> {
    let path = layout.apps_txt_path();
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed reading {}", path.display()));
        }
    };

    let mut apps: Vec<Application> = Vec::new();
    for line in raw.lines() {
        let name = line.trim();
        if name.is_empty() || apps.iter().any(|app| app.name == name) {
            continue;
        }
        apps.push(Application::new(layout, name));
    }
    Ok(apps)
}

/// Hosted sites, sorted by name. A site is a directory under `sites/` with a
/// `site_config.json`.
pub fn read_sites(layout: &BenchLayout) -> Result<Vec<Site>> {
    let sites_dir = layout.sites_dir();
    if !sites_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut sites = Vec::new();
    for entry in fs::read_dir(&sites_dir)
        .with_context(|| format!("failed reading sites directory {}", sites_dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let path = entry.path();
        if path.join("site_config.json").is_file() {
            sites.push(Site {
                name: entry.file_name().to_string_lossy().to_string(),
                path,
            });
        }
    }
    sites.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(sites)
}

pub fn read_excluded_apps(layout: &BenchLayout) -> Result<Vec<String>> {
    let path = layout.excluded_apps_path();
    match fs::read_to_string(&path) {
        Ok(raw) => Ok(raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err).with_context(|| format!("failed reading {}", path.display())),
    }
}

pub fn add_excluded_app(layout: &BenchLayout, app: &str) -> Result<()> {
    let mut excluded = read_excluded_apps(layout)?;
    if excluded.iter().any(|name| name == app) {
        return Ok(());
    }
    excluded.push(app.to_string());

    let mut document = excluded.join("\n");
    document.push('\n');
    let path = layout.excluded_apps_path();
    atomic_write(&path, document.as_bytes())
        .with_context(|| format!("failed writing {}", path.display()))
}

/// Splits an operator-supplied app list on commas and whitespace.
pub fn parse_app_list(raw: &str) -> Vec<String> {
    raw.split(|ch: char| ch == ',' || ch.is_whitespace())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Narrows `installed` to `requested`, keeping installation order. An empty
/// request selects everything.
pub fn select_apps(installed: &[Application], requested: &[String]) -> Result<Vec<Application>> {
    if requested.is_empty() {
        return Ok(installed.to_vec());
    }
    for name in requested {
        if !installed.iter().any(|app| &app.name == name) {
            return Err(BenchError::Configuration(format!("app '{name}' is not installed")).into());
        }
    }
    Ok(installed
        .iter()
        .filter(|app| requested.contains(&app.name))
        .cloned()
        .collect())
}
