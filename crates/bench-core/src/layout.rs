use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const BENCH_FOLDERS: [&str; 5] = ["apps", "sites", "config", "logs", "config/pids"];
const MAX_PARENT_ASCENT: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchLayout {
    root: PathBuf,
}

impl BenchLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn apps_dir(&self) -> PathBuf {
        self.root.join("apps")
    }

    pub fn app_dir(&self, app: &str) -> PathBuf {
        self.apps_dir().join(app)
    }

    pub fn sites_dir(&self) -> PathBuf {
        self.root.join("sites")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    pub fn pids_dir(&self) -> PathBuf {
        self.config_dir().join("pids")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn env_dir(&self) -> PathBuf {
        self.root.join("env")
    }

    pub fn env_bin(&self, executable: &str) -> PathBuf {
        self.env_dir().join("bin").join(executable)
    }

    pub fn env_python(&self) -> PathBuf {
        self.env_bin("python")
    }

    pub fn apps_txt_path(&self) -> PathBuf {
        self.sites_dir().join("apps.txt")
    }

    pub fn excluded_apps_path(&self) -> PathBuf {
        self.sites_dir().join("excluded_apps.txt")
    }

    pub fn common_site_config_path(&self) -> PathBuf {
        self.sites_dir().join("common_site_config.json")
    }

    pub fn installed_versions_path(&self) -> PathBuf {
        self.sites_dir().join("installed_versions.json")
    }

    pub fn upgrade_policy_path(&self) -> PathBuf {
        self.config_dir().join("upgrade.toml")
    }

    pub fn root_package_json_path(&self) -> PathBuf {
        self.root.join("package.json")
    }

    /// The installation's name: the last component of its absolute path.
    pub fn bench_name(&self) -> String {
        let absolute = if self.root.is_absolute() {
            self.root.clone()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&self.root))
                .unwrap_or_else(|_| self.root.clone())
        };
        absolute
            .components()
            .filter_map(|component| match component {
                std::path::Component::Normal(name) => Some(name.to_string_lossy().to_string()),
                _ => None,
            })
            .last()
            .unwrap_or_default()
    }
}

pub fn is_bench_directory(directory: &Path) -> bool {
    BENCH_FOLDERS
        .iter()
        .all(|folder| directory.join(folder).exists())
}

/// Walks from `start` towards the filesystem root looking for an installation.
/// The walk stops at `home` (when given), at the root, or after a fixed
/// number of ascents.
pub fn find_parent_bench(start: &Path, home: Option<&Path>) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    for _ in 0..MAX_PARENT_ASCENT {
        if is_bench_directory(&current) {
            return Some(current);
        }
        if home.is_some_and(|home| home == current) {
            return None;
        }
        match current.parent() {
            Some(parent) if parent != current => current = parent.to_path_buf(),
            _ => return None,
        }
    }
    None
}

/// Collects every installation below `directory`. Installations are not
/// searched for nested installations and symlinked directories are skipped.
pub fn find_benches(directory: &Path) -> Result<Vec<PathBuf>> {
    if is_bench_directory(directory) {
        return Ok(vec![directory.to_path_buf()]);
    }

    let mut benches = Vec::new();
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    queue.push_back(directory.to_path_buf());

    while let Some(dir) = queue.pop_front() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if dir != directory => {
                tracing::debug!("skipping unreadable directory {}: {err}", dir.display());
                continue;
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed reading directory {}", dir.display()))
            }
        };
        let mut children = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() && !file_type.is_symlink() {
                children.push(entry.path());
            }
        }
        children.sort();
        for child in children {
            if is_bench_directory(&child) {
                benches.push(child);
            } else {
                queue.push_back(child);
            }
        }
    }

    benches.sort();
    Ok(benches)
}
