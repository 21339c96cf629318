use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::fs_ops::{atomic_write, to_json_document};
use crate::{BenchError, BenchLayout};

pub mod keys {
    pub const MAINTENANCE_MODE: &str = "maintenance_mode";
    pub const PAUSE_SCHEDULER: &str = "pause_scheduler";
    pub const RELEASE_BENCH: &str = "release_bench";
    pub const SHALLOW_CLONE: &str = "shallow_clone";
    pub const REBASE_ON_PULL: &str = "rebase_on_pull";
    pub const RESTART_SUPERVISOR_ON_UPDATE: &str = "restart_supervisor_on_update";
    pub const RESTART_SYSTEMD_ON_UPDATE: &str = "restart_systemd_on_update";
    pub const SUPERVISOR_RESTART_CMD: &str = "supervisor_restart_cmd";
    pub const FRAPPE_USER: &str = "frappe_user";
    pub const DB_HOST: &str = "db_host";
    pub const REDIS_CACHE: &str = "redis_cache";
    pub const REDIS_QUEUE: &str = "redis_queue";
    pub const REDIS_SOCKETIO: &str = "redis_socketio";
}

/// Snapshot of the installation's flat configuration document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchConfig {
    values: Map<String, Value>,
}

impl BenchConfig {
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.values.get(key).unwrap_or(default)
    }

    /// Interprets `1`, `true` and `"1"`/`"true"` as set; anything else,
    /// including a missing key, as unset.
    pub fn flag(&self, key: &str) -> bool {
        match self.values.get(key) {
            Some(Value::Bool(value)) => *value,
            Some(Value::Number(number)) => number.as_i64().is_some_and(|value| value != 0),
            Some(Value::String(value)) => {
                matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
            }
            _ => false,
        }
    }

    pub fn str_value(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn is_release_bench(&self) -> bool {
        self.flag(keys::RELEASE_BENCH)
    }

    pub fn shallow_clone(&self) -> bool {
        self.flag(keys::SHALLOW_CLONE)
    }

    pub fn maintenance_mode(&self) -> bool {
        self.flag(keys::MAINTENANCE_MODE)
    }

    pub fn pause_scheduler(&self) -> bool {
        self.flag(keys::PAUSE_SCHEDULER)
    }

    pub fn merge(&mut self, partial: &Map<String, Value>) {
        for (key, value) in partial {
            self.values.insert(key.clone(), value.clone());
        }
    }
}

/// Reads and writes `sites/common_site_config.json`. Updates are
/// read-modify-write with no locking: the last writer wins.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_bench(layout: &BenchLayout) -> Self {
        Self::new(layout.common_site_config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<BenchConfig> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(BenchConfig::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed reading config {}", self.path.display()));
            }
        };
        if raw.trim().is_empty() {
            return Ok(BenchConfig::default());
        }

        let value: Value = serde_json::from_str(&raw).map_err(|err| {
            BenchError::Configuration(format!("{} is not valid JSON: {err}", self.path.display()))
        })?;
        match value {
            Value::Object(values) => Ok(BenchConfig::from_map(values)),
            other => Err(BenchError::Configuration(format!(
                "{} must hold a JSON object, found {}",
                self.path.display(),
                json_kind(&other)
            ))
            .into()),
        }
    }

    /// Merges `partial` into the persisted document, preserving unknown keys,
    /// and returns the document as written.
    pub fn update(&self, partial: &Map<String, Value>) -> Result<BenchConfig> {
        let mut config = self.load()?;
        config.merge(partial);
        self.write(&config)?;
        tracing::debug!(
            "updated {} keys: {}",
            self.path.display(),
            partial.keys().cloned().collect::<Vec<_>>().join(", ")
        );
        Ok(config)
    }

    pub fn set(&self, key: &str, value: Value) -> Result<BenchConfig> {
        let mut partial = Map::new();
        partial.insert(key.to_string(), value);
        self.update(&partial)
    }

    fn write(&self, config: &BenchConfig) -> Result<()> {
        let document = to_json_document(config.as_map())?;
        atomic_write(&self.path, &document)
            .with_context(|| format!("failed writing config {}", self.path.display()))
    }
}

/// Parses a value typed on the command line: JSON literals are kept as JSON,
/// anything else becomes a string.
pub fn parse_config_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
