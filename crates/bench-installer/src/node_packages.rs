use std::fs;

use anyhow::{Context, Result};
use bench_core::{atomic_write, to_json_document, Application, OrchestrationContext};
use bench_exec::CommandSpec;
use bench_version::{core_node_version, select_node_backend, NodeBackend};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    pub backend: NodeBackend,
    pub warnings: Vec<String>,
}

/// Shallow merge of one manifest into another: objects merge their keys,
/// arrays concatenate, anything else is overwritten.
pub fn merge_manifest_into(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        let merged = match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                for (inner_key, inner_value) in incoming {
                    existing.insert(inner_key.clone(), inner_value.clone());
                }
                true
            }
            (Some(Value::Array(existing)), Value::Array(incoming)) => {
                existing.extend(incoming.iter().cloned());
                true
            }
            _ => false,
        };
        if !merged {
            target.insert(key.clone(), value.clone());
        }
    }
}

pub fn merge_manifests<'a, I>(manifests: I) -> Map<String, Value>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let mut merged = Map::new();
    for manifest in manifests {
        merge_manifest_into(&mut merged, manifest);
    }
    merged
}

fn read_manifest(app: &Application) -> Result<Option<Map<String, Value>>> {
    let path = app.package_json_path();
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    let manifest: Map<String, Value> = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing {}", path.display()))?;
    Ok(Some(manifest))
}

/// Legacy backend: writes one merged `package.json` at the installation root
/// and runs `npm install` there.
pub fn install_npm_packages(
    ctx: &OrchestrationContext<'_>,
    apps: &[Application],
) -> Result<Vec<String>> {
    if ctx.runner().locate("npm").is_none() {
        let warning = "npm is not installed, skipping node dependencies".to_string();
        tracing::warn!("{warning}");
        return Ok(vec![warning]);
    }

    let mut manifests = Vec::new();
    for app in apps {
        if let Some(manifest) = read_manifest(app)? {
            manifests.push(manifest);
        }
    }
    if manifests.is_empty() {
        tracing::info!("no application ships a package.json, skipping npm install");
        return Ok(Vec::new());
    }

    let merged = merge_manifests(&manifests);
    let path = ctx.layout.root_package_json_path();
    if ctx.dry_run {
        tracing::info!("dry-run: not writing {}", path.display());
    } else {
        atomic_write(&path, &to_json_document(&merged)?)
            .with_context(|| format!("failed writing merged manifest {}", path.display()))?;
    }

    let spec = CommandSpec::new("npm")
        .arg("install")
        .current_dir(ctx.layout.root());
    ctx.runner()
        .run_checked(&spec)
        .context("npm install failed")?;
    Ok(Vec::new())
}

/// Modern backend: `yarn install` inside every application that has a
/// `package.json`.
pub fn install_yarn_packages(
    ctx: &OrchestrationContext<'_>,
    apps: &[Application],
) -> Result<Vec<String>> {
    if ctx.runner().locate("yarn").is_none() {
        let warning =
            "yarn is not installed; install it with `npm install -g yarn` and try again".to_string();
        tracing::warn!("{warning}");
        return Ok(vec![warning]);
    }

    for app in apps {
        if !app.package_json_path().exists() {
            continue;
        }
        tracing::info!("installing node dependencies for {}", app.name);
        let spec = CommandSpec::new("yarn")
            .arg("install")
            .current_dir(&app.path);
        ctx.runner()
            .run_checked(&spec)
            .with_context(|| format!("yarn install failed for app '{}'", app.name))?;
    }
    Ok(Vec::new())
}

/// Picks the backend from the core application's version and installs the
/// front-end dependencies with it.
pub fn update_node_packages(
    ctx: &OrchestrationContext<'_>,
    apps: &[Application],
) -> Result<NodeReport> {
    let core = Application::new(&ctx.layout, ctx.policy.core_app.as_str());
    let backend = match core_node_version(&core)? {
        Some(version) => select_node_backend(&version, &ctx.policy.node_modern_threshold),
        None => {
            tracing::warn!(
                "no version found for core app '{}', using yarn",
                core.name
            );
            NodeBackend::Yarn
        }
    };
    tracing::info!("updating node packages with {}", backend.as_str());

    let warnings = match backend {
        NodeBackend::Npm => install_npm_packages(ctx, apps)?,
        NodeBackend::Yarn => install_yarn_packages(ctx, apps)?,
    };
    Ok(NodeReport { backend, warnings })
}
