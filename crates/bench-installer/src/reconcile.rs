use anyhow::Result;
use bench_core::{Application, OrchestrationContext};
use bench_version::NodeBackend;

use crate::{install_backend_packages, install_dev_requirements, update_node_packages};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub dev: bool,
    pub skip_node: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub node_backend: Option<NodeBackend>,
    pub warnings: Vec<String>,
}

/// Brings backend and front-end dependencies in line with the checked-out
/// sources. Must only run once every application has been synchronized.
pub fn reconcile(
    ctx: &OrchestrationContext<'_>,
    apps: &[Application],
    options: ReconcileOptions,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    report.warnings.extend(install_backend_packages(ctx, apps)?);
    if options.dev {
        report.warnings.extend(install_dev_requirements(ctx, apps)?);
    }

    if !options.skip_node {
        let node = update_node_packages(ctx, apps)?;
        report.node_backend = Some(node.backend);
        report.warnings.extend(node.warnings);
    }
    Ok(report)
}
