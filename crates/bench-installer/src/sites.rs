use anyhow::{Context, Result};
use bench_core::{BenchError, OrchestrationContext, Site};
use bench_exec::CommandSpec;

/// `env/bin/python -m frappe.utils.bench_helper frappe`, run from the
/// `sites` directory. Platform commands go through this helper, never
/// through this tool's own binary.
pub fn helper_command(ctx: &OrchestrationContext<'_>) -> CommandSpec {
    CommandSpec::new(ctx.layout.env_python().display().to_string())
        .args(["-m", "frappe.utils.bench_helper", "frappe"])
        .current_dir(ctx.layout.sites_dir())
}

/// `helper_command` with `--site <site> <verb>`.
pub fn site_command(ctx: &OrchestrationContext<'_>, site: &str, verb: &str) -> CommandSpec {
    helper_command(ctx).arg("--site").arg(site).arg(verb)
}

pub fn migrate_site(ctx: &OrchestrationContext<'_>, site: &Site) -> Result<()> {
    let spec = site_command(ctx, &site.name, "migrate");
    let output = ctx
        .runner()
        .run(&spec)
        .with_context(|| format!("failed starting migration for site '{}'", site.name))?;
    if output.is_success() {
        return Ok(());
    }
    tracing::error!(
        "migration of site '{}' failed: `{}` exited with {:?}",
        site.name,
        spec.log_line(),
        output.code
    );
    Err(BenchError::Patch {
        site: site.name.clone(),
        code: output.code,
    }
    .into())
}

/// Migrates sites in the given order and stops at the first failure; later
/// sites are never started.
pub fn migrate_all(ctx: &OrchestrationContext<'_>, sites: &[Site]) -> Result<usize> {
    for (index, site) in sites.iter().enumerate() {
        tracing::info!("migrating site {} ({}/{})", site.name, index + 1, sites.len());
        migrate_site(ctx, site)?;
    }
    Ok(sites.len())
}

pub fn backup_site(ctx: &OrchestrationContext<'_>, site: &Site) -> Result<()> {
    ctx.runner()
        .run_checked(&site_command(ctx, &site.name, "backup"))
        .with_context(|| format!("backup failed for site '{}'", site.name))?;
    Ok(())
}

pub fn backup_all(ctx: &OrchestrationContext<'_>, sites: &[Site]) -> Result<()> {
    for site in sites {
        backup_site(ctx, site)?;
    }
    Ok(())
}
