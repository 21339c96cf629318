use anyhow::Result;
use bench_core::{find_bench_error, keys, BenchError, MigrationFailurePolicy, OrchestrationContext};
use serde_json::{json, Map};

fn maintenance_flags(enabled: bool) -> Map<String, serde_json::Value> {
    let value = json!(if enabled { 1 } else { 0 });
    let mut flags = Map::new();
    flags.insert(keys::MAINTENANCE_MODE.to_string(), value.clone());
    flags.insert(keys::PAUSE_SCHEDULER.to_string(), value);
    flags
}

/// Writes both maintenance flags in a single update.
pub(crate) fn set_maintenance(ctx: &OrchestrationContext<'_>, enabled: bool) -> Result<()> {
    if ctx.dry_run {
        tracing::info!("dry-run: maintenance_mode and pause_scheduler left unchanged");
        return Ok(());
    }
    ctx.config_store().update(&maintenance_flags(enabled))?;
    tracing::info!("maintenance mode {}", if enabled { "entered" } else { "exited" });
    Ok(())
}

/// Runs `body` with maintenance mode and the scheduler pause set, clearing
/// both on every exit path. The one exception is a failed site migration
/// under [`MigrationFailurePolicy::Hold`], which leaves the installation
/// offline for an operator.
pub(crate) fn with_maintenance_window<T, F>(ctx: &OrchestrationContext<'_>, body: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    set_maintenance(ctx, true)?;

    let outcome = body();

    let hold = match &outcome {
        Err(err) => {
            ctx.policy.migration_failure == MigrationFailurePolicy::Hold
                && matches!(find_bench_error(err), Some(BenchError::Patch { .. }))
        }
        Ok(_) => false,
    };
    if hold {
        tracing::error!(
            "site migration failed; maintenance mode is held. Fix the failing site, then run \
             `bench migrate` and clear maintenance_mode and pause_scheduler"
        );
        return outcome;
    }

    let released = set_maintenance(ctx, false);
    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(release_err)) => {
            tracing::error!("failed clearing maintenance flags: {release_err:#}");
            Err(err)
        }
    }
}
