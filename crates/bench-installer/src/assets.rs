use anyhow::{Context, Result};
use bench_core::OrchestrationContext;
use bench_exec::CommandSpec;

use crate::helper_command;

/// Delegates to the platform's `build [--app <app>]` with developer mode set.
/// No retry.
pub fn build_assets(ctx: &OrchestrationContext<'_>, app: Option<&str>) -> Result<()> {
    let mut spec = helper_command(ctx)
        .arg("build")
        .env("BENCH_DEVELOPER", "1");
    if let Some(app) = app {
        spec = spec.args(["--app", app]);
    }
    ctx.runner()
        .run_checked(&spec)
        .context("asset build failed")?;
    Ok(())
}

/// Byte-compiles the application sources, skipping `node_modules`. A failure
/// is logged and reported as `false`.
pub fn compile_python(ctx: &OrchestrationContext<'_>) -> Result<bool> {
    let spec = CommandSpec::new(ctx.layout.env_python().display().to_string())
        .args(["-m", "compileall", "-q", "-x", "node_modules"])
        .path_arg(&ctx.layout.apps_dir())
        .current_dir(ctx.layout.root());
    let output = ctx.runner().run(&spec)?;
    Ok(output.is_success())
}
