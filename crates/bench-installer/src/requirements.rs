use anyhow::{Context, Result};
use bench_core::{Application, OrchestrationContext};
use bench_exec::CommandSpec;

fn env_pip(ctx: &OrchestrationContext<'_>) -> CommandSpec {
    CommandSpec::new(ctx.layout.env_python().display().to_string())
        .args(["-m", "pip", "install", "-q"])
        .current_dir(ctx.layout.root())
}

/// Upgrades pip inside the installation's virtualenv.
pub fn update_env_pip(ctx: &OrchestrationContext<'_>) -> Result<()> {
    ctx.runner()
        .run_checked(&env_pip(ctx).args(["-U", "pip"]))
        .context("failed upgrading pip")?;
    Ok(())
}

/// Installs every application into the virtualenv in editable mode. pip is
/// upgraded once before the first application. Returns advisory warnings.
pub fn install_backend_packages(
    ctx: &OrchestrationContext<'_>,
    apps: &[Application],
) -> Result<Vec<String>> {
    let python = ctx.layout.env_python();
    if !python.exists() {
        let warning = format!(
            "virtualenv python not found at {}, skipping python dependencies",
            python.display()
        );
        tracing::warn!("{warning}");
        return Ok(vec![warning]);
    }

    update_env_pip(ctx)?;
    for app in apps {
        tracing::info!("installing python dependencies for {}", app.name);
        let spec = env_pip(ctx).args(["-U", "-e"]).path_arg(&app.path);
        ctx.runner()
            .run_checked(&spec)
            .with_context(|| format!("failed installing app '{}'", app.name))?;
    }
    Ok(Vec::new())
}

/// Installs `dev-requirements.txt` for each application that has one. A
/// missing file is a warning.
pub fn install_dev_requirements(
    ctx: &OrchestrationContext<'_>,
    apps: &[Application],
) -> Result<Vec<String>> {
    let mut warnings = Vec::new();
    for app in apps {
        let requirements = app.dev_requirements_path();
        if !requirements.exists() {
            let warning = format!("dev-requirements.txt not found in {}", app.name);
            tracing::warn!("{warning}");
            warnings.push(warning);
            continue;
        }
        tracing::info!("installing python development dependencies for {}", app.name);
        let spec = env_pip(ctx).arg("-r").path_arg(&requirements);
        ctx.runner()
            .run_checked(&spec)
            .with_context(|| format!("failed installing dev requirements for '{}'", app.name))?;
    }
    Ok(warnings)
}
