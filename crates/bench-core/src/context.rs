use anyhow::Result;
use bench_exec::CommandRunner;

use crate::{BenchConfig, BenchLayout, ConfigStore, UpgradePolicy};

/// Everything a component needs to act on one installation. Components never
/// consult the process working directory or global state.
pub struct OrchestrationContext<'a> {
    pub layout: BenchLayout,
    pub config: BenchConfig,
    pub policy: UpgradePolicy,
    pub dry_run: bool,
    runner: &'a dyn CommandRunner,
}

impl<'a> OrchestrationContext<'a> {
    pub fn new(
        layout: BenchLayout,
        config: BenchConfig,
        policy: UpgradePolicy,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            layout,
            config,
            policy,
            dry_run: false,
            runner,
        }
    }

    /// Loads the configuration document and upgrade policy from disk.
    pub fn load(layout: BenchLayout, runner: &'a dyn CommandRunner) -> Result<Self> {
        let config = ConfigStore::for_bench(&layout).load()?;
        let policy = UpgradePolicy::load(&layout)?;
        Ok(Self::new(layout, config, policy, runner))
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn runner(&self) -> &'a dyn CommandRunner {
        self.runner
    }

    pub fn config_store(&self) -> ConfigStore {
        ConfigStore::for_bench(&self.layout)
    }

    /// Re-reads the configuration document into the snapshot.
    pub fn refresh_config(&mut self) -> Result<()> {
        self.config = self.config_store().load()?;
        Ok(())
    }
}
