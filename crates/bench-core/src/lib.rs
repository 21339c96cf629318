mod apps;
mod config;
mod context;
mod error;
mod fs_ops;
mod layout;
mod markers;
mod policy;

pub use apps::{
    add_excluded_app, parse_app_list, read_apps, read_excluded_apps, read_sites, select_apps,
    Application, Site,
};
pub use config::{keys, parse_config_value, BenchConfig, ConfigStore};
pub use context::OrchestrationContext;
pub use error::{exit_code_for, find_bench_error, BenchError};
pub use fs_ops::{atomic_write, to_json_document};
pub use layout::{find_benches, find_parent_bench, is_bench_directory, BenchLayout};
pub use markers::{read_installed_versions, record_installed_versions, InstalledVersion};
pub use policy::{BackupFailurePolicy, MigrationFailurePolicy, UpgradePolicy};
