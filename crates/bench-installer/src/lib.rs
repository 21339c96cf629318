mod assets;
mod node_packages;
mod reconcile;
mod requirements;
mod services;
mod sites;

pub use assets::{build_assets, compile_python};
pub use node_packages::{
    install_npm_packages, install_yarn_packages, merge_manifest_into, merge_manifests,
    update_node_packages, NodeReport,
};
pub use reconcile::{reconcile, ReconcileOptions, ReconcileReport};
pub use requirements::{install_backend_packages, install_dev_requirements, update_env_pip};
pub use services::{
    is_current_executable, post_upgrade, restart_supervisor, restart_systemd, supervisor_group,
    CommandReconfigure, ConfigTarget, PostUpgradeReport, Reconfigure, RELOAD_HINT,
};
pub use sites::{
    backup_all, backup_site, helper_command, migrate_all, migrate_site, site_command,
};
