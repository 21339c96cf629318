mod node;
mod parse;
mod transition;

pub use node::{core_node_version, select_node_backend, NodeBackend};
pub use parse::{parse_lenient, read_app_version, read_develop_version, read_python_assignment};
pub use transition::{
    compare_versions, detect_upgrade, upstream_app_version, validate_upgrade_feasible,
    VersionTransition,
};

#[cfg(test)]
mod tests;
