mod app_tag;
mod git_ops;
mod remote_url;
mod source_sync;
mod source_types;

pub use app_tag::{resolve_app_tag, AppTag, GithubOrgLookup, OrgLookup, DEFAULT_ORGS};
pub(crate) use git_ops::run_git_command;
pub use git_ops::{
    current_branch, fetch_remote_branch, git_supports_shallow_clone, has_local_changes,
    head_commit, list_remotes, parse_git_version, preferred_remote, select_remote, show_file_at,
};
pub use remote_url::{app_name_from_git_url, set_remote_url};
pub use source_sync::{
    ensure_no_local_changes, preflight_sync, pull_all, pull_app, pull_apps, validate_branches,
};
pub use source_types::{failed_apps, AppSyncResult, SyncStatus};
