#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Updated,
    UpToDate,
    Skipped { reason: String },
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSyncResult {
    pub app: String,
    pub status: SyncStatus,
    pub remote: Option<String>,
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub error: Option<String>,
}

impl AppSyncResult {
    pub(crate) fn skipped(app: &str, reason: impl Into<String>) -> Self {
        Self {
            app: app.to_string(),
            status: SyncStatus::Skipped {
                reason: reason.into(),
            },
            remote: None,
            branch: None,
            commit: None,
            error: None,
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self.status, SyncStatus::Updated | SyncStatus::UpToDate)
    }

    pub fn is_failed(&self) -> bool {
        self.status == SyncStatus::Failed
    }
}

/// Names of applications whose sync failed.
pub fn failed_apps(results: &[AppSyncResult]) -> Vec<&str> {
    results
        .iter()
        .filter(|result| result.is_failed())
        .map(|result| result.app.as_str())
        .collect()
}
