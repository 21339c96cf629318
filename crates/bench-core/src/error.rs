use bench_exec::CommandFailure;

/// Failure kinds callers branch on. They travel inside `anyhow::Error` and
/// are recovered with [`find_bench_error`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BenchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("environment error: {0}")]
    Environment(String),

    #[error("source sync failed: {0}")]
    SourceSync(String),

    #[error("migration failed for site '{site}'")]
    Patch { site: String, code: Option<i32> },

    #[error("invalid remote: {0}")]
    InvalidRemote(String),

    #[error("invalid branch for app '{app}': {reason}")]
    InvalidBranch { app: String, reason: String },

    #[error("release bench detected, cannot update")]
    ReleaseBench,

    #[error("aborted: {0}")]
    Aborted(String),

    #[error(
        "cannot proceed with update: app '{0}' has local changes that are not committed; \
         commit or stash them, or run with --reset to discard them"
    )]
    LocalChanges(String),

    #[error("not a bench directory: {0}")]
    NotABench(String),
}

impl BenchError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Patch {
                code: Some(code), ..
            } if *code > 0 => *code,
            _ => 1,
        }
    }
}

/// Finds the first [`BenchError`] anywhere in the context chain.
pub fn find_bench_error(err: &anyhow::Error) -> Option<&BenchError> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<BenchError>())
}

/// Exit code for any error surfaced to the operator.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(bench_err) = find_bench_error(err) {
        return bench_err.exit_code();
    }
    err.chain()
        .find_map(|cause| cause.downcast_ref::<CommandFailure>())
        .and_then(|failure| failure.code)
        .filter(|code| *code > 0)
        .unwrap_or(1)
}
