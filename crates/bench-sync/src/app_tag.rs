use std::time::Duration;

use anyhow::{Context, Result};
use bench_core::BenchError;
use reqwest::blocking::Client;

/// Organisations searched when a tag names only the repository.
pub const DEFAULT_ORGS: [&str; 2] = ["frappe", "erpnext"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppTag {
    pub org: String,
    pub repo: String,
    pub tag: Option<String>,
}

/// Answers whether `org/repo` exists on the hosting service.
pub trait OrgLookup {
    fn repo_exists(&self, org: &str, repo: &str) -> Result<bool>;
}

pub struct GithubOrgLookup {
    client: Client,
    api_base: String,
}

impl GithubOrgLookup {
    pub fn new() -> Result<Self> {
        Self::with_api_base("https://api.github.com")
    }

    pub fn with_api_base(api_base: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("bench/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed building http client")?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }
}

impl OrgLookup for GithubOrgLookup {
    fn repo_exists(&self, org: &str, repo: &str) -> Result<bool> {
        let url = format!("{}/repos/{org}/{repo}", self.api_base);
        let response = self
            .client
            .head(&url)
            .send()
            .with_context(|| format!("failed querying {url}"))?;
        tracing::debug!("HEAD {url} -> {}", response.status());
        Ok(response.status().is_success())
    }
}

/// Parses `org/repo@tag`, `repo@tag` or `repo`. A missing organisation is
/// resolved by probing [`DEFAULT_ORGS`] in order.
pub fn resolve_app_tag(raw: &str, lookup: &dyn OrgLookup) -> Result<AppTag> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(BenchError::InvalidRemote("tag is not provided".to_string()).into());
    }

    let (org_repo, tag) = match raw.split_once('@') {
        Some((org_repo, tag)) => (org_repo, Some(tag.trim()).filter(|tag| !tag.is_empty())),
        None => (raw, None),
    };
    if tag.is_some_and(|tag| tag.contains('@')) {
        return Err(BenchError::InvalidRemote(format!("malformed tag '{raw}'")).into());
    }

    let segments = org_repo.split('/').map(str::trim).collect::<Vec<_>>();
    let (org, repo) = match segments.as_slice() {
        [org, repo] if !org.is_empty() && !repo.is_empty() => (org.to_string(), repo.to_string()),
        [repo] if !repo.is_empty() => (find_org(repo, lookup)?.to_string(), repo.to_string()),
        _ => return Err(BenchError::InvalidRemote(format!("malformed tag '{raw}'")).into()),
    };

    Ok(AppTag {
        org,
        repo,
        tag: tag.map(ToString::to_string),
    })
}

fn find_org(repo: &str, lookup: &dyn OrgLookup) -> Result<&'static str> {
    for org in DEFAULT_ORGS {
        if lookup.repo_exists(org, repo)? {
            return Ok(org);
        }
    }
    Err(BenchError::InvalidRemote(format!(
        "repository '{repo}' not found under {}",
        DEFAULT_ORGS.join(" or ")
    ))
    .into())
}
