use anyhow::Result;
use chrono::{DateTime, Local};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::remote::{RepositorySource, normalize_base_uri};

pub const REMOTE_REPOS_ENV: &str = "MAVENIZER_REMOTE_REPOS";
pub const DEFAULT_REPORT_FILE: &str = "./mavenizer-report-<datetime>.json";
const DATETIME_PLACEHOLDER: &str = "<datetime>";
const DATETIME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

#[derive(Debug, Clone)]
pub struct OnlineConfig {
    /// Minimum candidate scoreSum to be tried online.
    pub online_search_threshold: i32,
    pub top_group_ids: usize,
    pub top_artifact_ids: usize,
    pub top_versions: usize,
    /// Best version at or below this score triggers the version search.
    pub version_search_threshold: i32,
    /// Any version candidate at or above this score suppresses the version search.
    pub skip_version_search_threshold: i32,
    /// Resolve the probe artifact before any verification.
    pub probe_connectivity: bool,
    pub shutdown_grace: Duration,
}

impl Default for OnlineConfig {
    fn default() -> Self {
        Self {
            online_search_threshold: 1,
            top_group_ids: 2,
            top_artifact_ids: 2,
            top_versions: 2,
            version_search_threshold: 1,
            skip_version_search_threshold: 3,
            probe_connectivity: true,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub online: OnlineConfig,
    /// Offline candidates at or above this score are offered as proposals.
    pub propose_threshold: i32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            online: OnlineConfig::default(),
            propose_threshold: 4,
        }
    }
}

/// CLI value, then `MAVENIZER_REMOTE_REPOS`, then settings discovery.
pub fn resolve_repository_source(cli: &[String]) -> Result<RepositorySource> {
    repository_source(cli, env::var(REMOTE_REPOS_ENV).ok().as_deref())
}

fn repository_source(cli: &[String], env_value: Option<&str>) -> Result<RepositorySource> {
    let explicit: Vec<&str> = if !cli.is_empty() {
        cli.iter().flat_map(|v| v.split(',')).collect()
    } else if let Some(value) = env_value {
        value.split(',').collect()
    } else {
        Vec::new()
    };

    let urls = explicit
        .into_iter()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(normalize_base_uri)
        .collect::<Result<Vec<_>>>()?;
    if urls.is_empty() {
        Ok(RepositorySource::Discover)
    } else {
        Ok(RepositorySource::Explicit(urls))
    }
}

pub fn resolve_report_path(template: Option<&str>, now: DateTime<Local>) -> PathBuf {
    let template = template.unwrap_or(DEFAULT_REPORT_FILE);
    PathBuf::from(template.replace(
        DATETIME_PLACEHOLDER,
        &now.format(DATETIME_FORMAT).to_string(),
    ))
}
