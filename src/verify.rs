//! Online verification: resolve candidate coordinates remotely and compare digests.
//!
//! Every remote lookup goes through a coordinate-keyed cache of shared futures, so a
//! coordinate is resolved at most once per process no matter how many jars ask for it.
//! All lookups wait on a one-time init gate that discovers the repositories and probes
//! connectivity.

use anyhow::{Result, anyhow};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::candidate::{CandidateSet, ValueCandidate};
use crate::config::OnlineConfig;
use crate::coordinate::{Component, MavenCoordinate};
use crate::ingest::{JarHashes, hash_jar_bytes};
use crate::repository::RepositoryClient;

/// Well-known artifact resolved once to prove the remote repositories are reachable.
pub const PROBE_ARTIFACT: (&str, &str, &str) = ("junit", "junit", "4.12");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchClassification {
    ExactSha,
    ExactClassDigests,
    /// Reserved, never produced.
    SupersetClassnames,
    NoMatch,
    NotFound,
}

impl MatchClassification {
    pub fn is_considered_identical(self) -> bool {
        match self {
            MatchClassification::ExactSha | MatchClassification::ExactClassDigests => true,
            MatchClassification::SupersetClassnames
            | MatchClassification::NoMatch
            | MatchClassification::NotFound => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchClassification::ExactSha => "EXACT_SHA",
            MatchClassification::ExactClassDigests => "EXACT_CLASS_DIGESTS",
            MatchClassification::SupersetClassnames => "SUPERSET_CLASSNAMES",
            MatchClassification::NoMatch => "NO_MATCH",
            MatchClassification::NotFound => "NOT_FOUND",
        }
    }
}

impl fmt::Display for MatchClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidCheck {
    pub coordinate: MavenCoordinate,
    pub classification: MatchClassification,
    pub remote_url: Option<String>,
}

/// A remote jar as seen by the cache. `hashes` is `None` when the download was unreadable.
#[derive(Debug)]
pub struct RemoteJar {
    pub url: String,
    pub hashes: Option<JarHashes>,
}

pub fn classify(local: &JarHashes, remote: Option<&RemoteJar>) -> MatchClassification {
    let Some(remote) = remote else {
        return MatchClassification::NotFound;
    };
    let Some(remote) = &remote.hashes else {
        return MatchClassification::NoMatch;
    };
    if remote.jar_sha256 == local.jar_sha256 {
        return MatchClassification::ExactSha;
    }
    let same_classes = local.class_sha256.len() == remote.class_sha256.len()
        && local
            .class_sha256
            .iter()
            .all(|(path, digest)| remote.class_sha256.get(path) == Some(digest));
    if same_classes {
        MatchClassification::ExactClassDigests
    } else {
        MatchClassification::NoMatch
    }
}

/// A coordinate proposed for online checking with the scores that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateSelection {
    pub coordinate: MavenCoordinate,
    pub group_score: i32,
    pub artifact_score: i32,
    pub version_score: Option<i32>,
}

impl CoordinateSelection {
    pub fn total(&self) -> i32 {
        self.group_score + self.artifact_score + self.version_score.unwrap_or(0)
    }
}

fn top<'a>(candidates: &'a CandidateSet, component: Component, n: usize, threshold: i32) -> Vec<&'a ValueCandidate> {
    candidates
        .get(component)
        .iter()
        .filter(|c| c.score_sum() >= threshold)
        .take(n)
        .collect()
}

/// Cross product of the top candidates per component, highest combined score first.
pub fn select_candidates_to_check(
    candidates: &CandidateSet,
    config: &OnlineConfig,
) -> Vec<CoordinateSelection> {
    let threshold = config.online_search_threshold;
    let groups = top(candidates, Component::GroupId, config.top_group_ids, threshold);
    let artifacts = top(candidates, Component::ArtifactId, config.top_artifact_ids, threshold);
    let versions = top(candidates, Component::Version, config.top_versions, threshold);

    let mut selections = Vec::new();
    for group in &groups {
        for artifact in &artifacts {
            if versions.is_empty() {
                selections.push(CoordinateSelection {
                    coordinate: MavenCoordinate::new(group.value(), artifact.value(), None),
                    group_score: group.score_sum(),
                    artifact_score: artifact.score_sum(),
                    version_score: None,
                });
            }
            for version in &versions {
                selections.push(CoordinateSelection {
                    coordinate: MavenCoordinate::new(
                        group.value(),
                        artifact.value(),
                        Some(version.value().to_string()),
                    ),
                    group_score: group.score_sum(),
                    artifact_score: artifact.score_sum(),
                    version_score: Some(version.score_sum()),
                });
            }
        }
    }
    // Stable: equal totals keep candidate order.
    selections.sort_by_key(|s| std::cmp::Reverse(s.total()));
    selections
}

pub fn needs_version_search(candidates: &CandidateSet, config: &OnlineConfig) -> bool {
    let versions = candidates.get(Component::Version);
    match versions.first() {
        None => true,
        Some(best) => {
            best.score_sum() <= config.version_search_threshold
                && !versions
                    .iter()
                    .any(|v| v.score_sum() >= config.skip_version_search_threshold)
        }
    }
}

/// What to check online for one jar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationPlan {
    pub with_version: Vec<MavenCoordinate>,
    /// Versionless groupId/artifactId pairs whose versions are looked up remotely.
    pub search_pairs: Vec<MavenCoordinate>,
}

impl VerificationPlan {
    pub fn new(candidates: &CandidateSet, config: &OnlineConfig) -> Self {
        let selections = select_candidates_to_check(candidates, config);
        let mut plan = VerificationPlan::default();
        for selection in &selections {
            if selection.coordinate.version.is_some()
                && !plan.with_version.contains(&selection.coordinate)
            {
                plan.with_version.push(selection.coordinate.clone());
            }
        }
        if needs_version_search(candidates, config) {
            for selection in &selections {
                let pair = selection.coordinate.without_version();
                if !plan.search_pairs.contains(&pair) {
                    plan.search_pairs.push(pair);
                }
            }
        }
        plan
    }
}

/// Online results for one jar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JarChecks {
    pub with_version: Vec<UidCheck>,
    pub by_pair: Vec<(MavenCoordinate, Vec<UidCheck>)>,
}

impl JarChecks {
    /// Direct checks first, then version-search checks, in the order they were made.
    pub fn iter(&self) -> impl Iterator<Item = &UidCheck> {
        self.with_version
            .iter()
            .chain(self.by_pair.iter().flat_map(|(_, checks)| checks.iter()))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns the oldest and newest entries of a newest-first version list.
pub fn sample_versions(versions: &[String]) -> Vec<&str> {
    match versions {
        [] => Vec::new(),
        [only] => vec![only.as_str()],
        [newest, .., oldest] => vec![newest.as_str(), oldest.as_str()],
    }
}

type PendingJar = Shared<BoxFuture<'static, Option<Arc<RemoteJar>>>>;
type InitGate = Shared<BoxFuture<'static, Result<(), Arc<anyhow::Error>>>>;

pub struct OnlineVerifier<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for OnlineVerifier<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<R> {
    repo: Arc<R>,
    config: OnlineConfig,
    cache: Mutex<HashMap<MavenCoordinate, PendingJar>>,
    gate: InitGate,
}

async fn initialize<R: RepositoryClient>(repo: Arc<R>, probe: bool) -> Result<()> {
    repo.initialize().await?;
    if !probe {
        return Ok(());
    }
    let (group_id, artifact_id, version) = PROBE_ARTIFACT;
    let coordinate = MavenCoordinate::new(group_id, artifact_id, Some(version.to_string()));
    match repo.resolve(&coordinate).await {
        Ok(Some(artifact)) => {
            debug!("Connectivity probe resolved {}", artifact.url);
            Ok(())
        }
        Ok(None) => anyhow::bail!("probe artifact {coordinate} not found in any remote repository"),
        Err(e) => Err(e.context(format!("probe artifact {coordinate} could not be resolved"))),
    }
}

impl<R: RepositoryClient> OnlineVerifier<R> {
    /// Starts the init gate in the background. Must be called inside a tokio runtime.
    pub fn start(repo: Arc<R>, config: OnlineConfig) -> Self {
        let task = tokio::spawn(initialize(Arc::clone(&repo), config.probe_connectivity));
        let gate = async move {
            match task.await {
                Ok(result) => result.map_err(Arc::new),
                Err(e) => Err(Arc::new(anyhow::Error::new(e).context("initialization task failed"))),
            }
        }
        .boxed()
        .shared();

        Self {
            inner: Arc::new(Inner {
                repo,
                config,
                cache: Mutex::new(HashMap::new()),
                gate,
            }),
        }
    }

    /// Waits for the init gate.
    pub async fn initialized(&self) -> Result<()> {
        self.inner.gate.clone().await.map_err(|e| anyhow!("{e:#}"))
    }

    pub fn remote_repositories(&self) -> Vec<String> {
        self.inner.repo.remote_repositories()
    }

    /// Inserts a pending lookup for `coordinate` unless one exists, and returns it.
    fn lookup(&self, coordinate: &MavenCoordinate) -> PendingJar {
        let mut cache = self.inner.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = cache.get(coordinate) {
            return pending.clone();
        }
        let inner = Arc::clone(&self.inner);
        let key = coordinate.clone();
        let pending = async move { inner.fetch(&key).await }.boxed().shared();
        cache.insert(coordinate.clone(), pending.clone());
        pending
    }

    /// Checks coordinates in order and stops at the first `EXACT_SHA`, which is then the only result.
    pub async fn find_jars(&self, local: &JarHashes, coordinates: &[MavenCoordinate]) -> Vec<UidCheck> {
        let mut checks = Vec::with_capacity(coordinates.len());
        for coordinate in coordinates {
            let remote = self.lookup(coordinate).await;
            let classification = classify(local, remote.as_deref());
            let check = UidCheck {
                coordinate: coordinate.clone(),
                classification,
                remote_url: remote.as_ref().map(|r| r.url.clone()),
            };
            if classification == MatchClassification::ExactSha {
                return vec![check];
            }
            checks.push(check);
        }
        checks
    }

    /// Lists remote versions per pair and checks the newest and oldest one.
    pub async fn search_versions_and_find_jars(
        &self,
        local: &JarHashes,
        pairs: &[MavenCoordinate],
    ) -> Vec<(MavenCoordinate, Vec<UidCheck>)> {
        if pairs.is_empty() || self.initialized().await.is_err() {
            return Vec::new();
        }
        let mut results = Vec::new();
        for pair in pairs {
            let versions = match self
                .inner
                .repo
                .list_versions(&pair.group_id, &pair.artifact_id)
                .await
            {
                Ok(versions) => versions,
                Err(e) => {
                    debug!("Failed to list versions of {pair}: {e:#}");
                    continue;
                }
            };
            let coordinates: Vec<MavenCoordinate> = sample_versions(&versions)
                .into_iter()
                .map(|v| pair.with_version(v))
                .collect();
            if coordinates.is_empty() {
                continue;
            }
            let checks = self.find_jars(local, &coordinates).await;
            results.push((pair.clone(), checks));
        }
        results
    }

    /// Launches the online checks for one jar in the background.
    pub fn verify_jar(&self, local: Arc<JarHashes>, candidates: &CandidateSet) -> JoinHandle<JarChecks> {
        let plan = VerificationPlan::new(candidates, &self.inner.config);
        let this = self.clone();
        tokio::spawn(async move {
            let (with_version, by_pair) = futures::join!(
                this.find_jars(&local, &plan.with_version),
                this.search_versions_and_find_jars(&local, &plan.search_pairs),
            );
            JarChecks {
                with_version,
                by_pair,
            }
        })
    }

    /// Drops cached lookups and gives the init gate a bounded time to finish.
    pub async fn shutdown(&self) {
        self.inner
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        let grace = self.inner.config.shutdown_grace;
        if tokio::time::timeout(grace, self.inner.gate.clone()).await.is_err() {
            warn!("Repository initialization did not finish within {grace:?}, abandoning it");
        }
    }
}

impl<R: RepositoryClient> Inner<R> {
    async fn fetch(&self, coordinate: &MavenCoordinate) -> Option<Arc<RemoteJar>> {
        if self.gate.clone().await.is_err() {
            return None;
        }
        let artifact = match self.repo.resolve(coordinate).await {
            Ok(Some(artifact)) => artifact,
            Ok(None) => {
                debug!("Remote jar not found: {coordinate}");
                return None;
            }
            Err(e) => {
                debug!("Failed to resolve {coordinate}: {e:#}");
                return None;
            }
        };

        let url = artifact.url;
        let bytes = artifact.bytes;
        let hashes = match tokio::task::spawn_blocking(move || hash_jar_bytes(&bytes)).await {
            Ok(Ok(hashes)) => Some(hashes),
            Ok(Err(e)) => {
                warn!("Failed to read remote jar {url}: {e:#}");
                None
            }
            Err(e) => {
                warn!("Hashing remote jar {url} failed: {e}");
                None
            }
        };
        Some(Arc::new(RemoteJar { url, hashes }))
    }
}
