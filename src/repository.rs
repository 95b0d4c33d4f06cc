use anyhow::Result;
use async_trait::async_trait;

use crate::coordinate::MavenCoordinate;

/// An artifact fetched from a remote repository.
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub url: String,
    pub bytes: Vec<u8>,
}

/// Narrow view of a Maven repository client used by the online verification.
#[async_trait]
pub trait RepositoryClient: Send + Sync + 'static {
    /// Locates the remote repository configuration. Called once before any lookup.
    async fn initialize(&self) -> Result<()>;

    /// Fetches the jar for an exact coordinate. `Ok(None)` when no repository has it.
    async fn resolve(&self, coordinate: &MavenCoordinate) -> Result<Option<ResolvedArtifact>>;

    /// Known versions of a groupId/artifactId pair, newest first.
    async fn list_versions(&self, group_id: &str, artifact_id: &str) -> Result<Vec<String>>;

    /// Base URLs of the configured repositories, for reporting.
    fn remote_repositories(&self) -> Vec<String>;
}
