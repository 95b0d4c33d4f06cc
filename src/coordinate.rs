use serde::Serialize;
use std::fmt;

/// One of the three searchable parts of a Maven coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    GroupId,
    ArtifactId,
    Version,
}

impl Component {
    /// Fixed order used by every loop over components (aggregation, printing, prompting).
    pub const ALL: [Component; 3] = [Component::GroupId, Component::ArtifactId, Component::Version];

    pub fn xml_tag(self) -> &'static str {
        match self {
            Component::GroupId => "groupId",
            Component::ArtifactId => "artifactId",
            Component::Version => "version",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Component::GroupId => 0,
            Component::ArtifactId => 1,
            Component::Version => 2,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.xml_tag())
    }
}

/// A Maven coordinate. `version == None` stands for a groupId/artifactId pair
/// whose version is still to be discovered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MavenCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub classifier: Option<String>,
}

impl MavenCoordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: Option<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version,
            classifier: None,
        }
    }

    pub fn without_version(&self) -> Self {
        Self {
            version: None,
            ..self.clone()
        }
    }

    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..self.clone()
        }
    }

    pub fn get(&self, component: Component) -> Option<&str> {
        match component {
            Component::GroupId => Some(self.group_id.as_str()),
            Component::ArtifactId => Some(self.artifact_id.as_str()),
            Component::Version => self.version.as_deref(),
        }
    }

    /// Repository-relative path of the artifact file, e.g.
    /// `org/example/widget/2.3.1/widget-2.3.1.jar`. Needs a version.
    pub fn artifact_path(&self, extension: &str) -> Option<String> {
        let version = self.version.as_deref()?;
        let classifier = self
            .classifier
            .as_deref()
            .map(|c| format!("-{c}"))
            .unwrap_or_default();
        Some(format!(
            "{}/{}/{version}/{}-{version}{classifier}.{extension}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.artifact_id,
        ))
    }

    /// Repository-relative path of the artifact-level `maven-metadata.xml`.
    pub fn metadata_path(&self) -> String {
        format!(
            "{}/{}/maven-metadata.xml",
            self.group_id.replace('.', "/"),
            self.artifact_id
        )
    }
}

impl fmt::Display for MavenCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        Ok(())
    }
}
