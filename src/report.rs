use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::coordinate::MavenCoordinate;
use crate::ingest::JarIdentity;

pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub schema_version: String,
    pub analysis_info: AnalysisInfo,
    pub jar_results: Vec<JarReport>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisInfo {
    pub online_check_enabled: bool,
    pub remote_repos: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JarReport {
    pub filename: String,
    pub dir: String,
    /// Base64 of the whole-jar digest.
    pub sha256: String,
    pub found_on_remote: bool,
    pub result: MavenCoordinate,
}

impl JarReport {
    pub fn new(identity: &JarIdentity, result: MavenCoordinate, found_on_remote: bool) -> Self {
        Self {
            filename: identity.name.clone(),
            dir: identity.directory.clone(),
            sha256: identity.hashes.jar_sha256_base64(),
            found_on_remote,
            result,
        }
    }
}

impl AnalysisReport {
    pub fn new(online_check_enabled: bool, remote_repos: Vec<String>, jar_results: Vec<JarReport>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            analysis_info: AnalysisInfo {
                online_check_enabled,
                remote_repos,
            },
            jar_results,
        }
    }
}

pub fn write_report(path: &Path, report: &AnalysisReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::JarHashes;
    use std::collections::BTreeMap;

    #[test]
    fn report_uses_camel_case_and_null_classifier() -> Result<()> {
        let identity = JarIdentity {
            name: "widget-2.3.1.jar".to_string(),
            directory: "/opt/lib".to_string(),
            hashes: JarHashes {
                jar_sha256: [0u8; 32],
                class_sha256: BTreeMap::new(),
            },
        };
        let report = AnalysisReport::new(
            false,
            Vec::new(),
            vec![JarReport::new(
                &identity,
                MavenCoordinate::new("org.example", "widget", Some("2.3.1".to_string())),
                false,
            )],
        );

        let value = serde_json::to_value(&report)?;
        assert_eq!(value["schemaVersion"], "1.0");
        assert_eq!(value["analysisInfo"]["onlineCheckEnabled"], false);
        let jar = &value["jarResults"][0];
        assert_eq!(jar["filename"], "widget-2.3.1.jar");
        assert_eq!(jar["dir"], "/opt/lib");
        assert_eq!(jar["sha256"], "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=");
        assert_eq!(jar["foundOnRemote"], false);
        assert_eq!(jar["result"]["groupId"], "org.example");
        assert_eq!(jar["result"]["version"], "2.3.1");
        assert!(jar["result"]["classifier"].is_null());
        Ok(())
    }
}
