//! Regular expressions for packages, artifact ids and versions, plus the
//! package helpers shared by the extractors.

use lazy_static::lazy_static;
use regex::Regex;

use crate::coordinate::Component;

const CLASS: &str = r"[A-Z][A-Za-z0-9_]*";
const SUBPACKAGE: &str = r"[a-z_][a-z0-9_]*";
const ARTIFACT_ID_STRICT: &str = r"[a-z_][a-z0-9_\-]*";
const ARTIFACT_ID_LIKE: &str = r"[a-zA-Z_][a-zA-Z0-9_\-\.]*";
const CLASSIFIER: &str = r"[a-zA-Z0-9]+";
const VERSION: &str = r"[0-9]+(\.[0-9]+)*((\.[A-Z]+)|(\-[A-Z]+))?";

lazy_static! {
    static ref PACKAGE: String = format!(r"({SUBPACKAGE}\.)*({SUBPACKAGE})");
    static ref PACKAGE_2_OR_MORE: String = format!(r"({SUBPACKAGE}\.)+({SUBPACKAGE})");
    static ref CLASSIFIERS: String = format!(r"({CLASSIFIER})([\-\.]{CLASSIFIER}){{0,2}}");

    static ref PACKAGE_WITH_OPTIONAL_CLASS: Regex = Regex::new(&format!(
        r"^(?P<package>{})(\.(?P<class>{CLASS}))?$",
        *PACKAGE
    ))
    .unwrap();
    static ref PACKAGE_STRICT_WITH_OPTIONAL_CLASS: Regex = Regex::new(&format!(
        r"^(?P<package>{})(\.(?P<class>{CLASS}))?$",
        *PACKAGE_2_OR_MORE
    ))
    .unwrap();
    static ref ARTIFACT_ID: Regex = Regex::new(&format!(r"^(?P<artifactId>{ARTIFACT_ID_STRICT})$")).unwrap();
    static ref ARTIFACT_ID_LIKE_VALUE: Regex = Regex::new(&format!(r"^(?P<artifactId>{ARTIFACT_ID_LIKE})$")).unwrap();
    static ref PACKAGE_WITH_ARTIFACT_LEAF: Regex = Regex::new(&format!(
        r"^(?P<package>({SUBPACKAGE}\.)*)(?P<artifactId>{ARTIFACT_ID_LIKE})$"
    ))
    .unwrap();
    static ref JAR_FILENAME_VERSION_SUFFIX: Regex = Regex::new(&format!(
        r"\-(?P<version>{VERSION})([\-\.]{})?$",
        *CLASSIFIERS
    ))
    .unwrap();
    static ref VERSION_WITH_OPTIONAL_CLASSIFIERS: Regex = Regex::new(&format!(
        r"^(?P<version>{VERSION})([\-\.]{})?$",
        *CLASSIFIERS
    ))
    .unwrap();
    static ref GROUP_ID: Regex = Regex::new(&format!(
        r"^(?P<groupId>({})|([a-z_][a-z0-9_\-]*))$",
        *PACKAGE
    ))
    .unwrap();
}

/// Package part of `foo.bar` or `foo.bar.SomeClass`. Single segment packages are accepted.
pub fn package_of(value: &str) -> Option<String> {
    PACKAGE_WITH_OPTIONAL_CLASS
        .captures(value)
        .and_then(|c| c.name("package"))
        .map(|m| m.as_str().to_string())
}

/// Like [`package_of`] but requires at least two segments.
pub fn strict_package_of(value: &str) -> Option<String> {
    PACKAGE_STRICT_WITH_OPTIONAL_CLASS
        .captures(value)
        .and_then(|c| c.name("package"))
        .map(|m| m.as_str().to_string())
}

pub fn is_artifact_id(value: &str) -> bool {
    ARTIFACT_ID.is_match(value)
}

/// Leaf of `foo.bar-baz` style values, where the leaf may contain hyphens and periods.
pub fn artifact_leaf_of(value: &str) -> Option<String> {
    PACKAGE_WITH_ARTIFACT_LEAF
        .captures(value)
        .and_then(|c| c.name("artifactId"))
        .map(|m| m.as_str().to_string())
}

/// Splits `widget-2.3.1-sources` into (`widget`, `2.3.1`).
pub fn split_version_suffix(stem: &str) -> Option<(String, String)> {
    let caps = JAR_FILENAME_VERSION_SUFFIX.captures(stem)?;
    let whole = caps.get(0)?;
    let version = caps.name("version")?;
    Some((stem[..whole.start()].to_string(), version.as_str().to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMatch {
    pub version: String,
    pub has_classifiers: bool,
}

pub fn match_version(value: &str) -> Option<VersionMatch> {
    let version = VERSION_WITH_OPTIONAL_CLASSIFIERS
        .captures(value)?
        .name("version")?
        .as_str()
        .to_string();
    Some(VersionMatch {
        has_classifiers: version != value,
        version,
    })
}

/// Prefixes with 2, 3 and 4 segments. Empty when the package has fewer than 2 segments.
pub fn package_candidates(package: &str) -> Vec<String> {
    let parts: Vec<&str> = package.split('.').collect();
    if parts.len() < 2 {
        return Vec::new();
    }
    (2..=parts.len().min(4))
        .map(|n| parts[..n].join("."))
        .collect()
}

pub fn package_leaf(package: &str) -> &str {
    package.rsplit('.').next().unwrap_or(package)
}

/// Pattern a user-entered value must match for the given component.
pub fn validation_pattern(component: Component) -> &'static Regex {
    match component {
        Component::GroupId => &GROUP_ID,
        Component::ArtifactId => &ARTIFACT_ID_LIKE_VALUE,
        Component::Version => &VERSION_WITH_OPTIONAL_CLASSIFIERS,
    }
}
