use crate::candidate::Signal;
use crate::coordinate::Component;
use crate::manifest::{Attributes, Manifest};
use crate::patterns;

const VERSION_SUFFIX: &str = "Version";
const VERSION_EXCLUDES: [&str; 4] = [
    "Ant-Version",
    "Manifest-Version",
    "Bundle-ManifestVersion",
    "Archiver-Version",
];
// Often lacks the minor version.
const VERSION_LOW_CONFIDENCE: [&str; 1] = ["Specification-Version"];

/// How a groupId or artifactId is pulled out of an attribute value.
#[derive(Debug, Clone, Copy)]
enum Rule {
    /// Package prefixes; `exact` when the prefix is the whole value, else `sub`.
    PackagePrefixes { exact: i32, sub: i32 },
    /// The whole value when it is a valid artifact id, else the package leaf.
    ArtifactIdOrLeaf { artifact: i32, leaf: i32 },
    PackageLeaf { leaf: i32 },
    /// Leaf of `pkg.leaf`, where the leaf may contain `-` and `.`.
    ArtifactLeaf { leaf: i32 },
}

struct AttributeRules {
    name: &'static str,
    group_id: Option<Rule>,
    artifact_id: Option<Rule>,
}

const IDENTITY_ATTRIBUTES: [AttributeRules; 6] = [
    AttributeRules {
        name: "Extension-Name",
        group_id: Some(Rule::PackagePrefixes { exact: 4, sub: 2 }),
        artifact_id: Some(Rule::ArtifactIdOrLeaf { artifact: 8, leaf: 2 }),
    },
    AttributeRules {
        name: "Implementation-Title",
        group_id: Some(Rule::PackagePrefixes { exact: 4, sub: 2 }),
        artifact_id: Some(Rule::ArtifactIdOrLeaf { artifact: 4, leaf: 2 }),
    },
    AttributeRules {
        name: "Implementation-Vendor-Id",
        group_id: Some(Rule::PackagePrefixes { exact: 6, sub: 4 }),
        artifact_id: Some(Rule::PackageLeaf { leaf: 1 }),
    },
    AttributeRules {
        name: "Automatic-Module-Name",
        group_id: Some(Rule::PackagePrefixes { exact: 2, sub: 4 }),
        artifact_id: Some(Rule::PackageLeaf { leaf: 4 }),
    },
    AttributeRules {
        name: "Bundle-SymbolicName",
        group_id: Some(Rule::PackagePrefixes { exact: 2, sub: 4 }),
        artifact_id: Some(Rule::ArtifactLeaf { leaf: 2 }),
    },
    AttributeRules {
        name: "Main-Class",
        group_id: Some(Rule::PackagePrefixes { exact: 2, sub: 2 }),
        artifact_id: None,
    },
];

pub fn analyze(manifest: &Manifest) -> Vec<Signal> {
    let mut signals = Vec::new();
    for block in manifest.attribute_blocks() {
        analyze_block(block, &mut signals);
    }
    signals
}

fn analyze_block(attributes: &Attributes, signals: &mut Vec<Signal>) {
    for (name, value) in attributes.iter() {
        let value = value.trim();
        let detail = format!("{name}: '{value}'");

        if name.ends_with(VERSION_SUFFIX) && !VERSION_EXCLUDES.contains(&name) {
            version_signals(name, value, &detail, signals);
            continue;
        }

        let Some(rules) = IDENTITY_ATTRIBUTES.iter().find(|r| r.name == name) else {
            continue;
        };
        for (component, rule) in [
            (Component::GroupId, rules.group_id),
            (Component::ArtifactId, rules.artifact_id),
        ] {
            let Some(rule) = rule else { continue };
            for (candidate, score) in apply(rule, value) {
                signals.push(Signal::new(component, candidate, score, detail.clone()));
            }
        }
    }
}

fn version_signals(name: &str, value: &str, detail: &str, signals: &mut Vec<Signal>) {
    let Some(matched) = patterns::match_version(value) else {
        return;
    };
    let penalty = i32::from(VERSION_LOW_CONFIDENCE.contains(&name));

    let bare_score = if matched.has_classifiers { 1 } else { 3 };
    signals.push(Signal::new(
        Component::Version,
        matched.version,
        (bare_score - penalty).max(0),
        detail,
    ));
    if matched.has_classifiers {
        signals.push(Signal::new(
            Component::Version,
            value,
            (1 - penalty).max(0),
            detail,
        ));
    }
}

fn apply(rule: Rule, value: &str) -> Vec<(String, i32)> {
    match rule {
        Rule::PackagePrefixes { exact, sub } => match patterns::strict_package_of(value) {
            Some(package) => patterns::package_candidates(&package)
                .into_iter()
                .map(|c| {
                    let score = if c == value { exact } else { sub };
                    (c, score)
                })
                .collect(),
            None => Vec::new(),
        },
        Rule::ArtifactIdOrLeaf { artifact, leaf } => {
            if patterns::is_artifact_id(value) {
                vec![(value.to_string(), artifact)]
            } else {
                apply(Rule::PackageLeaf { leaf }, value)
            }
        }
        Rule::PackageLeaf { leaf } => patterns::strict_package_of(value)
            .map(|package| vec![(patterns::package_leaf(&package).to_string(), leaf)])
            .unwrap_or_default(),
        Rule::ArtifactLeaf { leaf } => patterns::artifact_leaf_of(value)
            .map(|l| vec![(l, leaf)])
            .unwrap_or_default(),
    }
}
