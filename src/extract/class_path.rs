use std::collections::BTreeMap;

use crate::candidate::Signal;
use crate::coordinate::Component;
use crate::ingest::ClassEntry;
use crate::patterns;

const VERSIONED_CLASSES_DIR: &str = "META-INF/versions/";
const MIN_COUNT_RATIO: f32 = 0.6;
const MAX_DEPTH: usize = 4;

/// Proposes folders that contain most of the jar's classes as groupIds.
pub fn analyze(classes: &[ClassEntry]) -> Vec<Signal> {
    // Recursive class count per folder, keyed by `a/b/c`.
    let mut deep_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total = 0usize;

    for class in classes {
        if class.path.starts_with(VERSIONED_CLASSES_DIR) {
            continue;
        }
        let Some((folder, _)) = class.path.rsplit_once('/') else {
            continue;
        };
        total += 1;
        let mut prefix = String::new();
        for segment in folder.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            *deep_counts.entry(prefix.clone()).or_default() += 1;
        }
    }
    if total == 0 {
        return Vec::new();
    }

    let mut dominant: Vec<(String, usize)> = deep_counts
        .into_iter()
        .filter(|(_, count)| *count as f32 / total as f32 >= MIN_COUNT_RATIO)
        .collect();
    dominant.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    // A single dominant folder may be a one-segment groupId.
    let min_depth = if dominant.len() <= 1 { 1 } else { 2 };

    let mut signals = Vec::new();
    for (folder, count) in dominant {
        let depth = folder.split('/').count();
        if depth < min_depth || depth > MAX_DEPTH {
            continue;
        }
        let ratio = count as f32 / total as f32;
        let Some(package) = patterns::package_of(&folder.replace('/', ".")) else {
            continue;
        };
        let score = (ratio * 2.0 + 0.5) as i32;
        let percent = (ratio * 100.0) as i32;
        signals.push(Signal::new(
            Component::GroupId,
            package,
            score,
            format!("Path contains {percent:>3}% of classes: '{folder}'"),
        ));
    }
    signals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(paths: &[&str]) -> Vec<ClassEntry> {
        paths
            .iter()
            .map(|p| ClassEntry {
                path: p.to_string(),
                timestamp: None,
            })
            .collect()
    }

    #[test]
    fn dominant_folders_within_depth_become_groups() {
        let signals = analyze(&classes(&[
            "org/example/widget/A.class",
            "org/example/widget/B.class",
            "org/example/widget/impl/C.class",
            "org/example/other/D.class",
            "META-INF/versions/9/module-info.class",
            "Root.class",
        ]));

        let found: Vec<_> = signals
            .iter()
            .map(|s| (s.value.as_str(), s.score))
            .collect();
        // org (depth 1) is excluded because several folders survive.
        assert_eq!(found, vec![("org.example", 2), ("org.example.widget", 2)]);
        assert_eq!(
            signals[1].detail,
            "Path contains  75% of classes: 'org/example/widget'"
        );
    }

    #[test]
    fn single_dominant_folder_may_have_depth_one() {
        let signals = analyze(&classes(&["acme/A.class", "acme/B.class", "misc/C.class"]));
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].value, "acme");
        assert_eq!(signals[0].score, 1);
    }

    #[test]
    fn invalid_package_names_are_skipped() {
        let signals = analyze(&classes(&["Com/Example/A.class", "Com/Example/B.class"]));
        assert!(signals.is_empty());
        assert!(analyze(&[]).is_empty());
    }
}
