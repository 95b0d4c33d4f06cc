use crate::candidate::Signal;
use crate::coordinate::Component;
use crate::patterns;

const SCORE_WITH_VERSION: i32 = 6;
const SCORE_WITHOUT_VERSION: i32 = 4;

pub fn analyze(filename: &str) -> Vec<Signal> {
    let stem = match filename.rfind('.') {
        Some(idx) => &filename[..idx],
        None => filename,
    };
    let detail = format!("'{filename}'");

    match patterns::split_version_suffix(stem) {
        Some((artifact_id, version)) => vec![
            Signal::new(Component::ArtifactId, artifact_id, SCORE_WITH_VERSION, detail.clone()),
            Signal::new(Component::Version, version, SCORE_WITH_VERSION, detail),
        ],
        None => vec![Signal::new(
            Component::ArtifactId,
            stem,
            SCORE_WITHOUT_VERSION,
            detail,
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versioned_filename_yields_artifact_and_version() {
        let signals = analyze("widget-2.3.1.jar");
        assert_eq!(
            signals,
            vec![
                Signal::new(Component::ArtifactId, "widget", 6, "'widget-2.3.1.jar'"),
                Signal::new(Component::Version, "2.3.1", 6, "'widget-2.3.1.jar'"),
            ]
        );
    }

    #[test]
    fn plain_filename_yields_artifact_only() {
        let signals = analyze("widget.jar");
        assert_eq!(
            signals,
            vec![Signal::new(Component::ArtifactId, "widget", 4, "'widget.jar'")]
        );
    }
}
