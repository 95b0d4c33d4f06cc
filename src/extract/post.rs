//! Rules that derive extra candidates from the merged pools.

use crate::candidate::{CandidateSet, Signal};
use crate::coordinate::Component;

const COMMONS_GROUP_PREFIX: &str = "org.apache.commons";
const COMMONS_ARTIFACT_PREFIX: &str = "commons-";
const COMMONS_MIN_SCORE: i32 = 4;
const COMMONS_GROUP_SCORE: i32 = 5;

pub fn analyze(candidates: &CandidateSet) -> Vec<Signal> {
    apache_commons(candidates).into_iter().collect()
}

/// Most Apache Commons jars use the artifactId as groupId (`commons-io:commons-io`).
fn apache_commons(candidates: &CandidateSet) -> Option<Signal> {
    let package_score: i32 = candidates
        .get(Component::GroupId)
        .iter()
        .filter(|c| c.value().starts_with(COMMONS_GROUP_PREFIX))
        .map(|c| c.score_sum())
        .sum();
    if package_score < COMMONS_MIN_SCORE {
        return None;
    }

    let artifact = candidates.get(Component::ArtifactId).iter().find(|c| {
        c.value().starts_with(COMMONS_ARTIFACT_PREFIX) && c.score_sum() >= COMMONS_MIN_SCORE
    })?;
    Some(Signal::new(
        Component::GroupId,
        artifact.value(),
        COMMONS_GROUP_SCORE,
        "Suspecting 'Apache Commons' jar - Rule: groupId equals artifactId",
    ))
}
