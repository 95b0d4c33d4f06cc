//! Signal extractors. Each one is a pure function from one evidence source to
//! a list of [`Signal`]s; [`collect_candidates`] runs them all and aggregates.

pub mod class_path;
pub mod class_time;
pub mod filename;
pub mod manifest;
pub mod pom;
pub mod post;

use crate::candidate::{Aggregator, CandidateSet, ExtractorKind};
use crate::ingest::JarContents;

pub fn collect_candidates(contents: &JarContents) -> CandidateSet {
    let mut aggregator = Aggregator::new();

    if let Some(manifest) = contents.manifest.manifest() {
        aggregator.add(ExtractorKind::Manifest, manifest::analyze(manifest));
    }
    aggregator.add(
        ExtractorKind::JarFilename,
        filename::analyze(&contents.identity.name),
    );
    aggregator.add(ExtractorKind::Pom, pom::analyze(&contents.pom_files));
    aggregator.add(
        ExtractorKind::ClassFilepath,
        class_path::analyze(&contents.classes),
    );
    aggregator.add(
        ExtractorKind::ClassTimestamp,
        class_time::analyze(&contents.classes),
    );

    let mut candidates = aggregator.finish();
    let derived = post::analyze(&candidates);
    candidates.absorb(ExtractorKind::Post, derived);
    candidates
}
