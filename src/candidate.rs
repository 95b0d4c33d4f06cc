use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::coordinate::Component;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExtractorKind {
    Manifest,
    JarFilename,
    Pom,
    ClassFilepath,
    ClassTimestamp,
    Post,
}

impl ExtractorKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ExtractorKind::Manifest => "Manifest",
            ExtractorKind::JarFilename => "Jar-Filename",
            ExtractorKind::Pom => "Pom",
            ExtractorKind::ClassFilepath => "Class-Filepath",
            ExtractorKind::ClassTimestamp => "Class-Timestamp",
            ExtractorKind::Post => "Post",
        }
    }
}

/// One `(component, value, score, detail)` tuple produced by an extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub component: Component,
    pub value: String,
    pub score: i32,
    pub detail: String,
}

impl Signal {
    pub fn new(
        component: Component,
        value: impl Into<String>,
        score: i32,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            component,
            value: value.into(),
            score,
            detail: detail.into(),
        }
    }
}

/// One reason a value was proposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvidenceItem {
    pub extractor: ExtractorKind,
    pub score: i32,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCandidate {
    value: String,
    evidence: Vec<EvidenceItem>,
    score_sum: i32,
}

impl ValueCandidate {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            evidence: Vec::new(),
            score_sum: 0,
        }
    }

    /// The running total is the only place `score_sum` changes.
    pub fn add_evidence(&mut self, item: EvidenceItem) {
        self.score_sum += item.score;
        self.evidence.push(item);
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn evidence(&self) -> &[EvidenceItem] {
        &self.evidence
    }

    pub fn score_sum(&self) -> i32 {
        self.score_sum
    }

    fn sort_evidence(&mut self) {
        self.evidence.sort_by(|a, b| b.score.cmp(&a.score));
    }
}

fn rank(a: &ValueCandidate, b: &ValueCandidate) -> Ordering {
    b.score_sum
        .cmp(&a.score_sum)
        .then_with(|| a.value.cmp(&b.value))
}

/// Ranked candidates per component: score sum descending, then value ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    pools: [Vec<ValueCandidate>; 3],
}

impl CandidateSet {
    pub fn get(&self, component: Component) -> &[ValueCandidate] {
        &self.pools[component.index()]
    }

    pub fn best(&self, component: Component) -> Option<&ValueCandidate> {
        self.get(component).first()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.iter().all(Vec::is_empty)
    }

    /// Merges another extractor's output into an already ranked set and re-ranks.
    pub fn absorb(&mut self, extractor: ExtractorKind, signals: Vec<Signal>) {
        if signals.is_empty() {
            return;
        }
        for signal in signals {
            let pool = &mut self.pools[signal.component.index()];
            let idx = match pool.iter().position(|c| c.value == signal.value) {
                Some(idx) => idx,
                None => {
                    pool.push(ValueCandidate::new(signal.value));
                    pool.len() - 1
                }
            };
            pool[idx].add_evidence(EvidenceItem {
                extractor,
                score: signal.score,
                detail: signal.detail,
            });
        }
        self.sort();
    }

    fn sort(&mut self) {
        for pool in &mut self.pools {
            for candidate in pool.iter_mut() {
                candidate.sort_evidence();
            }
            pool.sort_by(rank);
        }
    }
}

/// Accumulates extractor output keyed by component and value.
#[derive(Debug, Default)]
pub struct Aggregator {
    pools: [Vec<ValueCandidate>; 3],
    index: [HashMap<String, usize>; 3],
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, extractor: ExtractorKind, signals: Vec<Signal>) {
        for signal in signals {
            let slot = signal.component.index();
            let pool = &mut self.pools[slot];
            let idx = *self.index[slot]
                .entry(signal.value.clone())
                .or_insert_with(|| {
                    pool.push(ValueCandidate::new(signal.value.clone()));
                    pool.len() - 1
                });
            pool[idx].add_evidence(EvidenceItem {
                extractor,
                score: signal.score,
                detail: signal.detail,
            });
        }
    }

    pub fn finish(self) -> CandidateSet {
        let mut set = CandidateSet { pools: self.pools };
        set.sort();
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(component: Component, value: &str, score: i32) -> Signal {
        Signal::new(component, value, score, format!("test {score}"))
    }

    #[test]
    fn score_sum_is_independent_of_addition_order() {
        let items = [(ExtractorKind::Manifest, 3), (ExtractorKind::Pom, 10), (ExtractorKind::JarFilename, 6)];

        let mut forward = ValueCandidate::new("1.0");
        for (extractor, score) in items {
            forward.add_evidence(EvidenceItem { extractor, score, detail: String::new() });
        }
        let mut backward = ValueCandidate::new("1.0");
        for (extractor, score) in items.into_iter().rev() {
            backward.add_evidence(EvidenceItem { extractor, score, detail: String::new() });
        }

        assert_eq!(forward.score_sum(), 19);
        assert_eq!(backward.score_sum(), 19);
        assert_eq!(
            forward.score_sum(),
            forward.evidence().iter().map(|e| e.score).sum::<i32>()
        );
    }

    #[test]
    fn aggregator_merges_duplicates_and_ranks() {
        let mut agg = Aggregator::new();
        agg.add(
            ExtractorKind::Manifest,
            vec![
                signal(Component::GroupId, "org.example", 2),
                signal(Component::GroupId, "org.example.tool", 4),
            ],
        );
        agg.add(
            ExtractorKind::ClassFilepath,
            vec![signal(Component::GroupId, "org.example", 3)],
        );

        let set = agg.finish();
        let groups = set.get(Component::GroupId);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].value(), "org.example");
        assert_eq!(groups[0].score_sum(), 5);
        assert_eq!(groups[0].evidence()[0].score, 3);
        assert_eq!(groups[0].evidence()[0].extractor, ExtractorKind::ClassFilepath);
        assert_eq!(groups[1].value(), "org.example.tool");
        assert!(set.get(Component::Version).is_empty());
    }

    #[test]
    fn equal_scores_are_ordered_by_value() {
        let mut first = Aggregator::new();
        first.add(
            ExtractorKind::JarFilename,
            vec![signal(Component::ArtifactId, "zeta", 4), signal(Component::ArtifactId, "alpha", 4)],
        );
        let mut second = Aggregator::new();
        second.add(
            ExtractorKind::JarFilename,
            vec![signal(Component::ArtifactId, "alpha", 4), signal(Component::ArtifactId, "zeta", 4)],
        );

        let a = first.finish();
        let b = second.finish();
        let values = |s: &CandidateSet| {
            s.get(Component::ArtifactId)
                .iter()
                .map(|c| c.value().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(values(&a), vec!["alpha", "zeta"]);
        assert_eq!(values(&a), values(&b));
    }

    #[test]
    fn absorb_rescores_existing_candidates() {
        let mut agg = Aggregator::new();
        agg.add(
            ExtractorKind::JarFilename,
            vec![signal(Component::GroupId, "a.b", 6), signal(Component::GroupId, "commons-io", 1)],
        );
        let mut set = agg.finish();
        set.absorb(ExtractorKind::Post, vec![signal(Component::GroupId, "commons-io", 5)]);

        let best = set.best(Component::GroupId).unwrap();
        assert_eq!(best.value(), "commons-io");
        assert_eq!(best.score_sum(), 6);
        assert_eq!(best.evidence()[0].extractor, ExtractorKind::Post);
    }
}
