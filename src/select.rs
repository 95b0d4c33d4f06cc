//! Picks the final coordinate for a jar, automatically or by asking the operator.

use anyhow::Result;
use std::io::{BufRead, Write};
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::analyze::JarAnalysis;
use crate::coordinate::{Component, MavenCoordinate};
use crate::ingest::JarHashes;
use crate::patterns;
use crate::repository::RepositoryClient;
use crate::verify::{OnlineVerifier, UidCheck};

const PAD: &str = "  ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Selected {
        coordinate: MavenCoordinate,
        found_on_remote: bool,
    },
    Skipped,
    /// Stop processing the remaining jars.
    Exit,
}

/// First check that found an identical jar online, direct checks before version-search checks.
pub fn auto_select(analysis: &JarAnalysis) -> Option<&UidCheck> {
    analysis
        .checks
        .iter()
        .find(|check| check.classification.is_considered_identical())
}

/// Values offered for `component`, in order and without duplicates.
pub fn proposals(analysis: &JarAnalysis, component: Component, threshold: i32) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    let mut push = |value: &str| {
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    };

    for candidate in analysis.candidates.get(component) {
        if candidate.score_sum() >= threshold {
            push(candidate.value());
        }
    }
    for check in analysis.checks.with_version.iter() {
        if check.classification.is_considered_identical()
            && let Some(value) = check.coordinate.get(component)
        {
            push(value);
        }
    }
    for (pair, checks) in &analysis.checks.by_pair {
        if component != Component::Version
            && let Some(value) = pair.get(component)
        {
            push(value);
        }
        for check in checks {
            if check.classification.is_considered_identical()
                && let Some(value) = check.coordinate.get(component)
            {
                push(value);
            }
        }
    }
    values
}

enum Answer {
    Value(String),
    Skip,
    Exit,
}

/// Asks for groupId, artifactId and version, then re-checks the result online when a verifier is given.
pub async fn interactive_select<R, I, O>(
    analysis: &JarAnalysis,
    propose_threshold: i32,
    verifier: Option<&OnlineVerifier<R>>,
    input: &mut I,
    out: &mut O,
) -> Result<Decision>
where
    R: RepositoryClient,
    I: BufRead,
    O: Write,
{
    writeln!(out, "{PAD}Please complete missing groupId/artifactId/version info for this jar.")?;
    writeln!(out, "{PAD}Enter the value or enter '<number>!' to select a proposal.")?;

    let raw_manifest = analysis.manifest.raw();
    let mut values: Vec<String> = Vec::with_capacity(Component::ALL.len());
    for component in Component::ALL {
        let offered = proposals(analysis, component, propose_threshold);
        match prompt_component(component, &offered, raw_manifest, input, out)? {
            Answer::Value(value) => values.push(value),
            Answer::Skip => {
                writeln!(
                    out,
                    "{PAD}Skipped! Jar '{}' will not appear in result report!",
                    analysis.identity.name
                )?;
                return Ok(Decision::Skipped);
            }
            Answer::Exit => return Ok(Decision::Exit),
        }
    }

    let [group_id, artifact_id, version]: [String; 3] = values
        .try_into()
        .map_err(|_| anyhow::anyhow!("incomplete coordinate"))?;
    let coordinate = MavenCoordinate::new(group_id, artifact_id, Some(version));
    writeln!(out)?;
    writeln!(out, "{PAD}Final values: {coordinate}")?;

    let found_on_remote = match verifier {
        Some(verifier) => reverify(verifier, &analysis.identity.hashes, &coordinate, out).await?,
        None => false,
    };
    writeln!(out, "{PAD}Note that any mistakes can be fixed manually in the report file.")?;
    Ok(Decision::Selected {
        coordinate,
        found_on_remote,
    })
}

fn prompt_component<I: BufRead, O: Write>(
    component: Component,
    proposals: &[String],
    raw_manifest: Option<&str>,
    input: &mut I,
    out: &mut O,
) -> Result<Answer> {
    writeln!(out)?;
    writeln!(out, "{PAD}Enter {} or select from:", component.xml_tag())?;
    writeln!(out, "{PAD}    0! <skip this jar>")?;
    writeln!(out, "{PAD}    q! <exit>")?;
    if raw_manifest.is_some() {
        writeln!(out, "{PAD}    m! <print manifest>")?;
    }
    for (i, proposal) in proposals.iter().enumerate() {
        writeln!(out, "{PAD}    {}! {proposal}", i + 1)?;
    }

    let pattern = patterns::validation_pattern(component);
    loop {
        out.flush()?;
        let mut line = String::new();
        if read_line(input, &mut line)? == 0 {
            return Ok(Answer::Exit);
        }
        let line = line.trim();

        let value = match line.strip_suffix('!') {
            Some("q") => return Ok(Answer::Exit),
            Some("m") if raw_manifest.is_some() => {
                for manifest_line in raw_manifest.unwrap_or_default().lines() {
                    writeln!(out, "{PAD}    {manifest_line}")?;
                }
                continue;
            }
            Some(index) => match index.parse::<usize>() {
                Ok(0) => return Ok(Answer::Skip),
                Ok(n) => match proposals.get(n - 1) {
                    Some(proposal) => proposal.clone(),
                    None => {
                        writeln!(out, "{PAD}There is no proposal number {n}!")?;
                        continue;
                    }
                },
                Err(_) => line.to_string(),
            },
            None => line.to_string(),
        };

        if pattern.is_match(&value) {
            return Ok(Answer::Value(value));
        }
        writeln!(
            out,
            "{PAD}Given value does not seem to be a valid {}!",
            component.xml_tag()
        )?;
        writeln!(out, "{PAD}Value must match regex: {}", pattern.as_str())?;
    }
}

/// Reads one answer. On a multi-threaded runtime the worker is handed off while the
/// operator types, so background verifications keep running.
fn read_line<I: BufRead>(input: &mut I, line: &mut String) -> std::io::Result<usize> {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| input.read_line(line))
        }
        _ => input.read_line(line),
    }
}

/// Checks the typed coordinate online. Returns whether any jar exists at it.
async fn reverify<R: RepositoryClient, O: Write>(
    verifier: &OnlineVerifier<R>,
    local: &JarHashes,
    coordinate: &MavenCoordinate,
    out: &mut O,
) -> Result<bool> {
    let checks = verifier
        .find_jars(local, std::slice::from_ref(coordinate))
        .await;
    let check = checks.first();
    match check.and_then(|c| c.remote_url.as_deref().map(|url| (c, url))) {
        Some((check, url)) if check.classification.is_considered_identical() => {
            writeln!(out, "{PAD}Identical jar found online: {url}")?;
            Ok(true)
        }
        Some((_, url)) => {
            writeln!(
                out,
                "{PAD}WARNING: A different jar already exists online with the same coordinates: {url}"
            )?;
            Ok(true)
        }
        None => {
            writeln!(out, "{PAD}No conflicting jar found online.")?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{Aggregator, ExtractorKind, Signal};
    use crate::config::OnlineConfig;
    use crate::ingest::{JarIdentity, ManifestOutcome, hash_jar_bytes};
    use crate::manifest::{ParseMode, parse_manifest};
    use crate::verify::tests::{FakeRepository, jar_bytes};
    use crate::verify::{JarChecks, MatchClassification};
    use std::io::Cursor;
    use std::sync::Arc;

    const RAW_MANIFEST: &str = "Manifest-Version: 1.0\nImplementation-Title: widget\n";

    fn analysis(jar: &[u8], checks: JarChecks) -> JarAnalysis {
        let mut agg = Aggregator::new();
        agg.add(
            ExtractorKind::Manifest,
            vec![
                Signal::new(Component::GroupId, "org.example", 6, "g"),
                Signal::new(Component::GroupId, "org", 2, "g"),
                Signal::new(Component::ArtifactId, "widget", 6, "a"),
            ],
        );
        JarAnalysis {
            identity: JarIdentity {
                name: "widget.jar".to_string(),
                directory: "/tmp".to_string(),
                hashes: hash_jar_bytes(jar).unwrap(),
            },
            manifest: ManifestOutcome::ParsedOk {
                manifest: parse_manifest(RAW_MANIFEST.as_bytes(), ParseMode::Strict).unwrap(),
                raw: RAW_MANIFEST.to_string(),
                from_fallback: false,
            },
            candidates: agg.finish(),
            checks,
        }
    }

    fn check(coordinate: &str, classification: MatchClassification) -> UidCheck {
        let parts: Vec<&str> = coordinate.split(':').collect();
        UidCheck {
            coordinate: MavenCoordinate::new(parts[0], parts[1], parts.get(2).map(|v| v.to_string())),
            classification,
            remote_url: Some(format!("https://repo.example/{coordinate}")),
        }
    }

    async fn run(analysis: &JarAnalysis, input: &str) -> (Decision, String) {
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut out = Vec::new();
        let decision = interactive_select::<FakeRepository, _, _>(analysis, 4, None, &mut input, &mut out)
            .await
            .unwrap();
        (decision, String::from_utf8(out).unwrap())
    }

    #[test]
    fn first_identical_check_is_auto_selected() {
        let checks = JarChecks {
            with_version: vec![
                check("org:widget:1.0", MatchClassification::NoMatch),
                check("org.example:widget:1.0", MatchClassification::ExactClassDigests),
            ],
            by_pair: vec![(
                MavenCoordinate::new("org.example", "widget", None),
                vec![check("org.example:widget:2.0", MatchClassification::ExactSha)],
            )],
        };
        let analysis = analysis(&jar_bytes(&[]), checks);
        let selected = auto_select(&analysis).unwrap();
        assert_eq!(selected.coordinate.to_string(), "org.example:widget:1.0");

        let nothing = analysis_without_matches();
        assert!(auto_select(&nothing).is_none());
    }

    fn analysis_without_matches() -> JarAnalysis {
        analysis(
            &jar_bytes(&[]),
            JarChecks {
                with_version: vec![check("org:widget:1.0", MatchClassification::NotFound)],
                by_pair: Vec::new(),
            },
        )
    }

    /// Input that only becomes readable once another task on the runtime has run.
    struct GatedInput {
        gate: std::sync::mpsc::Receiver<()>,
        open: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl std::io::Read for GatedInput {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = std::io::Read::read(&mut self.fill_buf()?, buf)?;
            self.consume(n);
            Ok(n)
        }
    }

    impl BufRead for GatedInput {
        fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
            if !self.open {
                self.gate
                    .recv_timeout(std::time::Duration::from_secs(5))
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::TimedOut, e))?;
                self.open = true;
            }
            self.inner.fill_buf()
        }

        fn consume(&mut self, amt: usize) {
            self.inner.consume(amt);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn waiting_for_input_leaves_the_runtime_running() {
        let (tx, rx) = std::sync::mpsc::channel();
        let task = tokio::spawn(async move {
            tokio::spawn(async move {
                tx.send(()).ok();
            });
            let analysis = analysis_without_matches();
            let mut input = GatedInput {
                gate: rx,
                open: false,
                inner: Cursor::new(b"1!\n1!\n1.0\n".to_vec()),
            };
            let mut out = Vec::new();
            interactive_select::<FakeRepository, _, _>(&analysis, 4, None, &mut input, &mut out).await
        });

        let decision = task.await.unwrap().unwrap();
        assert_eq!(
            decision,
            Decision::Selected {
                coordinate: MavenCoordinate::new("org.example", "widget", Some("1.0".to_string())),
                found_on_remote: false,
            }
        );
    }

    #[test]
    fn proposals_merge_offline_and_online_values() {
        let checks = JarChecks {
            with_version: vec![check("com.other:widget-core:3.1", MatchClassification::ExactClassDigests)],
            by_pair: vec![(
                MavenCoordinate::new("org.example", "widget-all", None),
                vec![check("org.example:widget-all:0.9", MatchClassification::NoMatch)],
            )],
        };
        let analysis = analysis(&jar_bytes(&[]), checks);
        assert_eq!(
            proposals(&analysis, Component::GroupId, 4),
            vec!["org.example", "com.other"]
        );
        assert_eq!(
            proposals(&analysis, Component::ArtifactId, 4),
            vec!["widget", "widget-core", "widget-all"]
        );
        assert_eq!(proposals(&analysis, Component::Version, 4), vec!["3.1"]);
    }

    #[tokio::test]
    async fn values_are_selected_or_typed() {
        let analysis = analysis_without_matches();
        let (decision, out) = run(&analysis, "1!\n1!\n 2.3.1 \n").await;
        assert_eq!(
            decision,
            Decision::Selected {
                coordinate: MavenCoordinate::new("org.example", "widget", Some("2.3.1".to_string())),
                found_on_remote: false,
            }
        );
        assert!(out.contains("Enter groupId or select from:"));
        assert!(out.contains("    m! <print manifest>"));
        assert!(out.contains("Final values: org.example:widget:2.3.1"));
    }

    #[tokio::test]
    async fn invalid_value_is_asked_again() {
        let analysis = analysis_without_matches();
        let (decision, out) = run(&analysis, "Org.Example\norg.acme\nwidget\nlatest\n1.0\n").await;
        assert_eq!(
            decision,
            Decision::Selected {
                coordinate: MavenCoordinate::new("org.acme", "widget", Some("1.0".to_string())),
                found_on_remote: false,
            }
        );
        assert!(out.contains("Given value does not seem to be a valid groupId!"));
        assert!(out.contains("Given value does not seem to be a valid version!"));
        assert!(out.contains("Value must match regex: "));
    }

    #[tokio::test]
    async fn skip_exit_and_manifest_commands() {
        let analysis = analysis_without_matches();

        let (decision, out) = run(&analysis, "org.example\n0!\n").await;
        assert_eq!(decision, Decision::Skipped);
        assert!(out.contains("Skipped! Jar 'widget.jar' will not appear in result report!"));

        let (decision, _) = run(&analysis, "q!\n").await;
        assert_eq!(decision, Decision::Exit);

        let (decision, _) = run(&analysis, "org.example\n").await;
        assert_eq!(decision, Decision::Exit);

        let (decision, out) = run(&analysis, "m!\n0!\n").await;
        assert_eq!(decision, Decision::Skipped);
        assert!(out.contains("    Implementation-Title: widget"));
    }

    #[tokio::test]
    async fn reverification_flags_conflicting_remote_jar() {
        let local = jar_bytes(&[("org/example/A.class", "A")]);
        let mut repo = FakeRepository::with_probe();
        repo.add("org.example:widget:1.0", jar_bytes(&[("org/example/A.class", "changed")]));
        let verifier = OnlineVerifier::start(Arc::new(repo), OnlineConfig::default());
        let analysis = analysis(&local, JarChecks::default());

        let mut input = Cursor::new(b"1!\n1!\n1.0\n".to_vec());
        let mut out = Vec::new();
        let decision = interactive_select(&analysis, 4, Some(&verifier), &mut input, &mut out)
            .await
            .unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(matches!(decision, Decision::Selected { found_on_remote: true, .. }));
        assert!(out.contains(
            "WARNING: A different jar already exists online with the same coordinates: https://repo.example/org.example:widget:1.0"
        ));

        let mut input = Cursor::new(b"1!\n1!\n2.0\n".to_vec());
        let mut out = Vec::new();
        let decision = interactive_select(&analysis, 4, Some(&verifier), &mut input, &mut out)
            .await
            .unwrap();
        assert!(matches!(decision, Decision::Selected { found_on_remote: false, .. }));
        assert!(String::from_utf8(out).unwrap().contains("No conflicting jar found online."));
    }
}
