//! The `analyze` run: ingest and score every jar, launch its online checks in the
//! background, then present results and collect selections in discovery order.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::candidate::CandidateSet;
use crate::config::AnalysisConfig;
use crate::extract;
use crate::ingest::{self, JarIdentity, ManifestOutcome};
use crate::print;
use crate::report::{self, AnalysisReport, JarReport};
use crate::repository::RepositoryClient;
use crate::scan;
use crate::select::{self, Decision};
use crate::verify::{JarChecks, OnlineVerifier};

/// Everything known about one jar once its online checks are done.
#[derive(Debug, Clone)]
pub struct JarAnalysis {
    pub identity: JarIdentity,
    pub manifest: ManifestOutcome,
    pub candidates: CandidateSet,
    pub checks: JarChecks,
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub paths: Vec<PathBuf>,
    pub interactive: bool,
    pub start: usize,
    pub limit: Option<usize>,
    pub force_detailed_output: bool,
    pub skip_not_found: bool,
    pub report_file: PathBuf,
    pub config: AnalysisConfig,
}

#[derive(Debug)]
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    /// Jars considered after `start`/`limit`.
    pub total: usize,
    pub report_file: Option<PathBuf>,
}

struct PendingJar {
    identity: JarIdentity,
    manifest: ManifestOutcome,
    candidates: CandidateSet,
    checks: Option<JoinHandle<JarChecks>>,
}

/// Runs the analysis. `repository == None` means offline.
pub async fn run<R, I, O>(
    options: &AnalysisOptions,
    repository: Option<Arc<R>>,
    input: &mut I,
    out: &mut O,
) -> Result<AnalysisOutcome>
where
    R: RepositoryClient,
    I: BufRead,
    O: Write,
{
    let jars = scan::apply_window(
        scan::discover_jars(&options.paths)?,
        options.start,
        options.limit,
    );
    let total = jars.len();
    info!("Found {total} jars to analyze");

    let verifier = repository.map(|repo| OnlineVerifier::start(repo, options.config.online.clone()));
    let offline = verifier.is_none();

    writeln!(out, "Offline-Analysis started.")?;
    let mut pending = Vec::with_capacity(total);
    for (i, path) in jars.iter().enumerate() {
        writeln!(out, "Offline-Analysis: Jar {}/{}", i + 1, total)?;
        let contents = ingest::ingest_jar(path)?;
        let candidates = extract::collect_candidates(&contents);
        let checks = verifier
            .as_ref()
            .map(|v| v.verify_jar(Arc::new(contents.identity.hashes.clone()), &candidates));
        pending.push(PendingJar {
            identity: contents.identity,
            manifest: contents.manifest,
            candidates,
            checks,
        });
    }
    writeln!(out, "Offline-Analysis complete.")?;
    writeln!(out)?;

    if let Some(verifier) = &verifier {
        writeln!(out, "Online-Check initializing...")?;
        out.flush()?;
        if let Err(e) = verifier.initialized().await {
            error!("Online repositories are not reachable! Exiting program.");
            return Err(e.context("Online repositories are not reachable"));
        }
    }

    let mut reports: Vec<JarReport> = Vec::new();
    for (i, jar) in pending.into_iter().enumerate() {
        let checks = match jar.checks {
            Some(task) => task
                .await
                .with_context(|| format!("Online check failed for {}", jar.identity.name))?,
            None => JarChecks::default(),
        };
        if i == 0 && !offline {
            writeln!(out, "Online-Check initialized!")?;
            writeln!(out, "Online-Check started.")?;
            writeln!(out)?;
        }

        let analysis = JarAnalysis {
            identity: jar.identity,
            manifest: jar.manifest,
            candidates: jar.candidates,
            checks,
        };
        let auto_selected = select::auto_select(&analysis).cloned();
        print::print_results(
            out,
            &analysis,
            auto_selected.as_ref(),
            options.force_detailed_output,
            offline,
        )?;

        let decision = match auto_selected {
            Some(check) => Decision::Selected {
                coordinate: check.coordinate,
                found_on_remote: true,
            },
            None if options.interactive && !options.skip_not_found => {
                select::interactive_select(
                    &analysis,
                    options.config.propose_threshold,
                    verifier.as_ref(),
                    input,
                    out,
                )
                .await?
            }
            None => Decision::Skipped,
        };
        print::print_jar_separator(out)?;

        match decision {
            Decision::Selected {
                coordinate,
                found_on_remote,
            } => reports.push(JarReport::new(&analysis.identity, coordinate, found_on_remote)),
            Decision::Skipped => {}
            Decision::Exit => {
                info!("Exit requested, remaining jars are not processed");
                break;
            }
        }
    }

    let excluded = total - reports.len();
    writeln!(out, "Analysis complete ({excluded}/{total} excluded from report).")?;

    let remote_repos = verifier
        .as_ref()
        .map(|v| v.remote_repositories())
        .unwrap_or_default();
    let report = AnalysisReport::new(!offline, remote_repos, reports);
    let report_file = if report.jar_results.is_empty() {
        writeln!(out, "Skipping report file because no jars were resolved.")?;
        None
    } else {
        writeln!(out, "Writing report file: {}", options.report_file.display())?;
        report::write_report(&options.report_file, &report)?;
        Some(options.report_file.clone())
    };

    if let Some(verifier) = &verifier {
        writeln!(out, "Online-Check cleanup started.")?;
        verifier.shutdown().await;
    }

    Ok(AnalysisOutcome {
        report,
        total,
        report_file,
    })
}
