//! Console rendering of per-jar results.

use anyhow::Result;
use std::io::Write;

use crate::analyze::JarAnalysis;
use crate::candidate::ValueCandidate;
use crate::coordinate::Component;
use crate::verify::{MatchClassification, UidCheck};

const PADDING: usize = 8;
const MATCH_PADDING: usize = 24;
const MIN_VALUE_WIDTH: usize = 20;

pub fn print_results<W: Write>(
    out: &mut W,
    analysis: &JarAnalysis,
    auto_selected: Option<&UidCheck>,
    force_detailed_output: bool,
    offline: bool,
) -> Result<()> {
    writeln!(out, "{}", analysis.identity.name)?;

    if let Some(check) = auto_selected {
        let headline = match check.classification {
            MatchClassification::ExactSha => "Found identical jar online, UID:",
            MatchClassification::ExactClassDigests => {
                "Found not fully identical jar with identical classes online, UID:"
            }
            _ => "Automatically selected values:",
        };
        writeln!(out, "    {headline} {}", check.coordinate)?;
        if !force_detailed_output {
            return Ok(());
        }
        writeln!(out, "    Forced details:")?;
    }

    let pad = " ".repeat(PADDING);
    writeln!(out)?;
    writeln!(out, "    Folder: {}", analysis.identity.directory)?;
    writeln!(
        out,
        "    SHA_256 (uncompressed): {}",
        analysis.identity.hashes.jar_sha256_base64()
    )?;
    if !analysis.manifest.is_present() {
        writeln!(out, "    No manifest found.")?;
    }

    writeln!(out)?;
    writeln!(out, "    OFFLINE RESULT")?;
    for component in Component::ALL {
        print_candidates(out, component, analysis.candidates.get(component))?;
    }

    if !offline {
        writeln!(out)?;
        writeln!(out, "    ONLINE RESULT")?;
        let checks = &analysis.checks;
        if checks.is_empty() {
            let candidates = &analysis.candidates;
            if candidates.get(Component::GroupId).is_empty()
                || candidates.get(Component::ArtifactId).is_empty()
            {
                writeln!(out, "{pad}Did not gather enough information to attempt online search!")?;
            } else {
                writeln!(
                    out,
                    "{pad}Did not find any matching artifactId / groupId pair online. Attempt to look for valid versions failed!"
                )?;
            }
        } else {
            print_checks(out, &checks.with_version, PADDING + 2)?;
            if !checks.by_pair.is_empty() {
                writeln!(
                    out,
                    "{pad}Found artifactId / groupId pairs online, comparing local jar with newest and oldest online versions:"
                )?;
                for (pair, pair_checks) in &checks.by_pair {
                    writeln!(out, "{pad}  {:<width$}{pair}", "PAIR:", width = MATCH_PADDING + 2)?;
                    print_checks(out, pair_checks, PADDING + 4)?;
                }
            }
        }
    }
    writeln!(out)?;
    Ok(())
}

fn print_candidates<W: Write>(
    out: &mut W,
    component: Component,
    candidates: &[ValueCandidate],
) -> Result<()> {
    if candidates.is_empty() {
        return Ok(());
    }
    let pad = " ".repeat(PADDING);
    writeln!(out, "{pad}{}", component.xml_tag())?;

    let labels: Vec<String> = candidates
        .iter()
        .map(|c| format!("{:>2} | {}", c.score_sum(), c.value()))
        .collect();
    let width = labels
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max(MIN_VALUE_WIDTH);

    for (candidate, label) in candidates.iter().zip(&labels) {
        for (i, evidence) in candidate.evidence().iter().enumerate() {
            let shown = if i == 0 { label.as_str() } else { "" };
            writeln!(
                out,
                "{pad}    {shown:<w$} ({}({}): {})",
                evidence.extractor.display_name(),
                evidence.score,
                evidence.detail,
                w = width + 2
            )?;
        }
    }
    Ok(())
}

fn print_checks<W: Write>(out: &mut W, checks: &[UidCheck], padding: usize) -> Result<()> {
    let pad = " ".repeat(padding);
    for check in checks {
        let url = check
            .remote_url
            .as_deref()
            .map(|u| format!(" AT {u}"))
            .unwrap_or_default();
        let label = format!("{}   FOR ", check.classification);
        writeln!(out, "{pad}{label:>width$}{}{url}", check.coordinate, width = MATCH_PADDING)?;
    }
    Ok(())
}

pub fn print_jar_separator<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "{}", "-".repeat(80))?;
    Ok(())
}
