//! Evidence from `META-INF/maven/<groupId>/<artifactId>/pom.{xml,properties}`.

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::warn;

use crate::candidate::Signal;
use crate::coordinate::Component;
use crate::ingest::PomFile;

const POM_XML: &str = "pom.xml";
const POM_PROPERTIES: &str = "pom.properties";
const MAVEN_META_DIR: &str = "META-INF/maven";

const SCORE_CONSISTENT: i32 = 10;
const SCORE_PER_SOURCE: i32 = 2;

/// Values seen for one component, each with the sources that reported it.
/// `None` records a source that could not provide a value.
#[derive(Debug, Default)]
struct Sightings(Vec<(Option<String>, Vec<String>)>);

impl Sightings {
    fn record(&mut self, value: Option<String>, source: &str) {
        match self.0.iter_mut().find(|(v, _)| *v == value) {
            Some((_, sources)) => sources.push(source.to_string()),
            None => self.0.push((value, vec![source.to_string()])),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct PomValues {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
}

pub fn analyze(pom_files: &[PomFile]) -> Vec<Signal> {
    let mut sightings: [Sightings; 3] = Default::default();
    let mut path_reliable = true;

    for file in pom_files {
        let file_name = file.path.rsplit('/').next().unwrap_or(&file.path);
        if file_name != POM_XML && file_name != POM_PROPERTIES {
            continue;
        }

        let from_path = path_values(&file.path);
        path_reliable = path_reliable && from_path.is_some();
        let (group_id, artifact_id) = match from_path {
            Some((g, a)) if path_reliable => (Some(g), Some(a)),
            _ => (None, None),
        };
        let path_source = format!("Path: '{}'", file.path);
        sightings[Component::GroupId.index()].record(group_id, &path_source);
        sightings[Component::ArtifactId.index()].record(artifact_id, &path_source);

        let content = if file_name == POM_XML {
            parse_pom_xml(&file.content)
        } else {
            Ok(parse_pom_properties(&file.content))
        };
        let content = content.unwrap_or_else(|e| {
            warn!("Ignoring unreadable {}: {e:#}", file.path);
            PomValues::default()
        });
        let content_source = format!("File-Content: '{file_name}'");
        sightings[Component::GroupId.index()].record(content.group_id, &content_source);
        sightings[Component::ArtifactId.index()].record(content.artifact_id, &content_source);
        sightings[Component::Version.index()].record(content.version, &content_source);
    }

    let mut signals = Vec::new();
    for component in Component::ALL {
        let seen = &sightings[component.index()];
        match seen.0.as_slice() {
            [(Some(value), _)] => signals.push(Signal::new(
                component,
                value.clone(),
                SCORE_CONSISTENT,
                format!("{POM_XML} / {POM_PROPERTIES}"),
            )),
            entries => {
                for (value, sources) in entries {
                    let Some(value) = value else { continue };
                    for source in sources {
                        signals.push(Signal::new(
                            component,
                            value.clone(),
                            SCORE_PER_SOURCE,
                            source.clone(),
                        ));
                    }
                }
            }
        }
    }
    signals
}

/// `(groupId, artifactId)` when the file sits at `META-INF/maven/<g>/<a>/<file>`.
fn path_values(path: &str) -> Option<(String, String)> {
    let rest = path.strip_prefix(MAVEN_META_DIR)?.strip_prefix('/')?;
    let parts: Vec<&str> = rest.split('/').collect();
    match parts.as_slice() {
        [group_id, artifact_id, _file] if !group_id.is_empty() && !artifact_id.is_empty() => {
            Some((group_id.to_string(), artifact_id.to_string()))
        }
        _ => None,
    }
}

/// Project coordinates, with groupId and version inherited from `<parent>` when absent.
fn parse_pom_xml(content: &[u8]) -> Result<PomValues> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut project = PomValues::default();
    let mut parent = PomValues::default();
    let mut buf = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .context("Failed to parse pom.xml")?
        {
            Event::Start(e) => {
                stack.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                text.clear();
            }
            Event::Text(e) => {
                text.push_str(&e.decode().context("pom.xml is not valid text")?);
            }
            Event::GeneralRef(e) => {
                let name = e.decode().context("pom.xml is not valid text")?;
                if let Some(resolved) = quick_xml::escape::resolve_predefined_entity(&name) {
                    text.push_str(resolved);
                } else if let Ok(Some(ch)) = e.resolve_char_ref() {
                    text.push(ch);
                }
            }
            Event::End(_) => {
                let path: Vec<&str> = stack.iter().map(String::as_str).collect();
                let value = Some(text.trim().to_string()).filter(|v| !v.is_empty());
                match path.as_slice() {
                    ["project", "groupId"] => project.group_id = value,
                    ["project", "artifactId"] => project.artifact_id = value,
                    ["project", "version"] => project.version = value,
                    ["project", "parent", "groupId"] => parent.group_id = value,
                    ["project", "parent", "version"] => parent.version = value,
                    _ => {}
                }
                stack.pop();
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(PomValues {
        group_id: project.group_id.or(parent.group_id),
        artifact_id: project.artifact_id,
        version: project.version.or(parent.version),
    })
}

/// `groupId`, `artifactId` and `version` keys of a Java properties file.
fn parse_pom_properties(content: &[u8]) -> PomValues {
    let text = String::from_utf8_lossy(content);
    let mut values = PomValues::default();
    let mut logical = String::new();

    for raw in text.lines() {
        let line = raw.trim_start();
        if logical.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }
        if let Some(continued) = line.strip_suffix('\\') {
            logical.push_str(continued);
            continue;
        }
        logical.push_str(line);

        let entry = std::mem::take(&mut logical);
        let split_at = entry.find(['=', ':', ' ', '\t']);
        let (key, value) = match split_at {
            Some(idx) => {
                let value = entry[idx + 1..].trim_start();
                let value = value
                    .strip_prefix(['=', ':'])
                    .map(str::trim_start)
                    .unwrap_or(value);
                (entry[..idx].trim_end(), value.trim_end())
            }
            None => (entry.as_str(), ""),
        };
        let value = Some(value.to_string()).filter(|v| !v.is_empty());
        match key {
            "groupId" => values.group_id = value,
            "artifactId" => values.artifact_id = value,
            "version" => values.version = value,
            _ => {}
        }
    }
    values
}
