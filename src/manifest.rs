//! `META-INF/MANIFEST.MF` parsing.
//!
//! A manifest is a main attribute block followed by named sections separated
//! by blank lines. Header lines are `Name: value`; a line starting with a single
//! space continues the previous value.

use anyhow::{Context, Result};

/// Attribute block keeping insertion order. Names compare case-insensitively,
/// a repeated name replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, name: String, value: String) {
        match self.0.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSection {
    pub name: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub main: Attributes,
    pub sections: Vec<ManifestSection>,
}

impl Manifest {
    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.sections.is_empty()
    }

    /// Main attributes first, then each named section in file order.
    pub fn attribute_blocks(&self) -> impl Iterator<Item = &Attributes> {
        std::iter::once(&self.main).chain(self.sections.iter().map(|s| &s.attributes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Rejects malformed headers, non UTF-8 content and sections without `Name`.
    Strict,
    /// Skips whatever it cannot understand.
    Lenient,
}

pub fn parse_manifest(bytes: &[u8], mode: ParseMode) -> Result<Manifest> {
    let text = match mode {
        ParseMode::Strict => std::str::from_utf8(bytes)
            .context("manifest is not valid UTF-8")?
            .to_string(),
        ParseMode::Lenient => String::from_utf8_lossy(bytes).into_owned(),
    };
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let mut blocks: Vec<Vec<(String, String)>> = Vec::new();
    let mut current: Vec<(String, String)> = Vec::new();

    for (line_no, line) in split_lines(text).enumerate() {
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix(' ') {
            match current.last_mut() {
                Some((_, value)) => value.push_str(rest),
                None if mode == ParseMode::Strict => {
                    anyhow::bail!("manifest line {}: continuation without header", line_no + 1)
                }
                None => {}
            }
            continue;
        }

        match split_header(line, mode) {
            Some((name, value)) => current.push((name.to_string(), value.to_string())),
            None if mode == ParseMode::Strict => {
                anyhow::bail!("manifest line {}: invalid header field", line_no + 1)
            }
            None => {}
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    let mut manifest = Manifest::default();
    let mut blocks = blocks.into_iter();

    // A leading block that starts with `Name` is already a section.
    let mut pending = blocks.next();
    if let Some(first) = pending.take() {
        if first.first().is_some_and(|(k, _)| k.eq_ignore_ascii_case("Name")) {
            pending = Some(first);
        } else {
            for (k, v) in first {
                manifest.main.insert(k, v);
            }
        }
    }

    for block in pending.into_iter().chain(blocks) {
        let mut entries = block.into_iter();
        let section_name = match entries.next() {
            Some((k, v)) if k.eq_ignore_ascii_case("Name") => v,
            _ if mode == ParseMode::Strict => {
                anyhow::bail!("invalid manifest format: section without Name")
            }
            _ => continue,
        };
        let mut attributes = Attributes::default();
        for (k, v) in entries {
            attributes.insert(k, v);
        }
        match manifest.sections.iter_mut().find(|s| s.name == section_name) {
            Some(existing) => {
                for (k, v) in attributes.0 {
                    existing.attributes.insert(k, v);
                }
            }
            None => manifest.sections.push(ManifestSection {
                name: section_name,
                attributes,
            }),
        }
    }

    Ok(manifest)
}

fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l))
}

fn split_header(line: &str, mode: ParseMode) -> Option<(&str, &str)> {
    match mode {
        ParseMode::Strict => {
            let (name, value) = line.split_once(": ")?;
            let valid_name = !name.is_empty()
                && name.len() <= 70
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            valid_name.then_some((name, value))
        }
        ParseMode::Lenient => {
            let (name, value) = line.split_once(':')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name, value.trim_start()))
        }
    }
}
