//! Single pass over a jar: collects what the extractors need and hashes every entry.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use memmap2::Mmap;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::manifest::{Manifest, ParseMode, parse_manifest};

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

pub type Digest256 = [u8; 32];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JarHashes {
    /// Digest over the decompressed bytes of every entry, in entry order.
    pub jar_sha256: Digest256,
    /// Digest of each `.class` entry keyed by entry path.
    pub class_sha256: BTreeMap<String, Digest256>,
}

impl JarHashes {
    pub fn jar_sha256_base64(&self) -> String {
        use base64::{Engine as _, engine::general_purpose::STANDARD};
        STANDARD.encode(self.jar_sha256)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JarIdentity {
    pub name: String,
    pub directory: String,
    pub hashes: JarHashes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    pub path: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomFile {
    pub path: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestOutcome {
    ParsedOk {
        manifest: Manifest,
        raw: String,
        /// The strict parse failed and the lenient re-parse produced this manifest.
        from_fallback: bool,
    },
    MissingManifest,
}

impl ManifestOutcome {
    pub fn manifest(&self) -> Option<&Manifest> {
        match self {
            ManifestOutcome::ParsedOk { manifest, .. } => Some(manifest),
            ManifestOutcome::MissingManifest => None,
        }
    }

    pub fn raw(&self) -> Option<&str> {
        match self {
            ManifestOutcome::ParsedOk { raw, .. } => Some(raw),
            ManifestOutcome::MissingManifest => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, ManifestOutcome::ParsedOk { .. })
    }
}

#[derive(Debug, Clone)]
pub struct JarContents {
    pub identity: JarIdentity,
    pub manifest: ManifestOutcome,
    pub pom_files: Vec<PomFile>,
    pub classes: Vec<ClassEntry>,
}

/// Absolute parent folder of the jar, independent of the working directory.
fn jar_directory(jar_path: &Path) -> Result<String> {
    let absolute = std::path::absolute(jar_path)
        .with_context(|| format!("Failed to resolve absolute path: {}", jar_path.display()))?;
    Ok(absolute
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default())
}

pub fn ingest_jar(jar_path: &Path) -> Result<JarContents> {
    let file = File::open(jar_path)
        .with_context(|| format!("Failed to open jar: {}", jar_path.display()))?;
    // SAFETY: the mapping is read-only and dropped before this function returns.
    let mmap = unsafe {
        Mmap::map(&file).with_context(|| format!("Failed to mmap jar: {}", jar_path.display()))?
    };

    let name = jar_path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let directory = jar_directory(jar_path)?;

    let walk = walk_jar(Cursor::new(&mmap[..]))
        .with_context(|| format!("Failed to read jar: {}", jar_path.display()))?;

    let manifest = resolve_manifest(&name, walk.primary_manifest, walk.raw_manifest);
    if !manifest.is_present() {
        warn!("Did not find manifest in '{name}'! Expected '{MANIFEST_PATH}' to exist!");
    }

    Ok(JarContents {
        identity: JarIdentity {
            name,
            directory,
            hashes: walk.hashes,
        },
        manifest,
        pom_files: walk.pom_files,
        classes: walk.classes,
    })
}

/// Hashes a jar held in memory, e.g. a downloaded remote artifact.
pub fn hash_jar_bytes(bytes: &[u8]) -> Result<JarHashes> {
    Ok(walk_jar(Cursor::new(bytes))?.hashes)
}

struct JarWalk {
    hashes: JarHashes,
    primary_manifest: Option<Vec<u8>>,
    raw_manifest: Option<Vec<u8>>,
    pom_files: Vec<PomFile>,
    classes: Vec<ClassEntry>,
}

fn walk_jar<R: Read + Seek>(reader: R) -> Result<JarWalk> {
    let mut archive = ZipArchive::new(reader).context("Failed to read zip structure")?;

    let mut jar_hasher = Sha256::new();
    let mut class_hasher = Sha256::new();
    let mut class_sha256 = BTreeMap::new();
    let mut primary_manifest = None;
    let mut raw_manifest = None;
    let mut pom_files = Vec::new();
    let mut classes = Vec::new();
    let mut chunk = vec![0u8; 64 * 1024];

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let path = entry.name().to_string();
        let file_name = path.rsplit('/').next().unwrap_or(&path);

        let is_class = path.to_ascii_lowercase().ends_with(".class");
        let is_pom = file_name == "pom.xml" || file_name == "pom.properties";
        let is_manifest = path.eq_ignore_ascii_case(MANIFEST_PATH);
        let keep = is_pom || is_manifest;

        if is_class {
            classes.push(ClassEntry {
                path: path.clone(),
                timestamp: best_timestamp(entry.extra_data(), entry.last_modified()),
            });
        }

        let mut kept = Vec::new();
        loop {
            let n = entry
                .read(&mut chunk)
                .with_context(|| format!("Failed to read entry: {path}"))?;
            if n == 0 {
                break;
            }
            jar_hasher.update(&chunk[..n]);
            if is_class {
                class_hasher.update(&chunk[..n]);
            }
            if keep {
                kept.extend_from_slice(&chunk[..n]);
            }
        }

        if is_class {
            class_sha256.insert(path.clone(), class_hasher.finalize_reset().into());
        }
        if is_pom {
            pom_files.push(PomFile {
                path: path.clone(),
                content: kept.clone(),
            });
        }
        if is_manifest {
            if path == MANIFEST_PATH && primary_manifest.is_none() {
                primary_manifest = Some(kept.clone());
            }
            raw_manifest = Some(kept);
        }
    }

    Ok(JarWalk {
        hashes: JarHashes {
            jar_sha256: jar_hasher.finalize().into(),
            class_sha256,
        },
        primary_manifest,
        raw_manifest,
        pom_files,
        classes,
    })
}

/// Strict parse of the canonical entry first; a lenient re-parse of the raw
/// bytes only when that yields nothing and a manifest entry was actually seen.
fn resolve_manifest(
    jar_name: &str,
    primary: Option<Vec<u8>>,
    raw: Option<Vec<u8>>,
) -> ManifestOutcome {
    if let Some(bytes) = primary.as_deref()
        && let Ok(manifest) = parse_manifest(bytes, ParseMode::Strict)
        && !manifest.is_empty()
    {
        return ManifestOutcome::ParsedOk {
            manifest,
            raw: String::from_utf8_lossy(bytes).into_owned(),
            from_fallback: false,
        };
    }

    let Some(bytes) = raw else {
        return ManifestOutcome::MissingManifest;
    };
    debug!("Failed to auto-parse manifest: {jar_name}");
    match parse_manifest(&bytes, ParseMode::Lenient) {
        Ok(manifest) if !manifest.is_empty() => ManifestOutcome::ParsedOk {
            manifest,
            raw: String::from_utf8_lossy(&bytes).into_owned(),
            from_fallback: true,
        },
        _ => ManifestOutcome::MissingManifest,
    }
}

const EXTRA_NTFS: u16 = 0x000a;
const EXTRA_EXTENDED_TIMESTAMP: u16 = 0x5455;
const FILETIME_UNIX_EPOCH_SECS: i64 = 11_644_473_600;

/// Creation time if an extra field carries one, else modification time.
fn best_timestamp(extra: &[u8], dos: zip::DateTime) -> Option<DateTime<Utc>> {
    let mut created = None;
    let mut modified = None;

    for (id, data) in extra_fields(extra) {
        match id {
            EXTRA_NTFS => {
                if let Some(ctime) = ntfs_creation_time(data) {
                    created.get_or_insert(ctime);
                }
            }
            EXTRA_EXTENDED_TIMESTAMP => {
                let (mtime, ctime) = extended_timestamps(data);
                if let Some(ctime) = ctime {
                    created.get_or_insert(ctime);
                }
                if let Some(mtime) = mtime {
                    modified.get_or_insert(mtime);
                }
            }
            _ => {}
        }
    }

    created.or(modified).or_else(|| {
        Utc.with_ymd_and_hms(
            i32::from(dos.year()),
            u32::from(dos.month()),
            u32::from(dos.day()),
            u32::from(dos.hour()),
            u32::from(dos.minute()),
            u32::from(dos.second()),
        )
        .single()
    })
}

fn extra_fields(mut extra: &[u8]) -> Vec<(u16, &[u8])> {
    let mut fields = Vec::new();
    while extra.len() >= 4 {
        let id = u16::from_le_bytes([extra[0], extra[1]]);
        let size = usize::from(u16::from_le_bytes([extra[2], extra[3]]));
        let Some(data) = extra.get(4..4 + size) else {
            break;
        };
        fields.push((id, data));
        extra = &extra[4 + size..];
    }
    fields
}

/// Returns (modification, creation) from an `UT` extra field.
fn extended_timestamps(data: &[u8]) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let Some(&flags) = data.first() else {
        return (None, None);
    };
    let read = |offset: usize| {
        data.get(offset..offset + 4)
            .and_then(|b| <[u8; 4]>::try_from(b).ok())
            .and_then(|b| DateTime::from_timestamp(i64::from(i32::from_le_bytes(b)), 0))
    };

    let mut offset = 1;
    let mut mtime = None;
    let mut ctime = None;
    if flags & 0x01 != 0 {
        mtime = read(offset);
        offset += 4;
    }
    if flags & 0x02 != 0 {
        offset += 4;
    }
    if flags & 0x04 != 0 {
        ctime = read(offset);
    }
    (mtime, ctime)
}

fn ntfs_creation_time(data: &[u8]) -> Option<DateTime<Utc>> {
    // 4 reserved bytes, then tagged attributes; tag 1 holds mtime, atime, ctime.
    let mut rest = data.get(4..)?;
    while rest.len() >= 4 {
        let tag = u16::from_le_bytes([rest[0], rest[1]]);
        let size = usize::from(u16::from_le_bytes([rest[2], rest[3]]));
        let body = rest.get(4..4 + size)?;
        if tag == 0x0001 && size >= 24 {
            let ctime = u64::from_le_bytes(<[u8; 8]>::try_from(&body[16..24]).ok()?);
            let secs = i64::try_from(ctime / 10_000_000).ok()? - FILETIME_UNIX_EPOCH_SECS;
            return DateTime::from_timestamp(secs, 0);
        }
        rest = &rest[4 + size..];
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};

    fn write_jar(path: &Path, entries: &[(&str, &str)]) -> Result<()> {
        let file = File::create(path)?;
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, options)?;
            } else {
                zip.start_file(*name, options)?;
                zip.write_all(content.as_bytes())?;
            }
        }
        zip.finish()?;
        Ok(())
    }

    #[test]
    fn one_pass_hashes_every_class() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let jar = dir.path().join("widget-2.3.1.jar");
        write_jar(
            &jar,
            &[
                ("META-INF/", ""),
                ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\r\nImplementation-Title: widget\r\n\r\n"),
                ("org/example/widget/A.class", "class A"),
                ("org/example/widget/B.class", "class B"),
                ("org/example/widget/util/C.class", "class C"),
                ("META-INF/maven/org.example/widget/pom.properties", "groupId=org.example\n"),
                ("readme.txt", "hello"),
            ],
        )?;

        let contents = ingest_jar(&jar)?;
        assert_eq!(contents.identity.name, "widget-2.3.1.jar");
        assert_eq!(contents.identity.hashes.class_sha256.len(), 3);
        assert_eq!(contents.classes.len(), 3);
        assert_eq!(contents.pom_files.len(), 1);
        assert_eq!(
            contents.identity.hashes.class_sha256["org/example/widget/A.class"],
            <Digest256>::from(Sha256::digest(b"class A"))
        );
        assert!(matches!(
            contents.manifest,
            ManifestOutcome::ParsedOk { from_fallback: false, .. }
        ));

        let again = hash_jar_bytes(&std::fs::read(&jar)?)?;
        assert_eq!(again, contents.identity.hashes);
        Ok(())
    }

    #[test]
    fn directory_is_absolute_for_relative_paths() -> Result<()> {
        let relative = jar_directory(Path::new("lib/foo.jar"))?;
        assert!(Path::new(&relative).is_absolute());
        assert!(relative.ends_with("lib"));

        let bare = jar_directory(Path::new("foo.jar"))?;
        assert!(Path::new(&bare).is_absolute());

        let dir = tempfile::tempdir()?;
        let jar = dir.path().join("lib").join("foo.jar");
        std::fs::create_dir_all(jar.parent().unwrap())?;
        write_jar(&jar, &[("A.class", "A")])?;
        let identity = ingest_jar(&jar)?.identity;
        assert!(Path::new(&identity.directory).is_absolute());
        assert!(identity.directory.ends_with("lib"));
        Ok(())
    }

    #[test]
    fn whole_jar_digest_covers_all_entry_bytes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let jar = dir.path().join("a.jar");
        write_jar(&jar, &[("x.txt", "abc"), ("A.class", "def")])?;

        let hashes = ingest_jar(&jar)?.identity.hashes;
        assert_eq!(hashes.jar_sha256, <Digest256>::from(Sha256::digest(b"abcdef")));
        Ok(())
    }

    #[test]
    fn broken_manifest_falls_back_to_lenient_parse() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let jar = dir.path().join("broken.jar");
        write_jar(
            &jar,
            &[("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\ngarbage line\nMain-Class: org.example.Main\n")],
        )?;

        let contents = ingest_jar(&jar)?;
        match &contents.manifest {
            ManifestOutcome::ParsedOk { manifest, from_fallback, .. } => {
                assert!(*from_fallback);
                assert_eq!(manifest.main.get("Main-Class"), Some("org.example.Main"));
            }
            ManifestOutcome::MissingManifest => panic!("expected fallback manifest"),
        }
        Ok(())
    }

    #[test]
    fn missing_manifest_is_not_fatal() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let jar = dir.path().join("bare.jar");
        write_jar(&jar, &[("org/example/A.class", "A")])?;

        let contents = ingest_jar(&jar)?;
        assert_eq!(contents.manifest, ManifestOutcome::MissingManifest);
        Ok(())
    }

    #[test]
    fn extended_timestamp_prefers_creation_time() {
        let mut extra = vec![0x55, 0x54, 9, 0, 0x05];
        extra.extend_from_slice(&1_600_000_000i32.to_le_bytes());
        extra.extend_from_slice(&1_500_000_000i32.to_le_bytes());
        let dos = zip::DateTime::default();

        let ts = best_timestamp(&extra, dos).unwrap();
        assert_eq!(ts.timestamp(), 1_500_000_000);

        // Central directory copies usually carry the modification time only.
        let mut mtime_only = vec![0x55, 0x54, 5, 0, 0x05];
        mtime_only.extend_from_slice(&1_600_000_000i32.to_le_bytes());
        let ts = best_timestamp(&mtime_only, dos).unwrap();
        assert_eq!(ts.timestamp(), 1_600_000_000);
    }

    #[test]
    fn dos_time_is_used_without_extra_fields() {
        let dos = zip::DateTime::from_date_and_time(2021, 3, 4, 5, 6, 8).unwrap();
        let ts = best_timestamp(&[], dos).unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "2021-03-04 05:06:08");
    }

    #[test]
    fn not_a_zip_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let jar = dir.path().join("fake.jar");
        std::fs::write(&jar, b"definitely not a zip")?;
        assert!(ingest_jar(&jar).is_err());
        Ok(())
    }
}
