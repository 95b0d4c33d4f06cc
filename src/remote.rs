//! HTTP implementation of [`RepositoryClient`] for Maven2-layout repositories.

use anyhow::{Context, Result};
use async_trait::async_trait;
use hex::FromHex;
use hyper::client::HttpConnector;
use hyper::header::{LOCATION, USER_AGENT};
use hyper::{Body, Client, Request, StatusCode, Uri};
use hyper_tls::HttpsConnector;
use quick_xml::Reader;
use quick_xml::events::Event;
use sha1::{Digest, Sha1};
use std::sync::OnceLock;
use tracing::{debug, info, trace, warn};

use crate::coordinate::MavenCoordinate;
use crate::repository::{RepositoryClient, ResolvedArtifact};
use crate::settings;

// Maven Central answers 403 without a user agent.
const USER_AGENT_VALUE: &str = concat!("jar-mavenizer/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositorySource {
    Explicit(Vec<String>),
    Discover,
}

pub struct HttpRepository {
    client: Client<HttpsConnector<HttpConnector>>,
    source: RepositorySource,
    repositories: OnceLock<Vec<String>>,
}

impl HttpRepository {
    pub fn new(source: RepositorySource) -> Self {
        Self {
            client: Client::builder().build::<_, Body>(HttpsConnector::new()),
            source,
            repositories: OnceLock::new(),
        }
    }

    fn repositories(&self) -> &[String] {
        self.repositories.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// GET with redirects. `Ok(None)` on 404.
    async fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let mut url = url.to_string();
        for _ in 0..=MAX_REDIRECTS {
            let request = Request::builder()
                .method("GET")
                .uri(Uri::try_from(url.as_str())?)
                .header(USER_AGENT, USER_AGENT_VALUE)
                .body(Body::empty())?;
            trace!("getting {url}");

            let response = self
                .client
                .request(request)
                .await
                .with_context(|| format!("GET {url} failed"))?;
            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|h| h.to_str().ok())
                    .with_context(|| format!("redirect from {url} without location"))?;
                url = resolve_location(&url, location)?;
                continue;
            }
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !status.is_success() {
                anyhow::bail!("GET {url} returned {status}");
            }

            let expected_sha1 = response
                .headers()
                .get("x-checksum-sha1")
                .and_then(|h| h.to_str().ok())
                .map(str::to_string);
            let body = hyper::body::to_bytes(response.into_body())
                .await
                .with_context(|| format!("Failed to read body of {url}"))?;
            if let Some(expected) = expected_sha1 {
                verify_sha1(&body, &expected).with_context(|| format!("corrupt download: {url}"))?;
            }
            return Ok(Some(body.to_vec()));
        }
        anyhow::bail!("too many redirects: {url}")
    }
}

#[async_trait]
impl RepositoryClient for HttpRepository {
    async fn initialize(&self) -> Result<()> {
        let repositories = match &self.source {
            RepositorySource::Explicit(urls) => urls
                .iter()
                .map(|u| normalize_base_uri(u))
                .collect::<Result<Vec<_>>>()?,
            RepositorySource::Discover => settings::discover_repositories().await?,
        };
        info!("Remote repositories: {}", repositories.join(", "));
        if self.repositories.set(repositories).is_err() {
            debug!("Remote repositories already initialized, keeping the first list");
        }
        Ok(())
    }

    async fn resolve(&self, coordinate: &MavenCoordinate) -> Result<Option<ResolvedArtifact>> {
        let path = coordinate
            .artifact_path("jar")
            .with_context(|| format!("cannot resolve {coordinate} without a version"))?;
        for base in self.repositories() {
            let url = format!("{base}{path}");
            match self.get(&url).await {
                Ok(Some(bytes)) => {
                    debug!("Resolved {coordinate} from {url}");
                    return Ok(Some(ResolvedArtifact { url, bytes }));
                }
                Ok(None) => debug!("Not found: {url}"),
                Err(e) => debug!("Failed to resolve {coordinate} from {base}: {e:#}"),
            }
        }
        Ok(None)
    }

    async fn list_versions(&self, group_id: &str, artifact_id: &str) -> Result<Vec<String>> {
        let pair = MavenCoordinate::new(group_id, artifact_id, None);
        let path = pair.metadata_path();
        for base in self.repositories() {
            let url = format!("{base}{path}");
            let bytes = match self.get(&url).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Failed to list versions of {pair} from {base}: {e:#}");
                    continue;
                }
            };
            let mut versions = match parse_metadata_versions(&bytes) {
                Ok(versions) => versions,
                Err(e) => {
                    warn!("Failed to parse {url}: {e:#}");
                    continue;
                }
            };
            if !versions.is_empty() {
                versions.reverse();
                debug!("Versions found for {pair} in {base}: {}", versions.len());
                return Ok(versions);
            }
        }
        debug!("Versions not found for {pair}");
        Ok(Vec::new())
    }

    fn remote_repositories(&self) -> Vec<String> {
        self.repositories().to_vec()
    }
}

/// Appends the trailing `/` that relative artifact paths rely on and checks the URI.
pub fn normalize_base_uri(url: &str) -> Result<String> {
    let mut base = url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Uri::try_from(base.as_str()).with_context(|| format!("invalid repository URL: {url}"))?;
    Ok(base)
}

fn resolve_location(current: &str, location: &str) -> Result<String> {
    if location.starts_with("http://") || location.starts_with("https://") {
        return Ok(location.to_string());
    }
    let current = Uri::try_from(current)?;
    let scheme = current.scheme_str().unwrap_or("https");
    let authority = current
        .authority()
        .map(|a| a.as_str())
        .context("redirect from URL without authority")?;
    if location.starts_with('/') {
        Ok(format!("{scheme}://{authority}{location}"))
    } else {
        let dir = current.path().rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        Ok(format!("{scheme}://{authority}{dir}/{location}"))
    }
}

fn verify_sha1(body: &[u8], expected_hex: &str) -> Result<()> {
    let expected = <[u8; 20]>::from_hex(expected_hex.trim()).context("malformed sha1 header")?;
    let actual: [u8; 20] = Sha1::digest(body).into();
    if actual != expected {
        anyhow::bail!(
            "sha1 mismatch: expected {}, got {}",
            hex::encode(expected),
            hex::encode(actual)
        );
    }
    Ok(())
}

/// `<metadata><versioning><versions><version>` in file order (oldest first).
pub fn parse_metadata_versions(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut versions = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                stack.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(e) => {
                let in_version = stack.iter().map(String::as_str).eq(["metadata", "versioning", "versions", "version"]);
                if in_version {
                    let version = e.decode()?.trim().to_string();
                    if !version.is_empty() {
                        versions.push(version);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(versions)
}
