//! Remote repository discovery from the local Maven settings.

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::path::PathBuf;
use std::process::Stdio;
use tracing::debug;

use crate::remote::normalize_base_uri;

pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2/";

/// Repositories of the active profiles, Maven Central last.
pub async fn discover_repositories() -> Result<Vec<String>> {
    let xml = match effective_settings().await {
        Ok(xml) => Some(xml),
        Err(e) => {
            debug!("Effective settings unavailable, reading user settings: {e:#}");
            read_user_settings()?
        }
    };

    let mut repositories = Vec::new();
    if let Some(xml) = xml {
        for url in parse_settings_repositories(&xml)? {
            match normalize_base_uri(&url) {
                Ok(url) => repositories.push(url),
                Err(e) => debug!("Ignoring repository from settings: {e:#}"),
            }
        }
    }
    if !repositories.iter().any(|r| r == MAVEN_CENTRAL) {
        repositories.push(MAVEN_CENTRAL.to_string());
    }
    Ok(repositories)
}

async fn effective_settings() -> Result<String> {
    let output = std::env::temp_dir().join(format!(
        "mavenizer-effective-settings-{}.xml",
        std::process::id()
    ));
    let status = tokio::process::Command::new(mvn_command())
        .arg("help:effective-settings")
        .arg("-DshowPasswords=true")
        .arg(format!("-Doutput={}", output.display()))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .context("Failed to run mvn")?;
    if !status.success() {
        anyhow::bail!("mvn help:effective-settings exited with {status}");
    }

    let xml = tokio::fs::read_to_string(&output)
        .await
        .with_context(|| format!("Failed to read {}", output.display()))?;
    let _ = tokio::fs::remove_file(&output).await;
    Ok(xml)
}

fn mvn_command() -> &'static str {
    if cfg!(windows) { "mvn.cmd" } else { "mvn" }
}

fn user_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".m2").join("settings.xml"))
}

fn read_user_settings() -> Result<Option<String>> {
    let Some(path) = user_settings_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    let xml = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Some(xml))
}

#[derive(Debug, Default)]
struct Profile {
    id: String,
    active_by_default: bool,
    repositories: Vec<String>,
}

/// Repository URLs of profiles that are active by default or listed in `<activeProfiles>`.
pub fn parse_settings_repositories(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut profiles: Vec<Profile> = Vec::new();
    let mut active_ids: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "profile" && path_is(&stack, &["settings", "profiles"]) {
                    profiles.push(Profile::default());
                }
                stack.push(name);
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(e) => {
                let text = e.decode()?.trim().to_string();
                if path_is(&stack, &["settings", "activeProfiles", "activeProfile"]) {
                    active_ids.push(text);
                } else if let Some(profile) = profiles.last_mut() {
                    if path_is(&stack, &["settings", "profiles", "profile", "id"]) {
                        profile.id = text;
                    } else if path_is(
                        &stack,
                        &["settings", "profiles", "profile", "activation", "activeByDefault"],
                    ) {
                        profile.active_by_default = text.eq_ignore_ascii_case("true");
                    } else if path_is(
                        &stack,
                        &["settings", "profiles", "profile", "repositories", "repository", "url"],
                    ) {
                        profile.repositories.push(text);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let mut urls: Vec<String> = Vec::new();
    for profile in profiles {
        if !profile.active_by_default && !active_ids.contains(&profile.id) {
            continue;
        }
        for url in profile.repositories {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    Ok(urls)
}

fn path_is(stack: &[String], expected: &[&str]) -> bool {
    stack.iter().map(String::as_str).eq(expected.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<settings xmlns="http://maven.apache.org/SETTINGS/1.0.0">
  <profiles>
    <profile>
      <id>company</id>
      <repositories>
        <repository>
          <id>nexus</id>
          <url>https://nexus.example.com/repository/public</url>
        </repository>
      </repositories>
    </profile>
    <profile>
      <id>always</id>
      <activation><activeByDefault>true</activeByDefault></activation>
      <repositories>
        <repository><id>extra</id><url>https://extra.example.com/maven2/</url></repository>
      </repositories>
    </profile>
    <profile>
      <id>inactive</id>
      <repositories>
        <repository><id>old</id><url>https://old.example.com/</url></repository>
      </repositories>
    </profile>
  </profiles>
  <activeProfiles>
    <activeProfile>company</activeProfile>
  </activeProfiles>
</settings>"#;

    #[test]
    fn active_profile_repositories_in_declaration_order() -> Result<()> {
        assert_eq!(
            parse_settings_repositories(SETTINGS)?,
            vec![
                "https://nexus.example.com/repository/public",
                "https://extra.example.com/maven2/",
            ]
        );
        Ok(())
    }

    #[test]
    fn settings_without_profiles_yield_nothing() -> Result<()> {
        assert!(parse_settings_repositories("<settings><localRepository>/tmp/m2</localRepository></settings>")?.is_empty());
        Ok(())
    }
}
