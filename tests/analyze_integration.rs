use serde_json::Value;
use std::process::Command;

fn write_jar(path: &std::path::Path, entries: &[(&str, &str)]) -> anyhow::Result<()> {
    use std::io::Write;
    use zip::write::FileOptions;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(content.as_bytes())?;
    }
    zip.finish()?;
    Ok(())
}

fn run(args: &[&str], stdin: &str) -> anyhow::Result<(String, bool)> {
    use std::io::Write;
    use std::process::Stdio;

    let mut child = Command::new(env!("CARGO_BIN_EXE_jar-mavenizer"))
        .args(args)
        .env_remove("MAVENIZER_REMOTE_REPOS")
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    if let Some(mut input) = child.stdin.take() {
        input.write_all(stdin.as_bytes())?;
    }
    let out = child.wait_with_output()?;
    Ok((String::from_utf8_lossy(&out.stdout).into_owned(), out.status.success()))
}

#[test]
fn offline_interactive_run_writes_report() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let libs = dir.path().join("libs");
    write_jar(
        &libs.join("widget-2.3.1.jar"),
        &[
            (
                "META-INF/MANIFEST.MF",
                "Manifest-Version: 1.0\r\nImplementation-Title: org.example.widget\r\nImplementation-Version: 2.3.1\r\n\r\n",
            ),
            (
                "META-INF/maven/org.example/widget/pom.properties",
                "groupId=org.example\nartifactId=widget\nversion=2.3.1\n",
            ),
            ("org/example/widget/Widget.class", "class bytes"),
            ("org/example/widget/Part.class", "more class bytes"),
        ],
    )?;
    write_jar(&libs.join("zeta.jar"), &[("z/Z.class", "z")])?;
    std::fs::write(libs.join("readme.txt"), "not a jar")?;

    let report = dir.path().join("report-<datetime>.json");
    let report_arg = report.to_string_lossy().into_owned();
    let libs_arg = libs.to_string_lossy().into_owned();
    let (stdout, ok) = run(
        &[
            "analyze",
            &libs_arg,
            "--offline",
            "--interactive",
            "--report-file",
            &report_arg,
        ],
        "1!\n1!\n1!\n0!\n",
    )?;

    assert!(ok, "analyze failed:\n{stdout}");
    assert!(stdout.contains("Offline-Analysis: Jar 2/2"));
    assert!(stdout.contains("Analysis complete (1/2 excluded from report)."));

    let written: Vec<_> = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "json"))
        .collect();
    assert_eq!(written.len(), 1);
    let name = written[0].file_name().and_then(|n| n.to_str()).unwrap_or_default();
    assert!(!name.contains("<datetime>"));

    let report: Value = serde_json::from_str(&std::fs::read_to_string(&written[0])?)?;
    assert_eq!(report["schemaVersion"], "1.0");
    assert_eq!(report["analysisInfo"]["onlineCheckEnabled"], false);
    assert_eq!(report["analysisInfo"]["remoteRepos"], Value::Array(Vec::new()));

    let jars = report["jarResults"].as_array().cloned().unwrap_or_default();
    assert_eq!(jars.len(), 1);
    assert_eq!(jars[0]["filename"], "widget-2.3.1.jar");
    assert_eq!(jars[0]["foundOnRemote"], false);
    assert_eq!(jars[0]["result"]["groupId"], "org.example");
    assert_eq!(jars[0]["result"]["artifactId"], "widget");
    assert_eq!(jars[0]["result"]["version"], "2.3.1");
    assert!(jars[0]["result"]["classifier"].is_null());
    assert_eq!(jars[0]["sha256"].as_str().map(str::len), Some(44));
    Ok(())
}

#[test]
fn missing_path_fails() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("nope.jar").to_string_lossy().into_owned();
    let (_, ok) = run(&["analyze", &missing, "--offline"], "")?;
    assert!(!ok);
    Ok(())
}
