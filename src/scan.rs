use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Expands the given paths into jar files. Folders are listed one level deep and
/// sorted by file name, files are taken as given. Duplicates are dropped.
pub fn discover_jars(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut jars: Vec<PathBuf> = Vec::new();
    for path in paths {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Path does not exist: {}", path.display()))?;
        let found = if metadata.is_dir() {
            jars_in_folder(path)
        } else {
            vec![path.clone()]
        };
        for jar in found {
            if !jars.contains(&jar) {
                jars.push(jar);
            }
        }
    }
    Ok(jars)
}

fn jars_in_folder(folder: &Path) -> Vec<PathBuf> {
    let (tx, rx) = mpsc::channel();

    let walker = WalkBuilder::new(folder)
        .max_depth(Some(1))
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            if let Ok(entry) = entry
                && entry.depth() == 1
                && entry.file_type().is_some_and(|t| t.is_file())
                && entry.path().extension().is_some_and(|e| e == "jar")
            {
                let _ = tx.send(entry.path().to_path_buf());
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    let mut jars: Vec<PathBuf> = rx.iter().collect();
    jars.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    jars
}

/// Skips `start` jars and keeps at most `limit` of the rest.
pub fn apply_window(jars: Vec<PathBuf>, start: usize, limit: Option<usize>) -> Vec<PathBuf> {
    jars.into_iter()
        .skip(start)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}
