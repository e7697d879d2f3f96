use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::content::ContentId;
use crate::queue::WorkQueue;
use crate::store::{CorpusStore, ParseStatus, SqliteCorpus};

/// Directories never worth mining
const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "bower_components",
    ".git",
    ".svn",
    ".hg",
    "dist",
    "build",
    "out",
    "coverage",
    "vendor",
];

/// Generated or bundled files
const IGNORED_SUFFIXES: &[&str] = &[".min.js", ".bundle.js", ".map"];

/// Check if a path (relative to the ingest root) should be skipped
pub fn should_ignore(path: &Path) -> bool {
    let in_ignored_dir = path.components().any(|component| match component {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name)),
        _ => false,
    });
    if in_ignored_dir {
        return true;
    }

    let name = path.to_string_lossy();
    IGNORED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Stored but never parsed and not on the queue, e.g. after a failed push
fn is_stranded(corpus: &SqliteCorpus, queue: &dyn WorkQueue, id: &ContentId) -> Result<bool> {
    if corpus.parse_status(id)? != ParseStatus::Unparsed {
        return Ok(false);
    }
    let queued = queue
        .contains(id)
        .context(format!("Failed to look up {} on the queue", id))?;
    if !queued {
        warn!(%id, "Stored but never enqueued; enqueueing again");
    }
    Ok(!queued)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Files read and stored
    pub files: u32,
    /// Files whose content was new or left unqueued; one queue entry each
    pub enqueued: u32,
    pub total_bytes: u64,
}

/// Store every matching file under `root` and enqueue content not seen before.
///
/// Byte-identical files collapse to one content id and one queue entry; each
/// path is still recorded.
pub fn ingest_directory(
    root: &Path,
    extension: &str,
    corpus: &SqliteCorpus,
    queue: &dyn WorkQueue,
) -> Result<IngestReport> {
    info!(root = %root.display(), extension, "Scanning");
    let mut report = IngestReport::default();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            !should_ignore(relative)
        });

    for entry in walker {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();
        if !entry.file_type().is_file() || !has_extension(path, extension) {
            continue;
        }

        let source = match fs::read(path) {
            Ok(source) => source,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to read");
                continue;
            }
        };

        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();

        let inserted = corpus
            .insert_source(&source)
            .context(format!("Failed to store {}", relative))?;
        corpus
            .insert_source_path(&relative, &inserted.id)
            .context(format!("Failed to record path {}", relative))?;

        if inserted.is_new || is_stranded(corpus, queue, &inserted.id)? {
            queue
                .push(&inserted.id)
                .context(format!("Failed to enqueue {}", inserted.id))?;
            report.enqueued += 1;
        } else {
            debug!(path = %relative, id = %inserted.id, "Already in corpus");
        }

        report.files += 1;
        report.total_bytes += source.len() as u64;
        if report.files % 100 == 0 {
            info!(files = report.files, "Ingested");
        }
    }

    info!(
        files = report.files,
        enqueued = report.enqueued,
        bytes = report.total_bytes,
        "Ingest complete"
    );
    Ok(report)
}
