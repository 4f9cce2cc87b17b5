//! Candidate-file search: a cheap pre-filter before full extraction.
//!
//! Walks a tree (gitignore-aware via the `ignore` crate), keeps files with
//! a registered comment dialect under the size ceiling, then checks their
//! raw content for any marker substring on a bounded worker pool. Workers
//! pull paths from a shared channel and push hits to a single aggregating
//! receiver, so there is no shared result list to lock and the file-count
//! cap is enforced at the feeding end.

use crate::comment::{MAX_FILE_SIZE, patterns};
use crate::log::{log_debug, log_warn};
use anyhow::{Context, Result, bail};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

/// Stop collecting candidates after this many supported files
pub const MAX_FILES_TO_SEARCH: usize = 10_000;

/// Worker threads scanning candidate content
const SEARCH_WORKERS: usize = 8;

/// Directory names never worth descending into, registered dialect or not.
const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    ".vscode",
    ".idea",
    "__pycache__",
    ".pytest_cache",
    "target",
    "build",
    "dist",
    ".next",
    ".nuxt",
    "vendor",
];

/// Whether a directory component disqualifies a path.
pub fn in_ignored_directory(path: &Path) -> bool {
    path.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        IGNORED_DIRS.contains(&name.as_ref()) || (name.starts_with('.') && name.len() > 1)
    })
}

/// Quick content check: does this file mention any marker at all?
fn has_marker_substring(path: &Path) -> bool {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            log_warn(
                "search",
                "read.fail",
                &format!("{}: {}", path.display(), e),
            );
            return false;
        }
    };
    let lower = content.to_lowercase();
    lower.contains("ai?") || lower.contains("ai!") || lower.contains("ai:")
}

/// Find files likely to contain marker comments under `root`.
///
/// `ignore_extra` lets the caller exclude more paths on top of the built-in
/// directory and gitignore rules. No ordering guarantee on the result; only
/// a walk that cannot start at all is an error.
pub fn find_candidate_files<F>(root: &Path, ignore_extra: F) -> Result<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    if !root.is_dir() {
        bail!("search root is not a directory: {}", root.display());
    }

    // Collect candidates up to the cap. WalkBuilder applies gitignore rules
    // and skips hidden entries; the explicit dir list covers non-git trees.
    let mut candidates: Vec<PathBuf> = Vec::new();
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_exclude(true)
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log_warn("search", "walk.fail", &format!("{}", e));
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();

        let Some(ext) = patterns::extension_of(path) else {
            continue;
        };
        if !patterns::is_supported(&ext) {
            continue;
        }
        // Ignore rules apply to the path below the root; the root itself may
        // legitimately live under a dot-directory.
        let rel = path.strip_prefix(root).unwrap_or(path);
        if in_ignored_directory(rel) || ignore_extra(path) {
            continue;
        }
        if entry
            .metadata()
            .map(|m| m.len() > MAX_FILE_SIZE)
            .unwrap_or(true)
        {
            log_debug(
                "search",
                "skip.too_large",
                &format!("{}", path.display()),
            );
            continue;
        }

        candidates.push(path.to_path_buf());
        if candidates.len() >= MAX_FILES_TO_SEARCH {
            log_warn(
                "search",
                "cap.reached",
                &format!("stopping at {} candidate files", MAX_FILES_TO_SEARCH),
            );
            break;
        }
    }

    Ok(scan_candidates(candidates))
}

/// Fan candidate paths out to the worker pool and collect the hits.
fn scan_candidates(candidates: Vec<PathBuf>) -> Vec<PathBuf> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let (path_tx, path_rx) = mpsc::channel::<PathBuf>();
    let path_rx = Arc::new(Mutex::new(path_rx));
    let (hit_tx, hit_rx) = mpsc::channel::<PathBuf>();

    let workers = SEARCH_WORKERS.min(candidates.len());
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let path_rx = Arc::clone(&path_rx);
        let hit_tx = hit_tx.clone();
        handles.push(thread::spawn(move || {
            loop {
                // Release the receiver lock before touching the filesystem,
                // or the pool degrades to one worker at a time.
                let next = { path_rx.lock().unwrap().recv() };
                let path = match next {
                    Ok(p) => p,
                    Err(_) => break, // Feeder closed, queue drained
                };
                if has_marker_substring(&path) {
                    let _ = hit_tx.send(path);
                }
            }
        }));
    }
    drop(hit_tx);

    for path in candidates {
        let _ = path_tx.send(path);
    }
    drop(path_tx);

    // Aggregate until every worker has dropped its sender (barrier).
    let hits: Vec<PathBuf> = hit_rx.into_iter().collect();
    for handle in handles {
        let _ = handle.join();
    }

    log_debug(
        "search",
        "done",
        &format!("{} files with marker substrings", hits.len()),
    );
    hits
}

/// Convenience wrapper with no extra ignore predicate.
pub fn find_candidate_files_default(root: &Path) -> Result<Vec<PathBuf>> {
    find_candidate_files(root, |_| false).context("candidate file search failed")
}
