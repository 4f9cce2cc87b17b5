//! Recursive file watching for the comment workflow.
//!
//! Wraps a `notify` recursive watcher and filters the raw event stream down
//! to "a source file someone just saved": create/write events only, temp
//! files and ignored/hidden directories dropped, gitignore rules honored,
//! unregistered extensions dropped, and a per-path debounce window because
//! editors commonly fire several events per save (atomic replace: create
//! temp, write, rename).

use crate::comment::patterns;
use crate::log::{log_debug, log_error, log_warn};
use crate::search::in_ignored_directory;
use anyhow::{Context, Result};
use ignore::gitignore::Gitignore;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

/// Events for the same path within this window collapse into one dispatch.
pub const WATCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Editor droppings that fire events but never hold real source.
fn is_temp_file(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };
    name.ends_with('~')
        || name.ends_with(".tmp")
        || name.ends_with(".swp")
        || name.contains(".#")
}

/// Only writes and creates matter; editors that replace atomically surface
/// saves as creates.
fn wants_event_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

/// Full path filter applied to each event path.
fn should_dispatch(root: &Path, gitignore: &Gitignore, path: &Path) -> bool {
    if is_temp_file(path) {
        return false;
    }

    let Some(ext) = patterns::extension_of(path) else {
        return false;
    };
    if !patterns::is_supported(&ext) {
        return false;
    }

    let rel = path.strip_prefix(root).unwrap_or(path);
    if in_ignored_directory(rel) {
        return false;
    }
    if gitignore.matched_path_or_any_parents(rel, false).is_ignore() {
        return false;
    }

    true
}

/// Per-path event coalescing.
struct Debouncer {
    last: HashMap<PathBuf, Instant>,
    window: Duration,
}

impl Debouncer {
    fn new(window: Duration) -> Self {
        Self {
            last: HashMap::new(),
            window,
        }
    }

    /// Admit a path now, or swallow it as a duplicate of a recent event.
    fn admit(&mut self, path: &Path, now: Instant) -> bool {
        match self.last.get(path) {
            Some(prev) if now.duration_since(*prev) < self.window => false,
            _ => {
                self.last.insert(path.to_path_buf(), now);
                true
            }
        }
    }
}

/// Handle keeping the recursive watcher alive.
///
/// Dropping it stops watching; the dispatch channel simply goes quiet.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Start watching `root` recursively, sending surviving paths to `tx`.
    pub fn spawn(root: &Path, tx: Sender<PathBuf>) -> Result<Self> {
        if !root.is_dir() {
            anyhow::bail!("watch directory does not exist: {}", root.display());
        }

        let root = root
            .canonicalize()
            .with_context(|| format!("failed to resolve watch dir {}", root.display()))?;

        // Missing .gitignore yields an empty matcher; a malformed one is
        // logged and partially applied.
        let (gitignore, err) = Gitignore::new(root.join(".gitignore"));
        if let Some(err) = err {
            log_warn("watcher", "gitignore.partial", &format!("{}", err));
        }

        let debounce = Mutex::new(Debouncer::new(WATCH_DEBOUNCE));
        let event_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    log_error("watcher", "event.error", &format!("{}", e));
                    return;
                }
            };

            if !wants_event_kind(&event.kind) {
                return;
            }

            for path in event.paths {
                if !should_dispatch(&event_root, &gitignore, &path) {
                    continue;
                }
                if !debounce.lock().unwrap().admit(&path, Instant::now()) {
                    continue;
                }
                log_debug(
                    "watcher",
                    "change",
                    &format!("{}", path.display()),
                );
                if tx.send(path).is_err() {
                    // Dispatch side is gone; nothing useful left to do here.
                    return;
                }
            }
        })
        .context("failed to create file watcher")?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", root.display()))?;

        log_debug("watcher", "started", &format!("{}", root.display()));
        Ok(Self { _watcher: watcher })
    }
}
